//! Chart generation and rendering for the dashboard.
//!
//! This module creates ECharts visualizations of a user's transactions:
//! - **Revenue**: daily totals over time
//! - **Top items**: the categories with the largest totals
//! - **Heatmap**: totals by hour of the day and day of the week
//! - **Payment methods**: the share of each recipient
//!
//! Each chart is generated as JSON configuration for the ECharts library, either
//! embedded in the dashboard page with its initialization code or returned
//! from the JSON endpoints.

use std::str::FromStr;

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title, VisualMap},
    datatype::{DataFrame, DataPoint},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, Orient, Tooltip, Trigger},
    series::{Bar, Heatmap, Line, Pie},
};
use maud::{Markup, PreEscaped, html};
use serde::Deserialize;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    dashboard::aggregation::{
        TOP_CATEGORY_LIMIT, daily_totals, hour_weekday_totals, recipient_totals, top_categories,
    },
    html::HeadElement,
    transaction::Transaction,
};

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const TIMESTAMP_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// The charts that can be requested by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChartId {
    Revenue,
    TopItems,
    Heatmap,
    PaymentMethods,
}

impl ChartId {
    pub(crate) const ALL: [ChartId; 4] = [
        ChartId::Revenue,
        ChartId::TopItems,
        ChartId::Heatmap,
        ChartId::PaymentMethods,
    ];

    /// The ID used in requests, e.g. "top-items".
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ChartId::Revenue => "revenue",
            ChartId::TopItems => "top-items",
            ChartId::Heatmap => "heatmap",
            ChartId::PaymentMethods => "payment-methods",
        }
    }

    /// Whether the series type of the chart can be switched between line and bar.
    pub(crate) fn has_chart_type(&self) -> bool {
        matches!(self, ChartId::Revenue | ChartId::TopItems)
    }
}

impl FromStr for ChartId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownChart(s.to_owned()))
    }
}

/// The series type for the charts that support both.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ChartType {
    #[default]
    Line,
    Bar,
}

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: String,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
///
/// Charts that support switching between line and bar get a select element
/// with the chart ID in its `data-chart-id` attribute.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div class="flex flex-col gap-2"
                    {
                        @if let Some(chart_id) = chart.id.strip_suffix("-chart")
                            .and_then(|id| id.parse::<ChartId>().ok())
                            .filter(ChartId::has_chart_type)
                        {
                            select
                                class="chart-type-select self-end rounded text-sm
                                    bg-gray-50 dark:bg-gray-700 border border-gray-300"
                                data-chart-id=(chart_id.as_str())
                                aria-label="Chart type"
                            {
                                option value="line" selected { "Line" }
                                option value="bar" { "Bar" }
                            }
                        }

                        div
                            id=(chart.id)
                            class="min-h-[380px] rounded dark:bg-gray-100"
                        {}
                    }
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing. The instances are kept in `window.fintrackCharts`
/// so they can be updated when the chart type changes.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);
                    window.fintrackCharts[chartDom.id] = chart;

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "window.fintrackCharts = window.fintrackCharts || {{}};\n\
        document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// Build the chart `chart_id` from `transactions`.
///
/// `chart_type` only affects the revenue and top items charts.
pub(crate) fn build_chart(
    chart_id: ChartId,
    chart_type: ChartType,
    transactions: &[Transaction],
) -> Chart {
    match chart_id {
        ChartId::Revenue => revenue_chart(transactions, chart_type),
        ChartId::TopItems => top_categories_chart(transactions, chart_type),
        ChartId::Heatmap => heatmap_chart(transactions),
        ChartId::PaymentMethods => recipients_chart(transactions),
    }
}

/// Convert `chart` into the ECharts options as a JSON value.
///
/// # Errors
/// Returns [Error::JSONSerializationError] if the options are not valid JSON.
pub(crate) fn chart_to_json(chart: &Chart) -> Result<serde_json::Value, Error> {
    serde_json::from_str(&chart.to_string())
        .map_err(|error| Error::JSONSerializationError(error.to_string()))
}

/// A line chart of every transaction amount in date order.
pub(crate) fn transactions_chart(transactions: &[Transaction]) -> Chart {
    if transactions.is_empty() {
        return Chart::new().title(
            Title::new()
                .text("No Data Available")
                .subtext("No transactions found. Upload data to visualize.")
                .left("center")
                .top("middle"),
        );
    }

    let labels: Vec<String> = transactions
        .iter()
        .map(|t| t.date.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| t.date.to_string()))
        .collect();
    let values: Vec<f64> = transactions.iter().map(|t| t.amount).collect();

    Chart::new()
        .title(Title::new().text("Your Transactions"))
        .tooltip(axis_tooltip())
        .grid(default_grid())
        .x_axis(Axis::new().type_(AxisType::Category).name("Date").data(labels))
        .y_axis(currency_axis().name("Amount"))
        .series(Line::new().name("Amount").data(values))
}

fn revenue_chart(transactions: &[Transaction], chart_type: ChartType) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = daily_totals(transactions)
        .into_iter()
        .map(|(day, total)| (day.to_string(), total))
        .unzip();

    let chart = Chart::new()
        .title(Title::new().text("Revenue Trend").subtext("Daily totals"))
        .tooltip(axis_tooltip())
        .grid(default_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(currency_axis());

    with_series(chart, chart_type, "Amount", values)
}

fn top_categories_chart(transactions: &[Transaction], chart_type: ChartType) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) =
        top_categories(transactions, TOP_CATEGORY_LIMIT)
            .into_iter()
            .unzip();

    let chart = Chart::new()
        .title(Title::new().text("Top Categories by Spending"))
        .tooltip(axis_tooltip())
        .grid(default_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(currency_axis());

    with_series(chart, chart_type, "Total", values)
}

fn heatmap_chart(transactions: &[Transaction]) -> Chart {
    let grid = hour_weekday_totals(transactions);
    let (min, max) = grid
        .iter()
        .flatten()
        .fold((0.0_f64, 0.0_f64), |(min, max), &total| {
            (min.min(total), max.max(total))
        });
    let data: Vec<DataFrame> = grid
        .iter()
        .enumerate()
        .flat_map(|(hour, days)| {
            days.iter().enumerate().map(move |(day, total)| {
                vec![
                    DataPoint::from(day as f64),
                    DataPoint::from(hour as f64),
                    DataPoint::from(*total),
                ]
            })
        })
        .collect();
    let hours: Vec<String> = (0..24).map(|hour| format!("{hour:02}:00")).collect();

    Chart::new()
        .title(Title::new().text("Transaction Heatmap (Hour vs Day)"))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom(70)
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .name("Day of Week")
                .data(WEEKDAYS.to_vec()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Category)
                .name("Hour of Day")
                .data(hours),
        )
        .visual_map(
            VisualMap::new()
                .min(min)
                .max(max)
                .calculable(true)
                .orient(Orient::Horizontal)
                .left("center")
                .bottom(0),
        )
        .series(Heatmap::new().name("Amount").data(data))
}

fn recipients_chart(transactions: &[Transaction]) -> Chart {
    let totals = recipient_totals(transactions);
    let data: Vec<(f64, &str)> = totals
        .iter()
        .map(|(recipient, total)| (*total, recipient.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text("Payment Distribution by Recipient"))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new().top("bottom"))
        .series(
            Pie::new()
                .name("Recipient")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

fn with_series(chart: Chart, chart_type: ChartType, name: &str, values: Vec<f64>) -> Chart {
    match chart_type {
        ChartType::Line => chart.series(Line::new().name(name).data(values)),
        ChartType::Bar => chart.series(Bar::new().name(name).data(values)),
    }
}

#[inline]
fn default_grid() -> Grid {
    Grid::new()
        .left("3%")
        .right("4%")
        .bottom("3%")
        .contain_label(true)
}

#[inline]
fn currency_axis() -> Axis {
    Axis::new()
        .type_(AxisType::Value)
        .axis_label(AxisLabel::new().formatter("${value}"))
}

/// Creates a tooltip configuration for charts with a category axis
fn axis_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
