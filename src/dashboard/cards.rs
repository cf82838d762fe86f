//! Card components for the totals at the top of the dashboard.

use maud::{Markup, html};

use crate::{dashboard::aggregation::Summary, html::format_currency};

const CARD_STYLE: &str = "bg-white dark:bg-gray-800 border border-gray-200 \
    dark:border-gray-700 rounded-lg p-4 shadow-md flex flex-col";

fn card(id: &str, label: &str, value: &str) -> Markup {
    html! {
        div class=(CARD_STYLE) {
            span class="text-sm text-gray-600 dark:text-gray-400" { (label) }
            span id=(id) class="text-2xl font-bold" { (value) }
        }
    }
}

/// Renders the transaction count, total amount and anomaly count.
pub(super) fn summary_cards_view(summary: &Summary) -> Markup {
    html! {
        section class="w-full mx-auto mb-8" {
            div class="grid grid-cols-1 sm:grid-cols-3 gap-4" {
                (card("transaction-count", "Transactions", &summary.transaction_count.to_string()))
                (card("total-amount", "Total Amount", &format_currency(summary.total_amount)))
                (card("anomaly-count", "Anomalies", &summary.anomaly_count.to_string()))
            }
        }
    }
}
