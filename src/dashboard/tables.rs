//! Table views for dashboard data display.
//!
//! Provides the table of a user's transactions, with anomalies highlighted.

use maud::{Markup, html};
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    html::{
        TABLE_ANOMALY_ROW_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        format_currency,
    },
    transaction::{DEFAULT_CATEGORY, DEFAULT_RECIPIENT, Transaction},
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

const TABLE_CELL_GREEN_STYLE: &str = "text-green-600 dark:text-green-400";
const TABLE_CELL_RED_STYLE: &str = "text-red-600 dark:text-red-400";

/// Gets the CSS class for coloring amounts (green for positive, red for negative).
fn amount_color_class(amount: f64) -> &'static str {
    if amount >= 0.0 {
        TABLE_CELL_GREEN_STYLE
    } else {
        TABLE_CELL_RED_STYLE
    }
}

/// Renders a table of `transactions`, newest first.
///
/// Rows for anomalies are highlighted and show why they were flagged.
pub(super) fn transactions_table(transactions: &[Transaction]) -> Markup {
    html! {
        div class="w-full" {
            h3 class="text-xl font-semibold mb-4" { "Transactions" }

            div class="overflow-x-auto rounded-lg shadow" {
                table id="transactions-table" class="w-full text-sm text-left text-gray-500 dark:text-gray-400" {
                    thead class=(TABLE_HEADER_STYLE) {
                        tr {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Recipient" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Anomaly" }
                        }
                    }
                    tbody {
                        @for transaction in transactions.iter().rev() {
                            @let row_style = if transaction.is_anomaly {
                                TABLE_ANOMALY_ROW_STYLE
                            } else {
                                TABLE_ROW_STYLE
                            };

                            tr class=(row_style) data-anomaly[transaction.is_anomaly] {
                                td class=(TABLE_CELL_STYLE) {
                                    (transaction.date.date().format(DATE_FORMAT).unwrap_or_default())
                                }
                                td class={(TABLE_CELL_STYLE) " whitespace-nowrap " (amount_color_class(transaction.amount))} {
                                    (format_currency(transaction.amount))
                                }
                                td class=(TABLE_CELL_STYLE) {
                                    (transaction.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
                                }
                                td class=(TABLE_CELL_STYLE) { (transaction.description) }
                                td class=(TABLE_CELL_STYLE) {
                                    (transaction.recipient.as_deref().unwrap_or(DEFAULT_RECIPIENT))
                                }
                                td class=(TABLE_CELL_STYLE) {
                                    @if let Some(reason) = transaction.anomaly_reason {
                                        span class="font-medium text-red-700 dark:text-red-300" { (reason.message()) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
