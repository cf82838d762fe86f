//! Dashboard module
//!
//! Provides an overview page of the user's transactions with summary cards,
//! charts and a table, plus the JSON endpoints the page uses for charts.

mod aggregation;
mod api;
mod cards;
mod charts;
mod handlers;
mod tables;

pub(crate) use aggregation::category_totals;
pub use api::{download_report, get_dashboard_data, visualize};
pub use handlers::{DashboardState, get_dashboard_page};
