//! Transaction data aggregation for the charts, cards and reports.
//!
//! Transactions without a category are grouped under "Other" and transactions
//! without a recipient under "Unknown", the same defaults used for CSV uploads.

use std::collections::{BTreeMap, HashMap};

use time::{Date, Duration};

use crate::transaction::{DEFAULT_CATEGORY, DEFAULT_RECIPIENT, Transaction};

/// The number of categories shown in the top categories chart.
pub(crate) const TOP_CATEGORY_LIMIT: usize = 5;

/// Totals shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Summary {
    pub transaction_count: usize,
    pub total_amount: f64,
    pub anomaly_count: usize,
}

pub(crate) fn summarize(transactions: &[Transaction]) -> Summary {
    Summary {
        transaction_count: transactions.len(),
        total_amount: transactions.iter().map(|t| t.amount).sum(),
        anomaly_count: transactions.iter().filter(|t| t.is_anomaly).count(),
    }
}

/// Sums the amounts for each calendar day from the first to the last
/// transaction, with zero for days that have no transactions.
///
/// # Returns
/// Pairs of (day, total) in chronological order, empty if there are no transactions.
pub(super) fn daily_totals(transactions: &[Transaction]) -> Vec<(Date, f64)> {
    let mut totals: BTreeMap<Date, f64> = BTreeMap::new();

    for transaction in transactions {
        *totals.entry(transaction.date.date()).or_insert(0.0) += transaction.amount;
    }

    let (Some(&first), Some(&last)) = (totals.keys().next(), totals.keys().next_back()) else {
        return Vec::new();
    };

    let mut days = Vec::with_capacity((last - first).whole_days() as usize + 1);
    let mut day = first;

    while day <= last {
        days.push((day, totals.get(&day).copied().unwrap_or(0.0)));
        day += Duration::days(1);
    }

    days
}

/// Sums the amounts for each category.
pub(crate) fn category_totals(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();

    for transaction in transactions {
        let category = transaction
            .category
            .as_deref()
            .unwrap_or(DEFAULT_CATEGORY)
            .to_owned();
        *totals.entry(category).or_insert(0.0) += transaction.amount;
    }

    totals
}

/// The `limit` categories with the largest summed amounts, largest first.
///
/// Categories with equal totals are ordered by name.
pub(super) fn top_categories(transactions: &[Transaction], limit: usize) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = category_totals(transactions).into_iter().collect();
    // The sort is stable, so ties keep the alphabetical order of the BTreeMap.
    totals.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    totals.truncate(limit);
    totals
}

/// Sums the amounts for each recipient, ordered by recipient.
pub(super) fn recipient_totals(transactions: &[Transaction]) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions {
        let recipient = transaction
            .recipient
            .as_deref()
            .unwrap_or(DEFAULT_RECIPIENT);
        *totals.entry(recipient).or_insert(0.0) += transaction.amount;
    }

    let mut totals: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(recipient, total)| (recipient.to_owned(), total))
        .collect();
    totals.sort_by(|(a, _), (b, _)| a.cmp(b));
    totals
}

/// Sums the amounts by hour of the day and day of the week.
///
/// # Returns
/// A grid indexed by `[hour][weekday]` where weekday 0 is Monday.
pub(super) fn hour_weekday_totals(transactions: &[Transaction]) -> [[f64; 7]; 24] {
    let mut grid = [[0.0; 7]; 24];

    for transaction in transactions {
        let hour = transaction.date.hour() as usize;
        let weekday = transaction.date.weekday().number_days_from_monday() as usize;
        grid[hour][weekday] += transaction.amount;
    }

    grid
}
