//! Flags transactions that stand out from the rest of a user's transactions.
//!
//! Two rules are applied over the whole set of transactions:
//! - amounts more than two population standard deviations away from the mean,
//! - recipients that appear more than five times.
//!
//! When a transaction matches both rules, the recipient rule wins and its
//! reason replaces the amount reason.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};

use crate::transaction::Transaction;

/// How many standard deviations from the mean an amount must be to be flagged.
const STD_DEV_THRESHOLD: f64 = 2.0;

/// Transactions to a recipient that appears more than this many times are flagged.
const RECIPIENT_FREQUENCY_LIMIT: usize = 5;

/// Why a transaction was flagged as an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyReason {
    /// The amount is more than two standard deviations above the mean.
    HighAmount,
    /// The amount is more than two standard deviations below the mean.
    LowAmount,
    /// The recipient appears more than five times.
    FrequentRecipient,
}

impl AnomalyReason {
    /// The message shown to users and stored in the database.
    pub fn message(&self) -> &'static str {
        match self {
            AnomalyReason::HighAmount => "Amount significantly higher than average",
            AnomalyReason::LowAmount => "Amount significantly lower than average",
            AnomalyReason::FrequentRecipient => "Frequent transactions to same recipient",
        }
    }
}

impl Display for AnomalyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl FromStr for AnomalyReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            AnomalyReason::HighAmount,
            AnomalyReason::LowAmount,
            AnomalyReason::FrequentRecipient,
        ]
        .into_iter()
        .find(|reason| reason.message() == s)
        .ok_or_else(|| format!("unknown anomaly reason \"{s}\""))
    }
}

impl Serialize for AnomalyReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

impl ToSql for AnomalyReason {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.message()))
    }
}

impl FromSql for AnomalyReason {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// The population mean and standard deviation of a set of amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// The arithmetic mean.
    pub mean: f64,
    /// The standard deviation, dividing by N rather than N - 1.
    pub std_dev: f64,
}

/// Compute the population statistics of `amounts`.
///
/// Returns `None` for an empty slice since the mean is undefined.
pub fn population_statistics(amounts: &[f64]) -> Option<Statistics> {
    if amounts.is_empty() {
        return None;
    }

    let count = amounts.len() as f64;
    let mean = amounts.iter().sum::<f64>() / count;
    let variance = amounts
        .iter()
        .map(|amount| (amount - mean).powi(2))
        .sum::<f64>()
        / count;

    Some(Statistics {
        mean,
        std_dev: variance.sqrt(),
    })
}

/// Flag the unusual transactions in `transactions`.
///
/// All of `transactions` should belong to the same user. The returned
/// transactions are in the same order, and only `is_anomaly` and
/// `anomaly_reason` are changed. Flags that are already set are never
/// cleared.
pub fn detect_anomalies(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    let amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();

    let Some(stats) = population_statistics(&amounts) else {
        return transactions;
    };

    let upper_bound = stats.mean + STD_DEV_THRESHOLD * stats.std_dev;
    let lower_bound = stats.mean - STD_DEV_THRESHOLD * stats.std_dev;

    for transaction in &mut transactions {
        if transaction.amount > upper_bound {
            transaction.flag(AnomalyReason::HighAmount);
        } else if transaction.amount < lower_bound {
            transaction.flag(AnomalyReason::LowAmount);
        }
    }

    let recipient_counts = count_recipients(&transactions);
    let frequent_recipients: Vec<Option<String>> = recipient_counts
        .into_iter()
        .filter(|(_, count)| *count > RECIPIENT_FREQUENCY_LIMIT)
        .map(|(recipient, _)| recipient.map(str::to_owned))
        .collect();

    for transaction in &mut transactions {
        if frequent_recipients.contains(&transaction.recipient) {
            transaction.flag(AnomalyReason::FrequentRecipient);
        }
    }

    transactions
}

/// Count how many times each recipient appears, with a missing recipient as its own group.
fn count_recipients(transactions: &[Transaction]) -> HashMap<Option<&str>, usize> {
    let mut counts = HashMap::new();

    for transaction in transactions {
        *counts.entry(transaction.recipient.as_deref()).or_insert(0) += 1;
    }

    counts
}
