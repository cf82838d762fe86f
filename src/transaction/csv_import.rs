//! Parses uploaded CSV files into transactions.
//!
//! The first line must be a header. The `date` and `amount` columns are
//! required, `category`, `description` and `recipient` are optional and the
//! columns may appear in any order. For example:
//!
//! ```text
//! date,amount,category,description,recipient
//! 2025-01-18,-12.50,Food,Lunch,Birdy Bytes
//! 2025-01-19 18:45:00,2300.00,Income,Salary,ACME Ltd
//! ```

use serde::Deserialize;
use time::{
    Date, PrimitiveDateTime, Time, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{
    Error,
    auth::UserID,
    transaction::{NewTransaction, Transaction},
};

/// The category used when a row does not specify one.
pub const DEFAULT_CATEGORY: &str = "Other";
/// The recipient used when a row does not specify one.
pub const DEFAULT_RECIPIENT: &str = "Unknown";

/// The earliest year accepted in the date column.
const MIN_YEAR: i32 = 1900;
/// The latest year accepted in the date column.
const MAX_YEAR: i32 = 2100;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    amount: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    recipient: Option<String>,
}

/// Parse the transactions in the CSV document `text` as belonging to `user_id`.
///
/// A document with only a header row produces no transactions.
///
/// # Errors
///
/// Returns [Error::InvalidCSV] if a required column is missing, or a row has
/// an invalid date or amount. The message includes the row number, counting
/// the first row after the header as row 1.
pub fn parse_transactions_csv(text: &str, user_id: UserID) -> Result<Vec<NewTransaction>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?;

    for required in ["date", "amount"] {
        if !headers.iter().any(|header| header == required) {
            return Err(Error::InvalidCSV(format!(
                "missing required column \"{required}\""
            )));
        }
    }

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(index, row)| {
            let row_number = index + 1;
            let row =
                row.map_err(|error| Error::InvalidCSV(format!("row {row_number}: {error}")))?;

            parse_row(row, user_id)
                .map_err(|message| Error::InvalidCSV(format!("row {row_number}: {message}")))
        })
        .collect()
}

fn parse_row(row: CsvRow, user_id: UserID) -> Result<NewTransaction, String> {
    let date = parse_date(&row.date)?;
    let amount: f64 = row
        .amount
        .parse()
        .map_err(|_| format!("invalid amount \"{}\"", row.amount))?;

    if !amount.is_finite() {
        return Err(format!("amount \"{}\" is not a finite number", row.amount));
    }

    let category = non_empty(row.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());
    let description = non_empty(row.description).unwrap_or_default();
    let recipient = non_empty(row.recipient).unwrap_or_else(|| DEFAULT_RECIPIENT.to_owned());

    Ok(Transaction::build(user_id, amount, date)
        .category(&category)
        .description(&description)
        .recipient(&recipient))
}

/// Parse a date with an optional time of day, dates without a time are set to midnight.
///
/// Years outside [MIN_YEAR] to [MAX_YEAR] are rejected, since the daily charts
/// have a point for every day between the first and last transaction.
fn parse_date(text: &str) -> Result<PrimitiveDateTime, String> {
    let date_time = PrimitiveDateTime::parse(text, DATE_TIME_FORMAT)
        .or_else(|_| {
            Date::parse(text, DATE_FORMAT).map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT))
        })
        .map_err(|_| format!("invalid date \"{text}\", expected YYYY-MM-DD"))?;

    if !(MIN_YEAR..=MAX_YEAR).contains(&date_time.year()) {
        return Err(format!(
            "date \"{text}\" is outside the years {MIN_YEAR} to {MAX_YEAR}"
        ));
    }

    Ok(date_time)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
