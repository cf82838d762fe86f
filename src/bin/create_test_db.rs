use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, Time};

use fintrack::{
    NewTransaction, PasswordHash, Transaction, UserID, ValidatedPassword, count_transactions,
    create_user, detect_anomalies,
    get_transactions_by_user, import_transactions, initialize_db, save_anomalies,
};

const RECIPIENTS: [(&str, &str); 6] = [
    ("Groceries", "Fresh Mart"),
    ("Transport", "City Metro"),
    ("Dining", "Birdy Bytes"),
    ("Utilities", "Power Co"),
    ("Entertainment", "Cinema 8"),
    ("Shopping", "Online Store"),
];

/// A utility for creating a test database for the fintrack server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many days of transactions to generate.
    #[arg(long, default_value_t = 60)]
    days: i64,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user test@example.com with the password 'test'...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user("Test User", "test@example.com", password_hash, &conn)?;

    println!("Creating transactions...");

    import_transactions(sample_transactions(user.id, args.days), &conn)?;
    let count = count_transactions(user.id, &conn)?;

    let flagged = detect_anomalies(get_transactions_by_user(user.id, &conn)?);
    save_anomalies(&flagged, &conn)?;

    let anomaly_count = flagged.iter().filter(|t| t.is_anomaly).count();
    println!("Created {count} transactions, {anomaly_count} flagged as anomalies.");
    println!("Success!");

    Ok(())
}

/// Two purchases a day cycling through the sample recipients, plus a weekly
/// salary and one unusually large purchase.
fn sample_transactions(user_id: UserID, days: i64) -> Vec<NewTransaction> {
    let today = OffsetDateTime::now_utc().date();
    let mut transactions = Vec::new();

    for day in 0..days {
        let date = today - Duration::days(days - day);

        for slot in 0..2 {
            let index = (day * 2 + slot) as usize;
            let (category, recipient) = RECIPIENTS[index % RECIPIENTS.len()];
            let hour = 8 + ((index * 5) % 12) as u8;
            let time = Time::from_hms(hour, 15, 0).unwrap_or(Time::MIDNIGHT);
            let amount = -(10.0 + ((index * 37) % 90) as f64);

            transactions.push(
                Transaction::build(user_id, amount, PrimitiveDateTime::new(date, time))
                    .category(category)
                    .description(&format!("{category} purchase"))
                    .recipient(recipient),
            );
        }

        if day % 7 == 0 {
            transactions.push(
                Transaction::build(user_id, 1500.0, PrimitiveDateTime::new(date, Time::MIDNIGHT))
                    .category("Income")
                    .description("Salary")
                    .recipient("ACME Ltd"),
            );
        }
    }

    if days > 0 {
        let date = today - Duration::days(days / 2);
        let time = Time::from_hms(12, 30, 0).unwrap_or(Time::MIDNIGHT);
        transactions.push(
            Transaction::build(user_id, -2400.0, PrimitiveDateTime::new(date, time))
                .category("Shopping")
                .description("New laptop")
                .recipient("Tech Emporium"),
        );
    }

    transactions
}
