//! Roster listing utility.
//!
//! Prints the patient roster straight from the database, bypassing the
//! interactive session workflow. Intended for quick checks and scripting;
//! `--json` emits the same lines as a JSON array for other tools.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin roster -- [--db <path>] [--json]
//! ```
//!
//! Logs go to stderr so stdout stays pipeable.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use irisdesk::adapters::sanitize::SanitizingMakeWriter;
use irisdesk::adapters::sqlite::SqlitePatientStore;
use irisdesk::domain::PatientSummary;
use irisdesk::ports::PatientRepository;

const USAGE: &str = "Usage: roster [--db <path>] [--json]";

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut db_path: Option<String> = None;
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let p = args.next().unwrap_or_default();
                if p.is_empty() {
                    eprintln!("{USAGE}");
                    std::process::exit(2);
                }
                db_path = Some(p);
            }
            "--json" => json = true,
            "-h" | "--help" => {
                println!("{USAGE}\n\nLists every patient in the roster database in insertion order.");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown arg: {arg}\n{USAGE}");
                std::process::exit(2);
            }
        }
    }

    let db_path = db_path
        .or_else(|| std::env::var("IRISDESK_DB_PATH").ok())
        .unwrap_or_else(|| "irisdesk.db".to_string());

    // Quiet by default; the table itself is the output.
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let store = SqlitePatientStore::new(&db_path)
        .with_context(|| format!("Failed to open roster database {db_path}"))?;
    let summaries: Vec<PatientSummary> = store
        .list_all()
        .context("Failed to list patients")?
        .iter()
        .map(PatientSummary::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("Roster is empty");
        return Ok(());
    }

    println!(
        "{:<6} {:<24} {:<4} {:<4} {:<12} {:<9} {:<7} REPORT",
        "ID", "NAME", "AGE", "SEX", "PHONE", "REVIEWED", "IMAGES"
    );
    for line in &summaries {
        println!(
            "{:<6} {:<24} {:<4} {:<4} {:<12} {:<9} {:<7} {}",
            line.id,
            line.name,
            line.age,
            line.sex,
            line.phone,
            if line.reviewed { "yes" } else { "no" },
            if line.has_images { "yes" } else { "no" },
            if line.has_report { "yes" } else { "no" },
        );
    }
    Ok(())
}
