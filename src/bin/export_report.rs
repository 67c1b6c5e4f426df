//! Offline report export utility.
//!
//! Renders the stored report of one patient straight from the roster
//! database, bypassing the interactive session workflow. Useful for
//! reprinting a document after the visit, or for scripting batch exports.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin export_report -- --patient <id> [--db <path>] [--out-dir <dir>] [--force]
//! ```
//!
//! The database path falls back to `IRISDESK_DB_PATH`, then `irisdesk.db`.
//! Logs go to stderr (or a file via `IRISDESK_LOG_MODE=file`), so stdout
//! carries only the written path.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use irisdesk::adapters::pdf::PdfReportRenderer;
use irisdesk::adapters::sanitize::SanitizingMakeWriter;
use irisdesk::adapters::sqlite::SqlitePatientStore;
use irisdesk::domain::report_filename;
use irisdesk::ports::{PatientRepository, ReportRenderer};

const USAGE: &str =
    "Usage: export_report --patient <id> [--db <path>] [--out-dir <dir>] [--force]";

struct Args {
    patient_id: i64,
    db_path: String,
    out_dir: std::path::PathBuf,
    force: bool,
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let mut patient_id: Option<i64> = None;
    let mut db_path: Option<String> = None;
    let mut out_dir = std::path::PathBuf::from(".");
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--patient" => {
                let value = args.next().unwrap_or_default();
                match value.parse::<i64>() {
                    Ok(id) => patient_id = Some(id),
                    Err(_) => {
                        eprintln!("--patient expects a numeric id\n{USAGE}");
                        std::process::exit(2);
                    }
                }
            }
            "--db" => {
                let p = args.next().unwrap_or_default();
                if p.is_empty() {
                    eprintln!("{USAGE}");
                    std::process::exit(2);
                }
                db_path = Some(p);
            }
            "--out-dir" => {
                let p = args.next().unwrap_or_default();
                if p.is_empty() {
                    eprintln!("{USAGE}");
                    std::process::exit(2);
                }
                out_dir = std::path::PathBuf::from(p);
            }
            "--force" => force = true,
            "-h" | "--help" => {
                println!(
                    "{USAGE}\n\nRenders the stored report of one patient to a PDF named after \
                     the patient and prints the written path. Refuses to overwrite an \
                     existing file unless --force is given."
                );
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown arg: {arg}\n{USAGE}");
                std::process::exit(2);
            }
        }
    }

    let patient_id = patient_id.unwrap_or_else(|| {
        eprintln!("{USAGE}");
        std::process::exit(2);
    });
    let db_path = db_path
        .or_else(|| std::env::var("IRISDESK_DB_PATH").ok())
        .unwrap_or_else(|| "irisdesk.db".to_string());

    Args {
        patient_id,
        db_path,
        out_dir,
        force,
    }
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_mode = std::env::var("IRISDESK_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, guard) = if log_mode == "file" {
        let log_file =
            std::env::var("IRISDESK_LOG_FILE").unwrap_or_else(|_| "irisdesk.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    Ok(guard)
}

fn main() -> Result<()> {
    let args = parse_args();
    let _guard = init_logging()?;

    let store = SqlitePatientStore::new(&args.db_path)
        .with_context(|| format!("Failed to open roster database {}", args.db_path))?;
    let patient = store
        .get(args.patient_id)
        .with_context(|| format!("Failed to read patient {}", args.patient_id))?
        .with_context(|| {
            format!(
                "No patient {} in roster database {}",
                args.patient_id, args.db_path
            )
        })?;

    let filename = report_filename(&patient.record.name);
    let out_path = args.out_dir.join(&filename);
    if out_path.exists() && !args.force {
        eprintln!(
            "Refusing to overwrite existing file {:?}. Use --force.",
            out_path
        );
        std::process::exit(3);
    }

    let text = patient.record.report_text.clone().unwrap_or_default();
    let bytes = PdfReportRenderer::new()
        .render(&patient, &text)
        .with_context(|| format!("Failed to render report for patient {}", args.patient_id))?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", args.out_dir))?;
    std::fs::write(&out_path, &bytes)
        .with_context(|| format!("Failed to write {out_path:?}"))?;

    tracing::info!(
        "Exported report for patient {} ({} bytes)",
        args.patient_id,
        bytes.len()
    );
    println!("{}", out_path.display());
    Ok(())
}
