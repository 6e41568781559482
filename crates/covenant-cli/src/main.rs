use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use std::sync::{Arc, Mutex};

use covenant_core::{
    handler_fn, normalizer, parser, verifier, Callable, ContractRecord, FailureLocation,
    FailureReport, Value, Verdict,
};

/// Covenant — runtime contracts for callables
///
/// Describe, verify, fingerprint and check contract signatures such as
/// `Integer, Args[String] => Integer`.
#[derive(Parser)]
#[command(name = "covenant", version, about, long_about = None)]
struct Cli {
    /// Log at DEBUG level (otherwise RUST_LOG is honoured, default warn)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical form of a signature
    Describe {
        /// Signature text
        signature: String,
    },

    /// Well-formedness checks (variadic placement, empty combinators, redundancy)
    Verify {
        /// Signature text
        signature: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the SHA-256 fingerprint of a signature's canonical form
    Hash {
        /// Signature text
        signature: String,
    },

    /// Check JSON arguments (and optionally a return value) against a signature
    Check {
        /// Signature text
        signature: String,
        /// JSON array of actual arguments
        #[arg(long)]
        args: String,
        /// JSON return value to check against the return contract
        #[arg(long)]
        returns: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Describe { signature } => cmd_describe(&signature),
        Commands::Verify { signature, json } => cmd_verify(&signature, json),
        Commands::Hash { signature } => cmd_hash(&signature),
        Commands::Check {
            signature,
            args,
            returns,
            json,
        } => cmd_check(&signature, &args, returns.as_deref(), json),
        Commands::Version => {
            println!(
                "covenant {} (covenant-core {})",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_VERSION")
            );
            Ok(0)
        }
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            2
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ── Commands ──────────────────────────────────────────────

type CmdResult = Result<i32, String>;

fn cmd_describe(signature: &str) -> CmdResult {
    let canonical = normalizer::normalize(signature).map_err(|e| e.to_string())?;
    println!("{}", canonical);
    Ok(0)
}

fn cmd_hash(signature: &str) -> CmdResult {
    let hash = normalizer::fingerprint_text(signature).map_err(|e| e.to_string())?;
    println!("{}", hash);
    Ok(0)
}

fn cmd_verify(signature: &str, json: bool) -> CmdResult {
    let declaration = parser::parse(signature).map_err(|e| e.to_string())?;
    let result = verifier::verify(&declaration);
    tracing::debug!(
        diagnostics = result.diagnostics.len(),
        valid = result.is_valid(),
        "verified signature"
    );

    if json {
        let output = serde_json::json!({
            "valid": result.is_valid(),
            "signature": normalizer::canonical(&declaration),
            "diagnostics": result.diagnostics,
        });
        let text = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        for diagnostic in &result.diagnostics {
            let line = diagnostic.to_string();
            match diagnostic.severity {
                verifier::Severity::Error => println!("{}", line.red()),
                verifier::Severity::Warning => println!("{}", line.yellow()),
            }
        }
        if result.is_valid() {
            println!("{} {}", "✓".green().bold(), "signature is well-formed".green());
        } else {
            println!(
                "{} {} error(s)",
                "✗".red().bold(),
                result.errors().len()
            );
        }
    }

    Ok(if result.is_valid() { 0 } else { 1 })
}

fn cmd_check(signature: &str, args: &str, returns: Option<&str>, json: bool) -> CmdResult {
    let args = match parse_json(args, "--args")? {
        Value::Array(items) => items,
        other => {
            return Err(format!(
                "--args must be a JSON array, got {}",
                other.type_name()
            ))
        }
    };
    let returned = returns.map(|text| parse_json(text, "--returns")).transpose()?;

    // Collect every violation instead of stopping at the first
    let reports: Arc<Mutex<Vec<FailureReport>>> = Arc::default();
    let sink = Arc::clone(&reports);
    let collect = handler_fn(move |report| {
        sink.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report.clone());
        Ok(Verdict::Continue)
    });

    let result = returned.clone().unwrap_or(Value::Null);
    let callable = Callable::new("check", move |_, _| Ok(result.clone()));
    let record = ContractRecord::from_signature(callable, signature)
        .map_err(|e| e.to_string())?
        .with_failure_handler(collect);
    record.call(args, None).map_err(|e| e.to_string())?;

    let violations: Vec<FailureReport> = reports
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .drain(..)
        .filter(|r| returned.is_some() || r.location != FailureLocation::Return)
        .collect();
    tracing::debug!(violations = violations.len(), "checked arguments");

    if json {
        let output = serde_json::json!({
            "valid": violations.is_empty(),
            "signature": record.describe(),
            "violations": violations.iter().map(violation_json).collect::<Vec<_>>(),
        });
        let text = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else if violations.is_empty() {
        println!("{} {}", "✓".green().bold(), record.describe().green());
    } else {
        for report in &violations {
            println!(
                "{} {}: expected {}, got {}",
                "✗".red().bold(),
                location_text(&report.location),
                report.contract.to_string().yellow(),
                report.value.to_string().red()
            );
        }
    }

    Ok(if violations.is_empty() { 0 } else { 1 })
}

// ── Helpers ───────────────────────────────────────────────

fn parse_json(text: &str, flag: &str) -> Result<Value, String> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|json| Value::from_json(&json))
        .map_err(|e| format!("{} is not valid JSON: {}", flag, e))
}

fn location_text(location: &FailureLocation) -> String {
    match location {
        FailureLocation::Argument { position, count } => {
            format!("argument {} of {}", position, count)
        }
        FailureLocation::Return => "return value".to_string(),
        FailureLocation::Invariant { name } => format!("invariant {}", name),
    }
}

fn violation_json(report: &FailureReport) -> serde_json::Value {
    let mut entry = serde_json::json!({
        "location": location_text(&report.location),
        "expected": report.contract.to_string(),
        "actual": report.value.to_json(),
    });
    if let FailureLocation::Argument { position, count } = report.location {
        entry["position"] = position.into();
        entry["count"] = count.into();
    }
    entry
}
