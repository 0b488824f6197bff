//! CLI binary for blob2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RecoveryConfig`, runs each dump and prints a summary.

use anyhow::{Context, Result};
use blob2pdf::{
    recover_to_dir, DecimalGuard, OddHexPolicy, RecoverError, RecoveryConfig, SavedRecovery,
    XrefStatus,
};
use clap::Parser;
use futures::stream::{self, StreamExt};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Recover one dump; writes column.pdf next to it
  blob2pdf column.txt

  # Several dumps into one directory, 8 at a time
  blob2pdf -o recovered/ --concurrency 8 dumps/*.txt

  # A raw binary export
  blob2pdf --binary blob.bin

  # Accept hex cut off mid-byte
  blob2pdf --odd-hex drop truncated.hex

  # JSON summary for scripting
  blob2pdf --json column.txt > summary.json

OUTPUT FILES (per input <stem>):
  <stem>.pdf            recovered PDF (carved, or built from images)
  <stem>.repaired.pdf   same PDF with a rewritten startxref
  <stem>.images.pdf     PDF rebuilt from images when the trailer is beyond repair
  <stem>_imgNN.jpg|png  images carved from the buffer
  <stem>_partN.pdf      further PDFs found in the same buffer
  <stem>.dump.bin       decoded buffer, written only when recovery fails

ENVIRONMENT VARIABLES:
  RUST_LOG              Log filter (overrides -v / -q)
  BLOB2PDF_*            Every flag has an env var, see --help
"#;

/// Recover PDF documents from text dumps of database BLOB columns.
#[derive(Parser, Debug)]
#[command(
    name = "blob2pdf",
    version,
    about = "Recover PDF documents from text dumps of database BLOB columns",
    long_about = "Decode a BLOB column dump (Base64, data: URL, hex, decimal list or raw bytes), \
carve the PDF out of it and repair its trailer. When the buffer holds images instead of a PDF, \
a PDF is rebuilt with one page per image.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Dump files to recover.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for recovered files (default: next to each input).
    #[arg(short, long, env = "BLOB2PDF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Treat inputs as raw octets instead of text.
    #[arg(long, env = "BLOB2PDF_BINARY")]
    binary: bool,

    /// Number of dumps processed at once.
    #[arg(short, long, env = "BLOB2PDF_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Odd-length hex payloads: drop the last nibble or fail.
    #[arg(long, env = "BLOB2PDF_ODD_HEX", value_enum, default_value = "fail")]
    odd_hex: OddHexArg,

    /// Minimum digit runs for a text with hex letters to still count as decimal.
    #[arg(long, env = "BLOB2PDF_DECIMAL_MIN_RUNS", default_value_t = 10)]
    decimal_min_runs: usize,

    /// Accept any decimal list, even with hex letters present.
    #[arg(long, env = "BLOB2PDF_NO_DECIMAL_GUARD")]
    no_decimal_guard: bool,

    /// Try Base64 even when the text is all hex digits.
    #[arg(long, env = "BLOB2PDF_BASE64_ON_HEX")]
    base64_on_hex: bool,

    /// Try the decimal-list reading even when 0x / \x prefixes are present.
    #[arg(long, env = "BLOB2PDF_DECIMAL_ON_HEX_PREFIX")]
    decimal_on_hex_prefix: bool,

    /// Do not take text starting with %PDF- as raw bytes.
    #[arg(long, env = "BLOB2PDF_NO_RAW_PDF_TEXT")]
    no_raw_pdf_text: bool,

    /// Skip the second decode pass.
    #[arg(long, env = "BLOB2PDF_NO_REDECODE")]
    no_redecode: bool,

    /// Never rewrite the trailer.
    #[arg(long, env = "BLOB2PDF_NO_XREF_REPAIR")]
    no_xref_repair: bool,

    /// Bytes scanned after startxref for an xref stream object.
    #[arg(long, env = "BLOB2PDF_XREF_WINDOW", default_value_t = 2048)]
    xref_window: usize,

    /// Bytes scanned back from /Type /XRef for its obj header.
    #[arg(long, env = "BLOB2PDF_XREF_BACKTRACK", default_value_t = 200)]
    xref_backtrack: usize,

    /// Resolution assumed for carved images (72 = one pixel per point).
    #[arg(long, env = "BLOB2PDF_IMAGE_DPI", default_value_t = 72.0)]
    image_dpi: f32,

    /// Do not write carved images as separate files.
    #[arg(long, env = "BLOB2PDF_NO_IMAGES")]
    no_images: bool,

    /// Do not write further embedded PDFs as separate files.
    #[arg(long, env = "BLOB2PDF_NO_PARTS")]
    no_parts: bool,

    /// Print a JSON summary of every input on stdout.
    #[arg(long, env = "BLOB2PDF_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BLOB2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BLOB2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OddHexArg {
    Drop,
    Fail,
}

impl From<OddHexArg> for OddHexPolicy {
    fn from(v: OddHexArg) -> Self {
        match v {
            OddHexArg::Drop => OddHexPolicy::Drop,
            OddHexArg::Fail => OddHexPolicy::Fail,
        }
    }
}

/// Per-input entry of the `--json` summary.
#[derive(serde::Serialize)]
struct JsonEntry<'a> {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a blob2pdf::RecoveryResult>,
    written: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Run recovery ─────────────────────────────────────────────────────
    let outcomes: Vec<(PathBuf, Result<SavedRecovery, RecoverError>)> =
        stream::iter(cli.inputs.iter().cloned().map(|input| {
            let config = config.clone();
            let out_dir = cli.output_dir.clone().unwrap_or_else(|| {
                input
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from("."))
            });
            let binary = cli.binary;
            async move {
                let outcome = recover_to_dir(&input, &out_dir, binary, &config).await;
                (input, outcome)
            }
        }))
        .buffered(cli.concurrency.max(1))
        .collect()
        .await;

    let failed = outcomes.iter().filter(|(_, o)| o.is_err()).count();

    if cli.json {
        let entries: Vec<JsonEntry<'_>> = outcomes
            .iter()
            .map(|(input, outcome)| match outcome {
                Ok(saved) => JsonEntry {
                    input: input.display().to_string(),
                    result: Some(&saved.result),
                    written: saved
                        .written
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect(),
                    error: None,
                },
                Err(e) => JsonEntry {
                    input: input.display().to_string(),
                    result: None,
                    written: Vec::new(),
                    error: Some(e.to_string()),
                },
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        for (input, outcome) in &outcomes {
            print_summary(input, outcome);
        }
        if outcomes.len() > 1 {
            eprintln!(
                "{} {}/{} dumps recovered",
                if failed == 0 { green("✔") } else { cyan("⚠") },
                bold(&(outcomes.len() - failed).to_string()),
                outcomes.len()
            );
        }
    } else {
        for (input, outcome) in &outcomes {
            if let Err(e) = outcome {
                eprintln!("{}: {}", input.display(), e);
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(input: &std::path::Path, outcome: &Result<SavedRecovery, RecoverError>) {
    match outcome {
        Ok(saved) => {
            let r = &saved.result;
            let trailer = match r.xref {
                XrefStatus::Valid { .. } => "trailer ok".to_string(),
                XrefStatus::Repaired {
                    declared, offset, ..
                } => format!("startxref {declared} → {offset}"),
                XrefStatus::Unrepairable { reason } => format!("trailer {reason}"),
            };
            eprintln!(
                "{} {}  {}  {}  {}",
                green("✓"),
                bold(&input.display().to_string()),
                dim(&format!("{:?}/{:?}", r.encoding, r.method)),
                dim(&format!("{} bytes", r.stats.decoded_len)),
                dim(&trailer),
            );
            for rejected in &r.rejected_images {
                eprintln!("    {} {}", cyan("⚠"), rejected);
            }
            for path in &saved.written {
                eprintln!("    → {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("{} {}", red("✗"), bold(&input.display().to_string()));
            for line in e.to_string().lines() {
                eprintln!("    {}", red(line));
            }
        }
    }
}

/// Map CLI args to `RecoveryConfig`.
fn build_config(cli: &Cli) -> Result<RecoveryConfig> {
    let guard = if cli.no_decimal_guard {
        DecimalGuard::Disabled
    } else {
        DecimalGuard::HexLetters {
            min_runs: cli.decimal_min_runs,
        }
    };

    RecoveryConfig::builder()
        .odd_hex(cli.odd_hex.into())
        .decimal_guard(guard)
        .hex_only_defers_base64(!cli.base64_on_hex)
        .hex_prefix_defers_decimal(!cli.decimal_on_hex_prefix)
        .detect_raw_pdf_text(!cli.no_raw_pdf_text)
        .redecode(!cli.no_redecode)
        .xref_repair(!cli.no_xref_repair)
        .xref_window(cli.xref_window)
        .xref_backtrack(cli.xref_backtrack)
        .image_dpi(cli.image_dpi)
        .emit_carved_images(!cli.no_images)
        .emit_embedded_pdfs(!cli.no_parts)
        .build()
        .context("Invalid configuration")
}
