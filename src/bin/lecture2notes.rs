//! CLI binary for lecture2notes.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ClientConfig`, waits for the job and prints or writes the export.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lecture2notes::config::DEFAULT_BASE_URL;
use lecture2notes::{
    export_path, render, summarize, track, write_export, ClientConfig, ExportFormat,
    JobObserver, Summary, SummaryOutput,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner for the upload and polling phases plus one
/// log line per milestone.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl JobObserver for CliObserver {
    fn on_upload_start(&self, source: &str) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(source.to_string());
    }

    fn on_job_accepted(&self, job_id: &str) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Job {job_id} accepted"))
        ));
        self.bar.set_prefix("Processing");
        self.bar.set_message("waiting for the backend…");
    }

    fn on_poll(&self, _job_id: &str, attempt: u32) {
        self.bar.set_message(format!("status check #{attempt}"));
    }

    fn on_completed(&self, summary: &Summary) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(summary.display_title()),
            dim(&format!(
                "{} takeaways, {} notes, {} flashcards",
                summary.key_takeaways.len(),
                summary.bulleted_notes.len(),
                summary.flashcards.len()
            )),
        );
    }

    fn on_failed(&self, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarize a recording (plain text on stdout)
  lecture2notes lecture.mp4

  # Let the backend download the media
  lecture2notes https://example.com/talks/week3.mp3

  # Printable HTML, named after the lecture title
  lecture2notes lecture.mp4 -o notes/ --format html

  # Format picked from the extension
  lecture2notes lecture.mp4 -o week3.json

  # Follow a job that was submitted earlier
  lecture2notes --job 3f2a9c1e

ENVIRONMENT VARIABLES:
  LECTURE2NOTES_SERVER            Backend base URL (default http://127.0.0.1:8000)
  LECTURE2NOTES_OUTPUT            Output file or directory
  LECTURE2NOTES_FORMAT            text, html or json
  LECTURE2NOTES_POLL_INTERVAL_MS  Delay between status checks
  RUST_LOG                        Log filter, overrides -v / -q
"#;

/// Summarize lecture recordings into notes and flashcards.
#[derive(Parser, Debug)]
#[command(
    name = "lecture2notes",
    version,
    about = "Summarize lecture recordings into notes and flashcards",
    long_about = "Upload a lecture recording (or pass a URL) to a summarization backend, \
wait for the job to finish, and export the summary, key takeaways, detailed notes and \
flashcards as plain text, printable HTML or JSON.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local media file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "job", conflicts_with = "job")]
    input: Option<String>,

    /// Follow an existing backend job instead of submitting media.
    #[arg(long, env = "LECTURE2NOTES_JOB")]
    job: Option<String>,

    /// Backend base URL.
    #[arg(long, env = "LECTURE2NOTES_SERVER", default_value = DEFAULT_BASE_URL)]
    server: String,

    /// Write the export to this file (or into this directory) instead of stdout.
    #[arg(short, long, env = "LECTURE2NOTES_OUTPUT")]
    output: Option<PathBuf>,

    /// Export format. Default: from the output extension, else text.
    #[arg(long, env = "LECTURE2NOTES_FORMAT", value_enum)]
    format: Option<ExportFormat>,

    /// Delay between status checks in milliseconds.
    #[arg(long, env = "LECTURE2NOTES_POLL_INTERVAL_MS", default_value_t = 2000,
          value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: u64,

    /// How long a transient backend error stays on screen, in milliseconds.
    #[arg(long, env = "LECTURE2NOTES_ERROR_CLEAR_MS", default_value_t = 5000)]
    error_clear_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "LECTURE2NOTES_TIMEOUT", default_value_t = 600)]
    timeout: u64,

    /// Disable the spinner.
    #[arg(long, env = "LECTURE2NOTES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LECTURE2NOTES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LECTURE2NOTES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let observer = show_progress.then(CliObserver::new);
    let config = build_config(&cli, observer)?;

    // ── Run the job ──────────────────────────────────────────────────────
    let output = match (&cli.job, &cli.input) {
        (Some(job_id), _) => track(job_id.as_str(), &config)
            .await
            .with_context(|| format!("Tracking job {job_id} failed"))?,
        (None, Some(input)) => summarize(input, &config)
            .await
            .context("Summarization failed")?,
        (None, None) => anyhow::bail!("Provide a media file, a URL or --job <ID>"),
    };

    // ── Export ───────────────────────────────────────────────────────────
    match cli.output {
        Some(ref target) => {
            let format = cli
                .format
                .or_else(|| ExportFormat::from_path(target))
                .unwrap_or_default();
            let path = export_path(target, &output.summary, format);
            write_export(&output.summary, &path, format)
                .await
                .context("Failed to write export")?;

            if !cli.quiet {
                print_stats(&output, Some(&path));
            }
        }
        None => {
            let format = cli.format.unwrap_or_default();
            let rendered = render(&output.summary, format).context("Failed to render summary")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }

            if !cli.quiet {
                print_stats(&output, None);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, observer: Option<Arc<CliObserver>>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.server.as_str())
        .poll_interval_ms(cli.poll_interval_ms)
        .error_clear_ms(cli.error_clear_ms)
        .request_timeout_secs(cli.timeout);

    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }

    builder.build().context("Invalid configuration")
}

/// A directory target gets the title-derived export file name.
fn print_stats(output: &SummaryOutput, path: Option<&Path>) {
    let job = output.job_id.as_deref().unwrap_or("inline");
    let dest = path
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "   {}  {} status checks  {}ms{}",
        dim(&format!("job {job}")),
        output.stats.polls_issued,
        output.stats.duration_ms,
        dest,
    );
}
