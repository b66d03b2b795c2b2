//! CLI binary for kimera-transform.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TransformConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use kimera_transform::{
    default_output_name, CancellationToken, ImageAsset, JobDescriptor,
    MaterializeStrategy, ProgressCallback, TransformClient, TransformConfig,
    TransformProgressCallback, EXAMPLE_PROMPTS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner whose message tracks the latest
/// remote status, plus one log line per failed check.
struct CliProgressCallback {
    bar: ProgressBar,
    max_attempts: u32,
}

impl CliProgressCallback {
    fn new(max_attempts: u32) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Encoding image…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar, max_attempts })
    }
}

impl TransformProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, size_bytes: usize) {
        self.bar.set_prefix("Uploading");
        self.bar
            .set_message(format!("{:.2} MB", size_bytes as f64 / 1024.0 / 1024.0));
    }

    fn on_submitted(&self, job: &JobDescriptor) {
        self.bar.println(format!(
            "{} {} {}",
            cyan("◆"),
            bold("Transformation started"),
            dim(&format!("job {}", job.id))
        ));
        self.bar.set_prefix("Processing");
        self.bar.set_message(format!("status: {}", job.status));
    }

    fn on_status(&self, status: &str, attempt: u32) {
        self.bar.set_message(format!(
            "status: {status}  {}",
            dim(&format!("check {attempt}/{}", self.max_attempts))
        ));
    }

    fn on_check_failed(&self, attempt: u32, error: &str) {
        let msg = if error.len() > 80 {
            let cut = error
                .char_indices()
                .nth(79)
                .map(|(i, _)| i)
                .unwrap_or(error.len());
            format!("{}\u{2026}", &error[..cut])
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} check {:>2}/{}  {}",
            red("✗"),
            attempt,
            self.max_attempts,
            red(&msg)
        ));
    }

    fn on_complete(&self, _result_url: &str, attempts: u32) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Transformation completed after {} status checks",
            green("✔"),
            bold(&attempts.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transform a photo, print the result URL
  kimera selfie.jpg --prompt "a medieval knight in golden armor"

  # Save the result next to you
  kimera selfie.jpg -p "a cyberpunk warrior with neon armor" -o knight.jpg

  # Save with the default name (ai-transformed-<millis>.jpg)
  kimera selfie.jpg -p "a futuristic robot" --save

  # Upload first and send a URL instead of an inline data URI
  kimera selfie.jpg -p "a fairy" --strategy upload

  # JSON report (job id, attempts, per-check history)
  kimera selfie.jpg -p "a space explorer" --json

  # Prompt ideas
  kimera --list-prompts

ENVIRONMENT VARIABLES:
  KIMERA_API_KEY          API key (required)
  KIMERA_API_BASE         Override the API root (default https://api.kimera.ai/v1)

Press Ctrl-C to stop the running stage (upload, submission, polling or
download); press it again to exit immediately. A job that was already
submitted keeps running on the service.
"#;

/// Transform photos with a text prompt using the Kimera pipeline API.
#[derive(Parser, Debug)]
#[command(
    name = "kimera",
    version,
    about = "Transform photos with a text prompt using the Kimera pipeline API",
    long_about = "Submit a local image and a free-text prompt to the Kimera image-transformation \
pipeline, poll until the transformed image is ready, and print or save the result.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file to transform (PNG, JPEG, WebP, …).
    #[arg(required_unless_present = "list_prompts")]
    image: Option<PathBuf>,

    /// What the image should become.
    #[arg(short, long, required_unless_present = "list_prompts")]
    prompt: Option<String>,

    /// Download the transformed image to this file.
    #[arg(short, long, env = "KIMERA_OUTPUT")]
    output: Option<PathBuf>,

    /// Download the transformed image as ai-transformed-<millis>.jpg.
    #[arg(long, conflicts_with = "output")]
    save: bool,

    /// API key.
    #[arg(long, env = "KIMERA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API root URL.
    #[arg(long, env = "KIMERA_API_BASE")]
    base_url: Option<String>,

    /// How the image is sent: inline data URI or upload-then-URL.
    #[arg(long, env = "KIMERA_STRATEGY", value_enum, default_value = "inline")]
    strategy: StrategyArg,

    /// Upload endpoint for --strategy upload (default: <base-url>/upload).
    #[arg(long, env = "KIMERA_UPLOAD_ENDPOINT")]
    upload_endpoint: Option<String>,

    /// Milliseconds between status checks.
    #[arg(long, env = "KIMERA_POLL_INTERVAL_MS", default_value_t = 5_000)]
    poll_interval_ms: u64,

    /// Maximum number of status checks.
    #[arg(long, env = "KIMERA_MAX_ATTEMPTS", default_value_t = 60,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "KIMERA_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// Output the structured result as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "KIMERA_NO_PROGRESS")]
    no_progress: bool,

    /// Print example prompts and exit.
    #[arg(long)]
    list_prompts: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "KIMERA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "KIMERA_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum StrategyArg {
    Inline,
    Upload,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_prompts {
        for p in EXAMPLE_PROMPTS {
            println!("{p}");
        }
        return Ok(());
    }

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<(Arc<CliProgressCallback>, ProgressCallback)> = if show_progress {
        let cb = CliProgressCallback::new(cli.max_attempts);
        Some((Arc::clone(&cb), cb as Arc<dyn TransformProgressCallback>))
    } else {
        None
    };

    let config = build_config(&cli, progress_cb.as_ref().map(|(_, cb)| Arc::clone(cb)))?;

    // ── Load input ───────────────────────────────────────────────────────
    let image_path = cli.image.as_ref().context("An image path is required")?;
    let prompt = cli.prompt.as_deref().unwrap_or_default();
    let asset = ImageAsset::from_path(image_path)
        .await
        .with_context(|| format!("Failed to load image {}", image_path.display()))?;

    // ── Ctrl-C: first press cancels the running stage, second one exits ──
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let client = TransformClient::new(config).context("Invalid configuration")?;
    let result = client.run_with_cancel(&asset, prompt, &cancel).await;

    if let Some((ref bar, _)) = progress_cb {
        bar.bar.finish_and_clear();
    }

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            debug!(
                image_size = asset.size(),
                prompt_len = prompt.len(),
                kind = ?e.kind(),
                "transformation failed"
            );
            if !cli.quiet {
                eprintln!("{} {}", red("✘"), e.user_hint());
            }
            return Err(e).context("Transformation failed");
        }
    };

    // ── Optional download ────────────────────────────────────────────────
    let save_path = match (&cli.output, cli.save) {
        (Some(p), _) => Some(p.clone()),
        (None, true) => Some(default_output_name()),
        (None, false) => None,
    };
    if let Some(ref path) = save_path {
        let bytes = client
            .download_result_with_cancel(&output.result_url, path, &cancel)
            .await
            .context("Failed to save the transformed image")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} bytes  →  {}",
                green("✔"),
                bytes,
                bold(&path.display().to_string())
            );
        }
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        println!("{}", output.result_url);
        if !cli.quiet && !show_progress {
            eprintln!(
                "Job {} finished after {} checks in {}ms",
                output.job_id, output.attempts, output.duration_ms
            );
        }
    }

    Ok(())
}

/// Map CLI args to `TransformConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TransformConfig> {
    let api_key = cli
        .api_key
        .clone()
        .context("No API key: pass --api-key or set KIMERA_API_KEY")?;

    let strategy = match cli.strategy {
        StrategyArg::Inline => MaterializeStrategy::Inline,
        StrategyArg::Upload => MaterializeStrategy::Upload {
            endpoint: cli.upload_endpoint.clone(),
        },
    };

    let mut builder = TransformConfig::builder()
        .api_key(api_key)
        .strategy(strategy)
        .poll_interval_ms(cli.poll_interval_ms)
        .max_attempts(cli.max_attempts)
        .request_timeout_secs(cli.request_timeout);

    if let Some(ref base) = cli.base_url {
        builder = builder.base_url(base.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
