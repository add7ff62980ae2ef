//! CLI command definitions, routing, and tracing setup.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use topiclens_core::{AnalysisReport, ProgressReporter};
use topiclens_corpus::CancellationFlag;
use topiclens_shared::{
    AnalysisConfig, AppConfig, DocumentId, FailurePolicy, init_config, load_config,
    normalize_extensions,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TopicLens: discover the themes of a document collection.
#[derive(Parser)]
#[command(
    name = "topiclens",
    version,
    about = "Fit a topic model to a folder of documents and show each document's dominant topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Extraction failure policy flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum PolicyArg {
    Substitute,
    Exclude,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Substitute => FailurePolicy::Substitute,
            PolicyArg::Exclude => FailurePolicy::Exclude,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyze the documents in a file or directory.
    Analyze(AnalyzeArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `analyze`. Unset flags fall back to the config file.
#[derive(clap::Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// File or directory to analyze.
    pub path: PathBuf,

    /// Number of topics.
    #[arg(short = 'k', long)]
    pub topics: Option<usize>,

    /// Terms shown per topic.
    #[arg(short = 'n', long)]
    pub top_terms: Option<usize>,

    /// File extensions to include (comma-separated).
    #[arg(short = 'e', long = "ext", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// What to do with documents whose text cannot be extracted.
    #[arg(long)]
    pub policy: Option<PolicyArg>,

    /// Random seed for model initialization.
    #[arg(long)]
    pub seed: Option<u64>,

    /// EM iterations.
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Abort the model fit after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Descend into sub-directories.
    #[arg(long)]
    pub recursive: bool,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

impl AnalyzeArgs {
    /// Merge flags over the file config.
    pub(crate) fn to_analysis_config(&self, app: &AppConfig) -> AnalysisConfig {
        let mut config = AnalysisConfig::from(app);
        if let Some(k) = self.topics {
            config.topics = k;
        }
        if let Some(n) = self.top_terms {
            config.top_terms = n;
        }
        if let Some(exts) = &self.extensions {
            config.extensions = normalize_extensions(exts);
        }
        if let Some(policy) = self.policy {
            config.failure_policy = policy.into();
        }
        if let Some(seed) = self.seed {
            config.model.seed = seed;
        }
        if let Some(max_iter) = self.max_iter {
            config.model.max_iter = max_iter;
        }
        if let Some(secs) = self.timeout {
            config.model.timeout_secs = Some(secs);
        }
        if self.recursive {
            config.recursive = true;
        }
        config
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "topiclens=info",
        1 => "topiclens=debug",
        _ => "topiclens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so stdout carries only the report.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => cmd_analyze(&args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_analyze(args: &AnalyzeArgs) -> Result<()> {
    let app = load_config()?;
    let config = args.to_analysis_config(&app);

    info!(
        path = %args.path.display(),
        topics = config.topics,
        top_terms = config.top_terms,
        extensions = ?config.extensions,
        policy = %config.failure_policy,
        "analyzing documents"
    );

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let reporter = CliProgress::new();
    let result = topiclens_core::analyze(&args.path, &config, &reporter, &cancel).await;
    reporter.spinner.finish_and_clear();
    let report = result?;

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Topics, then one line per document, then failed documents.
pub(crate) fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Topics:");
    for topic in &report.topics {
        let _ = writeln!(out, "{topic}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Document assignments:");
    for assignment in &report.assignments {
        let _ = writeln!(out, "{assignment}");
    }

    let failures: Vec<_> = report
        .documents
        .iter()
        .filter_map(|d| match &d.status {
            topiclens_shared::ExtractionStatus::Failed { reason } => Some((d, reason)),
            topiclens_shared::ExtractionStatus::Ok => None,
        })
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Extraction failures:");
        for (doc, reason) in failures {
            let action = if doc.index.is_some() { "kept empty" } else { "excluded" };
            let _ = writeln!(out, "{} ({action}): {reason}", doc.document.file_name());
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} documents, {} terms, {} EM iterations, perplexity {:.2}",
        report.assignments.len(),
        report.stats.vocabulary_size,
        report.diagnostics.iterations,
        report.diagnostics.perplexity
    );
    out
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_loaded(&self, document: &DocumentId, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracting [{current}/{total}] {}", document.file_name()));
    }

    fn done(&self, _report: &AnalysisReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
