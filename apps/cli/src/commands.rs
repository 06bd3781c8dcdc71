//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use pagestitch_core::{StitchReport, StitchStatus, Stitcher, render};
use pagestitch_dom::Document;
use pagestitch_fetch::{Fetcher, location_from_arg};
use pagestitch_shared::{AppConfig, StitchOverrides, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pagestitch — compose landing pages from a shared reference document.
#[derive(Parser)]
#[command(
    name = "pagestitch",
    version,
    about = "Stitch the header, main and footer of a sibling index.html into a landing page.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.pagestitch/pagestitch.toml.
    #[arg(long, global = true, env = "PAGESTITCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Run summary format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum ReportFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Stitch a landing page and write the result.
    Stitch {
        /// Landing page: a file path or an http(s) URL.
        page: String,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Prefix for relative references and the reference document.
        #[arg(long)]
        root_path: Option<String>,

        /// Replacement hero image URL.
        #[arg(long)]
        hero_image: Option<String>,

        /// Bonus copy markup, inserted verbatim above the package image.
        #[arg(long)]
        bonus_copy: Option<String>,

        /// Replacement action URL for marked forms.
        #[arg(long)]
        form_action: Option<String>,

        /// Do not append the inline smooth-scroll script to the output.
        #[arg(long)]
        no_scroll_script: bool,

        /// Summary format, written to stderr.
        #[arg(long, default_value = "text")]
        report: ReportFormat,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stitched HTML
/// can be piped from stdout.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pagestitch=info",
        1 => "pagestitch=debug",
        _ => "pagestitch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config;
    match cli.command {
        Command::Stitch {
            page,
            out,
            root_path,
            hero_image,
            bonus_copy,
            form_action,
            no_scroll_script,
            report,
        } => {
            let flags = StitchOverrides {
                root_path,
                hero_image_url: hero_image,
                bonus_copy_html: bonus_copy,
                form_action_url: form_action,
            };
            let mut config = resolve_config(config_path.as_deref())?;
            if no_scroll_script {
                config.render.emit_scroll_script = false;
            }
            cmd_stitch(&page, out.as_deref(), &flags, &config, &report).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_stitch(
    page: &str,
    out: Option<&Path>,
    flags: &StitchOverrides,
    config: &AppConfig,
    format: &ReportFormat,
) -> Result<()> {
    let page_url = location_from_arg(page)?;
    info!(page = %page_url, "loading landing page");

    let fetcher = Fetcher::new(&config.fetch)?;
    let source = fetcher
        .fetch(&page_url)
        .await
        .wrap_err_with(|| format!("cannot load landing page '{page}'"))?;
    let mut live = Document::parse(&source);

    // Defaults < config file < host-page globals < flags.
    let mut stitch_config = config.stitch.clone();
    stitch_config.apply(&render::host_overrides(&live));
    stitch_config.apply(flags);

    let stitcher = Stitcher::new(config, stitch_config)?;
    let report = stitcher.run(&mut live, &page_url).await;
    render::finalize(&mut live, &config.render, &report)?;

    let html = live.to_html();
    match out {
        Some(path) => {
            std::fs::write(path, &html)
                .wrap_err_with(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), bytes = html.len(), "stitched page written");
        }
        None => println!("{html}"),
    }

    print_report(&report, format)?;

    match &report.status {
        StitchStatus::Completed => Ok(()),
        StitchStatus::Degraded { error } => Err(eyre!("page rendered in degraded state: {error}")),
    }
}

fn print_report(report: &StitchReport, format: &ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => eprintln!("{}", serde_json::to_string_pretty(report)?),
        ReportFormat::Text => {
            let status = match &report.status {
                StitchStatus::Completed => "completed".to_string(),
                StitchStatus::Degraded { error } => format!("degraded ({error})"),
            };
            eprintln!();
            eprintln!("  Status:      {status}");
            if let Some(url) = &report.reference_url {
                eprintln!("  Reference:   {url}");
            }
            eprintln!("  Sections:    {}", report.sections.join(", "));
            eprintln!("  Rewritten:   {}", report.rewritten);
            eprintln!("  Stylesheets: {}", report.stylesheets);
            eprintln!("  Hero:        {}", yes_no(report.hero_replaced));
            eprintln!("  Bonus copy:  {}", yes_no(report.bonus_copy_inserted));
            eprintln!("  Forms:       {}", report.forms_updated);
            eprintln!("  Links:       {}", report.scroll_links);
            eprintln!();
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
