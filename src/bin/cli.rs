//! autorig CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use autorig::{
    config::Config,
    error::Result,
    models::{SiteKind, SiteProfile},
};
use clap::{Parser, Subcommand};

#[cfg(feature = "browser")]
use autorig::{
    engine::ApplicationEngine,
    site::{BrowserSession, DomConfigurator, WaitSettings},
};

/// autorig - PC configurator auto-apply
#[derive(Parser, Debug)]
#[command(
    name = "autorig",
    version,
    about = "Applies a desired PC parts list on e-commerce configurator pages"
)]

struct Cli {
    /// Path to the run configuration file
    #[arg(short, long, default_value = "autorig.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the configurator page and apply the configured parts list
    #[cfg(feature = "browser")]
    Run {
        /// Override the page URL from the config file
        #[arg(long)]
        url: Option<String>,

        /// Write the JSON report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Print the built-in site profiles
    Profiles,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("autorig starting...");

    #[allow(unused_mut)]
    let mut config = Config::load_or_default(&cli.config);

    match cli.command {
        #[cfg(feature = "browser")]
        Command::Run { url, output } => {
            if let Some(url) = url {
                config.url = url;
            }
            if let Some(output) = output {
                config.output_path = Some(output);
            }
            config.validate()?;

            let profile = config.site_profile()?;
            let desired = config.desired();
            log::info!(
                "Applying {} components on {} ({})",
                desired.len(),
                profile.name,
                config.url
            );

            let session = match &config.browser.connect_ws {
                Some(ws_url) => BrowserSession::connect(ws_url).await?,
                None => BrowserSession::launch(config.browser.headless).await?,
            };

            let waits = WaitSettings {
                poll_interval_ms: config.browser.poll_interval_ms,
                settle_timeout_ms: config.browser.settle_timeout_ms,
                element_timeout_ms: config.browser.element_timeout_ms,
            };

            let page = session.open(&config.url).await?;
            let adapter = DomConfigurator::new(page, profile, waits).await?;
            adapter.prepare().await?;

            let report = ApplicationEngine::new(&adapter).run(&desired).await?;
            session.close().await?;

            let serialized = serde_json::to_string_pretty(&report.result.to_report())?;
            println!("{serialized}");

            if let Some(path) = &config.output_path {
                std::fs::write(path, &serialized)?;
                log::info!("Report written to {}", path.display());
            }

            if report.matched {
                log::info!(
                    "Configuration matched after {} attempt(s), price {}",
                    report.attempts,
                    report.result.price()
                );
            } else {
                log::warn!(
                    "Configuration did not fully apply; {} component(s) missing",
                    report.result.missing_components().len()
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} components for {})",
                config.components.len(),
                config.site
            );

            log::info!("All validations passed!");
        }

        Command::Profiles => {
            for kind in SiteKind::all() {
                let profile = SiteProfile::for_site(kind);
                println!("# {}\n{}", kind.name(), toml::to_string_pretty(&profile)?);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
