//! Sharenite Mirror CLI application
//!
//! Command-line interface for mirroring a public Sharenite game library and
//! looking up cover art for the games in it.

use std::process;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use sharenite_mirror::cli::{
    handle_cache, handle_cover, handle_list, handle_prefs, handle_sync, Cli, CommandContext,
    Commands,
};
use sharenite_mirror::config::AppConfig;
use sharenite_mirror::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("{}", e.report());
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("Sharenite Mirror v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext::new(&cli.global, config)?;

    match cli.command {
        Commands::Sync(args) => {
            info!("Executing sync command");
            handle_sync(&ctx, args).await
        }
        Commands::List(args) => {
            info!("Executing list command");
            handle_list(&ctx, args).await
        }
        Commands::Prefs(args) => {
            info!("Executing prefs command");
            handle_prefs(&ctx, args).await
        }
        Commands::Cover(args) => {
            info!("Executing cover command");
            handle_cover(&ctx, args).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(&ctx, args).await
        }
    }
}

/// Initialize logging from CLI verbosity flags, falling back to the config file
fn init_logging(cli: &Cli, config: &AppConfig) {
    let flags_given = cli.global.quiet || cli.global.verbose || cli.global.very_verbose;
    let level = if flags_given {
        cli.log_level().to_string().to_lowercase()
    } else {
        config.logging.level.clone()
    };

    let mut filter = EnvFilter::from_default_env();
    let mut invalid_level = false;
    match format!("sharenite_mirror={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(_) => invalid_level = true,
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if invalid_level {
        warn!("Ignoring invalid log level '{}'", level);
    }
    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
