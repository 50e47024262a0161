mod key_commands;

use std::{net::SocketAddr, sync::Arc};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "istari", about = "Istari — challenge-site interrogation gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Serve,
    /// Submit a single prompt from the command line, bypassing the gateway.
    Ask {
        /// Prompt text.
        #[arg(short, long)]
        prompt: String,
        /// Level page to interrogate (defaults to the configured target).
        #[arg(long)]
        target_url: Option<String>,
        /// Caller identity for session continuity.
        #[arg(long, default_value = "cli")]
        caller: String,
    },
    /// API key management.
    Keys {
        #[command(subcommand)]
        action: key_commands::KeyAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "istari starting");

    let mut config = istari_config::discover_and_load();
    istari_config::apply_env_overrides(&mut config);

    match cli.command {
        None | Some(Commands::Serve) => {
            let bind = cli.bind.unwrap_or(config.server.bind.clone());
            let port = cli.port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{bind}:{port}").parse()?;

            let default_target_url: url::Url = config.scraper.default_target_url.parse()?;
            let scraper = istari_scraper::Scraper::new((&config.scraper).into());
            let pool = istari_gateway::state::open_database(&config.database.path).await?;
            let state = Arc::new(istari_gateway::GatewayState::new(
                Arc::new(istari_gateway::LiveScrapeService::new(scraper)),
                pool,
                default_target_url,
            ));

            istari_gateway::serve(state, addr).await
        },
        Some(Commands::Ask {
            prompt,
            target_url,
            caller,
        }) => {
            let target_url: url::Url = target_url
                .unwrap_or(config.scraper.default_target_url.clone())
                .parse()?;
            let scraper = istari_scraper::Scraper::new((&config.scraper).into());
            let request = istari_scraper::ScrapeRequest {
                target_url,
                prompt,
                caller_id: caller,
            };
            let answer = scraper.answer(&request).await?;
            println!("{answer}");
            Ok(())
        },
        Some(Commands::Keys { action }) => {
            key_commands::handle_keys(action, &config.database.path).await
        },
    }
}
