//! The `lectern` binary: CLI subcommands and the HTTP server.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lectern_core::LecternConfig;
use lectern_server::{cli, routes};

/// Join everything after the subcommand, or exit with usage.
fn rest_of_args(args: &[String], usage: &str) -> String {
    let rest = args.get(2..).unwrap_or_default().join(" ");
    if rest.trim().is_empty() {
        eprintln!("Usage: lectern {}", usage);
        std::process::exit(1);
    }
    rest
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if let Some("--help" | "-h" | "help") = args.get(1).map(String::as_str) {
        cli::print_help();
        return Ok(());
    }

    let config = LecternConfig::load(None)?;
    info!("Data directory: {}", config.data_paths.root.display());

    if args.len() > 1 {
        match args[1].as_str() {
            "provider" => {
                let name = rest_of_args(&args, "provider <gemini|openai|anthropic|groq|auto>");
                return cli::set_provider(&config, &name);
            }
            "build" => {
                let state = cli::init_state(config)?;
                return cli::build(&state).await;
            }
            "ask" => {
                let question = rest_of_args(&args, "ask <question>");
                let state = cli::init_state(config)?;
                return cli::ask(&state, &question).await;
            }
            "chat" => {
                let state = cli::init_state(config)?;
                return cli::chat(&state).await;
            }
            "tutor" => {
                let state = cli::init_state(config)?;
                return cli::tutor(&state).await;
            }
            "explain" => {
                let question = rest_of_args(&args, "explain <question>");
                let state = cli::init_state(config)?;
                return cli::explain(&state, &question).await;
            }
            "journal" => {
                let state = cli::init_state(config)?;
                return cli::journal(&state).await;
            }
            "news" => {
                let query = rest_of_args(&args, "news <query>");
                let state = cli::init_state(config)?;
                return cli::news(&state, &query).await;
            }
            "weather" => {
                let city = rest_of_args(&args, "weather <city>");
                let state = cli::init_state(config)?;
                return cli::weather(&state, &city).await;
            }
            "recipe" => {
                let food = rest_of_args(&args, "recipe <food>");
                let state = cli::init_state(config)?;
                return cli::recipe(&state, &food).await;
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'lectern help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let port = config.port;
    let state = cli::init_state(config)?;

    match state.assistant.build_corpus().await {
        Ok(report) => cli::print_report(&report),
        Err(e) => warn!("Starting without an index: {}", e),
    }

    let app = routes::build_router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Lectern server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
