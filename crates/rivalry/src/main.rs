use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rivalry::web::{self, AppState};
use rivalry::{build_orchestrator, load_config, Credentials, DEMO_QUERY};
use rivalry_agents::{build_decision_tree_dot, build_decision_tree_markdown};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rivalry", version, about = "Multi-agent company comparison research")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/rivalry.toml", global = true)]
    config: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one research query and print the report
    Query {
        /// Research query; defaults to the observability demo query
        text: Vec<String>,

        /// Print the full result as JSON instead of the report
        #[arg(long)]
        json: bool,

        /// Also print the "Behind the Scenes" decision tree (text or dot)
        #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "text")]
        tree: Option<TreeFormat>,
    },
    /// Start the chat web UI
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TreeFormat {
    Text,
    Dot,
}

fn init_tracing(json: bool) {
    // Respects RUST_LOG, defaults to info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(&cli.config)?;
    let credentials = Credentials::from_env();

    match cli.command {
        Command::Query { text, json, tree } => {
            let problems = credentials.validate();
            if !problems.is_empty() {
                eprintln!("Configuration errors:");
                for problem in &problems {
                    eprintln!("  - {problem}");
                }
                eprintln!("\nSet the required environment variables and try again.");
                bail!("missing configuration");
            }

            let query = if text.is_empty() {
                DEMO_QUERY.to_string()
            } else {
                text.join(" ")
            };
            let orchestrator = build_orchestrator(&config, &credentials)
                .context("Failed to build orchestrator")?;

            let result = orchestrator.run(&query, None).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Research Query: {query}");
                println!("{}", "=".repeat(50));
                println!("{}", result.final_report);
            }
            match tree {
                Some(TreeFormat::Text) => {
                    println!("\n{}", build_decision_tree_markdown(&result.metadata()))
                }
                Some(TreeFormat::Dot) => println!("\n{}", build_decision_tree_dot(&result.metadata())),
                None => {}
            }
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let problems = credentials.validate();
            let orchestrator = if problems.is_empty() {
                Some(Arc::new(
                    build_orchestrator(&config, &credentials)
                        .context("Failed to build orchestrator")?,
                ))
            } else {
                warn!(problems = ?problems, "Credentials missing, research is disabled");
                None
            };
            let state = Arc::new(AppState::new(orchestrator, problems, &config.server));

            let listener = tokio::net::TcpListener::bind((host.as_str(), port))
                .await
                .with_context(|| format!("Failed to bind {host}:{port}"))?;

            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            // Handle shutdown signals
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Received shutdown signal");
                shutdown.cancel();
            });

            web::serve(listener, state, cancel).await?;
        }
    }

    Ok(())
}
