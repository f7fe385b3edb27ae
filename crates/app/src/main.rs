//! Relay binary.

use anyhow::{Context, Result};
use clap::Parser;
use relay::{Cli, Commands};
use relay_application::{StandardVariables, VariableSyntax};
use relay_domain::Environment;
use relay_infrastructure::to_json_stable;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays JSON
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = relay::load_settings(cli.settings.as_deref()).await?;

    match cli.command {
        Some(Commands::History { limit }) => {
            let executor = relay::build_executor(&settings, relay::open_history(&settings))?;
            let entries = executor.recent_history(limit).await?;
            print!("{}", to_json_stable(&entries)?);
        }
        Some(Commands::Variables) => {
            for info in StandardVariables::available() {
                println!(
                    "{:<16} {} (e.g. {})",
                    VariableSyntax::Immediate.token(info.name),
                    info.description,
                    info.example
                );
            }
        }
        None => {
            let path = cli.request.context("no request file given")?;
            let request = relay::load_request(&path, cli.name.as_deref()).await?;
            let environment = match cli.environment.as_deref() {
                Some(path) => relay::load_environment(path).await?,
                None => Environment::new("none"),
            };

            tracing::info!(method = %request.method, url = %request.url, "running request");
            let response =
                relay::run_request(&request, &environment, &settings, relay::open_history(&settings))
                    .await?;
            print!("{}", to_json_stable(&response)?);
        }
    }

    Ok(())
}
