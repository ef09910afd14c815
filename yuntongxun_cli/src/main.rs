mod commands;
mod output;
mod xml_output;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use yuntongxun_api::{Client, ClientConfig, Credential};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "ytx")]
#[command(about = "Send signed calls to the Yuntongxun REST API")]
struct Cli {
    /// Output format: json or xml
    #[arg(long, default_value = "json", global = true)]
    output: String,

    /// Base URL, e.g. https://app.cloopen.com:8883/2013-12-26 (default: $YUNTONGXUN_BASE_URL or the sandbox)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Default timeout in seconds (default: $YUNTONGXUN_TIMEOUT_SECS or 15)
    #[arg(long, global = true)]
    default_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Authorization header and sig for the configured account
    Sign,
    /// Invoke a REST API function
    Invoke(Box<commands::invoke::InvokeArgs>),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yuntongxun_cli=info".parse()?)
                .add_directive("yuntongxun_api=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "xml" => OutputFormat::Xml,
        _ => OutputFormat::Json,
    };

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(secs) = cli.default_timeout.filter(|secs| *secs > 0) {
        config.timeout = Duration::from_secs(secs);
    }

    let credential = Credential::from_env()
        .context("credentials are read from YUNTONGXUN_ACCOUNT_SID and YUNTONGXUN_AUTH_TOKEN")?;
    let client = Client::from_config(&config, credential);

    match &cli.command {
        Commands::Sign => commands::sign::run(&client, &format)?,
        Commands::Invoke(args) => commands::invoke::run(args.as_ref(), &client, &format).await?,
    }

    Ok(())
}
