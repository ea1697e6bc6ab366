use clap::error::ErrorKind;
use clap::Parser;
use cli::{Args, Command};
use color_eyre::config::{HookBuilder, Theme};
use config::{Config, NetworkOverrides};
use forge_utils::ForgeBuild;
use indicatif::ProgressStyle;
use tracing_error::ErrorLayer;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod artifacts;
pub mod forge_utils;
pub mod serde_utils;

mod accounts;
mod cli;
mod config;
mod deployment;
mod network;
mod report;
mod types;

async fn start() -> eyre::Result<()> {
    // Bad arguments, e.g. a malformed PRIVATE_KEY, fail like any other error
    let args = Args::try_parse().or_else(|err| match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => err.exit(),
        _ => Err(err),
    })?;

    let config = Config::load(args.config.as_deref()).await?;

    let overrides = NetworkOverrides {
        rpc_url: args.rpc_url,
        private_key: args.private_key,
    };

    match args.command.unwrap_or_default() {
        Command::Deploy(deploy_args) => {
            let network =
                config.resolve_network(args.network.as_ref(), &overrides)?;

            deployment::run_deployment(&config, &network, deploy_args).await?;
        }
        Command::Accounts => {
            let network =
                config.resolve_network(args.network.as_ref(), &overrides)?;

            let addresses = network.account_addresses().await?;

            accounts::write_accounts(&addresses, &mut std::io::stdout().lock())?;
        }
        Command::Compile => {
            ForgeBuild::from_config(&config).run().await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // The report is logged through tracing, which escapes ANSI codes
    HookBuilder::default().theme(Theme::new()).install()?;

    dotenv::dotenv().ok();

    let indicatif_layer = IndicatifLayer::new().with_progress_style(
        ProgressStyle::with_template(
            "{span_child_prefix}{spinner:.green} {span_name}{{{span_fields}}} {elapsed}",
        )?,
    );

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(filter),
        )
        .with(indicatif_layer)
        .with(ErrorLayer::default())
        .init();

    match start().await {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::error!("{:?}", err);
            std::process::exit(1)
        }
    }
}
