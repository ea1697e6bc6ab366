use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

pub mod private_key;

pub use private_key::PrivateKey;
use url::Url;

use crate::artifacts::ContractSpec;
use crate::types::NetworkName;

pub const DEFAULT_CONTRACT: &str = "Trigger";

#[derive(Debug, Clone, Parser)]
#[clap(rename_all = "kebab-case", version, about)]
pub struct Args {
    /// Path to the deployer configuration file
    ///
    /// Falls back to `deployer.yml` in the working directory, and to the
    /// built-in defaults when that file does not exist either
    #[clap(short, long, env = "DEPLOYER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Name of the network to use, defaults to the config's `default_network`
    #[clap(short, long, env = "NETWORK", global = true)]
    pub network: Option<NetworkName>,

    /// The RPC Url to use for networks that don't configure one
    #[clap(short, long, env = "API_URL", global = true)]
    pub rpc_url: Option<Url>,

    /// Private key to use for networks that don't configure accounts
    ///
    /// Only parsed when a network falls back to it, a blank value is ignored
    #[clap(short, long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Deploys a contract and prints its address (the default)
    Deploy(DeployArgs),
    /// Prints the list of accounts
    Accounts,
    /// Compiles the contract sources with forge
    Compile,
}

impl Default for Command {
    fn default() -> Self {
        Self::Deploy(DeployArgs::default())
    }
}

#[derive(Debug, Clone, ClapArgs)]
#[clap(rename_all = "kebab-case")]
pub struct DeployArgs {
    /// Contract to deploy, either `Name` or `path/to/File.sol:Name`
    #[clap(default_value = DEFAULT_CONTRACT)]
    pub contract: ContractSpec,

    /// Skip compiling the sources before deploying
    #[clap(long)]
    pub no_compile: bool,

    /// Write a record of the deployment to this path
    #[clap(long)]
    pub report: Option<PathBuf>,

    /// Number of confirmations to wait for, overrides the network config
    #[clap(long)]
    pub confirmations: Option<usize>,
}

impl Default for DeployArgs {
    fn default() -> Self {
        Self {
            contract: ContractSpec::name(DEFAULT_CONTRACT),
            no_compile: false,
            report: None,
            confirmations: None,
        }
    }
}
