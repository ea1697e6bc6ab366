use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eyre::{Context, ContextCompat};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::cli::PrivateKey;
use crate::network::Network;
use crate::serde_utils;
use crate::types::{CompilerVersion, NetworkName};

pub const DEFAULT_CONFIG_PATH: &str = "deployer.yml";

pub const LOCAL_NETWORK: &str = "hardhat";
pub const LOCAL_NODE_URL: &str = "http://127.0.0.1:8545";

pub const DEV_MNEMONIC: &str =
    "test test test test test test test test test test test junk";
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/";
pub const DEFAULT_ACCOUNT_COUNT: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub solidity: SolidityConfig,
    pub default_network: NetworkName,
    #[serde(default)]
    pub networks: HashMap<NetworkName, NetworkConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SolidityConfig {
    Version(CompilerVersion),
    Detailed {
        version: CompilerVersion,
        #[serde(default)]
        optimizer: Option<OptimizerConfig>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimizerConfig {
    pub enabled: bool,
    #[serde(default)]
    pub runs: Option<u32>,
}

impl SolidityConfig {
    pub fn version(&self) -> &CompilerVersion {
        match self {
            SolidityConfig::Version(version) => version,
            SolidityConfig::Detailed { version, .. } => version,
        }
    }

    pub fn optimizer(&self) -> Option<&OptimizerConfig> {
        match self {
            SolidityConfig::Version(_) => None,
            SolidityConfig::Detailed { optimizer, .. } => optimizer.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NetworkConfig {
    #[serde(default)]
    pub url: Option<Url>,
    #[serde(default)]
    pub accounts: Option<Accounts>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub confirmations: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Accounts {
    /// Accounts managed by the node, listed with `eth_accounts`
    Remote(RemoteAccounts),
    Keys(Vec<PrivateKey>),
    Mnemonic(MnemonicConfig),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteAccounts {
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MnemonicConfig {
    pub mnemonic: String,
    #[serde(default = "default_derivation_path")]
    pub path: String,
    #[serde(default)]
    pub initial_index: u32,
    #[serde(default = "default_account_count")]
    pub count: u32,
}

fn default_derivation_path() -> String {
    DEFAULT_DERIVATION_PATH.to_string()
}

fn default_account_count() -> u32 {
    DEFAULT_ACCOUNT_COUNT
}

impl MnemonicConfig {
    pub fn dev() -> Self {
        Self {
            mnemonic: DEV_MNEMONIC.to_string(),
            path: default_derivation_path(),
            initial_index: 0,
            count: DEFAULT_ACCOUNT_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_sources")]
    pub sources: PathBuf,
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_sources() -> PathBuf {
    PathBuf::from("contracts")
}

fn default_artifacts() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            sources: default_sources(),
            artifacts: default_artifacts(),
        }
    }
}

impl PathsConfig {
    pub fn sources_dir(&self) -> PathBuf {
        self.root.join(&self.sources)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join(&self.artifacts)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solidity: SolidityConfig::Version(CompilerVersion::new("0.8.4")),
            default_network: NetworkName::new("ropsten"),
            networks: maplit::hashmap! {
                NetworkName::new(LOCAL_NETWORK) => NetworkConfig {
                    url: Url::parse(LOCAL_NODE_URL).ok(),
                    accounts: Some(Accounts::Mnemonic(MnemonicConfig::dev())),
                    chain_id: None,
                    confirmations: None,
                },
                NetworkName::new("ropsten") => NetworkConfig::default(),
            },
            paths: PathsConfig::default(),
        }
    }
}

/// Values from the command line or the environment, used where the config
/// leaves a gap
#[derive(Debug, Clone, Default)]
pub struct NetworkOverrides {
    pub rpc_url: Option<Url>,
    /// Kept raw so commands and networks that never sign ignore a bad value
    pub private_key: Option<String>,
}

impl NetworkOverrides {
    /// A blank key, e.g. from a template `.env`, counts as unset
    fn private_key(&self) -> eyre::Result<Option<PrivateKey>> {
        self.private_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| key.parse::<PrivateKey>().context("Invalid PRIVATE_KEY"))
            .transpose()
    }
}

impl Config {
    /// Reads `path` if given, then `deployer.yml` if it exists, otherwise
    /// falls back to the defaults
    pub async fn load(path: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = path {
            info!("Using config at {}", path.display());
            return serde_utils::read_deserialize(path).await;
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);

        if default_path.exists() {
            info!("Using config at {}", default_path.display());
            return serde_utils::read_deserialize(default_path).await;
        }

        info!("No {DEFAULT_CONFIG_PATH} found, using the default config");

        Ok(Self::default())
    }

    pub fn resolve_network(
        &self,
        selected: Option<&NetworkName>,
        overrides: &NetworkOverrides,
    ) -> eyre::Result<Network> {
        let name = selected.unwrap_or(&self.default_network).clone();

        let network_config = self.networks.get(&name).with_context(|| {
            let mut known: Vec<_> =
                self.networks.keys().map(|name| name.to_string()).collect();
            known.sort();

            format!(
                "Network {name} is not defined in the config, known networks: {}",
                known.join(", ")
            )
        })?;

        let url = network_config
            .url
            .clone()
            .or_else(|| overrides.rpc_url.clone())
            .with_context(|| {
                format!("No RPC url configured for network {name}, set API_URL or the network's `url`")
            })?;

        let accounts = match &network_config.accounts {
            Some(accounts) => accounts.clone(),
            None => match overrides.private_key()? {
                Some(private_key) => Accounts::Keys(vec![private_key]),
                None => Accounts::Remote(RemoteAccounts::Remote),
            },
        };

        Ok(Network {
            name,
            url,
            accounts,
            chain_id: network_config.chain_id,
            confirmations: network_config.confirmations.unwrap_or(1),
        })
    }
}
