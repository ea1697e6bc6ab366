use std::sync::Arc;

use ethers::prelude::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::coins_bip39::English;
use ethers::signers::{LocalWallet, MnemonicBuilder, Signer};
use ethers::types::Address;
use eyre::{Context, ContextCompat};
use tracing::{info, instrument};
use url::Url;

use crate::cli::PrivateKey;
use crate::config::{Accounts, MnemonicConfig};
use crate::types::NetworkName;

// TODO: Allow for different wallet kinds, e.g. hardware wallets
pub type RpcSigner = SignerMiddleware<Provider<Http>, LocalWallet>;

/// A network from the config with every gap filled in
#[derive(Debug, Clone)]
pub struct Network {
    pub name: NetworkName,
    pub url: Url,
    pub accounts: Accounts,
    pub chain_id: Option<u64>,
    pub confirmations: usize,
}

impl Network {
    pub fn provider(&self) -> eyre::Result<Provider<Http>> {
        let provider = Provider::<Http>::try_from(self.url.as_str())
            .with_context(|| format!("Invalid RPC url for network {}", self.name))?;

        Ok(provider)
    }

    pub fn local_wallets(&self) -> eyre::Result<Vec<LocalWallet>> {
        match &self.accounts {
            Accounts::Remote(_) => Ok(vec![]),
            Accounts::Keys(keys) => Ok(keys.iter().map(PrivateKey::wallet).collect()),
            Accounts::Mnemonic(mnemonic) => derive_wallets(mnemonic),
        }
    }

    /// Connects to the node and wraps the first local account in a signer
    #[instrument(skip_all, fields(network = %self.name))]
    pub async fn connect(&self) -> eyre::Result<Arc<RpcSigner>> {
        let provider = self.provider()?;

        let chain_id = provider
            .get_chainid()
            .await
            .with_context(|| format!("Fetching chain id from {}", self.name))?
            .as_u64();

        if let Some(expected) = self.chain_id {
            if expected != chain_id {
                eyre::bail!(
                    "Network {} is configured with chain id {expected} but the node reports {chain_id}",
                    self.name
                );
            }
        }

        let wallet = self
            .local_wallets()?
            .into_iter()
            .next()
            .with_context(|| {
                format!(
                    "Network {} has no local account to sign with, set PRIVATE_KEY or configure `accounts`",
                    self.name
                )
            })?
            .with_chain_id(chain_id);

        info!(chain_id, deployer = ?wallet.address(), "Connected");

        Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
    }

    /// Local accounts are derived offline, remote ones are queried from the node
    pub async fn account_addresses(&self) -> eyre::Result<Vec<Address>> {
        match &self.accounts {
            Accounts::Remote(_) => {
                let accounts = self
                    .provider()?
                    .get_accounts()
                    .await
                    .with_context(|| format!("Listing accounts of {}", self.name))?;

                Ok(accounts)
            }
            _ => Ok(self
                .local_wallets()?
                .iter()
                .map(|wallet| wallet.address())
                .collect()),
        }
    }
}

fn derive_wallets(config: &MnemonicConfig) -> eyre::Result<Vec<LocalWallet>> {
    if config.count > 0 && config.initial_index.checked_add(config.count - 1).is_none() {
        eyre::bail!(
            "Account index overflows, initial_index {} with count {}",
            config.initial_index,
            config.count
        );
    }

    (0..config.count)
        .map(|offset| -> eyre::Result<LocalWallet> {
            let index = config.initial_index + offset;

            let wallet = MnemonicBuilder::<English>::default()
                .phrase(config.mnemonic.as_str())
                .derivation_path(&format!("{}{index}", config.path))?
                .build()
                .with_context(|| format!("Deriving account #{index}"))?;

            Ok(wallet)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::config::RemoteAccounts;

    fn network(accounts: Accounts) -> eyre::Result<Network> {
        Ok(Network {
            name: NetworkName::new("test"),
            url: Url::parse("http://127.0.0.1:8545")?,
            accounts,
            chain_id: None,
            confirmations: 1,
        })
    }

    #[test]
    fn derives_dev_accounts() -> eyre::Result<()> {
        let network = network(Accounts::Mnemonic(MnemonicConfig {
            count: 2,
            ..MnemonicConfig::dev()
        }))?;

        let addresses: Vec<_> = network
            .local_wallets()?
            .iter()
            .map(|wallet| wallet.address())
            .collect();

        assert_eq!(
            addresses,
            vec![
                Address::from(hex!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266")),
                Address::from(hex!("70997970c51812dc3a010c7d01b50e0d17dc79c8")),
            ]
        );

        Ok(())
    }

    #[test]
    fn respects_initial_index() -> eyre::Result<()> {
        let network = network(Accounts::Mnemonic(MnemonicConfig {
            initial_index: 1,
            count: 1,
            ..MnemonicConfig::dev()
        }))?;

        let wallets = network.local_wallets()?;

        assert_eq!(wallets.len(), 1);
        assert_eq!(
            wallets[0].address(),
            Address::from(hex!("70997970c51812dc3a010c7d01b50e0d17dc79c8"))
        );

        Ok(())
    }

    #[test]
    fn rejects_overflowing_account_index() -> eyre::Result<()> {
        let network = network(Accounts::Mnemonic(MnemonicConfig {
            initial_index: u32::MAX,
            count: 2,
            ..MnemonicConfig::dev()
        }))?;

        let err = network.local_wallets().unwrap_err();

        assert!(err.to_string().contains("Account index overflows"));

        Ok(())
    }

    #[tokio::test]
    async fn lists_key_accounts_without_a_node() -> eyre::Result<()> {
        let key: PrivateKey =
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .parse()?;
        let network = network(Accounts::Keys(vec![key]))?;

        let addresses = network.account_addresses().await?;

        assert_eq!(
            addresses,
            vec![Address::from(hex!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"))]
        );

        Ok(())
    }

    #[test]
    fn remote_accounts_have_no_local_wallets() -> eyre::Result<()> {
        let network = network(Accounts::Remote(RemoteAccounts::Remote))?;

        assert!(network.local_wallets()?.is_empty());

        Ok(())
    }
}
