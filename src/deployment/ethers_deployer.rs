use std::sync::Arc;

use async_trait::async_trait;
use ethers::contract::ContractFactory;
use ethers::providers::{Middleware, PendingTransaction};
use eyre::{bail, Context, ContextCompat};
use tracing::info;

use super::{Deployer, SubmittedDeployment};
use crate::artifacts::{ArtifactStore, ContractArtifact, ContractSpec};
use crate::report::ContractDeployment;

/// Deploys through an ethers middleware stack, reading artifacts from disk
pub struct EthersDeployer<M> {
    artifacts: ArtifactStore,
    signer: Arc<M>,
    confirmations: usize,
}

impl<M: Middleware + 'static> EthersDeployer<M> {
    pub fn new(artifacts: ArtifactStore, signer: Arc<M>) -> Self {
        Self {
            artifacts,
            signer,
            confirmations: 1,
        }
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }
}

#[async_trait]
impl<M: Middleware + 'static> Deployer for EthersDeployer<M> {
    async fn load_artifact(
        &self,
        contract: &ContractSpec,
    ) -> eyre::Result<ContractArtifact> {
        self.artifacts.load(contract).await
    }

    async fn submit(
        &self,
        artifact: &ContractArtifact,
    ) -> eyre::Result<SubmittedDeployment> {
        let deployer = self
            .signer
            .default_sender()
            .context("No account to deploy from")?;

        let factory = ContractFactory::new(
            artifact.abi.clone(),
            artifact.bytecode.clone(),
            self.signer.clone(),
        );

        let deployment = factory
            .deploy(())
            .with_context(|| format!("Building deployment of {}", artifact.name))?;

        let pending = self
            .signer
            .send_transaction(deployment.tx, None)
            .await
            .context("Send transaction")?;

        let transaction_hash = pending.tx_hash();

        info!(?transaction_hash, "Sent deployment transaction");

        Ok(SubmittedDeployment {
            contract: artifact.name.clone(),
            transaction_hash,
            deployer,
        })
    }

    async fn wait_for_deployment(
        &self,
        submitted: &SubmittedDeployment,
    ) -> eyre::Result<ContractDeployment> {
        let receipt =
            PendingTransaction::new(submitted.transaction_hash, self.signer.provider())
                .confirmations(self.confirmations)
                .await
                .context("Awaiting receipt")?
                .with_context(|| {
                    format!(
                        "Deployment transaction {:?} was dropped",
                        submitted.transaction_hash
                    )
                })?;

        if receipt.status != Some(1.into()) {
            bail!(
                "Deployment transaction {:?} reverted",
                submitted.transaction_hash
            );
        }

        let address = receipt
            .contract_address
            .context("Receipt is missing the contract address")?;

        Ok(ContractDeployment {
            contract: submitted.contract.clone(),
            address,
            transaction_hash: receipt.transaction_hash,
            deployer: receipt.from,
            block_number: receipt.block_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::path::PathBuf;
    use std::time::Duration;

    use ethers::abi::Abi;
    use ethers::providers::{MockProvider, Provider};
    use ethers::types::{
        Address, Block, Bytes, FeeHistory, Transaction, TransactionReceipt, TxHash, H256,
        U256,
    };
    use hex_literal::hex;

    use super::*;
    use crate::artifacts::ArtifactFormat;

    const DEPLOYER: [u8; 20] = hex!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const DEPLOYED: [u8; 20] = hex!("5fbdb2315678afecb367f032d93f642f64180aa3");

    fn mocked_deployer() -> (EthersDeployer<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        let provider = provider
            .interval(Duration::from_millis(1))
            .with_sender(Address::from(DEPLOYER));

        let deployer = EthersDeployer::new(
            ArtifactStore::new(PathBuf::from("artifacts")),
            Arc::new(provider),
        );

        (deployer, mock)
    }

    fn artifact() -> ContractArtifact {
        ContractArtifact {
            name: "Trigger".to_string(),
            path: PathBuf::from("artifacts/Trigger.sol/Trigger.json"),
            format: ArtifactFormat::Hardhat,
            abi: Abi::default(),
            bytecode: Bytes::from(vec![0x60, 0x80, 0x60, 0x40]),
        }
    }

    fn submitted() -> SubmittedDeployment {
        SubmittedDeployment {
            contract: "Trigger".to_string(),
            transaction_hash: H256::repeat_byte(0x11),
            deployer: Address::from(DEPLOYER),
        }
    }

    fn mined_transaction() -> Transaction {
        Transaction {
            hash: H256::repeat_byte(0x11),
            block_number: Some(7.into()),
            ..Default::default()
        }
    }

    fn receipt(status: u64, contract_address: Option<Address>) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: H256::repeat_byte(0x11),
            from: Address::from(DEPLOYER),
            block_number: Some(7.into()),
            status: Some(status.into()),
            contract_address,
            ..Default::default()
        }
    }

    /// Responses are served last-in first-out, so the receipt goes in before
    /// the transaction lookup that precedes it
    fn push_mined(mock: &MockProvider, receipt: TransactionReceipt) -> eyre::Result<()> {
        mock.push(receipt)?;
        mock.push(mined_transaction())?;

        Ok(())
    }

    async fn bounded<T>(fut: impl Future<Output = T>) -> eyre::Result<T> {
        tokio::time::timeout(Duration::from_secs(10), fut)
            .await
            .context("Polling the mocked node timed out")
    }

    #[tokio::test]
    async fn submits_deployment_transaction() -> eyre::Result<()> {
        let (deployer, mock) = mocked_deployer();

        // Requested in reverse: fees, gas estimate, then the send itself
        mock.push(H256::repeat_byte(0x11))?;
        mock.push(U256::from(100_000))?;
        mock.push(FeeHistory {
            base_fee_per_gas: vec![U256::from(7)],
            gas_used_ratio: vec![0.5],
            oldest_block: U256::from(1),
            reward: vec![],
        })?;
        mock.push(Block::<TxHash> {
            base_fee_per_gas: Some(U256::from(7)),
            ..Default::default()
        })?;

        let sent = bounded(deployer.submit(&artifact())).await??;

        assert_eq!(sent, submitted());

        Ok(())
    }

    #[tokio::test]
    async fn failed_send_is_reported() -> eyre::Result<()> {
        let (deployer, _mock) = mocked_deployer();

        let err = bounded(deployer.submit(&artifact())).await?.unwrap_err();

        assert!(err.to_string().contains("Send transaction"));

        Ok(())
    }

    #[tokio::test]
    async fn waits_for_receipt() -> eyre::Result<()> {
        let (deployer, mock) = mocked_deployer();
        push_mined(&mock, receipt(1, Some(Address::from(DEPLOYED))))?;

        let deployment = bounded(deployer.wait_for_deployment(&submitted())).await??;

        assert_eq!(
            deployment,
            ContractDeployment {
                contract: "Trigger".to_string(),
                address: Address::from(DEPLOYED),
                transaction_hash: H256::repeat_byte(0x11),
                deployer: Address::from(DEPLOYER),
                block_number: Some(7.into()),
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn reverted_deployment_fails() -> eyre::Result<()> {
        let (deployer, mock) = mocked_deployer();
        push_mined(&mock, receipt(0, Some(Address::from(DEPLOYED))))?;

        let err = bounded(deployer.wait_for_deployment(&submitted()))
            .await?
            .unwrap_err();

        assert!(err.to_string().contains("reverted"));

        Ok(())
    }

    #[tokio::test]
    async fn receipt_without_contract_address_fails() -> eyre::Result<()> {
        let (deployer, mock) = mocked_deployer();
        push_mined(&mock, receipt(1, None))?;

        let err = bounded(deployer.wait_for_deployment(&submitted()))
            .await?
            .unwrap_err();

        assert!(err.to_string().contains("missing the contract address"));

        Ok(())
    }

    #[tokio::test]
    async fn dropped_transaction_fails() -> eyre::Result<()> {
        let (deployer, mock) = mocked_deployer();

        // The initial lookup plus every retry finds nothing
        for _ in 0..4 {
            mock.push(Option::<Transaction>::None)?;
        }

        let err = bounded(deployer.wait_for_deployment(&submitted()))
            .await?
            .unwrap_err();

        assert!(err.to_string().contains("was dropped"));

        Ok(())
    }
}
