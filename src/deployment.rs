use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use ethers::signers::Signer;
use ethers::types::{Address, H256};
use eyre::Context;
use tracing::{info, instrument};

use crate::artifacts::{ArtifactStore, ContractArtifact, ContractSpec};
use crate::cli::DeployArgs;
use crate::config::Config;
use crate::forge_utils::ForgeBuild;
use crate::network::Network;
use crate::report::{ContractDeployment, Report};
use crate::serde_utils;

pub mod ethers_deployer;

pub use self::ethers_deployer::EthersDeployer;

/// A deployment transaction that was accepted by the node but not yet mined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedDeployment {
    pub contract: String,
    pub transaction_hash: H256,
    pub deployer: Address,
}

/// The three steps of a deployment, each delegated to the backend
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn load_artifact(
        &self,
        contract: &ContractSpec,
    ) -> eyre::Result<ContractArtifact>;

    async fn submit(
        &self,
        artifact: &ContractArtifact,
    ) -> eyre::Result<SubmittedDeployment>;

    async fn wait_for_deployment(
        &self,
        submitted: &SubmittedDeployment,
    ) -> eyre::Result<ContractDeployment>;
}

/// Looks up the contract, submits it once and waits for it to be mined
///
/// The first failing step aborts the deployment, nothing is retried.
#[instrument(name = "deploy", skip_all, fields(contract = %contract))]
pub async fn deploy_contract<D>(
    deployer: &D,
    contract: &ContractSpec,
) -> eyre::Result<ContractDeployment>
where
    D: Deployer + ?Sized,
{
    let artifact = deployer
        .load_artifact(contract)
        .await
        .with_context(|| format!("Getting contract factory for {contract}"))?;

    let submitted = deployer
        .submit(&artifact)
        .await
        .with_context(|| format!("Submitting deployment of {contract}"))?;

    info!(tx_hash = ?submitted.transaction_hash, "Deployment submitted");

    let deployment = deployer
        .wait_for_deployment(&submitted)
        .await
        .with_context(|| format!("Waiting for {contract} to be deployed"))?;

    info!(address = ?deployment.address, "Deployment confirmed");

    Ok(deployment)
}

pub fn deployment_message(deployment: &ContractDeployment) -> String {
    format!(
        "{} deployed to: {}",
        deployment.contract,
        deployment.checksummed_address()
    )
}

pub async fn run_deployment(
    config: &Config,
    network: &Network,
    args: DeployArgs,
) -> eyre::Result<()> {
    if !args.no_compile {
        ForgeBuild::from_config(config).run().await?;
    }

    let signer = network.connect().await?;
    let chain_id = signer.signer().chain_id();

    let confirmations = args.confirmations.unwrap_or(network.confirmations);

    let deployer = EthersDeployer::new(
        ArtifactStore::new(config.paths.artifacts_dir()),
        signer,
    )
    .with_confirmations(confirmations);

    let deployment = deploy_contract(&deployer, &args.contract).await?;

    let report = Report {
        network: network.name.clone(),
        chain_id,
        deployment,
    };

    publish(report, args.report.as_deref(), &mut std::io::stdout()).await
}

/// Writes the report when a path is given, and only then prints the address
///
/// A report that cannot be written fails the run before anything is printed.
async fn publish(
    report: Report,
    report_path: Option<&Path>,
    out: &mut impl Write,
) -> eyre::Result<()> {
    if let Some(path) = report_path {
        serde_utils::write_serialize(path, &report).await?;

        info!("Report written to {}", path.display());
    }

    writeln!(out, "{}", deployment_message(&report.deployment))?;

    Ok(())
}
