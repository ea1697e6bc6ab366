use serde::{Deserialize, Serialize};

use crate::types::NetworkName;

pub mod contract_deployment;

pub use self::contract_deployment::ContractDeployment;

/// Record of a single deployment, written when `--report` is given
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub network: NetworkName,
    pub chain_id: u64,
    #[serde(flatten)]
    pub deployment: ContractDeployment,
}
