use ethers::types::{Address, H256, U64};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ContractDeployment {
    pub contract: String,
    pub address: Address,
    pub transaction_hash: H256,
    pub deployer: Address,
    #[serde(default)]
    pub block_number: Option<U64>,
}

impl ContractDeployment {
    pub fn checksummed_address(&self) -> String {
        ethers::utils::to_checksum(&self.address, None)
    }
}
