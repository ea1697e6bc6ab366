use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ethers::abi::Abi;
use ethers::types::Bytes;
use eyre::Context;
use serde::Deserialize;
use strum::Display;
use tracing::{info, instrument};
use walkdir::WalkDir;

use crate::serde_utils;

const BUILD_INFO_DIR: &str = "build-info";

/// Identifies a contract either by its bare name or by `source/path.sol:Name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub path: Option<PathBuf>,
    pub name: String,
}

impl ContractSpec {
    pub fn path_name(path: PathBuf, name: impl ToString) -> Self {
        Self {
            path: Some(path),
            name: name.to_string(),
        }
    }

    pub fn name(name: impl ToString) -> Self {
        Self {
            path: None,
            name: name.to_string(),
        }
    }

    fn artifact_file_name(&self) -> String {
        format!("{}.json", self.name)
    }
}

impl fmt::Display for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = self.path.as_deref() {
            write!(f, "{}:{}", path.display(), self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl FromStr for ContractSpec {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let spec = match s.rsplit_once(':') {
            Some((path, name)) => {
                if path.is_empty() {
                    eyre::bail!("Missing source path in {s:?}");
                }

                Self::path_name(PathBuf::from(path), name)
            }
            None => Self::name(s),
        };

        if spec.name.is_empty() {
            eyre::bail!("Missing contract name in {s:?}");
        }

        Ok(spec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactFormat {
    Hardhat,
    Forge,
}

/// Everything needed to build a contract factory
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub path: PathBuf,
    pub format: ArtifactFormat,
    pub abi: Abi,
    pub bytecode: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    #[serde(default)]
    contract_name: Option<String>,
    abi: Abi,
    bytecode: RawBytecode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl RawBytecode {
    fn format(&self) -> ArtifactFormat {
        match self {
            RawBytecode::Hex(_) => ArtifactFormat::Hardhat,
            RawBytecode::Object { .. } => ArtifactFormat::Forge,
        }
    }

    fn hex(&self) -> &str {
        match self {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        }
    }
}

/// Looks up build artifacts in either the hardhat or the forge output layout
///
/// hardhat: `<root>/contracts/Trigger.sol/Trigger.json`
/// forge:   `<root>/Trigger.sol/Trigger.json`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn find(&self, spec: &ContractSpec) -> eyre::Result<PathBuf> {
        if !self.root.is_dir() {
            eyre::bail!(
                "Artifacts directory {} does not exist, compile the contracts first",
                self.root.display()
            );
        }

        let candidates = match spec.path.as_deref() {
            Some(source) => self.qualified_candidates(source, spec),
            None => {
                let root = self.root.clone();
                let file_name = spec.artifact_file_name();

                tokio::task::spawn_blocking(move || {
                    search_artifacts(&root, &file_name)
                })
                .await??
            }
        };

        match candidates.as_slice() {
            [] => eyre::bail!(
                "Artifact for {spec} not found in {}",
                self.root.display()
            ),
            [path] => Ok(path.clone()),
            _ => {
                let found = candidates
                    .iter()
                    .map(|path| format!("  {}", path.display()))
                    .collect::<Vec<_>>()
                    .join("\n");

                eyre::bail!(
                    "Multiple artifacts found for {spec}, use a fully qualified name like `path/to/File.sol:{}`:\n{found}",
                    spec.name
                )
            }
        }
    }

    pub async fn load(&self, spec: &ContractSpec) -> eyre::Result<ContractArtifact> {
        let path = self.find(spec).await?;

        let artifact = load_artifact(&path, &spec.name).await?;

        info!(
            path = %artifact.path.display(),
            format = %artifact.format,
            "Loaded artifact for {spec}"
        );

        Ok(artifact)
    }

    fn qualified_candidates(
        &self,
        source: &Path,
        spec: &ContractSpec,
    ) -> Vec<PathBuf> {
        let file_name = spec.artifact_file_name();

        let mut candidates = vec![self.root.join(source).join(&file_name)];

        if let Some(source_file) = source.file_name() {
            candidates.push(self.root.join(source_file).join(&file_name));
        }

        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .into_iter()
            .collect()
    }
}

fn search_artifacts(root: &Path, file_name: &str) -> eyre::Result<Vec<PathBuf>> {
    let mut found = vec![];

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != BUILD_INFO_DIR);

    for entry in walker {
        let entry = entry.with_context(|| {
            format!("Searching artifacts in {}", root.display())
        })?;

        if entry.file_type().is_file() && entry.file_name() == file_name {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

pub async fn load_artifact(
    path: impl AsRef<Path>,
    name: &str,
) -> eyre::Result<ContractArtifact> {
    let path = path.as_ref();

    let raw: RawArtifact = serde_utils::read_deserialize_json(path).await?;

    if let Some(contract_name) = raw.contract_name.as_deref() {
        if contract_name != name {
            eyre::bail!(
                "Artifact {} is for {contract_name}, expected {name}",
                path.display()
            );
        }
    }

    let bytecode_hex = raw.bytecode.hex().trim().trim_start_matches("0x");

    if bytecode_hex.is_empty() {
        eyre::bail!(
            "{name} has no bytecode, abstract contracts and interfaces can't be deployed"
        );
    }

    if bytecode_hex.contains("__") {
        eyre::bail!("{name} has unlinked library references");
    }

    let bytecode = hex::decode(bytecode_hex)
        .with_context(|| format!("Decoding bytecode of {}", path.display()))?;

    Ok(ContractArtifact {
        name: name.to_string(),
        path: path.to_owned(),
        format: raw.bytecode.format(),
        abi: raw.abi,
        bytecode: Bytes::from(bytecode),
    })
}
