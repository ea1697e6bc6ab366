use std::path::{Path, PathBuf};

use eyre::Context;
use tracing::{info, instrument};

use crate::config::Config;
use crate::types::CompilerVersion;

#[derive(Debug, Default)]
pub struct ForgeBuild {
    cwd: Option<PathBuf>,
    compiler_version: Option<CompilerVersion>,
    contracts: Option<PathBuf>,
    out: Option<PathBuf>,
    optimize: bool,
    optimizer_runs: Option<u32>,
}

impl ForgeBuild {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `paths.sources` into `paths.artifacts` with the configured solc
    pub fn from_config(config: &Config) -> Self {
        let mut forge_build = Self::new()
            .with_cwd(&config.paths.root)
            .with_compiler_version(config.solidity.version().clone())
            .with_contracts(&config.paths.sources)
            .with_out(&config.paths.artifacts);

        if let Some(optimizer) = config.solidity.optimizer() {
            if optimizer.enabled {
                forge_build = forge_build.with_optimizer(optimizer.runs);
            }
        }

        forge_build
    }

    pub fn with_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_owned());
        self
    }

    pub fn with_compiler_version(
        mut self,
        compiler_version: CompilerVersion,
    ) -> Self {
        self.compiler_version = Some(compiler_version);
        self
    }

    pub fn with_contracts(mut self, contracts: impl AsRef<Path>) -> Self {
        self.contracts = Some(contracts.as_ref().to_owned());
        self
    }

    pub fn with_out(mut self, out: impl AsRef<Path>) -> Self {
        self.out = Some(out.as_ref().to_owned());
        self
    }

    pub fn with_optimizer(mut self, runs: Option<u32>) -> Self {
        self.optimize = true;
        self.optimizer_runs = runs;
        self
    }

    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("forge");
        cmd.arg("build");

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(compiler_version) = &self.compiler_version {
            cmd.arg("--use");
            cmd.arg(compiler_version.as_str());
        }

        if let Some(contracts) = &self.contracts {
            cmd.arg("--contracts");
            cmd.arg(contracts);
        }

        if let Some(out) = &self.out {
            cmd.arg("--out");
            cmd.arg(out);
        }

        if self.optimize {
            cmd.arg("--optimize");

            if let Some(runs) = self.optimizer_runs {
                cmd.arg("--optimizer-runs");
                cmd.arg(runs.to_string());
            }
        }

        cmd
    }

    #[instrument(name = "forge_build", skip_all)]
    pub async fn run(&self) -> eyre::Result<()> {
        let mut cmd = self.command();

        info!("Compiling contracts with {cmd:#?}");

        let output = cmd
            .output()
            .await
            .context("Running forge, is foundry installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            eyre::bail!("forge build failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        info!("{}", stdout.trim());

        Ok(())
    }
}
