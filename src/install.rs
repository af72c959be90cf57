//! Editable install collaborator

#[cfg(test)]
use mockall::automock;

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::InstallError;

/// Default program used for editable installs
pub const DEFAULT_PIP: &str = "pip";

/// Environment variable overriding the pip program
pub const PIP_ENV: &str = "PIS_PIP";

/// Trait for installing a source checkout in development mode
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, pkg_dir: &Path) -> Result<(), InstallError>;
}

/// Runs `pip install -e <dir>`
#[derive(Debug, Clone)]
pub struct PipInstaller {
    program: String,
}

impl Default for PipInstaller {
    fn default() -> Self {
        Self::new(DEFAULT_PIP.to_string())
    }
}

impl PipInstaller {
    pub fn new(program: String) -> Self {
        Self { program }
    }

    /// Uses `$PIS_PIP` when set, `pip` otherwise
    pub fn from_env() -> Self {
        std::env::var(PIP_ENV)
            .ok()
            .filter(|program| !program.is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Installer for PipInstaller {
    async fn install(&self, pkg_dir: &Path) -> Result<(), InstallError> {
        info!("Installing {} in editable mode", pkg_dir.display());
        debug!("Running {} install -e {}", self.program, pkg_dir.display());

        let status = Command::new(&self.program)
            .arg("install")
            .arg("-e")
            .arg(pkg_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| InstallError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(InstallError::Failed {
                dir: pkg_dir.to_path_buf(),
                status,
            });
        }

        Ok(())
    }
}
