//! Application context for CLI command execution.
//!
//! # Example
//!
//! ```no_run
//! use depchain::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let projects = app.engine().storage().project_ids().await?;
//!     println!("{} projects", projects.len());
//!     Ok(())
//! }
//! ```

use crate::commands::init::find_depchain_root;
use crate::config::{DepchainConfig, CONFIG_FILE_NAME, DEPCHAIN_DIR_NAME};
use crate::engine::Engine;
use crate::error::{ConfigError, Result};
use crate::storage::create_storage;
use std::path::{Path, PathBuf};

/// Application context for CLI operations.
///
/// Finds the repository, loads its configuration and opens storage. The
/// snapshot is read once on creation; call [`App::save`] after writes.
pub struct App {
    engine: Engine,

    /// Path to the depchain directory (.depchain)
    depchain_dir: PathBuf,

    config: DepchainConfig,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("depchain_dir", &self.depchain_dir)
            .field("config", &self.config)
            .field("storage", &"<dyn DependencyStorage>")
            .finish()
    }
}

impl App {
    /// Create an App by searching upward from `working_dir` for `.depchain/`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No depchain repository is found in the directory tree
    /// - Configuration cannot be loaded or is out of range
    /// - Storage initialization fails
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_depchain_root(working_dir).ok_or(ConfigError::NotInitialized)?;

        let depchain_dir = root_dir.join(DEPCHAIN_DIR_NAME);
        let config = DepchainConfig::load(&depchain_dir.join(CONFIG_FILE_NAME)).await?;

        let backend = config.storage.to_backend(&root_dir)?;
        let storage = create_storage(backend).await?;
        let engine = Engine::new(storage, config.engine)?;

        Ok(Self {
            engine,
            depchain_dir,
            config,
        })
    }

    /// The graph engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Loaded configuration
    pub fn config(&self) -> &DepchainConfig {
        &self.config
    }

    /// Path to the `.depchain/` directory
    pub fn depchain_dir(&self) -> &Path {
        &self.depchain_dir
    }

    /// Persist storage state.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot can't be written.
    pub async fn save(&self) -> Result<()> {
        self.engine.storage().save().await
    }
}
