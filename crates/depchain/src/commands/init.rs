//! Implementation of the `init` command.
//!
//! Creates the `.depchain/` directory with a default configuration, an
//! empty snapshot file and a `.gitignore`.

use crate::config::{DepchainConfig, CONFIG_FILE_NAME, DEPCHAIN_DIR_NAME, SNAPSHOT_FILE_NAME};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .depchain
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the depchain root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created depchain directory
    pub depchain_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created snapshot file
    pub snapshot_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
}

/// Initialize a new depchain repository in `base_dir`.
///
/// # Errors
///
/// Returns an error if `.depchain/` already exists or a file operation fails.
pub async fn init(base_dir: &Path) -> Result<InitResult> {
    let depchain_dir = base_dir.join(DEPCHAIN_DIR_NAME);

    if depchain_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(DEPCHAIN_DIR_NAME.to_string()).into());
    }

    fs::create_dir_all(&depchain_dir).await?;

    let config_file = depchain_dir.join(CONFIG_FILE_NAME);
    DepchainConfig::default().save(&config_file).await?;

    let snapshot_file = depchain_dir.join(SNAPSHOT_FILE_NAME);
    fs::write(&snapshot_file, "").await?;

    let gitignore_file = depchain_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = "\
# Temporary files left behind by interrupted snapshot writes
*.tmp
";
    fs::write(&gitignore_file, gitignore_content).await?;

    Ok(InitResult {
        depchain_dir,
        config_file,
        snapshot_file,
        gitignore_file,
    })
}

/// Check if a directory has been initialized with depchain.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(DEPCHAIN_DIR_NAME).exists()
}

/// Find the depchain root directory by searching up the directory tree.
///
/// Returns the directory containing `.depchain/`, or `None` if none is found
/// before the filesystem root or [`MAX_TRAVERSAL_DEPTH`].
pub fn find_depchain_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(DEPCHAIN_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
