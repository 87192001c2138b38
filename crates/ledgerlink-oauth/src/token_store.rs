//! Snapshot persistence for callers that keep a session across runs.
//!
//! The session itself never touches storage. A caller loads a snapshot,
//! hands it to [`crate::TokenSession::restore`], and saves
//! [`crate::TokenSession::snapshot`] when it is done.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{OAuthError, Result};
use crate::session::SessionSnapshot;

/// Default token file name within the ledgerlink config directory.
pub const TOKEN_FILE: &str = "session.json";

// ============================================================================
// TokenStore Trait
// ============================================================================

/// Storage for session snapshots.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    /// Check if a snapshot exists.
    fn exists(&self) -> bool;

    /// Load the stored snapshot, if any.
    async fn load(&self) -> Result<Option<SessionSnapshot>>;

    /// Save a snapshot, replacing the previous one.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Delete the stored snapshot.
    async fn delete(&self) -> Result<()>;
}

// ============================================================================
// FileTokenStore
// ============================================================================

/// JSON file store. The file is written owner-readable only on unix.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<SessionSnapshot>>,
}

impl FileTokenStore {
    /// Store `TOKEN_FILE` inside `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join(TOKEN_FILE))
    }

    /// Store at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    /// Get the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        {
            let cache = self.cached.read().await;
            if cache.is_some() {
                return Ok(cache.clone());
            }
        }

        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| OAuthError::Storage(format!("Failed to read token file: {}", e)))?;

        let snapshot: SessionSnapshot = serde_json::from_str(&content)
            .map_err(|e| OAuthError::Serialization(format!("Failed to parse token file: {}", e)))?;

        let mut cache = self.cached.write().await;
        *cache = Some(snapshot.clone());

        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OAuthError::Storage(format!("Failed to create token directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(|e| {
            OAuthError::Serialization(format!("Failed to serialize session: {}", e))
        })?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| OAuthError::Storage(format!("Failed to open token file: {}", e)))?;

        // The mode above only applies to new files.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| OAuthError::Storage(format!("Failed to restrict token file: {}", e)))?;
        }

        file.write_all(json.as_bytes())
            .map_err(|e| OAuthError::Storage(format!("Failed to write token file: {}", e)))?;

        let mut cache = self.cached.write().await;
        *cache = Some(snapshot.clone());

        tracing::debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| OAuthError::Storage(format!("Failed to delete token file: {}", e)))?;
        }
        let mut cache = self.cached.write().await;
        *cache = None;
        Ok(())
    }
}

// ============================================================================
// MemoryTokenStore (for testing)
// ============================================================================

/// In-memory store for testing.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    snapshot: RwLock<Option<SessionSnapshot>>,
    save_count: AtomicU32,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    fn exists(&self) -> bool {
        self.snapshot
            .try_read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let mut stored = self.snapshot.write().await;
        *stored = Some(snapshot.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let mut stored = self.snapshot.write().await;
        *stored = None;
        Ok(())
    }
}

// ============================================================================
// Shared Token Store
// ============================================================================

/// Shared token store for use across async contexts.
pub type SharedTokenStore = Arc<dyn TokenStore>;
