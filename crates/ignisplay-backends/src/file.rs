use async_trait::async_trait;
use ignisplay_models::PersistedData;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use crate::error::BackendError;
use crate::traits::LocalBackend;

/// Longest file stem before switching to a hashed name (file systems cap names at 255 bytes)
const MAX_STEM_LEN: usize = 200;

/// Local backend writing one pretty-printed JSON file per identity key.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Keys contain `:` and arbitrary uids, so anything outside
    /// `[A-Za-z0-9-]` is hex-escaped to keep file names unique and portable.
    /// Names that would grow past `MAX_STEM_LEN` keep a readable prefix and
    /// end in the SHA-256 of the key instead.
    pub fn path_for_key(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("_{:02x}", byte));
            }
        }
        if name.len() > MAX_STEM_LEN {
            let digest = Sha256::digest(key.as_bytes());
            name.truncate(MAX_STEM_LEN - 65);
            name.push('_');
            name.push_str(&format!("{:x}", digest));
        }
        name.push_str(".json");
        self.dir.join(name)
    }
}

#[async_trait]
impl LocalBackend for JsonFileBackend {
    fn backend_name(&self) -> &str {
        "json-file"
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedData>, BackendError> {
        let path = self.path_for_key(key);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store miss: {} (file does not exist)", key);
                return Ok(None);
            }
            Err(e) => return Err(BackendError::Io(e)),
        };

        match serde_json::from_str::<PersistedData>(&content) {
            Ok(data) => {
                info!(
                    "Store hit: {} (loaded {} history, {} saved)",
                    key,
                    data.history.len(),
                    data.my_list.len()
                );
                Ok(Some(data))
            }
            Err(e) => {
                warn!(
                    "Store corruption detected for {}: {}. Deleting corrupted file.",
                    key, e
                );
                if let Err(rm_err) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to delete corrupted store file: {}", rm_err);
                }
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, data: &PersistedData) -> Result<(), BackendError> {
        let path = self.path_for_key(key);
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_string_pretty(data)?;

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!(
            "Store saved: {} ({} history, {} saved)",
            key,
            data.history.len(),
            data.my_list.len()
        );
        Ok(())
    }
}
