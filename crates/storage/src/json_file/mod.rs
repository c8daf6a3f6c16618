//! Single JSON document store.
//!
//! The whole database is one file holding `{ "users": [ ... ] }`. Every
//! mutation re-reads the file, edits the parsed document, and replaces the
//! file atomically (write to a sibling temp file, fsync, rename). A process
//! wide mutex serializes mutations so concurrent calls never interleave
//! their read-modify-write cycles.

mod document;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use wall_core::model::{ProtocolId, TrackedProtocol, UserId};

use crate::repository::{ProtocolEdit, Storage, StorageError, WallRepository};
use document::{ProtocolDocument, WallDocument};

#[derive(Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileRepository {
    /// Open the document at `path`, creating an empty one if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file or its directory cannot be
    /// created, and `StorageError::Serialization` if an existing file is not a
    /// valid document.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let repo = Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        };

        if tokio::fs::try_exists(&repo.path).await.map_err(io_err)? {
            // Fail early on a corrupt file instead of on first use.
            repo.read_document().await?;
        } else {
            if let Some(parent) = repo.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
            repo.write_document(&WallDocument::default()).await?;
            tracing::info!(path = %repo.path.display(), "created empty wall document");
        }

        Ok(repo)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<WallDocument, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(WallDocument::default());
            }
            Err(e) => return Err(io_err(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(WallDocument::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn write_document(&self, doc: &WallDocument) -> Result<(), StorageError> {
        let bytes =
            serde_json::to_vec_pretty(doc).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await.map_err(io_err)?;
        file.write_all(&bytes).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "wrote wall document");
        Ok(())
    }

    /// Run `f` against the parsed document and persist the result.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut WallDocument) -> Result<T, StorageError> + Send,
    ) -> Result<T, StorageError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_document().await?;
        let out = f(&mut doc)?;
        self.write_document(&doc).await?;
        Ok(out)
    }

    async fn snapshot(&self) -> Result<WallDocument, StorageError> {
        let _guard = self.lock.lock().await;
        self.read_document().await
    }
}

fn io_err(e: std::io::Error) -> StorageError {
    StorageError::Io(e.to_string())
}

#[async_trait]
impl WallRepository for JsonFileRepository {
    async fn list_protocols(&self, user: &UserId) -> Result<Vec<TrackedProtocol>, StorageError> {
        let doc = self.snapshot().await?;
        Ok(doc
            .user(user)
            .map(|u| {
                u.protocols
                    .iter()
                    .filter_map(|p| match p.to_domain() {
                        Ok(protocol) => Some(protocol),
                        Err(e) => {
                            tracing::warn!(user = %user, error = %e, "skipping unreadable protocol");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<Option<TrackedProtocol>, StorageError> {
        let doc = self.snapshot().await?;
        doc.user(user)
            .and_then(|u| u.protocols.iter().find(|p| p.protocol_id == id.as_str()))
            .map(ProtocolDocument::to_domain)
            .transpose()
    }

    async fn insert_protocol(
        &self,
        user: &UserId,
        protocol: &TrackedProtocol,
    ) -> Result<(), StorageError> {
        self.mutate(|doc| {
            let user_doc = doc.user_or_insert(user);
            if user_doc.protocol_mut(protocol.protocol_id()).is_some() {
                return Err(StorageError::Conflict);
            }
            user_doc.protocols.push(ProtocolDocument::from_domain(protocol));
            Ok(())
        })
        .await
    }

    async fn update_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
        edit: ProtocolEdit<'_>,
    ) -> Result<Option<TrackedProtocol>, StorageError> {
        self.mutate(|doc| {
            let Some(slot) = doc.user_mut(user).and_then(|u| u.protocol_mut(id)) else {
                return Ok(None);
            };
            let mut protocol = slot.to_domain()?;
            edit(&mut protocol);
            slot.apply(&protocol);
            Ok(Some(protocol))
        })
        .await
    }

    async fn remove_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<bool, StorageError> {
        self.mutate(|doc| {
            let Some(user_doc) = doc.user_mut(user) else {
                return Ok(false);
            };
            let before = user_doc.protocols.len();
            user_doc.protocols.retain(|p| p.protocol_id != id.as_str());
            Ok(user_doc.protocols.len() < before)
        })
        .await
    }

    async fn purge(&self, user: &UserId) -> Result<usize, StorageError> {
        // The user record itself (account fields) is kept.
        self.mutate(|doc| {
            Ok(doc
                .user_mut(user)
                .map_or(0, |u| std::mem::take(&mut u.protocols).len()))
        })
        .await
    }
}

impl Storage {
    /// Storage backed by a single JSON document at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be created or parsed.
    pub async fn json_file(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let repo = JsonFileRepository::open(path).await?;
        let wall: Arc<dyn WallRepository> = Arc::new(repo);
        Ok(Self { wall })
    }
}
