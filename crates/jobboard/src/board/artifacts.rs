//! Resume artifacts: upload validation, addressing, and swappable storage backends.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::domain::{ArtifactAddress, SeekerId};
use super::error::ValidationError;

/// Largest accepted resume: 5 MiB.
pub const MAX_RESUME_BYTES: u64 = 5 * 1024 * 1024;

const DOC_MIME: &str = "application/msword";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Accepted resume encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Doc,
    Docx,
}

impl ResumeFormat {
    /// Match a declared MIME type, ignoring parameters such as `charset`.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let parsed: mime::Mime = declared.trim().parse().ok()?;
        let essence = parsed.essence_str().to_ascii_lowercase();
        if essence == mime::APPLICATION_PDF.essence_str() {
            Some(ResumeFormat::Pdf)
        } else if essence == DOC_MIME {
            Some(ResumeFormat::Doc)
        } else if essence == DOCX_MIME {
            Some(ResumeFormat::Docx)
        } else {
            None
        }
    }

    pub const fn mime(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "application/pdf",
            ResumeFormat::Doc => DOC_MIME,
            ResumeFormat::Docx => DOCX_MIME,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "pdf",
            ResumeFormat::Doc => "doc",
            ResumeFormat::Docx => "docx",
        }
    }
}

/// File submitted by a seeker together with its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub declared_mime: String,
    pub bytes: Vec<u8>,
}

impl ResumeUpload {
    pub fn new(declared_mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            declared_mime: declared_mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Type first, then size; the first failure wins.
    pub fn validate(&self) -> Result<ResumeFormat, ValidationError> {
        let format = ResumeFormat::from_declared(&self.declared_mime).ok_or_else(|| {
            ValidationError::UnsupportedFileType {
                declared: self.declared_mime.clone(),
            }
        })?;

        let size = self.size_bytes();
        if size > MAX_RESUME_BYTES {
            return Err(ValidationError::FileTooLarge {
                size,
                limit: MAX_RESUME_BYTES,
            });
        }

        Ok(format)
    }
}

/// Bytes and MIME type as persisted by an artifact store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub mime: String,
    pub bytes: Vec<u8>,
}

static ARTIFACT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Mint a candidate address under the seeker's resume namespace.
///
/// The sequence restarts with the process, so a minted address may already be
/// occupied. Stores refuse such a `put` with `AddressTaken` and callers mint again.
pub fn mint_address(
    seeker_id: SeekerId,
    format: ResumeFormat,
    now: DateTime<Utc>,
) -> ArtifactAddress {
    let sequence = ARTIFACT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ArtifactAddress(format!(
        "resumes/seeker-{}/{}-{sequence}.{}",
        seeker_id.0,
        now.timestamp_millis(),
        format.extension()
    ))
}

/// Storage backend for resume artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Store a new artifact. An occupied address yields `AddressTaken`.
    fn put(&self, address: &ArtifactAddress, artifact: &StoredArtifact)
        -> Result<(), ArtifactError>;
    fn fetch(&self, address: &ArtifactAddress) -> Result<Option<StoredArtifact>, ArtifactError>;
    /// Remove an artifact; unknown addresses are not an error.
    fn discard(&self, address: &ArtifactAddress) -> Result<(), ArtifactError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact {address} could not be accessed: {source}")]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact {address} is corrupt: {reason}")]
    Corrupt { address: String, reason: String },
    #[error("artifact address '{address}' is not valid for this store")]
    InvalidAddress { address: String },
    #[error("artifact address '{address}' is already taken")]
    AddressTaken { address: String },
    #[error("artifact store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactMeta {
    mime: String,
    size: u64,
}

const META_SUFFIX: &str = ".meta.json";

/// Directory-backed store: one file per artifact plus a JSON sidecar for its MIME type.
///
/// Data files are never overwritten. A data file whose sidecar is missing reads
/// as absent, so an interrupted `put` leaves nothing observable.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an address to a data path. Addresses escaping the root, naming a
    /// sidecar, or touching hidden entries (staging files included) resolve to nothing.
    fn resolve(&self, address: &ArtifactAddress) -> Option<PathBuf> {
        let raw = address.as_str();
        if raw.is_empty() || raw.contains('\\') || raw.ends_with(META_SUFFIX) {
            return None;
        }
        let relative = Path::new(raw);
        let plain = relative.components().all(|component| match component {
            Component::Normal(name) => !name.to_string_lossy().starts_with('.'),
            _ => false,
        });
        plain.then(|| self.root.join(relative))
    }

    fn meta_path(data_path: &Path) -> PathBuf {
        let mut meta = data_path.as_os_str().to_owned();
        meta.push(META_SUFFIX);
        PathBuf::from(meta)
    }

    /// Write bytes to a synced temporary file beside `target`.
    fn stage(target: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let staged = NamedTempFile::new_in(dir)?;
        {
            let mut file = staged.as_file();
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        Ok(staged)
    }

    fn remove_if_present(path: &Path) -> std::io::Result<()> {
        match fs::remove_file(path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

fn io_error(address: &ArtifactAddress) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        address: address.to_string(),
        source,
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(
        &self,
        address: &ArtifactAddress,
        artifact: &StoredArtifact,
    ) -> Result<(), ArtifactError> {
        let path = self
            .resolve(address)
            .ok_or_else(|| ArtifactError::InvalidAddress {
                address: address.to_string(),
            })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(address))?;
        }

        let meta = serde_json::to_vec(&ArtifactMeta {
            mime: artifact.mime.clone(),
            size: artifact.bytes.len() as u64,
        })
        .map_err(|err| ArtifactError::Corrupt {
            address: address.to_string(),
            reason: err.to_string(),
        })?;

        let data = Self::stage(&path, &artifact.bytes).map_err(io_error(address))?;
        match data.persist_noclobber(&path) {
            Ok(_) => {}
            Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ArtifactError::AddressTaken {
                    address: address.to_string(),
                });
            }
            Err(err) => return Err(io_error(address)(err.error)),
        }

        // The sidecar publishes the artifact.
        let meta_path = Self::meta_path(&path);
        let published = Self::stage(&meta_path, &meta)
            .and_then(|staged| staged.persist(&meta_path).map(|_| ()).map_err(|err| err.error));
        if let Err(err) = published {
            if let Err(cleanup) = Self::remove_if_present(&path) {
                warn!(%address, error = %cleanup, "orphaned artifact data left behind");
            }
            return Err(io_error(address)(err));
        }
        debug!(%address, bytes = artifact.bytes.len(), "artifact stored");
        Ok(())
    }

    fn fetch(&self, address: &ArtifactAddress) -> Result<Option<StoredArtifact>, ArtifactError> {
        let Some(path) = self.resolve(address) else {
            return Ok(None);
        };

        match fs::metadata(&path) {
            Ok(found) if found.is_file() => {}
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(address)(err)),
        }
        let raw_meta = match fs::read(Self::meta_path(&path)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(address)(err)),
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(address)(err)),
        };

        let meta: ArtifactMeta =
            serde_json::from_slice(&raw_meta).map_err(|err| ArtifactError::Corrupt {
                address: address.to_string(),
                reason: err.to_string(),
            })?;
        if meta.size != bytes.len() as u64 {
            return Err(ArtifactError::Corrupt {
                address: address.to_string(),
                reason: format!("expected {} bytes, found {}", meta.size, bytes.len()),
            });
        }

        Ok(Some(StoredArtifact {
            mime: meta.mime,
            bytes,
        }))
    }

    fn discard(&self, address: &ArtifactAddress) -> Result<(), ArtifactError> {
        let Some(path) = self.resolve(address) else {
            return Ok(());
        };
        // Sidecar first so a partial discard reads as absent.
        for target in [Self::meta_path(&path), path] {
            Self::remove_if_present(&target).map_err(io_error(address))?;
        }
        Ok(())
    }
}

/// Process-local store used by tests and throwaway demos.
#[derive(Debug, Default, Clone)]
pub struct MemoryArtifactStore {
    artifacts: Arc<Mutex<HashMap<ArtifactAddress, StoredArtifact>>>,
}

impl MemoryArtifactStore {
    pub fn len(&self) -> usize {
        self.artifacts.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ArtifactAddress, StoredArtifact>>, ArtifactError>
    {
        self.artifacts
            .lock()
            .map_err(|_| ArtifactError::Unavailable("artifact map lock poisoned".to_string()))
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(
        &self,
        address: &ArtifactAddress,
        artifact: &StoredArtifact,
    ) -> Result<(), ArtifactError> {
        match self.lock()?.entry(address.clone()) {
            Entry::Occupied(_) => Err(ArtifactError::AddressTaken {
                address: address.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(artifact.clone());
                Ok(())
            }
        }
    }

    fn fetch(&self, address: &ArtifactAddress) -> Result<Option<StoredArtifact>, ArtifactError> {
        Ok(self.lock()?.get(address).cloned())
    }

    fn discard(&self, address: &ArtifactAddress) -> Result<(), ArtifactError> {
        self.lock()?.remove(address);
        Ok(())
    }
}
