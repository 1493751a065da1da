//! Generated artifacts and the resource handles derived from them.
//!
//! A [`ResourceStore`] turns an [`Artifact`] into an addressable
//! [`ResourceHandle`] (a file the host can preview or hand to a download
//! surface). [`ArtifactLifecycleManager`] keeps at most one live handle and
//! revokes it on replacement, on [`clear`](ArtifactLifecycleManager::clear)
//! and on drop.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use vd_core::config::ArtifactConfig;
use vd_core::events::{EventBus, EventPayload};
use vd_core::{Error, FileName, HandleId, Result, VideoFormat};

/// The binary output of one successful transcode.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Bytes,
    format: VideoFormat,
}

impl Artifact {
    pub fn new(data: impl Into<Bytes>, format: VideoFormat) -> Self {
        Self {
            data: data.into(),
            format,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn format(&self) -> VideoFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("format", &self.format)
            .field("len", &self.data.len())
            .finish()
    }
}

/// An addressable copy of an artifact, valid until revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceHandle {
    id: HandleId,
    uri: String,
    path: PathBuf,
    format: VideoFormat,
    size_bytes: u64,
}

impl ResourceHandle {
    pub fn new(id: HandleId, path: PathBuf, uri: String, format: VideoFormat, size_bytes: u64) -> Self {
        Self {
            id,
            uri,
            path,
            format,
            size_bytes,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// URI a preview surface can load, e.g. `file:///tmp/<id>.webm`.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> VideoFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Creates and revokes resource handles.
///
/// Calls are synchronous so a handle can be released from `Drop`.
pub trait ResourceStore: Send + Sync {
    fn create(&self, artifact: &Artifact) -> Result<ResourceHandle>;

    fn revoke(&self, handle: &ResourceHandle) -> Result<()>;
}

/// Materialises handles as `<uuid>.<ext>` files in a directory.
#[derive(Debug, Clone)]
pub struct TempFileStore {
    dir: PathBuf,
}

impl TempFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use `artifacts.dir`, or the system temp dir when unset.
    pub fn from_config(config: &ArtifactConfig) -> Self {
        let dir = config
            .dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("video-dummy"));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResourceStore for TempFileStore {
    fn create(&self, artifact: &Artifact) -> Result<ResourceHandle> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::resource(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let id = HandleId::new();
        let path = self
            .dir
            .join(format!("{id}.{}", artifact.format().extension()));
        write_or_discard(&path, |p| std::fs::write(p, artifact.data()))
            .map_err(|e| Error::resource(format!("failed to write {}: {e}", path.display())))?;

        let uri = format!("file://{}", path.display());
        Ok(ResourceHandle::new(
            id,
            path,
            uri,
            artifact.format(),
            artifact.len() as u64,
        ))
    }

    fn revoke(&self, handle: &ResourceHandle) -> Result<()> {
        match std::fs::remove_file(handle.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::resource(format!(
                "failed to remove {}: {e}",
                handle.path().display()
            ))),
        }
    }
}

/// Run `write` against `path`, removing whatever it left behind on failure.
fn write_or_discard(
    path: &Path,
    write: impl FnOnce(&Path) -> std::io::Result<()>,
) -> std::io::Result<()> {
    write(path).inspect_err(|_| {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove partial artifact {}: {e}", path.display());
            }
        }
    })
}

/// Everything a download surface needs to save the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// `<validated-name>.<artifact extension>`.
    pub file_name: String,
    pub mime_type: &'static str,
    pub uri: String,
    pub data: Bytes,
}

struct Published {
    artifact: Artifact,
    handle: ResourceHandle,
}

/// Owner of the current artifact and its single live handle.
pub struct ArtifactLifecycleManager {
    store: Arc<dyn ResourceStore>,
    current: Option<Published>,
    events: Option<Arc<EventBus>>,
}

impl ArtifactLifecycleManager {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            current: None,
            events: None,
        }
    }

    /// Publish handle lifecycle events on `bus`.
    pub fn attach_events(&mut self, bus: Arc<EventBus>) {
        self.events = Some(bus);
    }

    /// Replace the current artifact.
    ///
    /// The previous handle is revoked before the new one is created, so at
    /// most one handle is ever live. If creation fails the slot is left
    /// empty.
    pub fn set(&mut self, artifact: Artifact) -> Result<ResourceHandle> {
        self.clear();
        let handle = self.store.create(&artifact)?;
        self.install(artifact, handle.clone());
        Ok(handle)
    }

    /// The store handles are created in, for callers that create a handle
    /// off the current thread and [`install`](Self::install) it afterwards.
    pub fn store(&self) -> Arc<dyn ResourceStore> {
        Arc::clone(&self.store)
    }

    /// Take ownership of a handle created by [`store`](Self::store),
    /// revoking any handle still held.
    pub fn install(&mut self, artifact: Artifact, handle: ResourceHandle) {
        self.clear();
        tracing::debug!("Created artifact handle {}", handle.uri());
        self.publish(EventPayload::ArtifactPublished {
            handle_id: handle.id(),
            format: handle.format(),
            size_bytes: handle.size_bytes(),
        });
        self.current = Some(Published { artifact, handle });
    }

    /// Revoke the current handle, if any.
    ///
    /// A failed revocation is logged; the handle is forgotten either way.
    pub fn clear(&mut self) {
        let Some(previous) = self.current.take() else {
            return;
        };
        let handle = previous.handle;
        match self.store.revoke(&handle) {
            Ok(()) => tracing::debug!("Revoked artifact handle {}", handle.uri()),
            Err(e) => tracing::warn!("Failed to revoke artifact handle {}: {e}", handle.uri()),
        }
        self.publish(EventPayload::ArtifactRevoked {
            handle_id: handle.id(),
        });
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.current.as_ref().map(|p| &p.artifact)
    }

    /// The live preview handle.
    pub fn preview(&self) -> Option<&ResourceHandle> {
        self.current.as_ref().map(|p| &p.handle)
    }

    /// Download name for the current artifact. The extension always comes
    /// from the artifact's format.
    pub fn download_name(&self, name: &FileName) -> Option<String> {
        self.current
            .as_ref()
            .map(|p| name.with_format(p.artifact.format()))
    }

    pub fn download(&self, name: &FileName) -> Option<Download> {
        self.current.as_ref().map(|p| Download {
            file_name: name.with_format(p.artifact.format()),
            mime_type: p.artifact.mime_type(),
            uri: p.handle.uri().to_string(),
            data: p.artifact.data().clone(),
        })
    }

    fn publish(&self, payload: EventPayload) {
        if let Some(ref bus) = self.events {
            bus.publish(payload);
        }
    }
}

impl Drop for ArtifactLifecycleManager {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for ArtifactLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactLifecycleManager")
            .field("handle", &self.preview())
            .finish()
    }
}
