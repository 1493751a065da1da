//! The engine's private working namespace.
//!
//! A [`Workspace`] is a temporary directory that holds the files the engine
//! reads and writes (font asset, output video). Names are flat: a file name
//! must be a single path component, so nothing can escape the directory.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tempfile::TempDir;
use vd_core::{Error, Result};

/// Temporary directory owned by one engine instance, removed on drop.
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a fresh namespace, inside `parent` when given, otherwise in
    /// the system temp directory.
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vd-engine-");
        let temp_dir = match parent {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::tool("workspace", format!("failed to create temp dir: {e}")))?;

        Ok(Self { temp_dir })
    }

    /// Path to the namespace directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Map a flat file name to its path inside the namespace.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.temp_dir.path().join(name)),
            _ => Err(Error::tool(
                "workspace",
                format!("invalid file name in engine namespace: {name:?}"),
            )),
        }
    }

    /// Write (or overwrite) a file in the namespace.
    pub async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    /// Read a file from the namespace.
    pub async fn read_file(&self, name: &str) -> Result<Bytes> {
        let path = self.resolve(name)?;
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    /// Remove a file if it exists.
    pub async fn remove_file(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.exists()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read() {
        let ws = Workspace::new(None).unwrap();
        ws.write_file("overlay.ttf", b"font").await.unwrap();
        assert!(ws.exists("overlay.ttf"));
        assert_eq!(&ws.read_file("overlay.ttf").await.unwrap()[..], b"font");
    }

    #[tokio::test]
    async fn write_is_idempotent() {
        let ws = Workspace::new(None).unwrap();
        ws.write_file("overlay.ttf", b"first").await.unwrap();
        ws.write_file("overlay.ttf", b"second").await.unwrap();
        assert_eq!(&ws.read_file("overlay.ttf").await.unwrap()[..], b"second");
    }

    #[test]
    fn rejects_paths_outside_namespace() {
        let ws = Workspace::new(None).unwrap();
        for bad in ["../escape", "/etc/passwd", "a/b", "", ".."] {
            assert!(ws.resolve(bad).is_err(), "accepted {bad:?}");
        }
        assert!(ws.resolve("output.mp4").unwrap().starts_with(ws.path()));
    }

    #[tokio::test]
    async fn read_missing_file_is_io_error() {
        let ws = Workspace::new(None).unwrap();
        let err = ws.read_file("output.mp4").await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[tokio::test]
    async fn remove_missing_file_is_ok() {
        let ws = Workspace::new(None).unwrap();
        ws.remove_file("output.mp4").await.unwrap();
    }

    #[test]
    fn created_inside_parent_and_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let ws = Workspace::new(Some(parent.path())).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.starts_with(parent.path()));
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }
}
