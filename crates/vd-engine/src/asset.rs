//! The font used by the text overlay.

use std::path::PathBuf;

use bytes::Bytes;
use tokio::sync::OnceCell;
use vd_core::config::EngineConfig;
use vd_core::{Error, Result};

/// Name of the font file inside the engine namespace.
pub const FONT_FILE_NAME: &str = "overlay.ttf";

#[derive(Debug, Clone)]
enum FontSource {
    File(PathBuf),
    Memory(Bytes),
    Missing,
}

/// The overlay font, read from its source at most once.
#[derive(Debug)]
pub struct FontAsset {
    source: FontSource,
    cache: OnceCell<Bytes>,
}

impl FontAsset {
    /// Use the configured font, falling back to a well-known system font.
    pub fn from_config(config: &EngineConfig) -> Self {
        let source = match config.resolve_font_path() {
            Some(path) => FontSource::File(path),
            None => FontSource::Missing,
        };
        Self {
            source,
            cache: OnceCell::new(),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: FontSource::File(path.into()),
            cache: OnceCell::new(),
        }
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            source: FontSource::Memory(data.into()),
            cache: OnceCell::new(),
        }
    }

    /// Name the asset is written under in the engine namespace.
    pub fn file_name(&self) -> &'static str {
        FONT_FILE_NAME
    }

    /// Font bytes. A failed read is not cached, so it is retried next time.
    pub async fn bytes(&self) -> Result<Bytes> {
        self.cache
            .get_or_try_init(|| async {
                match &self.source {
                    FontSource::Memory(data) => Ok(data.clone()),
                    FontSource::File(path) => {
                        let data = tokio::fs::read(path).await.map_err(|e| {
                            Error::Config(format!(
                                "failed to read font {}: {e}",
                                path.display()
                            ))
                        })?;
                        tracing::debug!("Loaded overlay font from {}", path.display());
                        Ok(Bytes::from(data))
                    }
                    FontSource::Missing => Err(Error::Config(
                        "no overlay font configured and no system font found".into(),
                    )),
                }
            })
            .await
            .cloned()
    }
}
