//! Configuration file loading.
//!
//! The types live in [`vd_core::config`]; this module finds, reads and
//! checks the file on behalf of the host.

pub use vd_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Locations searched by [`load_config_or_default`], in order.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["./video-dummy.toml", "~/.config/video-dummy/config.toml"];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vd_core::VideoFormat;

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[engine]
timeout_secs = 30

[defaults]
width = "640"
format = "webm"
file_name = "clip"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(config.defaults.video.width, "640");
        assert_eq!(config.defaults.video.height, "1080");
        assert_eq!(config.defaults.file_name, "clip");
        let video = vd_core::validate_video(&config.defaults.video).unwrap();
        assert_eq!(video.format(), VideoFormat::Webm);
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let err = load_config_or_default(Some(Path::new("/nonexistent/video-dummy.toml")))
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }

    #[test]
    fn malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine\ntimeout_secs = ").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
