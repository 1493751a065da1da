//! Field validation for the video form and the download file name.
//!
//! Validation is purely local: it never touches the engine. The video
//! schema and the file name schema are independent and produce their own
//! error sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::IntErrorKind;

use crate::video::{
    FileName, VideoConfig, VideoFormat, MAX_FILE_NAME_CHARS, MAX_HEIGHT, MAX_TEXT_CHARS,
    MAX_WIDTH,
};

/// A form field that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Width,
    Height,
    Text,
    BackgroundColor,
    Format,
    FileName,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Width => "width",
            Field::Height => "height",
            Field::Text => "text",
            Field::BackgroundColor => "background_color",
            Field::Format => "format",
            Field::FileName => "file_name",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to error message, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Unvalidated form values, exactly as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawVideoInput {
    pub width: String,
    pub height: String,
    pub text: String,
    pub background_color: String,
    pub format: String,
}

impl Default for RawVideoInput {
    fn default() -> Self {
        Self {
            width: "1920".into(),
            height: "1080".into(),
            text: "Hello, World!".into(),
            background_color: "#0000FF".into(),
            format: VideoFormat::Mp4.to_string(),
        }
    }
}

impl RawVideoInput {
    /// Current raw value of a video field. `None` for [`Field::FileName`].
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Width => &self.width,
            Field::Height => &self.height,
            Field::Text => &self.text,
            Field::BackgroundColor => &self.background_color,
            Field::Format => &self.format,
            Field::FileName => return None,
        };
        Some(value)
    }

    /// Replace a video field. Returns whether the stored value changed.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> bool {
        let slot = match field {
            Field::Width => &mut self.width,
            Field::Height => &mut self.height,
            Field::Text => &mut self.text,
            Field::BackgroundColor => &mut self.background_color,
            Field::Format => &mut self.format,
            Field::FileName => return false,
        };
        let value = value.into();
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }
}

/// Validate raw form input into a [`VideoConfig`].
///
/// Every field is checked; on failure all field errors are reported at once.
pub fn validate_video(raw: &RawVideoInput) -> Result<VideoConfig, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let width = check_dimension(&raw.width, MAX_WIDTH)
        .map_err(|m| errors.insert(Field::Width, m))
        .ok();
    let height = check_dimension(&raw.height, MAX_HEIGHT)
        .map_err(|m| errors.insert(Field::Height, m))
        .ok();

    if raw.text.chars().count() > MAX_TEXT_CHARS {
        errors.insert(
            Field::Text,
            format!("Must be at most {MAX_TEXT_CHARS} characters"),
        );
    }

    if !is_hex_color(&raw.background_color) {
        errors.insert(Field::BackgroundColor, "Must be a hex color like #RRGGBB");
    }

    let format = raw
        .format
        .parse::<VideoFormat>()
        .map_err(|m| errors.insert(Field::Format, m))
        .ok();

    errors.into_result(|| VideoConfig {
        width: width.unwrap_or_default(),
        height: height.unwrap_or_default(),
        text: raw.text.clone(),
        background_color: raw.background_color.clone(),
        format: format.unwrap_or_default(),
    })
}

/// Validate a download file name stem.
pub fn validate_file_name(raw: &str) -> Result<FileName, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let len = raw.chars().count();

    if len == 0 {
        errors.insert(Field::FileName, "File name is required");
    } else if len > MAX_FILE_NAME_CHARS {
        errors.insert(
            Field::FileName,
            format!("Must be at most {MAX_FILE_NAME_CHARS} characters"),
        );
    } else if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.insert(
            Field::FileName,
            "Only letters, digits, '_' and '-' are allowed",
        );
    }

    errors.into_result(|| FileName(raw.to_string()))
}

fn check_dimension(raw: &str, max: u32) -> Result<u32, String> {
    let value = match raw.trim().parse::<i64>() {
        Ok(v) => v,
        Err(e) => {
            return Err(match e.kind() {
                IntErrorKind::PosOverflow => format!("Must be at most {max}"),
                IntErrorKind::NegOverflow => "Must be greater than 0".to_string(),
                _ => "Expected a whole number".to_string(),
            })
        }
    };

    if value < 1 {
        return Err("Must be greater than 0".into());
    }
    if value > i64::from(max) {
        return Err(format!("Must be at most {max}"));
    }
    u32::try_from(value).map_err(|_| format!("Must be at most {max}"))
}

fn is_hex_color(raw: &str) -> bool {
    raw.len() == 7
        && raw.starts_with('#')
        && raw[1..].chars().all(|c| c.is_ascii_hexdigit())
}
