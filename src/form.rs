//! Form state: raw field values plus their current validation errors.

use vd_core::config::FormDefaults;
use vd_core::{
    validate_file_name, validate_video, Field, FileName, RawVideoInput, ValidationErrors,
    VideoConfig,
};

/// What the user has typed, exactly as typed.
///
/// The video fields and the download file name are validated separately:
/// a bad file name never blocks generation and a bad dimension never blocks
/// a download.
#[derive(Debug, Clone)]
pub struct VideoForm {
    video: RawVideoInput,
    file_name: String,
    errors: ValidationErrors,
}

impl Default for VideoForm {
    fn default() -> Self {
        Self::from_defaults(&FormDefaults::default())
    }
}

impl VideoForm {
    pub fn from_defaults(defaults: &FormDefaults) -> Self {
        let mut form = Self {
            video: defaults.video.clone(),
            file_name: defaults.file_name.clone(),
            errors: ValidationErrors::default(),
        };
        form.revalidate();
        form
    }

    /// Update one field and revalidate. Returns whether the value changed.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> bool {
        let changed = match field {
            Field::FileName => {
                let value = value.into();
                let changed = self.file_name != value;
                self.file_name = value;
                changed
            }
            _ => self.video.set(field, value),
        };
        if changed {
            self.revalidate();
        }
        changed
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FileName => &self.file_name,
            _ => self.video.get(field).unwrap_or_default(),
        }
    }

    pub fn raw(&self) -> &RawVideoInput {
        &self.video
    }

    /// Field errors for both schemas, as of the last edit.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn video_config(&self) -> Result<VideoConfig, ValidationErrors> {
        validate_video(&self.video)
    }

    pub fn file_name(&self) -> Result<FileName, ValidationErrors> {
        validate_file_name(&self.file_name)
    }

    fn revalidate(&mut self) {
        let mut errors = ValidationErrors::default();
        for result in [
            self.video_config().err(),
            self.file_name().err(),
        ]
        .into_iter()
        .flatten()
        {
            for (field, message) in result.iter() {
                errors.insert(field, message);
            }
        }
        self.errors = errors;
    }
}
