//! Translation of a [`VideoConfig`] into engine arguments.
//!
//! [`build`] is pure: the same configuration always yields the same
//! argument sequence. The command generates a solid-color source, draws the
//! text centered with a fixed font, encodes with a per-format codec and
//! writes `output.<format>` into the engine namespace.

use std::fmt;

use vd_core::{VideoConfig, VideoFormat};

use crate::asset::FONT_FILE_NAME;

/// Clip length in seconds.
pub const DURATION_SECS: u32 = 5;
/// Overlay font size in pixels, independent of resolution.
pub const FONT_SIZE: u32 = 72;
pub const FONT_COLOR: &str = "white";
/// Pixel format shared by every output format.
pub const PIXEL_FORMAT: &str = "yuv420p";
/// x264 preset for mp4 output.
pub const MP4_PRESET: &str = "ultrafast";
/// Target bitrate for webm output.
pub const WEBM_BITRATE: &str = "1M";

/// Ordered engine arguments for one generation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranscodeCommand {
    args: Vec<String>,
    output_file: String,
}

impl TranscodeCommand {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Name of the file the engine will write, e.g. `output.webm`.
    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(String::as_str)
    }
}

impl fmt::Display for TranscodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Output file name for a format.
pub fn output_file_name(format: VideoFormat) -> String {
    format!("output.{}", format.extension())
}

/// Build the argument list for a configuration.
pub fn build(config: &VideoConfig) -> TranscodeCommand {
    let output_file = output_file_name(config.format());
    let mut args: Vec<String> = Vec::with_capacity(20);

    // Source: generated solid color at the requested size.
    args.extend(["-f".into(), "lavfi".into(), "-i".into()]);
    args.push(format!(
        "color=c={}:s={}:d={DURATION_SECS}",
        config.background_hex(),
        config.resolution()
    ));

    // Overlay: nothing to draw for empty text.
    if !config.text().is_empty() {
        args.push("-vf".into());
        args.push(drawtext_filter(config.text()));
    }

    args.extend(codec_args(config.format()));
    args.extend(["-pix_fmt".into(), PIXEL_FORMAT.into()]);
    args.extend(["-t".into(), DURATION_SECS.to_string()]);
    args.push(output_file.clone());

    TranscodeCommand { args, output_file }
}

fn codec_args(format: VideoFormat) -> [String; 4] {
    match format {
        VideoFormat::Mp4 => [
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            MP4_PRESET.into(),
        ],
        VideoFormat::Webm => [
            "-c:v".into(),
            "libvpx-vp9".into(),
            "-b:v".into(),
            WEBM_BITRATE.into(),
        ],
    }
}

fn drawtext_filter(text: &str) -> String {
    format!(
        "drawtext=fontfile={FONT_FILE_NAME}:text={}:expansion=none:fontsize={FONT_SIZE}:fontcolor={FONT_COLOR}:x=(w-text_w)/2:y=(h-text_h)/2",
        escape_filter_value(text)
    )
}

/// Escape a drawtext option value for use inside a `-vf` filtergraph.
///
/// Two levels: the option parser treats `\ ' :` as special and strips
/// unescaped whitespace at both ends of the value, then the filtergraph
/// parser treats `\ ' [ ] , ;` as special.
fn escape_filter_value(text: &str) -> String {
    escape(&escape_option_value(text), &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_option_value(text: &str) -> String {
    let lead_end = text.len() - text.trim_start().len();
    let trail_start = text.trim_end().len();
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if matches!(c, '\\' | '\'' | ':') || i < lead_end || i >= trail_start {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
