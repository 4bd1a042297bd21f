//! Render request models.
//!
//! A [`RenderRequest`] describes one transcoding intent: which assembled
//! uploads to use, the trim window, fades, and the text layers stamped onto
//! the output. Timing for the whole render (trim end, fades, progress
//! denominator) is derived from the audio track, not the video.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default watermark text when the client sends none.
pub const DEFAULT_WATERMARK_TEXT: &str = "Clipstamp";

/// Validation errors raised before a job is created.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Missing required upload: {0}")]
    MissingUpload(String),

    #[error("Invalid trim window: start {start} >= end {end}")]
    InvalidTrim { start: f64, end: f64 },
}

/// Source mode for a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Uploaded video is the visual source.
    #[default]
    Video,
    /// Static image over a blurred copy of itself, driven by the audio.
    Music,
}

/// Primary watermark text layer. Always rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub text: String,
    /// Horizontal position as a percentage of frame width (0-100).
    #[serde(default = "default_wm_x")]
    pub x: f64,
    /// Vertical position as a percentage of frame height (0-100).
    #[serde(default = "default_wm_y")]
    pub y: f64,
    #[serde(default = "default_wm_font_size")]
    pub font_size: u32,
    #[serde(default = "default_wm_color")]
    pub color: String,
}

fn default_wm_x() -> f64 {
    50.0
}

fn default_wm_y() -> f64 {
    90.0
}

fn default_wm_font_size() -> u32 {
    32
}

fn default_wm_color() -> String {
    "white".to_string()
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: DEFAULT_WATERMARK_TEXT.to_string(),
            x: default_wm_x(),
            y: default_wm_y(),
            font_size: default_wm_font_size(),
            color: default_wm_color(),
        }
    }
}

/// Optional title layer, composited only in music mode.
///
/// Multi-line content is allowed; line breaks are preserved verbatim by the
/// rendering engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleSpec {
    pub text: String,
    #[serde(default = "default_title_x")]
    pub x: f64,
    #[serde(default = "default_title_y")]
    pub y: f64,
    #[serde(default = "default_title_font_size")]
    pub font_size: u32,
}

fn default_title_x() -> f64 {
    50.0
}

fn default_title_y() -> f64 {
    20.0
}

fn default_title_font_size() -> u32 {
    40
}

/// Foreground placement for the music-mode image overlay, as justification
/// percentages (50/50 = centered).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackgroundJustify {
    pub x: f64,
    pub y: f64,
}

impl Default for BackgroundJustify {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

/// One transcoding intent, as submitted by the client after all chunks for
/// the referenced uploads have been assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub mode: RenderMode,
    /// Assembled video upload (video mode).
    pub video_file: Option<String>,
    /// Assembled image upload (music mode).
    pub image_file: Option<String>,
    /// Assembled audio upload. Authoritative for all timing.
    pub audio_file: String,
    /// Trim window start in seconds.
    #[serde(default)]
    pub trim_start: f64,
    /// Trim window end in seconds. Absent means "to end of audio".
    pub trim_end: Option<f64>,
    /// Fade-in duration in seconds (0 = none).
    #[serde(default)]
    pub fade_in: f64,
    /// Fade-out duration in seconds (0 = none).
    #[serde(default)]
    pub fade_out: f64,
    #[serde(default)]
    pub watermark: WatermarkSpec,
    pub title: Option<TitleSpec>,
    pub background: Option<BackgroundJustify>,
}

impl RenderRequest {
    /// Name of the visual source upload for this request's mode.
    pub fn visual_file(&self) -> Result<&str, RequestError> {
        let (field, value) = match self.mode {
            RenderMode::Video => ("video_file", self.video_file.as_deref()),
            RenderMode::Music => ("image_file", self.image_file.as_deref()),
        };
        value.ok_or_else(|| RequestError::MissingUpload(field.to_string()))
    }

    /// Basic shape validation; upload presence on disk is checked separately.
    pub fn validate(&self) -> Result<(), RequestError> {
        self.visual_file()?;
        if self.audio_file.is_empty() {
            return Err(RequestError::MissingUpload("audio_file".to_string()));
        }
        if let Some(end) = self.trim_end {
            if self.trim_start >= end {
                return Err(RequestError::InvalidTrim {
                    start: self.trim_start,
                    end,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> RenderRequest {
        RenderRequest {
            mode: RenderMode::Video,
            video_file: Some("clip.mp4".into()),
            image_file: None,
            audio_file: "track.mp3".into(),
            trim_start: 0.0,
            trim_end: None,
            fade_in: 0.0,
            fade_out: 0.0,
            watermark: WatermarkSpec::default(),
            title: None,
            background: None,
        }
    }

    #[test]
    fn test_visual_file_per_mode() {
        let req = base_request();
        assert_eq!(req.visual_file().unwrap(), "clip.mp4");

        let mut music = base_request();
        music.mode = RenderMode::Music;
        assert!(music.visual_file().is_err());

        music.image_file = Some("cover.png".into());
        assert_eq!(music.visual_file().unwrap(), "cover.png");
    }

    #[test]
    fn test_validate_rejects_inverted_trim() {
        let mut req = base_request();
        req.trim_start = 8.0;
        req.trim_end = Some(2.0);
        assert!(matches!(
            req.validate(),
            Err(RequestError::InvalidTrim { .. })
        ));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: RenderRequest = serde_json::from_str(
            r#"{"mode":"music","image_file":"cover.png","audio_file":"track.mp3",
                "watermark":{"text":"Hi"}}"#,
        )
        .unwrap();

        assert_eq!(req.mode, RenderMode::Music);
        assert_eq!(req.trim_start, 0.0);
        assert!(req.trim_end.is_none());
        assert_eq!(req.watermark.text, "Hi");
        assert_eq!(req.watermark.font_size, 32);
        assert_eq!(req.watermark.color, "white");
    }
}
