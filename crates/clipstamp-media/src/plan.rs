//! Filter-graph compilation.
//!
//! [`RenderPlan::compile`] is a pure mapping from a render request (plus the
//! audio-derived render duration and pre-written text side-files) to the
//! engine invocation: input specs, a `-filter_complex` expression, and the
//! output encoding arguments. Nothing here touches the filesystem or spawns
//! a process.

use std::path::{Path, PathBuf};

use clipstamp_models::{RenderMode, RenderRequest};

/// Canonical output frame.
pub const FRAME_WIDTH: u32 = 1280;
pub const FRAME_HEIGHT: u32 = 720;

/// Thumbnail size the music-mode background is blurred at. Blurring at
/// native resolution costs far more for a result that is upscaled anyway.
const BLUR_WIDTH: u32 = 160;
const BLUR_HEIGHT: u32 = 90;

/// Multiplicative luma brighten applied to the blurred background.
const BG_BRIGHTEN: f64 = 1.30;

/// Output audio sample rate.
const AUDIO_RATE: u32 = 44_100;

/// Paths of the temporary text side-files consumed via `drawtext=textfile=`.
///
/// Text goes through side-files rather than the command line so arbitrary
/// user content (quotes, newlines, non-Latin scripts) never needs shell or
/// filter escaping.
#[derive(Debug, Clone)]
pub struct TextLayers {
    pub watermark_file: PathBuf,
    pub title_file: Option<PathBuf>,
}

/// One engine input: arguments that precede `-i`, then the source path.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub pre_args: Vec<String>,
    pub path: PathBuf,
}

/// A compiled engine invocation, minus the output path.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub inputs: Vec<InputSpec>,
    pub filter_complex: String,
    pub output_args: Vec<String>,
}

/// Effective render duration in seconds.
///
/// The audio track is authoritative: an absent trim end means "to end of
/// audio", and the result is clamped so the render is at least one second.
pub fn render_duration(audio_duration: f64, trim_start: f64, trim_end: Option<f64>) -> f64 {
    let end = trim_end.unwrap_or(audio_duration);
    (end - trim_start).max(1.0)
}

impl RenderPlan {
    /// Compile a request into an engine invocation.
    ///
    /// `visual_path`/`audio_path` are the assembled uploads on disk,
    /// `duration` the audio-derived render duration, `threads` the fixed
    /// engine thread count.
    pub fn compile(
        req: &RenderRequest,
        duration: f64,
        visual_path: &Path,
        audio_path: &Path,
        text: &TextLayers,
        threads: u32,
    ) -> Self {
        let inputs = compile_inputs(req, duration, visual_path, audio_path);
        let filter_complex = compile_filter_graph(req, duration, text);
        let output_args = compile_output_args(duration, threads);

        Self {
            inputs,
            filter_complex,
            output_args,
        }
    }
}

fn compile_inputs(
    req: &RenderRequest,
    duration: f64,
    visual_path: &Path,
    audio_path: &Path,
) -> Vec<InputSpec> {
    let visual = match req.mode {
        RenderMode::Video => {
            // Pre-input seek: decoding starts at the trim point instead of
            // discarding frames after the fact.
            let mut pre_args = Vec::new();
            if req.trim_start > 0.0 {
                pre_args.extend(["-ss".to_string(), fmt_secs(req.trim_start)]);
            }
            InputSpec {
                pre_args,
                path: visual_path.to_path_buf(),
            }
        }
        RenderMode::Music => InputSpec {
            // Loop the still image for exactly the render duration.
            pre_args: vec![
                "-loop".to_string(),
                "1".to_string(),
                "-t".to_string(),
                fmt_secs(duration),
            ],
            path: visual_path.to_path_buf(),
        },
    };

    let mut audio_pre = Vec::new();
    if req.trim_start > 0.0 {
        audio_pre.extend(["-ss".to_string(), fmt_secs(req.trim_start)]);
    }
    let audio = InputSpec {
        pre_args: audio_pre,
        path: audio_path.to_path_buf(),
    };

    vec![visual, audio]
}

fn compile_filter_graph(req: &RenderRequest, duration: f64, text: &TextLayers) -> String {
    let mut chains: Vec<String> = Vec::new();

    // Visual base construction, ending in [canvas].
    match req.mode {
        RenderMode::Video => {
            chains.push(format!(
                "[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1[canvas]",
                w = FRAME_WIDTH,
                h = FRAME_HEIGHT,
            ));
        }
        RenderMode::Music => {
            let justify = req.background.unwrap_or_default();
            // Cheap approximate blur: blur a thumbnail, upscale back.
            chains.push(format!(
                "[0:v]scale={bw}:{bh}:flags=fast_bilinear,boxblur=10:2,\
                 scale={w}:{h}:flags=fast_bilinear,lutyuv=y=val*{brighten:.2}[bg]",
                bw = BLUR_WIDTH,
                bh = BLUR_HEIGHT,
                w = FRAME_WIDTH,
                h = FRAME_HEIGHT,
                brighten = BG_BRIGHTEN,
            ));
            chains.push(format!(
                "[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease[fg]",
                w = FRAME_WIDTH,
                h = FRAME_HEIGHT,
            ));
            chains.push(format!(
                "[bg][fg]overlay=x=(W-w)*{jx}:y=(H-h)*{jy}[canvas]",
                jx = fmt_fraction(justify.x),
                jy = fmt_fraction(justify.y),
            ));
        }
    }

    // Text layers and fades run as one comma chain on the canvas.
    let mut vchain: Vec<String> = Vec::new();

    vchain.push(drawtext_filter(
        &text.watermark_file,
        req.watermark.x,
        req.watermark.y,
        req.watermark.font_size,
        &req.watermark.color,
    ));

    // Title applies only in music mode; the side-file is only written there.
    if req.mode == RenderMode::Music {
        if let (Some(title), Some(title_file)) = (&req.title, &text.title_file) {
            vchain.push(drawtext_filter(
                title_file,
                title.x,
                title.y,
                title.font_size,
                "white",
            ));
        }
    }

    if req.fade_in > 0.0 {
        vchain.push(format!("fade=t=in:st=0:d={}", fmt_secs(req.fade_in)));
    }
    if req.fade_out > 0.0 {
        // Clamped at 0 so an oversized fade never produces a negative start.
        let st = (duration - req.fade_out).max(0.0);
        vchain.push(format!(
            "fade=t=out:st={}:d={}",
            fmt_secs(st),
            fmt_secs(req.fade_out)
        ));
    }

    chains.push(format!("[canvas]{}[v]", vchain.join(",")));

    // Audio branch with matching fades.
    let mut achain: Vec<String> = vec![format!("aresample={AUDIO_RATE}")];
    if req.fade_in > 0.0 {
        achain.push(format!("afade=t=in:st=0:d={}", fmt_secs(req.fade_in)));
    }
    if req.fade_out > 0.0 {
        let st = (duration - req.fade_out).max(0.0);
        achain.push(format!(
            "afade=t=out:st={}:d={}",
            fmt_secs(st),
            fmt_secs(req.fade_out)
        ));
    }
    chains.push(format!("[1:a]{}[a]", achain.join(",")));

    chains.join(";")
}

fn compile_output_args(duration: f64, threads: u32) -> Vec<String> {
    [
        "-map", "[v]", "-map", "[a]",
        "-c:v", "libx264", "-preset", "superfast", "-tune", "fastdecode",
        "-crf", "28", "-pix_fmt", "yuv420p", "-movflags", "+faststart",
        "-c:a", "aac", "-b:a", "96k",
        "-shortest",
    ]
    .into_iter()
    .map(String::from)
    .chain([
        "-threads".to_string(),
        threads.to_string(),
        "-t".to_string(),
        fmt_secs(duration),
    ])
    .collect()
}

/// Build one `drawtext` filter: percentage coordinates become pixel offsets
/// centered on the text's own bounding box.
fn drawtext_filter(textfile: &Path, x_pct: f64, y_pct: f64, font_size: u32, color: &str) -> String {
    format!(
        "drawtext=textfile='{file}':x=(w*{x}-tw/2):y=(h*{y}-th/2):\
         fontsize={size}:fontcolor={color}:shadowcolor=black@0.5:shadowx=2:shadowy=2",
        file = escape_filter_path(&textfile.to_string_lossy()),
        x = fmt_fraction(x_pct),
        y = fmt_fraction(y_pct),
        size = font_size,
    )
}

/// Escape a path for use inside a single-quoted filter option.
fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

fn fmt_secs(v: f64) -> String {
    format!("{:.3}", v)
}

/// Percentage (0-100) as a filter-expression fraction.
fn fmt_fraction(pct: f64) -> String {
    format!("{:.4}", pct / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstamp_models::{BackgroundJustify, TitleSpec, WatermarkSpec};
    use std::path::PathBuf;

    fn video_request() -> RenderRequest {
        RenderRequest {
            mode: RenderMode::Video,
            video_file: Some("clip.mp4".into()),
            image_file: None,
            audio_file: "track.mp3".into(),
            trim_start: 2.0,
            trim_end: Some(8.0),
            fade_in: 0.0,
            fade_out: 0.0,
            watermark: WatermarkSpec {
                text: "Hi".into(),
                x: 50.0,
                y: 90.0,
                font_size: 32,
                color: "white".into(),
            },
            title: None,
            background: None,
        }
    }

    fn music_request() -> RenderRequest {
        RenderRequest {
            mode: RenderMode::Music,
            video_file: None,
            image_file: Some("cover.png".into()),
            audio_file: "track.mp3".into(),
            trim_start: 0.0,
            trim_end: None,
            fade_in: 1.0,
            fade_out: 2.0,
            watermark: WatermarkSpec::default(),
            title: Some(TitleSpec {
                text: "Line1\nLine2".into(),
                x: 50.0,
                y: 20.0,
                font_size: 40,
            }),
            background: Some(BackgroundJustify { x: 50.0, y: 30.0 }),
        }
    }

    fn layers(with_title: bool) -> TextLayers {
        TextLayers {
            watermark_file: PathBuf::from("/tmp/wm_1.txt"),
            title_file: with_title.then(|| PathBuf::from("/tmp/title_1.txt")),
        }
    }

    #[test]
    fn test_render_duration_from_audio() {
        assert_eq!(render_duration(10.0, 0.0, None), 10.0);
        assert_eq!(render_duration(10.0, 2.0, Some(8.0)), 6.0);
        assert_eq!(render_duration(10.0, 4.0, None), 6.0);
        // Clamped to at least one second
        assert_eq!(render_duration(10.0, 9.8, None), 1.0);
        assert_eq!(render_duration(0.3, 0.0, None), 1.0);
    }

    #[test]
    fn test_video_mode_compiles_trim_and_scale_path() {
        let req = video_request();
        let duration = render_duration(10.0, req.trim_start, req.trim_end);
        let plan = RenderPlan::compile(
            &req,
            duration,
            Path::new("/u/clip.mp4"),
            Path::new("/u/track.mp3"),
            &layers(false),
            8,
        );

        // Pre-input seek on both the video and audio inputs
        assert_eq!(plan.inputs.len(), 2);
        assert_eq!(plan.inputs[0].pre_args, ["-ss", "2.000"]);
        assert_eq!(plan.inputs[0].path, PathBuf::from("/u/clip.mp4"));
        assert_eq!(plan.inputs[1].pre_args, ["-ss", "2.000"]);

        // Direct scale/pad path, no blur pipeline
        assert!(plan.filter_complex.contains("scale=1280:720"));
        assert!(plan.filter_complex.contains("pad=1280:720"));
        assert!(!plan.filter_complex.contains("boxblur"));

        // Watermark centered on its own text box, from a side-file
        assert!(plan
            .filter_complex
            .contains("textfile='/tmp/wm_1.txt'"));
        assert!(plan.filter_complex.contains("x=(w*0.5000-tw/2)"));
        assert!(plan.filter_complex.contains("y=(h*0.9000-th/2)"));

        // Processing bounded to the render duration
        let args = plan.output_args.join(" ");
        assert!(args.contains("-t 6.000"));
        assert!(args.contains("-shortest"));
        assert!(args.contains("-movflags +faststart"));
        assert!(args.contains("-threads 8"));
    }

    #[test]
    fn test_music_mode_compiles_blur_overlay_title_path() {
        let req = music_request();
        let duration = render_duration(30.0, req.trim_start, req.trim_end);
        let plan = RenderPlan::compile(
            &req,
            duration,
            Path::new("/u/cover.png"),
            Path::new("/u/track.mp3"),
            &layers(true),
            8,
        );

        // Image looped for the render duration
        assert_eq!(plan.inputs[0].pre_args, ["-loop", "1", "-t", "30.000"]);

        // Blurred-background + foreground-overlay path
        assert!(plan.filter_complex.contains("scale=160:90"));
        assert!(plan.filter_complex.contains("boxblur"));
        assert!(plan.filter_complex.contains("lutyuv=y=val*1.30"));
        assert!(plan
            .filter_complex
            .contains("overlay=x=(W-w)*0.5000:y=(H-h)*0.3000"));

        // Both text layers present
        assert!(plan.filter_complex.contains("textfile='/tmp/wm_1.txt'"));
        assert!(plan.filter_complex.contains("textfile='/tmp/title_1.txt'"));
        assert!(plan.filter_complex.contains("fontsize=40"));

        // Matching fades on both branches
        assert!(plan.filter_complex.contains("fade=t=in:st=0:d=1.000"));
        assert!(plan.filter_complex.contains("fade=t=out:st=28.000:d=2.000"));
        assert!(plan.filter_complex.contains("afade=t=out:st=28.000:d=2.000"));
    }

    #[test]
    fn test_title_ignored_in_video_mode() {
        let mut req = video_request();
        req.title = Some(TitleSpec {
            text: "Nope".into(),
            x: 50.0,
            y: 20.0,
            font_size: 40,
        });
        let plan = RenderPlan::compile(
            &req,
            6.0,
            Path::new("/u/clip.mp4"),
            Path::new("/u/track.mp3"),
            &layers(true),
            4,
        );
        assert!(!plan.filter_complex.contains("title_1.txt"));
    }

    #[test]
    fn test_fade_out_start_clamped_at_zero() {
        let mut req = music_request();
        req.fade_out = 60.0;
        let plan = RenderPlan::compile(
            &req,
            30.0,
            Path::new("/u/cover.png"),
            Path::new("/u/track.mp3"),
            &layers(true),
            4,
        );
        assert!(plan.filter_complex.contains("fade=t=out:st=0.000:d=60.000"));
        assert!(plan.filter_complex.contains("afade=t=out:st=0.000"));
    }

    #[test]
    fn test_filter_path_escaping() {
        assert_eq!(escape_filter_path("/tmp/a'b:c"), "/tmp/a\\'b\\:c");
    }
}
