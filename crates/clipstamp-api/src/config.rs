//! API configuration.

use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory for chunk-assembled uploads and text side-files
    pub upload_dir: PathBuf,
    /// Directory for finished output artifacts
    pub public_dir: PathBuf,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size (bounds a single upload chunk)
    pub max_body_size: usize,
    /// Transcoding engine binary
    pub ffmpeg_bin: String,
    /// Probe binary
    pub ffprobe_bin: String,
    /// Fixed engine thread count per job
    pub ffmpeg_threads: u32,
    /// Duration substituted when audio probing fails, in seconds
    pub default_duration_secs: f64,
    /// Delay between process exit and input cleanup, in seconds
    pub cleanup_grace_secs: u64,
    /// Per-job engine timeout in seconds; 0 disables
    pub render_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6011,
            upload_dir: PathBuf::from("/tmp/clipstamp/uploads"),
            public_dir: PathBuf::from("/tmp/clipstamp/public"),
            cors_origins: vec!["*".to_string()],
            max_body_size: 32 * 1024 * 1024, // 32MB per chunk
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            ffmpeg_threads: 8,
            default_duration_secs: 60.0,
            cleanup_grace_secs: 2,
            render_timeout_secs: 0,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT", defaults.port),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_dir: std::env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: env_parse("MAX_BODY_SIZE", defaults.max_body_size),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: std::env::var("FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            ffmpeg_threads: env_parse("FFMPEG_THREADS", defaults.ffmpeg_threads),
            default_duration_secs: env_parse("DEFAULT_DURATION_SECS", defaults.default_duration_secs),
            cleanup_grace_secs: env_parse("CLEANUP_GRACE_SECS", defaults.cleanup_grace_secs),
            render_timeout_secs: env_parse("RENDER_TIMEOUT_SECS", defaults.render_timeout_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
