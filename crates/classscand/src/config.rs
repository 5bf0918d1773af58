use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use classscan_core::detector::DEFAULT_CONFIDENCE_THRESHOLD;
use classscan_core::image_source::DEFAULT_MAX_IMAGE_BYTES;
use classscan_core::DEFAULT_TOLERANCE;

/// Daemon configuration, loaded once from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind (default: 0.0.0.0).
    pub bind_host: String,
    /// TCP port (default: 5000).
    pub port: u16,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum Euclidean distance for two embeddings to be the same person.
    pub tolerance: f64,
    /// Minimum SCRFD score for a detection to count as a face.
    pub detection_threshold: f32,
    /// Timeout for fetching a remote image.
    pub fetch_timeout: Duration,
    /// Largest image payload accepted after download or base64 decode.
    pub max_image_bytes: usize,
    /// Largest JSON request body accepted.
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 5000,
            model_dir: default_model_dir(),
            tolerance: DEFAULT_TOLERANCE,
            detection_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fetch_timeout: Duration::from_secs(30),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from `CLASSSCAN_*` environment variables (and `PORT`) with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_host: std::env::var("CLASSSCAN_BIND").unwrap_or(defaults.bind_host),
            port: env_parse("PORT", defaults.port),
            model_dir: std::env::var("CLASSSCAN_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            tolerance: env_parse("CLASSSCAN_TOLERANCE", defaults.tolerance),
            detection_threshold: env_parse("CLASSSCAN_DETECTION_THRESHOLD", defaults.detection_threshold),
            fetch_timeout: Duration::from_secs(env_parse(
                "CLASSSCAN_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )),
            max_image_bytes: env_parse("CLASSSCAN_MAX_IMAGE_BYTES", defaults.max_image_bytes),
            max_body_bytes: env_parse("CLASSSCAN_MAX_BODY_BYTES", defaults.max_body_bytes),
        }
    }

    /// Socket address to listen on.
    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_host, self.port).parse()
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

/// `$XDG_DATA_HOME/classscan/models`, falling back to `~/.local/share`.
fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("classscan")
        .join("models")
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment value");
            default
        }),
        Err(_) => default,
    }
}
