use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use classscan_core::image_source::data_url_for_bytes;
use classscan_core::protocol::{
    AttendanceRequest, AttendanceResponse, EncodeStudentRequest, EncodeStudentResponse, ErrorBody,
    HealthResponse,
};
use classscan_core::StudentRecord;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "classscan", about = "ClassScan attendance CLI")]
struct Cli {
    /// Base URL of the classscand service
    #[arg(long, env = "CLASSSCAN_SERVER", default_value = "http://127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service health
    Health,
    /// Encode a student's reference photo and print the embedding as JSON
    Encode {
        /// Local image file or http(s) URL
        image: String,
    },
    /// Take attendance from a class photo
    Attend {
        /// Local image file or http(s) URL of the class photo
        image: String,
        /// JSON file holding an array of {id, name, encodings}
        #[arg(short, long)]
        roster: PathBuf,
    },
}

/// Which request field an image argument goes into.
enum ImageArg {
    Url(String),
    Data(String),
}

impl ImageArg {
    fn resolve(arg: &str) -> Result<Self> {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            return Ok(ImageArg::Url(arg.to_string()));
        }
        let bytes = std::fs::read(arg).with_context(|| format!("reading {arg}"))?;
        let url = data_url_for_bytes(&bytes).with_context(|| format!("{arg} is not a supported image"))?;
        Ok(ImageArg::Data(url))
    }
}

fn load_roster(path: &Path) -> Result<Vec<StudentRecord>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let roster: Vec<StudentRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing roster {}", path.display()))?;
    if roster.is_empty() {
        bail!("roster {} is empty", path.display());
    }
    Ok(roster)
}

struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    fn new(server: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: server.trim_end_matches('/').to_string(),
        }
    }

    async fn health(&self) -> Result<HealthResponse> {
        let response = self.http.get(format!("{}/health", self.base)).send().await?;
        decode(response).await
    }

    async fn post<B: serde::Serialize, T: serde::de::DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base);
        tracing::debug!(%url, "posting request");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("connecting to {}", self.base))?;
        decode(response).await
    }
}

/// Parse a success body, or turn the service's error envelope into an error.
async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body: Value = response.json().await.context("service returned non-JSON body")?;
    if !status.is_success() {
        let message = serde_json::from_value::<ErrorBody>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| "unknown error".to_string());
        bail!("classscand returned {status}: {message}");
    }
    Ok(serde_json::from_value(body)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = Client::new(&cli.server);

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("classscand at {}: {}", client.base, health.status);
        }
        Commands::Encode { image } => {
            let request = match ImageArg::resolve(&image)? {
                ImageArg::Url(url) => EncodeStudentRequest { image_url: Some(url), ..Default::default() },
                ImageArg::Data(data) => EncodeStudentRequest { image_data: Some(data), ..Default::default() },
            };
            let response: EncodeStudentResponse = client.post("/encode-student", &request).await?;
            println!("{}", serde_json::to_string(&response.encodings)?);
        }
        Commands::Attend { image, roster } => {
            let students = load_roster(&roster)?;
            let mut request = AttendanceRequest {
                students: Some(students),
                ..Default::default()
            };
            match ImageArg::resolve(&image)? {
                ImageArg::Url(url) => request.class_image_url = Some(url),
                ImageArg::Data(data) => request.class_image_data = Some(data),
            }

            let response: AttendanceResponse = client.post("/process-attendance", &request).await?;
            let present = response.results.iter().filter(|r| !r.is_absent).count();
            for r in &response.results {
                let mark = if r.is_absent { "absent" } else { "present" };
                println!("{:<8} {:<24} {}", mark, r.name, r.id);
            }
            println!("{present}/{} present", response.results.len());
        }
    }

    Ok(())
}
