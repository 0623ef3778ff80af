use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "asr-server")]
#[command(about = "HTTP speech-to-text service backed by whisper.cpp", long_about = None)]
pub struct Config {
	/// Model identifier (tiny, base, small, ...) or a path to a ggml model file
	#[arg(long, env = "WHISPER_MODEL", default_value = "small")]
	pub whisper_model: String,

	/// Directory searched for ggml model files
	#[arg(long, env = "WHISPER_MODELS_PATH", default_value = "./models")]
	pub whisper_models_path: PathBuf,

	/// Inference device
	#[arg(long, env = "DEVICE", value_enum, default_value = "cpu")]
	pub device: Device,

	/// Compute precision mode
	#[arg(long, env = "COMPUTE_TYPE", default_value = "int8")]
	pub compute_type: String,

	/// Maximum number of transcriptions running at once
	#[arg(long, env = "MAX_TRANSCRIBE_WORKERS", default_value = "1")]
	pub max_transcribe_workers: usize,

	/// Beam search width; anything other than a positive integer is ignored
	#[arg(long, env = "BEAM_SIZE")]
	pub beam_size: Option<String>,

	/// Number of threads for each Whisper inference
	#[arg(long, env = "WHISPER_THREADS", default_value = "2")]
	pub whisper_threads: i32,

	/// Server host
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// Server port
	#[arg(long, env = "PORT", default_value = "8000")]
	pub port: u16,

	/// Largest accepted request body in megabytes
	#[arg(long, env = "MAX_BODY_MB", default_value = "100")]
	pub max_body_mb: usize,

	/// Directory for buffered audio bodies (system temp dir when unset)
	#[arg(long, env = "TEMP_DIR")]
	pub temp_dir: Option<PathBuf>,

	/// Log filter
	#[arg(long, env = "RUST_LOG", default_value = "info,asr_server=debug")]
	pub rust_log: String,

	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Service name for observability
	#[arg(long, env = "OTEL_SERVICE_NAME", default_value = "asr-server")]
	pub service_name: String,

	/// OTLP collector endpoint; telemetry stays local when unset
	#[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
	pub otlp_endpoint: Option<String>,

	/// Probe GET /health on the local port and exit
	#[arg(long)]
	pub health_check: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
	Cpu,
	Cuda,
	Auto,
}

impl Device {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Cpu => "cpu",
			Self::Cuda => "cuda",
			Self::Auto => "auto",
		}
	}

	/// Whether GPU offload should be requested from the backend
	pub const fn wants_gpu(self) -> bool {
		!matches!(self, Self::Cpu)
	}
}

impl fmt::Display for Device {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Config {
	/// Validate configuration values
	pub fn validate(&self) -> Result<(), String> {
		if self.max_transcribe_workers == 0 {
			return Err("max_transcribe_workers must be at least 1".to_string());
		}

		if self.whisper_threads < 1 {
			return Err("whisper_threads must be at least 1".to_string());
		}

		if self.max_body_mb == 0 {
			return Err("max_body_mb must be greater than 0".to_string());
		}

		if self.whisper_model.trim().is_empty() {
			return Err("whisper_model must not be empty".to_string());
		}

		Ok(())
	}

	/// Beam width in effect, `None` means greedy decoding
	pub fn beam_size(&self) -> Option<i32> {
		self.beam_size.as_deref().and_then(parse_beam_size)
	}

	/// The raw `BEAM_SIZE` value when it was set but could not be used
	pub fn ignored_beam_size(&self) -> Option<&str> {
		self.beam_size.as_deref().filter(|raw| parse_beam_size(raw).is_none())
	}

	pub const fn max_body_bytes(&self) -> usize {
		self.max_body_mb.saturating_mul(1024 * 1024)
	}

	pub fn listen_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// Address the `--health-check` probe connects to
	pub fn probe_addr(&self) -> SocketAddr {
		let host = match self.host.parse::<std::net::IpAddr>() {
			Ok(ip) if !ip.is_unspecified() => ip,
			_ => std::net::IpAddr::from([127, 0, 0, 1]),
		};
		SocketAddr::new(host, self.port)
	}
}

fn parse_beam_size(raw: &str) -> Option<i32> {
	raw.trim().parse::<i32>().ok().filter(|size| *size > 0)
}
