use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{
	global,
	metrics::{Counter, Histogram, Meter, UpDownCounter},
	KeyValue,
};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
	metrics::{PeriodicReader, SdkMeterProvider},
	trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
	Resource,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

const METER_NAME: &str = "asr-server";

/// Metrics for the transcription service
#[derive(Clone)]
pub struct AsrMetrics {
	// Counters
	pub requests: Counter<u64>,
	pub requests_rejected: Counter<u64>,
	pub transcriptions_completed: Counter<u64>,
	pub transcriptions_failed: Counter<u64>,
	pub bytes_received: Counter<u64>,

	// Histograms
	pub queue_wait_latency: Histogram<f64>,
	pub transcription_latency: Histogram<f64>,

	// Gauges
	pub in_flight: UpDownCounter<i64>,
}

impl AsrMetrics {
	pub fn new(meter: &Meter) -> Self {
		Self {
			requests: meter.u64_counter("asr.requests").with_description("Transcription requests received").build(),
			requests_rejected: meter
				.u64_counter("asr.requests.rejected")
				.with_description("Requests rejected before reaching the gate")
				.build(),
			transcriptions_completed: meter
				.u64_counter("asr.transcriptions.completed")
				.with_description("Total successful transcriptions")
				.build(),
			transcriptions_failed: meter
				.u64_counter("asr.transcriptions.failed")
				.with_description("Total failed transcriptions")
				.build(),
			bytes_received: meter.u64_counter("asr.bytes.received").with_description("Audio bytes received").build(),

			queue_wait_latency: meter
				.f64_histogram("asr.gate.wait")
				.with_description("Time spent waiting for an admission permit (ms)")
				.build(),
			transcription_latency: meter
				.f64_histogram("asr.transcription.latency")
				.with_description("Time spent inside the speech model (ms)")
				.build(),

			in_flight: meter
				.i64_up_down_counter("asr.gate.in_flight")
				.with_description("Transcriptions currently holding a permit")
				.build(),
		}
	}
}

impl Default for AsrMetrics {
	/// Metrics on the global meter; a no-op until a provider is installed
	fn default() -> Self {
		Self::new(&global::meter(METER_NAME))
	}
}

/// Exporter handles flushed on shutdown
#[derive(Default)]
pub struct Telemetry {
	tracer_provider: Option<SdkTracerProvider>,
	meter_provider: Option<SdkMeterProvider>,
}

impl Telemetry {
	/// Flush and stop exporters
	pub fn shutdown(self) {
		if let Some(provider) = self.tracer_provider {
			if let Err(e) = provider.shutdown() {
				warn!(error = %e, "Tracer provider shutdown failed");
			}
		}
		if let Some(provider) = self.meter_provider {
			if let Err(e) = provider.shutdown() {
				warn!(error = %e, "Meter provider shutdown failed");
			}
		}
	}
}

/// Install the tracing subscriber and, when an OTLP endpoint is configured,
/// the trace and metric exporters.
///
/// Exporter failures are not fatal: the service falls back to local logs and
/// no-op metrics.
pub fn init_observability(config: &Config) -> Result<(Telemetry, AsrMetrics)> {
	let mut fallback_reason = None;
	let telemetry = match config.otlp_endpoint.as_deref() {
		Some(endpoint) => match build_exporters(&config.service_name, endpoint) {
			Ok((tracer_provider, meter_provider)) => Telemetry {
				tracer_provider: Some(tracer_provider),
				meter_provider: Some(meter_provider),
			},
			Err(e) => {
				fallback_reason = Some(e);
				Telemetry::default()
			}
		},
		None => Telemetry::default(),
	};

	let otel_layer = telemetry
		.tracer_provider
		.as_ref()
		.map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(METER_NAME)));

	let env_filter = EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

	let fmt_layer = if config.log_json {
		tracing_subscriber::fmt::layer().json().flatten_event(true).with_span_list(false).boxed()
	} else {
		tracing_subscriber::fmt::layer().with_target(true).boxed()
	};

	tracing_subscriber::registry().with(env_filter).with(fmt_layer).with(otel_layer).try_init()?;

	match (&config.otlp_endpoint, fallback_reason) {
		(Some(endpoint), None) => info!(service = %config.service_name, %endpoint, "✅ OpenTelemetry initialized with OTLP export"),
		(Some(endpoint), Some(e)) => {
			warn!(error = %e, %endpoint, "⚠️ OTLP observability failed to initialize, falling back to local logs only");
		}
		(None, _) => info!("OTLP endpoint not configured, telemetry stays local"),
	}

	Ok((telemetry, AsrMetrics::default()))
}

fn build_exporters(service_name: &str, endpoint: &str) -> Result<(SdkTracerProvider, SdkMeterProvider)> {
	// Create resource with service metadata
	let resource = Resource::builder()
		.with_service_name(service_name.to_string())
		.with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
		.build();

	let span_exporter = SpanExporter::builder().with_tonic().with_endpoint(endpoint).build()?;
	let tracer_provider = SdkTracerProvider::builder()
		.with_sampler(Sampler::AlwaysOn)
		.with_id_generator(RandomIdGenerator::default())
		.with_resource(resource.clone())
		.with_batch_exporter(span_exporter)
		.build();

	let metric_exporter = MetricExporter::builder().with_tonic().with_endpoint(endpoint).build()?;
	let reader = PeriodicReader::builder(metric_exporter).with_interval(Duration::from_secs(10)).build();
	let meter_provider = SdkMeterProvider::builder().with_reader(reader).with_resource(resource).build();

	global::set_tracer_provider(tracer_provider.clone());
	global::set_meter_provider(meter_provider.clone());

	Ok((tracer_provider, meter_provider))
}
