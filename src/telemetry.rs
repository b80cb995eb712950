use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter, MeterProvider},
    trace::TracerProvider as _,
    KeyValue,
};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    resource::Resource,
    trace::SdkTracerProvider,
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, Registry};

use crate::engine::ports::MetricsSink;
use crate::obs::tracingx::filter_from_env;

const SCOPE: &str = "wexel_core";

fn commit_sha() -> String {
    std::env::var("WXL_COMMIT_SHA").unwrap_or_else(|_| "unknown".into())
}

pub struct Telemetry {
    pub tracer_provider: SdkTracerProvider,
    pub meter_provider: SdkMeterProvider,
    pub meter: Meter,
    pub op_latency_ms: Histogram<f64>,
    pub boost_progress_bps: Histogram<f64>,
}

impl Telemetry {
    /// Handle sobre providers já montados; instrumentos criados no escopo do crate.
    pub fn from_providers(tracer_provider: SdkTracerProvider, meter_provider: SdkMeterProvider) -> Self {
        let meter = meter_provider.meter(SCOPE);
        let op_latency_ms = meter
            .f64_histogram("wexel_op_latency_ms")
            .with_unit("ms")
            .with_description("Latency of wexel service operations in ms")
            .build();
        let boost_progress_bps = meter
            .f64_histogram("wexel_boost_progress_bps")
            .with_unit("bps")
            .with_description("Boost value as a fraction of the pool target")
            .build();
        Self { tracer_provider, meter_provider, meter, op_latency_ms, boost_progress_bps }
    }

    /// Flush + shutdown dos providers. Falhas viram `warn!`; devolve quantos passos falharam.
    pub fn shutdown(&self) -> usize {
        let mut failed = 0;
        if let Err(e) = self.meter_provider.force_flush() {
            tracing::warn!(error = %e, "falha no flush de métricas");
            failed += 1;
        }
        if let Err(e) = self.meter_provider.shutdown() {
            tracing::warn!(error = %e, "falha no shutdown do meter provider");
            failed += 1;
        }
        if let Err(e) = self.tracer_provider.shutdown() {
            tracing::warn!(error = %e, "falha no shutdown do tracer provider");
            failed += 1;
        }
        failed
    }

    /// Sink de métricas do serviço sobre o meter deste handle.
    pub fn metrics_sink(&self) -> OtelMetrics {
        OtelMetrics::new(self.meter.clone())
    }
}

pub fn init(service_name: &str) -> Result<Telemetry> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4318".to_string());

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", service_name.to_string()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("git.commit.sha", commit_sha()),
        ])
        .build();

    // ---- Traces (OTLP/HTTP) ----
    let span_exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(&endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_batch_exporter(span_exporter)
        .build();

    let tracer = tracer_provider.tracer(SCOPE);

    // ---- Métricas (OTLP/HTTP) ----
    let metric_exporter = MetricExporter::builder()
        .with_http()
        .with_endpoint(&endpoint)
        .build()?;

    let reader = PeriodicReader::builder(metric_exporter)
        .with_interval(Duration::from_secs(10))
        .build();

    let meter_provider = SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build();

    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider.clone());

    // tracing -> OTel
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let subscriber = Registry::default()
        .with(filter_from_env())
        .with(fmt_layer)
        .with(otel_layer);
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        tracing::warn!(error = %e, "subscriber global já instalado");
    }

    Ok(Telemetry::from_providers(tracer_provider, meter_provider))
}

/// Cria um `Span` INFO com nome **estático** (exigência do tracing) e
/// coloca o nome dinâmico em `span_name`. Inclui `git_commit_sha`.
pub fn make_info_span(name: &str, op_id: u64, component: &str) -> tracing::Span {
    let commit = commit_sha();
    tracing::span!(
        target: "wexel_core",
        Level::INFO,
        "op",
        git_commit_sha = %commit,
        span_name = %name,
        op_id = op_id,
        component = component
    )
}

fn attributes(labels: &[(&'static str, String)]) -> Vec<KeyValue> {
    labels.iter().map(|(k, v)| KeyValue::new(*k, v.clone())).collect()
}

/// `MetricsSink` sobre instrumentos OTel, criados sob demanda e cacheados por nome.
pub struct OtelMetrics {
    meter: Meter,
    counters: Mutex<HashMap<&'static str, Counter<u64>>>,
    gauges: Mutex<HashMap<&'static str, Gauge<f64>>>,
}

impl OtelMetrics {
    pub fn new(meter: Meter) -> Self {
        Self { meter, counters: Mutex::new(HashMap::new()), gauges: Mutex::new(HashMap::new()) }
    }

    /// Usa o meter provider global (no-op se `init` não rodou).
    pub fn global() -> Self {
        Self::new(global::meter(SCOPE))
    }
}

impl MetricsSink for OtelMetrics {
    fn incr_counter(&self, name: &'static str, value: u64, labels: &[(&'static str, String)]) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let counter = counters.entry(name).or_insert_with(|| self.meter.u64_counter(name).build());
        counter.add(value, &attributes(labels));
    }

    fn record_gauge(&self, name: &'static str, value: f64, labels: &[(&'static str, String)]) {
        let mut gauges = self.gauges.lock().unwrap_or_else(|e| e.into_inner());
        let gauge = gauges.entry(name).or_insert_with(|| self.meter.f64_gauge(name).build());
        gauge.record(value, &attributes(labels));
    }
}
