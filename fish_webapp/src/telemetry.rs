use fish_quality::QualityVerdict;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    request_counter: Counter<u64>,
    analysis_duration: Histogram<u64>,
    verdict_counter: Counter<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("fish_webapp");
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of requests")
            .build();

        let boundaries = generate_boundaries((50, 150, 400, 1000, 5000));

        let analysis_duration = meter
            .u64_histogram("analysis_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of image analyses in milliseconds")
            .build();

        let verdict_counter = meter
            .u64_counter("quality_verdicts_total")
            .with_description("Quality verdicts handed out")
            .build();

        Ok(Metrics {
            request_counter,
            analysis_duration,
            verdict_counter,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_analysis_duration(&self, duration_ms: u64, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.analysis_duration.record(duration_ms, &attributes);
    }

    pub fn record_verdict(&self, verdict: QualityVerdict) {
        let attributes = vec![KeyValue::new("verdict", verdict.as_str())];
        self.verdict_counter.add(1, &attributes);
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 25;
    let middle_step: usize = 50;
    let end_step: usize = 200;
    let tail_step: usize = 1000;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
