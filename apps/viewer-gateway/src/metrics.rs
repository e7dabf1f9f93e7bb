use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static UPLOADS: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("gateway_uploads_total", "Model files stored in the bucket").unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static TRANSLATIONS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "gateway_translations_submitted_total",
        "Translation jobs accepted by the model derivative service",
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static UPSTREAM_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("gateway_upstream_errors_total", "Failed calls to APS"),
        &["operation"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

/// Forces registration so every series shows up before its first increment.
pub fn init() {
    Lazy::force(&UPLOADS);
    Lazy::force(&TRANSLATIONS_SUBMITTED);
    Lazy::force(&UPSTREAM_ERRORS);
}

pub fn export_prometheus() -> String {
    let metric_families = REGISTRY.gather();
    let mut buf = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buf).ok();
    String::from_utf8(buf).unwrap_or_default()
}
