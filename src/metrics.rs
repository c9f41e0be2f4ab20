// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Tally metrics --------
pub static INCREMENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "increments_total",
            "accepted increments (labels: target = fixed|open, direction = buy|sell|none)",
        ),
        &["target", "direction"],
    )
    .unwrap()
});

pub static REQUESTS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("requests_rejected_total", "rejected HTTP requests by reason"),
        &["reason"],
    )
    .unwrap()
});

pub static DAILY_RESETS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("daily_resets_total", "midnight tally resets").unwrap());

pub static PERSIST_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("persist_errors_total", "failed writes of the daily file").unwrap()
});

// -------- Chat message sync --------
pub static SYNC: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sync_total",
            "message sync attempts (label: outcome = unchanged|created|edited|failed)",
        ),
        &["outcome"],
    )
    .unwrap()
});

// Round trip of one create/edit call (milliseconds)
pub static SYNC_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "sync_latency_ms",
        "Latency of one create/edit call to the chat channel (ms)",
    ))
    .unwrap()
});

// ---- Config visibility ----
pub static CONFIG_TIMEZONE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_timezone", "configured timezone (label: tz)"),
        &["tz"],
    )
    .unwrap()
});

pub static CONFIG_OPEN_ITEMS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "config_open_items",
            "open item policy (label: mode)",
        ),
        &["mode"],
    )
    .unwrap()
});

pub static CONFIG_CATALOG_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("config_catalog_items", "number of fixed catalog items").unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(INCREMENTS.clone())),
        REGISTRY.register(Box::new(REQUESTS_REJECTED.clone())),
        REGISTRY.register(Box::new(DAILY_RESETS.clone())),
        REGISTRY.register(Box::new(PERSIST_ERRORS.clone())),
        REGISTRY.register(Box::new(SYNC.clone())),
        REGISTRY.register(Box::new(SYNC_LATENCY.clone())),
        REGISTRY.register(Box::new(CONFIG_TIMEZONE.clone())),
        REGISTRY.register(Box::new(CONFIG_OPEN_ITEMS.clone())),
        REGISTRY.register(Box::new(CONFIG_CATALOG_ITEMS.clone())),
    ] {
        let _ = m;
    }
}

// Config gauges, set once at startup
pub fn record_config(tz: &str, open_mode: &str, catalog_items: usize) {
    CONFIG_TIMEZONE.with_label_values(&[tz]).set(1);
    CONFIG_OPEN_ITEMS.with_label_values(&[open_mode]).set(1);
    CONFIG_CATALOG_ITEMS.set(catalog_items as i64);
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_metrics_show_up_in_text_format() {
        init();
        init(); // second registration is ignored
        DAILY_RESETS.inc();
        let body = String::from_utf8(encode_metrics()).unwrap();
        assert!(body.contains("daily_resets_total"));
    }

    #[test]
    fn config_gauges_keep_policy_and_size_apart() {
        init();
        record_config("Asia/Tashkent", "split", 10);
        assert_eq!(CONFIG_OPEN_ITEMS.with_label_values(&["split"]).get(), 1);
        assert_eq!(CONFIG_CATALOG_ITEMS.get(), 10);
        let body = String::from_utf8(encode_metrics()).unwrap();
        assert!(body.contains("config_open_items{mode=\"split\"} 1"));
        assert!(body.contains("config_catalog_items 10"));
    }
}
