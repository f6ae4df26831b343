use prometheus_exporter::prometheus::core::{AtomicU64, GenericCounter};

pub struct Metrics {
    pub items_produced: GenericCounter<AtomicU64>,
    pub items_consumed: GenericCounter<AtomicU64>,
    pub workers_cancelled: GenericCounter<AtomicU64>,
}

/// Registers the counters, and serves them on `port` if one is configured.
pub fn setup_metrics(port: Option<u16>) -> anyhow::Result<Metrics> {
    if let Some(port) = port {
        let binding = format!("0.0.0.0:{port}").parse()?;
        prometheus_exporter::start(binding)?;
        tracing::info!("Serving metrics on {}", binding);
    }

    let items_produced = prometheus_exporter::prometheus::register_int_counter!(
        "queue_items_produced",
        "Items enqueued by producers"
    )?;

    let items_consumed = prometheus_exporter::prometheus::register_int_counter!(
        "queue_items_consumed",
        "Items delivered to consumer destinations"
    )?;

    let workers_cancelled = prometheus_exporter::prometheus::register_int_counter!(
        "queue_workers_cancelled",
        "Workers that stopped before finishing their loop"
    )?;

    Ok(Metrics {
        items_produced,
        items_consumed,
        workers_cancelled,
    })
}
