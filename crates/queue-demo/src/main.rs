mod config;
mod metrics;
mod words;

extern crate dotenv;

use bounded_queue::{BoundedQueue, CancelToken, Pipeline};
use queue_common::{
    shutdown::{setup_shutdown_handler, setup_signal_handlers},
    telemetry::setup_telemetry,
};
use tracing::{info, warn};

use crate::{
    config::Configuration,
    metrics::setup_metrics,
    words::{capitalize, split_round_robin},
};

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    setup_telemetry("queue-demo")?;

    let config = Configuration::from_env()?;
    info!("Chosen configuration: {:#?}", config);

    let metrics = setup_metrics(config.metrics_port)?;

    let token = CancelToken::new();
    let signal_flag = setup_signal_handlers()?;
    let shutdown_token = token.clone();
    setup_shutdown_handler(signal_flag, move || shutdown_token.cancel());

    let queue = BoundedQueue::new(config.capacity)?;

    let items_produced = metrics.items_produced.clone();
    let items_consumed = metrics.items_consumed.clone();
    let mut pipeline = Pipeline::new(queue)
        .producer_delay(config.producer_delay)
        .consumer_delay(config.consumer_delay)
        .cancel_token(token)
        .producer_observer(move |item: &String| {
            info!("Produced: {}", capitalize(item));
            items_produced.inc();
        })
        .observer(move |item: &String| {
            info!("Consumed: {}", capitalize(item));
            items_consumed.inc();
        });

    for source in split_round_robin(config.items, config.producers) {
        pipeline = pipeline.producer(source);
    }

    for _ in 0..config.consumers {
        pipeline = pipeline.consumer(Vec::<String>::new());
    }

    let report = pipeline.run()?;

    let cancelled = report
        .producers
        .iter()
        .map(|p| p.status)
        .chain(report.consumers.iter().map(|c| c.status))
        .filter(|status| !status.is_completed())
        .count();
    metrics.workers_cancelled.inc_by(cancelled as u64);

    let complete = report.is_complete();
    let produced = report.total_produced();
    let delivered = report
        .into_destinations()
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    info!(
        "Delivered {} of {} produced items: {:?}",
        delivered.len(),
        produced,
        delivered
    );

    if !complete {
        warn!("{} workers stopped before finishing", cancelled);
    }

    Ok(())
}
