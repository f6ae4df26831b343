use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sets the returned flag on SIGINT or SIGTERM.
pub fn setup_signal_handlers() -> Result<Arc<AtomicBool>, std::io::Error> {
    let signal_flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, signal_flag.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, signal_flag.clone())?;
    Ok(signal_flag)
}

/// Watches `signal_flag` from a background thread and runs `on_shutdown`
/// once it is set.
///
/// Signal handlers may only touch the flag, so the actual shutdown work
/// (waking blocked workers) happens on this thread instead.
pub fn setup_shutdown_handler<F>(signal_flag: Arc<AtomicBool>, on_shutdown: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::spawn(move || {
        while !signal_flag.load(Ordering::Relaxed) {
            std::thread::sleep(POLL_INTERVAL);
        }

        info!("Shutdown signal detected. Shutting down gracefully.");
        on_shutdown();
    })
}
