//! Periodic background driver used for generation and job spawning.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, tick};
use tracing::{debug, error};

/// Calls `tick` on its own thread once per interval until stopped.
pub struct PeriodicDriver {
    name: String,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicDriver {
    pub fn spawn<F>(name: &str, interval: Duration, mut on_tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let ticker = tick(interval);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    select! {
                        // Fires once the sender is dropped.
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => on_tick(),
                    }
                }
            })?;
        debug!(driver = name, ?interval, "driver started");
        Ok(Self {
            name: name.to_string(),
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop ticking and join the thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(driver = %self.name, "driver thread panicked");
            }
            debug!(driver = %self.name, "driver stopped");
        }
    }
}

impl Drop for PeriodicDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let driver = {
            let ticks = Arc::clone(&ticks);
            PeriodicDriver::spawn("ticker", Duration::from_millis(10), move || {
                ticks.fetch_add(1, Ordering::SeqCst);
            })
            .expect("spawn driver")
        };
        thread::sleep(Duration::from_millis(120));
        driver.stop();

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop >= 3, "only {after_stop} ticks");
        thread::sleep(Duration::from_millis(50));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn stop_does_not_wait_for_next_tick() {
        let driver = PeriodicDriver::spawn("slow", Duration::from_secs(60), || {}).expect("spawn");
        let started = std::time::Instant::now();
        driver.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
