//! Timer task driving the caret hint

use imprint_core::CaretBlink;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Ticks a shared [`CaretBlink`] on a tokio interval. The task is aborted
/// when this handle is dropped.
pub struct CaretBlinkTask {
    handle: JoinHandle<()>,
}

impl CaretBlinkTask {
    /// Start blinking `caret` on the current runtime
    pub fn spawn(caret: Arc<Mutex<CaretBlink>>) -> Self {
        let period = {
            let mut caret = caret.lock();
            caret.start(Instant::now());
            caret.interval()
        };

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                caret.lock().tick(Instant::now());
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CaretBlinkTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
