//! Change coalescing
//!
//! Buffers [`DecorationChange`]s for a fixed window and delivers them as a
//! single merged event. The first buffered change arms a timer; everything
//! arriving before it fires is merged into the same delivery.

use crate::change::DecorationChange;
use decor_foundation::Emitter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

/// Merges change events fired within `window` of each other
pub struct ChangeCoalescer {
    window: Duration,
    target: Arc<Emitter<DecorationChange>>,
    buffer: Arc<Mutex<Buffer>>,
}

#[derive(Default)]
struct Buffer {
    change: Option<DecorationChange>,
    /// bumped on every arm; a timer only delivers the window it was armed for
    generation: u64,
}

impl ChangeCoalescer {
    pub fn new(window: Duration, target: Arc<Emitter<DecorationChange>>) -> Self {
        Self {
            window,
            target,
            buffer: Arc::new(Mutex::new(Buffer::default())),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True while a merged event is waiting for its timer
    pub fn has_pending(&self) -> bool {
        self.buffer.lock().change.is_some()
    }

    /// Buffer a change, arming the delivery timer if none is running
    pub fn push(&self, change: DecorationChange) {
        let generation = {
            let mut buffer = self.buffer.lock();
            match buffer.change.take() {
                Some(buffered) => {
                    buffer.change = Some(buffered.merge(change));
                    return;
                }
                None => {
                    buffer.change = Some(change);
                    buffer.generation += 1;
                    buffer.generation
                }
            }
        };

        // outside a runtime there is no timer, deliver right away
        let Ok(runtime) = Handle::try_current() else {
            self.flush();
            return;
        };

        let buffer = Arc::clone(&self.buffer);
        let target = Arc::clone(&self.target);
        let window = self.window;
        runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let merged = {
                let mut buffer = buffer.lock();
                if buffer.generation != generation {
                    return;
                }
                buffer.change.take()
            };
            if let Some(merged) = merged {
                trace!(emitter = target.name(), generation, "Delivering coalesced change");
                target.fire(merged);
            }
        });
    }

    /// Deliver the buffered change now (the armed timer then finds nothing)
    pub fn flush(&self) {
        let merged = self.buffer.lock().change.take();
        if let Some(merged) = merged {
            self.target.fire(merged);
        }
    }
}
