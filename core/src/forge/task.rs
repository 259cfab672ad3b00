//! Background operation handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::cancel::CancelToken;
use crate::error::{ForgeError, ForgeResult};

/// A forge or install running on a worker thread.
///
/// Progress events arrive on [`progress`](Self::progress) in order; the
/// channel closes when the operation ends.
pub struct Task<T, P> {
    progress: Receiver<P>,
    cancel: CancelToken,
    handle: JoinHandle<ForgeResult<T>>,
}

impl<T, P> Task<T, P> {
    pub(crate) fn new(
        progress: Receiver<P>,
        cancel: CancelToken,
        handle: JoinHandle<ForgeResult<T>>,
    ) -> Self {
        Self {
            progress,
            cancel,
            handle,
        }
    }

    pub fn progress(&self) -> &Receiver<P> {
        &self.progress
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result, dropping any unread progress.
    pub fn join(self) -> ForgeResult<T> {
        self.handle.join().unwrap_or_else(|_| {
            Err(ForgeError::IoFailure {
                context: "worker thread".to_string(),
                message: "panicked".to_string(),
            })
        })
    }

    /// Feed every progress event to `on_progress`, then return the result.
    pub fn wait(self, mut on_progress: impl FnMut(P)) -> ForgeResult<T> {
        for event in self.progress.iter() {
            on_progress(event);
        }
        self.handle.join().unwrap_or_else(|_| {
            Err(ForgeError::IoFailure {
                context: "worker thread".to_string(),
                message: "panicked".to_string(),
            })
        })
    }
}

/// Marks the engine busy for as long as it lives.
#[derive(Debug)]
pub(crate) struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    /// Fails with `Busy` if another guard on `flag` is alive.
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> ForgeResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ForgeError::Busy)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
