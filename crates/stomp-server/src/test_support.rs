//! In-memory connection handle for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::errors::HandleError;
use crate::registry::ConnectionHandle;

/// Records every frame sent through it.
#[derive(Default)]
pub(crate) struct RecordingHandle {
    frames: Mutex<Vec<Bytes>>,
    closes: AtomicUsize,
    refuse: AtomicBool,
    fail_close: AtomicBool,
}

impl RecordingHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Frames received so far, lossily decoded.
    pub(crate) fn frames(&self) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub(crate) fn refuse_sends(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }
}

impl ConnectionHandle for RecordingHandle {
    fn send(&self, frame: Bytes) -> bool {
        if self.refuse.load(Ordering::SeqCst) {
            return false;
        }
        self.frames.lock().push(frame);
        true
    }

    fn close(&self) -> Result<(), HandleError> {
        let _ = self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(HandleError::AlreadyClosed);
        }
        Ok(())
    }
}
