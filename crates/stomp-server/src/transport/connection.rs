//! Transport handle of one TCP connection.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::HandleError;
use crate::metrics::SEND_DROPS_TOTAL;
use crate::registry::ConnectionHandle;

/// Queues encoded frames for the connection's writer task.
///
/// `close` cancels `closed`; the writer flushes whatever is already queued
/// and then shuts the socket down.
pub struct TcpConnectionHandle {
    tx: mpsc::Sender<Bytes>,
    closed: CancellationToken,
    dropped_frames: AtomicU64,
}

impl TcpConnectionHandle {
    /// Wrap the writer queue and close signal.
    pub fn new(tx: mpsc::Sender<Bytes>, closed: CancellationToken) -> Self {
        Self {
            tx,
            closed,
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Frames refused because the queue was full or the writer gone.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl ConnectionHandle for TcpConnectionHandle {
    fn send(&self, frame: Bytes) -> bool {
        if !self.closed.is_cancelled() && self.tx.try_send(frame).is_ok() {
            return true;
        }
        let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
        counter!(SEND_DROPS_TOTAL).increment(1);
        false
    }

    fn close(&self) -> Result<(), HandleError> {
        if self.closed.is_cancelled() {
            return Err(HandleError::AlreadyClosed);
        }
        self.closed.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn make_handle(capacity: usize) -> (TcpConnectionHandle, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (TcpConnectionHandle::new(tx, CancellationToken::new()), rx)
    }

    #[tokio::test]
    async fn send_reaches_queue() {
        let (handle, mut rx) = make_handle(4);
        assert!(handle.send(Bytes::from_static(b"RECEIPT\n\n\0")));
        assert_eq!(&rx.recv().await.unwrap()[..], b"RECEIPT\n\n\0");
        assert_eq!(handle.dropped_frames(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_frame() {
        let (handle, _rx) = make_handle(1);
        assert!(handle.send(Bytes::from_static(b"a")));
        assert!(!handle.send(Bytes::from_static(b"b")));
        assert_eq!(handle.dropped_frames(), 1);
    }

    #[tokio::test]
    async fn closed_receiver_drops_frame() {
        let (handle, rx) = make_handle(4);
        drop(rx);
        assert!(!handle.send(Bytes::from_static(b"a")));
    }

    #[test]
    fn close_once_then_error() {
        let (handle, _rx) = make_handle(4);
        assert!(handle.close().is_ok());
        assert!(handle.is_closed());
        assert_matches!(handle.close(), Err(HandleError::AlreadyClosed));
        assert!(!handle.send(Bytes::from_static(b"late")));
    }
}
