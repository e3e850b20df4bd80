//! Connection transport abstraction.
//!
//! The registry never talks to sockets. A connection layer (WebSocket,
//! in-process channel, test mock) hands it a [`ConnectionHandle`] whose sink
//! accepts frames without blocking.

use crate::error::{LiveError, LiveResult};
use crate::protocol::PushFrame;
use liveset_types::ConnectionId;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Accepts frames for one connection.
///
/// `push` is called while the registry lock is held, so it must not block.
/// Returning `ChannelClosed` tells the registry the connection is gone.
pub trait PushSink: Send + Sync {
    fn push(&self, frame: PushFrame) -> LiveResult<()>;
}

impl PushSink for mpsc::UnboundedSender<PushFrame> {
    fn push(&self, frame: PushFrame) -> LiveResult<()> {
        self.send(frame).map_err(|_| LiveError::ChannelClosed)
    }
}

/// A connection as the registry sees it: an id and a place to push frames.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sink: Arc<dyn PushSink>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sink: Arc<dyn PushSink>) -> Self {
        Self { id, sink }
    }

    /// Creates a handle backed by an unbounded channel, returning the
    /// receiving end for the connection's writer task.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PushFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ConnectionId::new(), Arc::new(tx)), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn sink(&self) -> Arc<dyn PushSink> {
        Arc::clone(&self.sink)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A recording sink for testing.
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records every frame pushed to it; can be closed to simulate a dead socket.
    #[derive(Debug, Default)]
    pub struct MockSink {
        frames: Mutex<Vec<PushFrame>>,
        closed: AtomicBool,
    }

    impl MockSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a sink together with a handle for a fresh connection.
        pub fn handle() -> (ConnectionHandle, Arc<MockSink>) {
            let sink = Arc::new(Self::new());
            let handle = ConnectionHandle::new(ConnectionId::new(), sink.clone());
            (handle, sink)
        }

        /// All frames received so far.
        pub fn frames(&self) -> Vec<PushFrame> {
            self.frames
                .lock()
                .map(|f| f.clone())
                .unwrap_or_default()
        }

        /// Drains and returns the received frames.
        pub fn take(&self) -> Vec<PushFrame> {
            self.frames
                .lock()
                .map(|mut f| std::mem::take(&mut *f))
                .unwrap_or_default()
        }

        pub fn count(&self) -> usize {
            self.frames.lock().map(|f| f.len()).unwrap_or(0)
        }

        /// Makes every further push fail with `ChannelClosed`.
        pub fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    impl PushSink for MockSink {
        fn push(&self, frame: PushFrame) -> LiveResult<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(LiveError::ChannelClosed);
            }
            self.frames
                .lock()
                .map_err(|_| LiveError::ChannelClosed)?
                .push(frame);
            Ok(())
        }
    }
}
