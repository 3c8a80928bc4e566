//! Event fan-out and pipe pumping.
//!
//! Subscribers receive every `RunEvent` in emission order over an unbounded
//! channel. Dropping a `Subscription` unregisters it; nothing else needs to be
//! called to stop delivery.

use crate::model::{RunEvent, StreamChannel};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Default)]
struct Registry {
    next_id: u64,
    senders: Vec<(u64, UnboundedSender<RunEvent>)>,
}

/// Shared list of event subscribers.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    inner: Arc<Mutex<Registry>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        reg.next_id += 1;
        let id = reg.next_id;
        reg.senders.push((id, tx));
        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every live subscriber. Closed receivers are pruned.
    pub(crate) fn emit(&self, event: RunEvent) {
        let mut reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        reg.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .len()
    }
}

/// Receiving end of a supervisor event stream.
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiver<RunEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the supervisor is gone and
    /// every queued event was consumed.
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.rx.recv().await
    }

    /// Take a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<RunEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            let mut reg = inner.lock().unwrap_or_else(PoisonError::into_inner);
            reg.senders.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Forward raw chunks from a child pipe until EOF. Chunks are decoded lossily
/// and never split or joined on line boundaries.
pub(crate) async fn pump<R>(mut pipe: R, channel: StreamChannel, subscribers: Subscribers)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => subscribers.emit(RunEvent::Output {
                channel,
                text: String::from_utf8_lossy(&buf[..n]).into_owned(),
            }),
            Err(e) => {
                tracing::debug!(?channel, error = %e, "pipe read failed");
                break;
            }
        }
    }
}
