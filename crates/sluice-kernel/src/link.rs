//! Bounded record link with backpressure and half-close.
//!
//! A link connects exactly two adjacent stages. The sender blocks when the
//! queue is full; the receiver blocks when it is empty. Either end can be
//! closed independently:
//!
//! ```text
//!   LinkSender ──▶ [VecDeque<Record>, capacity N] ──▶ LinkReceiver
//!                  ├── send blocks when full (backpressure)
//!                  ├── receive blocks when empty
//!                  ├── close sender   → receiver drains, then sees Closed
//!                  └── close receiver → queue dropped, every send (pending
//!                                       or future) returns RejectedClosed
//! ```
//!
//! Capacity 0 makes a rendezvous link: `send` completes only once the
//! receiver has actually taken the record, so a producer never gets ahead
//! of its consumer.
//!
//! The buffer lives behind a `std::sync::Mutex` because critical sections are
//! a handful of `VecDeque` operations. Closed flags are atomics so that `Drop`
//! never has to await. Wakers are stored under the lock to prevent lost
//! wakeups.

use std::collections::VecDeque;
use std::future::poll_fn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use sluice_types::{Record, RecvOutcome, SendOutcome};

/// Default number of records a link buffers before the sender blocks.
pub const DEFAULT_LINK_CAPACITY: usize = 4;

struct LinkBuffer {
    queue: VecDeque<Record>,
    capacity: usize,
    /// Records ever pushed. A send's ticket is the value after its push.
    pushed: u64,
    /// Records ever taken by the receiver.
    taken: u64,
    reader_waker: Option<Waker>,
    writer_waker: Option<Waker>,
}

impl LinkBuffer {
    fn wake_reader(&mut self) {
        if let Some(waker) = self.reader_waker.take() {
            waker.wake();
        }
    }

    fn wake_writer(&mut self) {
        if let Some(waker) = self.writer_waker.take() {
            waker.wake();
        }
    }
}

struct LinkShared {
    buf: Mutex<LinkBuffer>,
    sender_closed: AtomicBool,
    receiver_closed: AtomicBool,
}

impl LinkShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, LinkBuffer> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Sending end of a link, owned by the upstream stage.
pub struct LinkSender {
    shared: Arc<LinkShared>,
}

/// Receiving end of a link, owned by the downstream stage.
pub struct LinkReceiver {
    shared: Arc<LinkShared>,
}

/// Create a link with the given capacity (0 = rendezvous).
pub fn link(capacity: usize) -> (LinkSender, LinkReceiver) {
    let shared = Arc::new(LinkShared {
        buf: Mutex::new(LinkBuffer {
            queue: VecDeque::with_capacity(capacity.max(1)),
            capacity,
            pushed: 0,
            taken: 0,
            reader_waker: None,
            writer_waker: None,
        }),
        sender_closed: AtomicBool::new(false),
        receiver_closed: AtomicBool::new(false),
    });

    (
        LinkSender { shared: shared.clone() },
        LinkReceiver { shared },
    )
}

/// Create a link with [`DEFAULT_LINK_CAPACITY`].
pub fn link_default() -> (LinkSender, LinkReceiver) {
    link(DEFAULT_LINK_CAPACITY)
}

impl LinkSender {
    /// Send a record, waiting while the link is full.
    ///
    /// Returns `RejectedClosed` without blocking once the receiver is closed,
    /// including when it closes while this call is waiting.
    pub async fn send(&self, record: Record) -> SendOutcome {
        let mut slot = Some(record);
        let ticket = match poll_fn(|cx| self.poll_push(cx, &mut slot)).await {
            Some(ticket) => ticket,
            None => return SendOutcome::RejectedClosed,
        };

        if self.capacity() > 0 {
            return SendOutcome::Accepted;
        }
        poll_fn(|cx| self.poll_handoff(cx, ticket)).await
    }

    fn poll_push(&self, cx: &mut Context<'_>, slot: &mut Option<Record>) -> Poll<Option<u64>> {
        if self.shared.receiver_closed.load(Ordering::Acquire) {
            return Poll::Ready(None);
        }

        let mut inner = self.shared.lock();

        // Re-check under lock (may have raced with receiver close)
        if self.shared.receiver_closed.load(Ordering::Acquire) {
            return Poll::Ready(None);
        }

        if inner.queue.len() < inner.capacity.max(1) {
            let Some(record) = slot.take() else {
                return Poll::Ready(None);
            };
            inner.queue.push_back(record);
            inner.pushed += 1;
            let ticket = inner.pushed;
            inner.wake_reader();
            Poll::Ready(Some(ticket))
        } else {
            inner.writer_waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }

    fn poll_handoff(&self, cx: &mut Context<'_>, ticket: u64) -> Poll<SendOutcome> {
        let mut inner = self.shared.lock();
        if inner.taken >= ticket {
            Poll::Ready(SendOutcome::Accepted)
        } else if self.shared.receiver_closed.load(Ordering::Acquire) {
            Poll::Ready(SendOutcome::RejectedClosed)
        } else {
            inner.writer_waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }

    /// Signal end of data. Idempotent.
    pub fn close(&self) {
        self.shared.sender_closed.store(true, Ordering::Release);
        self.shared.lock().wake_reader();
    }

    /// Whether the receiving end has been closed.
    pub fn is_receiver_closed(&self) -> bool {
        self.shared.receiver_closed.load(Ordering::Acquire)
    }

    /// Configured capacity of this link.
    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity
    }
}

impl Drop for LinkSender {
    fn drop(&mut self) {
        self.shared.sender_closed.store(true, Ordering::Release);
        // If the lock is poisoned the reader still sees sender_closed on its next poll.
        if let Ok(mut inner) = self.shared.buf.lock() {
            inner.wake_reader();
        }
    }
}

impl LinkReceiver {
    /// Receive the next record, waiting while the link is empty and open.
    pub async fn receive(&self) -> RecvOutcome {
        poll_fn(|cx| self.poll_receive(cx)).await
    }

    fn poll_receive(&self, cx: &mut Context<'_>) -> Poll<RecvOutcome> {
        if self.shared.receiver_closed.load(Ordering::Acquire) {
            return Poll::Ready(RecvOutcome::Closed);
        }

        let mut inner = self.shared.lock();

        if let Some(record) = inner.queue.pop_front() {
            inner.taken += 1;
            inner.wake_writer();
            Poll::Ready(RecvOutcome::Record(record))
        } else if self.shared.sender_closed.load(Ordering::Acquire) {
            Poll::Ready(RecvOutcome::Closed)
        } else {
            inner.reader_waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }

    /// Stop reading. Buffered records are dropped and the sender is woken so
    /// that a blocked `send` returns `RejectedClosed`. Idempotent.
    pub fn close(&self) {
        self.shared.receiver_closed.store(true, Ordering::Release);
        let mut inner = self.shared.lock();
        inner.queue.clear();
        inner.wake_writer();
    }

    /// Whether the sending end has been closed.
    pub fn is_sender_closed(&self) -> bool {
        self.shared.sender_closed.load(Ordering::Acquire)
    }

    /// Number of records currently buffered.
    pub fn buffered(&self) -> usize {
        self.shared.lock().queue.len()
    }
}

impl Drop for LinkReceiver {
    fn drop(&mut self) {
        self.shared.receiver_closed.store(true, Ordering::Release);
        if let Ok(mut inner) = self.shared.buf.lock() {
            inner.queue.clear();
            inner.wake_writer();
        }
    }
}

impl std::fmt::Debug for LinkSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSender")
            .field("receiver_closed", &self.is_receiver_closed())
            .finish()
    }
}

impl std::fmt::Debug for LinkReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkReceiver")
            .field("sender_closed", &self.is_sender_closed())
            .finish()
    }
}
