//! Bounded mailbox over a tokio mpsc channel.
//!
//! Every process owns two of these: the user mailbox and the system mailbox.
//! Sends are non-blocking try-sends so that a slow receiver exerts
//! backpressure by rejection (`chan_full`) rather than by suspending the
//! sender; receives are async and owned exclusively by the process driver.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tokio::sync::mpsc;

// Layer 3: Internal module imports
use crate::error::RtError;

/// Create a bounded mailbox with the given capacity.
///
/// Returns the cloneable sender half and the exclusively owned receiver
/// half.
///
/// # Example
/// ```rust
/// use proclet_rt::mailbox;
///
/// let (tx, mut rx) = mailbox::bounded::<u32>(2);
/// tx.try_send(1).unwrap();
/// tx.try_send(2).unwrap();
/// assert!(tx.try_send(3).unwrap_err().is_channel_full());
/// assert_eq!(rx.try_recv(), Some(1));
/// ```
pub fn bounded<T>(capacity: usize) -> (MailboxSender<T>, Mailbox<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        MailboxSender { tx, capacity },
        Mailbox { rx, capacity },
    )
}

/// Sending half of a bounded mailbox. Cheap to clone and share.
pub struct MailboxSender<T> {
    tx: mpsc::Sender<T>,
    capacity: usize,
}

impl<T> MailboxSender<T> {
    /// Attempt to enqueue a message without blocking.
    ///
    /// # Errors
    ///
    /// - [`RtError::ChannelFull`] when the mailbox is at capacity
    /// - [`RtError::NoProc`] when the receiver has been dropped
    pub fn try_send(&self, message: T) -> Result<(), RtError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RtError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => RtError::NoProc,
        })
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

/// Receiving half of a bounded mailbox, owned by one process driver.
pub struct Mailbox<T> {
    rx: mpsc::Receiver<T>,
    capacity: usize,
}

impl<T> Mailbox<T> {
    /// Receive the next message, suspending until one arrives.
    ///
    /// Returns `None` only once every sender is gone and the queue drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Dequeue a message without blocking, if one is ready.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
