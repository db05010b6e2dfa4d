//! Bounded process mailboxes with non-blocking send.

pub mod bounded;

pub use bounded::{bounded, Mailbox, MailboxSender};
