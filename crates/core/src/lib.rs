//! Domain types shared by every cuedeck crate.
//!
//! Nothing in here performs I/O: the queue message contract, source format
//! rules, generated-card parsing, the file lifecycle and the notification
//! payload pushed to clients all live here so the producer (API) and the
//! consumer (worker pool) agree on them.

pub mod cards;
pub mod error;
pub mod formats;
pub mod lifecycle;
pub mod message;
pub mod notification;
pub mod types;
