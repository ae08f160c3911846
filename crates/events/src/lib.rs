//! Real-time notification of pipeline outcomes.
//!
//! The [`NotificationHub`] correlates a file id with the one live client
//! connection waiting on it and pushes a single ready/failed message when the
//! worker pool finishes that file.

pub mod hub;

pub use hub::{HubError, HubFrame, HubSender, NotificationHub};
