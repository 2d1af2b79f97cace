//! Event types and external-collaborator traits for Bulwark.
//!
//! The protection framework never talks to a chat transport directly. It
//! receives [`ReportEvent`]s and [`RoomEvent`]s from the surrounding bot and
//! performs side effects through a [`ModerationClient`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod events;
#[cfg(feature = "testing")]
mod recording;

pub use client::ModerationClient;
pub use events::{ReportEvent, RoomEvent};
#[cfg(feature = "testing")]
pub use recording::{ModerationCall, RecordingModerationClient};
