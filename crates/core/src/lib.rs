//! Core types for KapokMQ
//!
//! Types shared between the broker's message path and the durability layer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod message;

pub use message::{now_millis, Message, MessageStatus, Timestamp};
