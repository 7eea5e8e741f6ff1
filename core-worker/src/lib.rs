//! # Worker Channel Layer
//!
//! Message-passing execution of blocking conversions in isolated contexts.
//!
//! ## Overview
//!
//! The coordinating task never blocks on a conversion. Each job runs on its
//! own worker context behind a [`WorkerChannel`]; the [`WorkerPool`] bounds
//! how many contexts are alive and multiplexes their messages back to the
//! caller.
//!
//! ## Components
//!
//! - **Message Protocol** (`messages`): tagged run/progress/result/error
//!   unions with transferred binary payloads
//! - **Worker Channel** (`channel`): one context, one job at a time,
//!   terminate-to-cancel
//! - **Worker Pool** (`pool`): bounded channel set with explicit
//!   spawn/terminate lifecycle and timeout sweeping

pub mod channel;
pub mod error;
pub mod messages;
pub mod pool;

pub use channel::WorkerChannel;
pub use error::{Result, WorkerError};
pub use messages::{RequestId, RunRequest, WorkerMessage};
pub use pool::WorkerPool;
