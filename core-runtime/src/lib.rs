//! # Core Runtime
//!
//! Ambient runtime services for the file processing pipeline.
//!
//! ## Components
//!
//! - **Configuration** (`config`): `CoreConfig` builder with fail-fast
//!   validation of registered codecs and pipeline limits
//! - **Events** (`events`): broadcast `EventBus` carrying queue, job, and
//!   settings events to the host
//! - **Logging** (`logging`): `tracing-subscriber` initialization with
//!   pretty/JSON/compact formats and env-filter support

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{
    CoreConfig, CoreConfigBuilder, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE_BYTES,
};
pub use error::{Error, Result};
pub use events::{
    CoreEvent, EventBus, EventSeverity, JobEvent, QueueEvent, SettingsEvent,
};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
