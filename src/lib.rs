//! Workspace placeholder crate.
//!
//! This crate exists so host applications can depend on `fileworks-workspace`
//! and reach every member crate without wiring each one individually.

pub use codec_traits;
pub use core_pipeline;
pub use core_runtime;
pub use core_worker;
