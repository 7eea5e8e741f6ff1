use crate::item::{FileItemId, ItemStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: FileItemId },

    #[error("Invalid item id: {0}")]
    InvalidItemId(String),

    #[error("Invalid item transition from {from} to {to}")]
    InvalidTransition { from: ItemStatus, to: ItemStatus },

    #[error("Item {item_id} is {status}, expected {expected}")]
    UnexpectedStatus {
        item_id: FileItemId,
        status: ItemStatus,
        expected: ItemStatus,
    },

    #[error("No codec registered for operation: {operation}")]
    NoCodec { operation: String },

    #[error("No archive packager configured")]
    PackagerUnavailable,

    #[error("No completed results to package")]
    NothingToPackage,

    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("Worker error: {0}")]
    Worker(#[from] core_worker::WorkerError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
