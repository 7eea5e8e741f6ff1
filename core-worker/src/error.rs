use crate::messages::RequestId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker context: {0}")]
    SpawnFailed(String),

    #[error("Channel busy with in-flight request {request_id}")]
    ChannelBusy { request_id: RequestId },

    #[error("Worker channel closed")]
    ChannelClosed,

    #[error("Worker pool at capacity ({max} running)")]
    CapacityExhausted { max: usize },
}

pub type Result<T> = std::result::Result<T, WorkerError>;
