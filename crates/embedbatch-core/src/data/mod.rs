//! Core data structures for Embedbatch

pub mod identifiers;
pub mod errors;
pub mod job;
pub mod embed;

// Re-export all common types
pub use identifiers::JobId;
pub use errors::CoreError;
pub use job::{ErrorCode, Job, JobError, JobStatus};
pub use embed::{
    Chunk, EmbedOutput, EmbedRequest, EmbedResponse, EmbedResult, InputItem, TruncateStrategy,
};
