//! Embedbatch job pipeline
//!
//! The registry holds every job record, the worker pool drains a bounded queue
//! of job ids, and the processor runs the acquire, extract, embed and persist
//! steps for each job before notifying its callback URL.

pub mod acquisition;
pub mod callback;
pub mod config;
pub mod error;
pub mod processor;
pub mod registry;
pub mod worker;

pub use acquisition::{AcquiredFile, DefaultFileAcquirer, FileAcquirer};
pub use callback::{CallbackDispatcher, CallbackPayload};
pub use config::JobsConfig;
pub use error::{AcquireError, CallbackError, JobsError};
pub use processor::JobProcessor;
pub use registry::JobRegistry;
pub use worker::{WorkerPool, WorkerPoolConfig};
