// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod ratelimit;
pub mod scheduler;
pub mod store;
pub mod worker;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::notify::{DispatchResult, Dispatcher};
pub use crate::pipeline::{IngestResult, Pipeline};
pub use crate::queue::{Job, JobQueue, MemoryQueue};
pub use crate::ratelimit::RateLimiter;
pub use crate::scheduler::InFlight;
pub use crate::store::{MemoryStore, Store};
