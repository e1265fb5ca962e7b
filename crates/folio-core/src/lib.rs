//! Resilient data loading for the folio portfolio client.
//!
//! Independent resources (portfolio summary, trending stocks) load
//! concurrently, each through its own retry driver with exponential backoff
//! and jitter, and publish into one observable presentation state.

pub mod config;
pub mod logging;

pub mod control;
pub mod models;
pub mod orchestrator;
pub mod resource;
pub mod retry;
pub mod session;
pub mod source;
pub mod state;

pub use orchestrator::FetchOrchestrator;
pub use resource::{FailurePolicy, ResourceConfig, ResourceId};
pub use session::{MemorySessionProvider, Session, SessionProvider};
pub use source::{HttpDataSource, RemoteDataSource};
pub use state::{PresentationState, ResourceState};
