//! Remote data sources.
//!
//! The orchestrator treats a source as an opaque async function per resource.
//! Decoding the returned JSON into typed models happens afterwards, in
//! [`ResourceId::decode`](crate::resource::ResourceId::decode).

mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::resource::ResourceId;
use crate::retry::FetchError;

pub use http::{parse_body, HttpDataSource};

/// Performs the network call for one attempt at one resource.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    async fn fetch(&self, resource: ResourceId, token: Option<&str>) -> Result<Value, FetchError>;
}
