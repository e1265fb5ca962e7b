//! The independently retriable units of data the client loads.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{self, PortfolioSummary, ResourceValue, TrendingStock};
use crate::retry::{FallbackFn, FetchError, RetryPolicy};

/// Identifier of a loadable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceId {
    /// The signed-in user's portfolio summary.
    Portfolio,
    /// Public list of trending stocks.
    Trending,
}

impl ResourceId {
    pub const ALL: [ResourceId; 2] = [ResourceId::Portfolio, ResourceId::Trending];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceId::Portfolio => "portfolio",
            ResourceId::Trending => "trending",
        }
    }

    /// Human-readable name used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            ResourceId::Portfolio => "portfolio summary",
            ResourceId::Trending => "trending stocks",
        }
    }

    /// Path of the resource relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            ResourceId::Portfolio => "portfolio/summary",
            ResourceId::Trending => "market/trending",
        }
    }

    /// Decode a raw payload. A payload of the wrong shape is `FetchError::Malformed`.
    pub fn decode(self, raw: Value) -> Result<ResourceValue, FetchError> {
        let malformed = |e: serde_json::Error| FetchError::Malformed(format!("{}: {}", self, e));
        match self {
            ResourceId::Portfolio => serde_json::from_value::<PortfolioSummary>(raw)
                .map(ResourceValue::Portfolio)
                .map_err(malformed),
            ResourceId::Trending => serde_json::from_value::<Vec<TrendingStock>>(raw)
                .map(ResourceValue::Trending)
                .map_err(malformed),
        }
    }

    /// Static value substituted when the resource is configured to fall back.
    pub fn fallback_value(self) -> ResourceValue {
        match self {
            ResourceId::Portfolio => ResourceValue::Portfolio(models::fallback_portfolio()),
            ResourceId::Trending => ResourceValue::Trending(models::fallback_trending()),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown resource '{}' (expected portfolio or trending)", s))
    }
}

/// What to do when a load cannot produce a real value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Substitute the resource's static fallback and present it as success.
    Fallback,
    /// Surface the failure to the user.
    Fail,
}

/// Load configuration for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    pub id: ResourceId,
    pub policy: RetryPolicy,
    pub on_failure: FailurePolicy,
    /// Skip the load entirely when there is no authenticated session.
    pub requires_auth: bool,
}

impl ResourceConfig {
    /// Built-in defaults: the portfolio needs a session and fails visibly;
    /// trending is public and falls back to a static list.
    pub fn defaults_for(id: ResourceId) -> Self {
        match id {
            ResourceId::Portfolio => Self {
                id,
                policy: RetryPolicy::default(),
                on_failure: FailurePolicy::Fail,
                requires_auth: true,
            },
            ResourceId::Trending => Self {
                id,
                policy: RetryPolicy::default(),
                on_failure: FailurePolicy::Fallback,
                requires_auth: false,
            },
        }
    }

    pub fn all_defaults() -> Vec<Self> {
        ResourceId::ALL.into_iter().map(Self::defaults_for).collect()
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, on_failure: FailurePolicy) -> Self {
        self.on_failure = on_failure;
        self
    }

    pub fn with_requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Fallback supplier for the retry driver, if this resource falls back.
    pub fn fallback_supplier(&self) -> Option<FallbackFn<ResourceValue>> {
        let id = self.id;
        match self.on_failure {
            FailurePolicy::Fallback => Some(Arc::new(move || id.fallback_value())),
            FailurePolicy::Fail => None,
        }
    }
}
