//! Aggregation engine
//!
//! Runs a declarative list of upstream calls under one policy:
//!
//! - every call has its own deadline, enforced by the fetcher;
//! - a failing *required* call aborts the whole aggregation with
//!   `ServiceError::RequiredCallFailed` naming the call;
//! - a failing *optional* call degrades to a skipped result
//!   (`skipped = true`, `status = 0`, `error` set);
//! - a non-2xx status is never a failure here, it is data for the caller.
//!
//! Calls run either concurrently (joined positionally) or sequentially. In
//! sequential mode a required failure short-circuits the remaining calls.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, error, warn};

use crate::core::{UpstreamFetch, UpstreamResult};
use crate::error::{Result, ServiceError};

/// Expected relative cost of an upstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallCost {
    /// Cheap, fast call
    #[default]
    Light,

    /// Disproportionately expensive call
    Heavy,
}

/// One named upstream call and its policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequestSpec {
    /// Key of the result in the aggregation
    pub name: String,

    /// Request-relative path, already percent-encoded
    pub path: String,

    /// Per-call deadline
    pub timeout: Duration,

    /// Whether a failure aborts the aggregation
    pub required: bool,

    /// Expected cost, used by `AggregatePlan::auto`
    pub cost: CallCost,
}

impl UpstreamRequestSpec {
    /// A call whose failure aborts the aggregation
    pub fn required(name: impl Into<String>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            timeout,
            required: true,
            cost: CallCost::Light,
        }
    }

    /// A call whose failure degrades to a skipped result
    pub fn optional(name: impl Into<String>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            required: false,
            ..Self::required(name, path, timeout)
        }
    }

    /// Mark the call as disproportionately expensive
    pub fn heavy(mut self) -> Self {
        self.cost = CallCost::Heavy;
        self
    }
}

/// How the calls of a plan are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// All calls in parallel, independent deadlines
    Concurrent,

    /// One call after another, in plan order
    Sequential,
}

/// Ordered calls plus an execution mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatePlan {
    specs: Vec<UpstreamRequestSpec>,
    mode: ExecutionMode,
}

impl AggregatePlan {
    /// Run every call in parallel
    pub fn concurrent(specs: Vec<UpstreamRequestSpec>) -> Self {
        Self {
            specs,
            mode: ExecutionMode::Concurrent,
        }
    }

    /// Run calls one after another in the given order
    pub fn sequential(specs: Vec<UpstreamRequestSpec>) -> Self {
        Self {
            specs,
            mode: ExecutionMode::Sequential,
        }
    }

    /// Pick the mode from the call costs
    ///
    /// Calls of comparable cost run concurrently. When any call is heavy the
    /// plan runs sequentially with heavy calls moved (stably) after the light
    /// ones, so cheap calls finish before the expensive one starts.
    pub fn auto(specs: Vec<UpstreamRequestSpec>) -> Self {
        if specs.iter().all(|s| s.cost == CallCost::Light) {
            return Self::concurrent(specs);
        }

        let (light, heavy): (Vec<_>, Vec<_>) =
            specs.into_iter().partition(|s| s.cost == CallCost::Light);

        Self::sequential(light.into_iter().chain(heavy).collect())
    }

    /// Calls in execution order
    pub fn specs(&self) -> &[UpstreamRequestSpec] {
        &self.specs
    }

    /// Selected execution mode
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for spec in &self.specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(ServiceError::validation(format!(
                    "Duplicate call name in aggregate plan: {}",
                    spec.name
                )));
            }

            if spec.timeout.is_zero() {
                return Err(ServiceError::validation(format!(
                    "Call '{}' has a zero timeout",
                    spec.name
                )));
            }
        }

        Ok(())
    }
}

/// Named results of a successful aggregation, in plan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    results: Vec<(String, UpstreamResult)>,
}

impl Aggregation {
    /// Result of the named call
    pub fn get(&self, name: &str) -> Option<&UpstreamResult> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Remove and return the named result
    pub fn take(&mut self, name: &str) -> Option<UpstreamResult> {
        let index = self.results.iter().position(|(n, _)| n == name)?;
        Some(self.results.remove(index).1)
    }

    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True when the plan had no calls
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results in plan order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UpstreamResult)> {
        self.results.iter().map(|(n, r)| (n.as_str(), r))
    }
}

/// Runs aggregate plans against a fetcher
pub struct Aggregator<F> {
    fetcher: F,
}

impl<F: UpstreamFetch> Aggregator<F> {
    /// Create an aggregator over a fetcher
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// The underlying fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Run every call of the plan under the required/optional policy
    pub async fn aggregate(&self, plan: &AggregatePlan) -> Result<Aggregation> {
        plan.validate()?;

        let mut results = Vec::with_capacity(plan.specs.len());

        match plan.mode {
            ExecutionMode::Concurrent => {
                let outcomes = join_all(plan.specs.iter().map(|spec| self.run(spec))).await;

                for (spec, outcome) in plan.specs.iter().zip(outcomes) {
                    results.push((spec.name.clone(), outcome?));
                }
            }
            ExecutionMode::Sequential => {
                for spec in &plan.specs {
                    let result = self.run(spec).await?;
                    results.push((spec.name.clone(), result));
                }
            }
        }

        Ok(Aggregation { results })
    }

    async fn run(&self, spec: &UpstreamRequestSpec) -> Result<UpstreamResult> {
        let started = Instant::now();

        match self.fetcher.fetch(&spec.path, spec.timeout).await {
            Ok(result) => {
                debug!(
                    call = %spec.name,
                    status = result.status,
                    elapsed_ms = result.elapsed_ms,
                    "aggregated call completed"
                );
                Ok(result)
            }
            Err(err) if spec.required => {
                error!(call = %spec.name, path = %spec.path, error = %err, "required call failed");
                Err(ServiceError::required_call_failed(&spec.name, err))
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    call = %spec.name,
                    path = %spec.path,
                    elapsed_ms,
                    error = %err,
                    "optional call degraded"
                );
                Ok(UpstreamResult::skipped(err.to_string(), elapsed_ms))
            }
        }
    }
}
