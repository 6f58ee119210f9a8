//! Tests for the aggregation engine
//!
//! These tests drive the aggregator with a scripted in-process fetcher to
//! verify the required/optional policy and both execution modes.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::aggregate::{AggregatePlan, Aggregator, UpstreamRequestSpec};
    use crate::core::{Decoded, UpstreamFetch, UpstreamResult};
    use crate::error::{Result, ServiceError};

    /// Scripted behavior of one path
    #[derive(Clone)]
    enum Script {
        /// Answer with a status and JSON body after a delay
        Respond { status: u16, body: Value, delay_ms: u64 },

        /// Fail with a network error
        Refuse,

        /// Fail with a configuration error
        Misconfigured,
    }

    /// In-process fetcher that honors the per-call deadline
    #[derive(Default)]
    struct ScriptedFetcher {
        scripts: HashMap<String, Script>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn on(mut self, path: &str, script: Script) -> Self {
            self.scripts.insert(path.to_string(), script);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamFetch for ScriptedFetcher {
        async fn fetch(&self, path: &str, timeout: Duration) -> Result<UpstreamResult> {
            self.calls.lock().unwrap().push(path.to_string());

            match self.scripts.get(path).cloned() {
                Some(Script::Respond { status, body, delay_ms }) => {
                    let delay = Duration::from_millis(delay_ms);
                    match tokio::time::timeout(timeout, tokio::time::sleep(delay)).await {
                        Ok(()) => Ok(UpstreamResult::received(status, Decoded::Json(body), delay_ms)),
                        Err(_) => {
                            let ms = timeout.as_millis() as u64;
                            Err(ServiceError::timeout(ms, ms))
                        }
                    }
                }
                Some(Script::Refuse) => Err(ServiceError::network("Connection refused")),
                Some(Script::Misconfigured) => {
                    Err(ServiceError::configuration("Missing AC_API_URL or AC_API_TOKEN"))
                }
                None => Ok(UpstreamResult::received(404, Decoded::Json(json!({})), 0)),
            }
        }
    }

    fn ok(delay_ms: u64) -> Script {
        Script::Respond {
            status: 200,
            body: json!({ "ok": true }),
            delay_ms,
        }
    }

    fn slow() -> Script {
        ok(1_000)
    }

    fn required(name: &str) -> UpstreamRequestSpec {
        UpstreamRequestSpec::required(name, format!("/{}", name), Duration::from_millis(100))
    }

    fn optional(name: &str) -> UpstreamRequestSpec {
        UpstreamRequestSpec::optional(name, format!("/{}", name), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_required_timeout_fails_even_when_optionals_succeed() {
        let fetcher = ScriptedFetcher::default()
            .on("/a", slow())
            .on("/b", ok(0))
            .on("/c", ok(0));
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::concurrent(vec![required("a"), optional("b"), optional("c")]);
        let err = aggregator.aggregate(&plan).await.unwrap_err();

        assert_eq!(err.failed_call(), Some("a"));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("'a'"));
    }

    #[tokio::test]
    async fn test_optional_timeout_degrades_to_skipped() {
        let fetcher = ScriptedFetcher::default().on("/a", ok(0)).on("/b", slow());
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::concurrent(vec![required("a"), optional("b")]);
        let results = aggregator.aggregate(&plan).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.get("a").unwrap().ok);

        let skipped = results.get("b").unwrap();
        assert!(skipped.skipped);
        assert_eq!(skipped.status, 0);
        assert!(!skipped.ok);
        assert!(skipped.error.as_deref().unwrap().contains("within 100ms"));
    }

    #[tokio::test]
    async fn test_optional_configuration_error_degrades() {
        let fetcher = ScriptedFetcher::default()
            .on("/a", ok(0))
            .on("/b", Script::Misconfigured);
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::concurrent(vec![required("a"), optional("b")]);
        let results = aggregator.aggregate(&plan).await.unwrap();

        assert!(results.get("b").unwrap().skipped);
    }

    #[tokio::test]
    async fn test_required_network_error_names_call() {
        let fetcher = ScriptedFetcher::default()
            .on("/a", ok(0))
            .on("/b", Script::Refuse);
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::concurrent(vec![required("a"), required("b")]);
        let err = aggregator.aggregate(&plan).await.unwrap_err();

        assert_eq!(err.failed_call(), Some("b"));
        assert!(matches!(err.root(), ServiceError::Network(_)));
    }

    #[tokio::test]
    async fn test_required_non_2xx_is_not_a_failure() {
        let fetcher = ScriptedFetcher::default().on(
            "/a",
            Script::Respond {
                status: 404,
                body: json!({ "message": "No Result found" }),
                delay_ms: 0,
            },
        );
        let aggregator = Aggregator::new(&fetcher);

        let results = aggregator
            .aggregate(&AggregatePlan::concurrent(vec![required("a")]))
            .await
            .unwrap();

        let result = results.get("a").unwrap();
        assert!(!result.ok);
        assert!(!result.skipped);
        assert_eq!(result.status, 404);
    }

    #[tokio::test]
    async fn test_sequential_required_failure_short_circuits() {
        let fetcher = ScriptedFetcher::default()
            .on("/a", Script::Refuse)
            .on("/b", ok(0));
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::sequential(vec![required("a"), optional("b")]);
        assert!(aggregator.aggregate(&plan).await.is_err());

        assert_eq!(fetcher.calls(), vec!["/a".to_string()]);
    }

    #[tokio::test]
    async fn test_sequential_runs_in_plan_order() {
        let fetcher = ScriptedFetcher::default()
            .on("/a", ok(0))
            .on("/b", ok(0))
            .on("/heavy", slow());
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::auto(vec![optional("heavy").heavy(), required("a"), required("b")]);
        let results = aggregator.aggregate(&plan).await.unwrap();

        assert_eq!(fetcher.calls(), vec!["/a", "/b", "/heavy"]);
        let names: Vec<_> = results.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b", "heavy"]);
        assert!(results.get("heavy").unwrap().skipped);
    }

    #[tokio::test]
    async fn test_concurrent_mode_attempts_every_call() {
        let fetcher = ScriptedFetcher::default()
            .on("/a", Script::Refuse)
            .on("/b", ok(20))
            .on("/c", ok(10));
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::concurrent(vec![required("a"), required("b"), required("c")]);
        assert!(aggregator.aggregate(&plan).await.is_err());

        let mut calls = fetcher.calls();
        calls.sort();
        assert_eq!(calls, vec!["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn test_invalid_plan_makes_no_calls() {
        let fetcher = ScriptedFetcher::default();
        let aggregator = Aggregator::new(&fetcher);

        let plan = AggregatePlan::concurrent(vec![required("a"), required("a")]);
        assert!(matches!(
            aggregator.aggregate(&plan).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(fetcher.calls().is_empty());
    }
}
