//! Request-level analysis pipeline.
//!
//! cache → (credential check) → single-flight → analyzer → sanitize → cache.
//!
//! One [`AnalysisService`] is built at startup and shared by reference with
//! every handler; it owns the cache, so nothing here is module-global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::SentenceAnalysis;
use crate::cache::{CacheStats, ResponseCache, SingleFlight};
use crate::config::{CacheConfig, Config};
use crate::error::{BunkaiError, Result};
use crate::providers::{AnthropicProvider, Analyzer};
use crate::utils::sanitize::sanitize_analysis;

/// Shared analysis pipeline.
pub struct AnalysisService {
    analyzer: Option<Arc<dyn Analyzer>>,
    cache: Option<Arc<ResponseCache>>,
    flights: SingleFlight,
    upstream_calls: AtomicU64,
    upstream_failures: AtomicU64,
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService")
            .field("analyzer", &self.analyzer.is_some())
            .field("cache", &self.cache)
            .finish()
    }
}

impl AnalysisService {
    /// Build a service around an optional analyzer and cache.
    ///
    /// `analyzer = None` models a missing credential: cached sentences are
    /// still served, misses fail with [`BunkaiError::ConfigurationMissing`].
    pub fn new(analyzer: Option<Arc<dyn Analyzer>>, cache: Option<Arc<ResponseCache>>) -> Self {
        Self {
            analyzer,
            cache,
            flights: SingleFlight::new(),
            upstream_calls: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
        }
    }

    /// Wire up the Anthropic analyzer and cache from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let analyzer = AnthropicProvider::from_config(&config.provider)?;
        match &analyzer {
            Some(p) => info!(model = %p.model(), "Anthropic analyzer configured"),
            None => info!("ANTHROPIC_API_KEY not set; only cached analyses can be served"),
        }
        let analyzer = analyzer.map(|p| Arc::new(p) as Arc<dyn Analyzer>);
        Ok(Self::new(analyzer, cache_from_config(&config.cache)))
    }

    /// Analyze `sentence`, using the cache when possible.
    ///
    /// The sentence is used verbatim as the cache key. Returned analyses are
    /// always sanitized.
    pub async fn analyze(&self, sentence: &str) -> Result<Arc<SentenceAnalysis>> {
        if sentence.is_empty() {
            return Err(BunkaiError::InvalidInput("empty sentence".to_string()));
        }
        if let Some(hit) = self.cached(sentence) {
            debug!("Serving analysis from cache");
            return Ok(hit);
        }

        let analyzer = self.analyzer.as_ref().ok_or_else(|| {
            BunkaiError::ConfigurationMissing("ANTHROPIC_API_KEY not configured".to_string())
        })?;

        let _flight = self.flights.acquire(sentence).await;
        // Another caller may have finished the same sentence while we waited.
        // This re-check is not counted; the lookup above already was.
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.peek(sentence)) {
            debug!("Analysis completed by concurrent request");
            return Ok(hit);
        }

        self.upstream_calls.fetch_add(1, Ordering::Relaxed);
        let raw = analyzer.analyze(sentence).await.inspect_err(|_| {
            self.upstream_failures.fetch_add(1, Ordering::Relaxed);
        })?;
        let analysis = Arc::new(sanitize_analysis(raw));

        if let Some(cache) = &self.cache {
            cache.put(sentence.to_string(), Arc::clone(&analysis));
        }
        Ok(analysis)
    }

    /// Counters for the metrics endpoint.
    pub fn metrics(&self) -> ServiceMetrics {
        ServiceMetrics {
            analyzer_configured: self.analyzer.is_some(),
            cache: self.cache.as_ref().map(|c| c.stats()),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            in_flight: self.flights.in_flight(),
        }
    }

    fn cached(&self, sentence: &str) -> Option<Arc<SentenceAnalysis>> {
        self.cache.as_ref().and_then(|c| c.get(sentence))
    }
}

/// Build the cache described by `config`, or `None` when caching is off.
pub fn cache_from_config(config: &CacheConfig) -> Option<Arc<ResponseCache>> {
    config
        .enabled
        .then(|| Arc::new(ResponseCache::new(config.ttl(), config.sweep_threshold)))
}

/// Snapshot returned by `GET /api/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMetrics {
    pub analyzer_configured: bool,
    pub cache: Option<CacheStats>,
    pub upstream_calls: u64,
    pub upstream_failures: u64,
    pub in_flight: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::watashi_wa;
    use crate::providers::MockAnalyzer;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn cache() -> Option<Arc<ResponseCache>> {
        Some(Arc::new(ResponseCache::default()))
    }

    /// Slow analyzer that counts calls, for concurrency tests.
    struct CountingAnalyzer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Analyzer for CountingAnalyzer {
        async fn analyze(&self, _sentence: &str) -> Result<SentenceAnalysis> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(watashi_wa())
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit_calls_upstream_once() {
        let mut mock = MockAnalyzer::new();
        mock.expect_analyze().times(1).returning(|_| Ok(watashi_wa()));
        let service = AnalysisService::new(Some(Arc::new(mock)), cache());

        let first = service.analyze("私は美しい花を見ました。").await.unwrap();
        let second = service.analyze("私は美しい花を見ました。").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.metrics().upstream_calls, 1);
    }

    #[tokio::test]
    async fn test_uncached_request_counts_one_miss() {
        let mut mock = MockAnalyzer::new();
        mock.expect_analyze().times(1).returning(|_| Ok(watashi_wa()));
        let service = AnalysisService::new(Some(Arc::new(mock)), cache());

        service.analyze("花").await.unwrap();
        let stats = service.metrics().cache.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);

        service.analyze("花").await.unwrap();
        let stats = service.metrics().cache.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_result_is_sanitized_before_caching() {
        let mut mock = MockAnalyzer::new();
        mock.expect_analyze().times(1).returning(|_| {
            let mut a = watashi_wa();
            a.explanation = "<p>ok</p><script>alert(1)</script>".into();
            Ok(a)
        });
        let cache = cache();
        let service = AnalysisService::new(Some(Arc::new(mock)), cache.clone());

        let result = service.analyze("花").await.unwrap();
        assert_eq!(result.explanation, "<p>ok</p>");
        let stored = cache.unwrap().get("花").unwrap();
        assert_eq!(stored.explanation, "<p>ok</p>");
    }

    #[tokio::test]
    async fn test_missing_analyzer_is_configuration_error() {
        let service = AnalysisService::new(None, cache());
        let err = service.analyze("花").await.unwrap_err();
        assert!(matches!(err, BunkaiError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_cache_hit_served_without_analyzer() {
        let cache = cache();
        cache
            .as_ref()
            .unwrap()
            .put("花".into(), Arc::new(watashi_wa()));
        let service = AnalysisService::new(None, cache);
        assert!(service.analyze("花").await.is_ok());
    }

    #[tokio::test]
    async fn test_upstream_failure_not_cached() {
        let mut mock = MockAnalyzer::new();
        mock.expect_analyze()
            .times(2)
            .returning(|_| Err(BunkaiError::Upstream("boom".into())));
        let cache = cache();
        let service = AnalysisService::new(Some(Arc::new(mock)), cache.clone());

        assert!(service.analyze("花").await.is_err());
        assert!(service.analyze("花").await.is_err());
        assert!(cache.unwrap().is_empty());
        let metrics = service.metrics();
        assert_eq!(metrics.upstream_calls, 2);
        assert_eq!(metrics.upstream_failures, 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_calls_upstream() {
        let mut mock = MockAnalyzer::new();
        mock.expect_analyze().times(2).returning(|_| Ok(watashi_wa()));
        let service = AnalysisService::new(Some(Arc::new(mock)), None);
        service.analyze("花").await.unwrap();
        service.analyze("花").await.unwrap();
        assert!(service.metrics().cache.is_none());
    }

    #[tokio::test]
    async fn test_empty_sentence_rejected() {
        let service = AnalysisService::new(None, cache());
        let err = service.analyze("").await.unwrap_err();
        assert!(matches!(err, BunkaiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_share_one_call() {
        let analyzer = Arc::new(CountingAnalyzer {
            calls: AtomicUsize::new(0),
        });
        let service = Arc::new(AnalysisService::new(
            Some(analyzer.clone() as Arc<dyn Analyzer>),
            cache(),
        ));

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.analyze("猫が静かに部屋に入った。").await })
            })
            .collect();
        for t in tasks {
            assert!(t.await.unwrap().is_ok());
        }
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.metrics().in_flight, 0);
    }

    #[tokio::test]
    async fn test_distinct_sentences_each_call_upstream() {
        let analyzer = Arc::new(CountingAnalyzer {
            calls: AtomicUsize::new(0),
        });
        let service = AnalysisService::new(Some(analyzer.clone() as Arc<dyn Analyzer>), cache());
        service.analyze("花").await.unwrap();
        service.analyze("花。").await.unwrap();
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_from_config() {
        let mut config = CacheConfig::default();
        let cache = cache_from_config(&config).unwrap();
        assert_eq!(cache.ttl(), Duration::from_secs(3600));
        config.enabled = false;
        assert!(cache_from_config(&config).is_none());
    }

    #[test]
    fn test_from_config_without_key() {
        let service = AnalysisService::from_config(&Config::default()).unwrap();
        assert!(!service.metrics().analyzer_configured);
    }
}
