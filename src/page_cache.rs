use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::accessors::{PageContent, PageFetcher};
use crate::errors::AppError;

/// Memoizes successful page fetches for the lifetime of one run.
///
/// The email and owner-name finders both walk the homepage and `/about`; this keeps
/// each page to a single request. Failures are never cached, so a page that timed
/// out once is retried by the next extractor.
pub struct CachedPageFetcher {
    inner: Arc<dyn PageFetcher>,
    cache: Cache<String, Arc<PageContent>>,
}

impl CachedPageFetcher {
    pub fn new(inner: Arc<dyn PageFetcher>, ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();
        Self { inner, cache }
    }

    /// 10 minute TTL, 2k pages: comfortably one run of 20 leads.
    pub fn for_run(inner: Arc<dyn PageFetcher>) -> Self {
        Self::new(inner, Duration::from_secs(600), 2_000)
    }
}

#[async_trait]
impl PageFetcher for CachedPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, AppError> {
        if let Some(cached) = self.cache.get(url).await {
            tracing::debug!("Page cache hit: {}", url);
            return Ok((*cached).clone());
        }

        let page = self.inner.fetch(url).await?;
        self.cache
            .insert(url.to_string(), Arc::new(page.clone()))
            .await;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PageFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<PageContent, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::Unreachable(url.to_string()))
            } else {
                Ok(PageContent::from_text(url, "hello"))
            }
        }
    }

    #[tokio::test]
    async fn test_successful_fetch_is_reused() {
        let inner = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cached = CachedPageFetcher::for_run(inner.clone());

        let first = cached.fetch("https://a.co.uk/").await.unwrap();
        let second = cached.fetch("https://a.co.uk/").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cached = CachedPageFetcher::for_run(inner.clone());

        assert!(cached.fetch("https://down.co.uk/").await.is_err());
        assert!(cached.fetch("https://down.co.uk/").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
