//! robots.txt gate
//!
//! Off by default; when enabled the session consults the target host's
//! robots.txt before the first attempt on each URL. Fetched files are
//! cached per origin for a day. A missing or unfetchable robots.txt
//! restricts nothing.

use crate::FetchError;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// How long a fetched robots.txt stays valid
const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CachedRobots {
    /// None when the fetch failed; treated as allow-all
    content: Option<String>,
    fetched_at: Instant,
}

impl CachedRobots {
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.fetched_at) >= ROBOTS_TTL
    }
}

/// Per-origin robots.txt cache with its own plain HTTP client
pub struct RobotsGate {
    client: Client,
    cache: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsGate {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Whether `user_agent` may fetch `url` under the host's robots.txt
    pub async fn is_allowed(&self, url: &Url, user_agent: &str) -> Result<bool, FetchError> {
        let Some(origin) = robots_origin(url) else {
            return Ok(true);
        };

        // Lock held across the fetch so each origin is fetched once
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        let needs_fetch = match cache.get(&origin) {
            Some(entry) => entry.is_stale(now),
            None => true,
        };
        if needs_fetch {
            let content = self.fetch_robots(&origin).await;
            cache.insert(
                origin.clone(),
                CachedRobots {
                    content,
                    fetched_at: now,
                },
            );
        }

        let allowed = match &cache[&origin].content {
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url.as_str())
            }
            None => true,
        };
        Ok(allowed)
    }

    /// Fetches `{origin}/robots.txt`; any failure means no restrictions
    async fn fetch_robots(&self, origin: &str) -> Option<String> {
        let robots_url = format!("{}/robots.txt", origin);
        tracing::debug!("fetching {}", robots_url);

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", origin, e);
                return None;
            }
        };
        if !response.status().is_success() {
            return None;
        }
        response.text().await.ok()
    }
}

fn robots_origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_origin() {
        let url = Url::parse("https://example.com/deep/page?q=1").unwrap();
        assert_eq!(robots_origin(&url), Some("https://example.com".to_string()));

        let url = Url::parse("http://127.0.0.1:9200/page").unwrap();
        assert_eq!(
            robots_origin(&url),
            Some("http://127.0.0.1:9200".to_string())
        );

        let url = Url::parse("mailto:someone@example.com").unwrap();
        assert_eq!(robots_origin(&url), None);
    }

    #[test]
    fn test_cache_staleness() {
        let now = Instant::now();
        let entry = CachedRobots {
            content: None,
            fetched_at: now,
        };

        assert!(!entry.is_stale(now + Duration::from_secs(60)));
        assert!(entry.is_stale(now + ROBOTS_TTL));
    }

    #[test]
    fn test_matcher_honors_disallow() {
        let content = "User-agent: *\nDisallow: /private/\n";
        let mut matcher = DefaultMatcher::default();

        assert!(matcher.one_agent_allowed_by_robots(
            content,
            "Mozilla/5.0",
            "https://example.com/public/page"
        ));
        assert!(!matcher.one_agent_allowed_by_robots(
            content,
            "Mozilla/5.0",
            "https://example.com/private/page"
        ));
    }
}
