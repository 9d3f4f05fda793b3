//! Descriptor acquisition: remote fetch, single-flight memoization, and the
//! local-file fallback.
//!
//! The acquirer is the only I/O-bound piece of the pipeline. It memoizes by
//! fully resolved URL for the lifetime of the acquirer, and concurrent
//! requests for the same URL collapse into exactly one underlying fetch: all
//! callers await a shared future and observe the same result or the same
//! failure. The fetch itself runs on a detached task, so one caller going
//! away never cancels the operation for the rest.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    descriptor::{self, DescriptorMeta},
    error::FetchError,
    profile::Profile,
};

/// Transport seam for descriptor retrieval.
///
/// Production uses [`HttpFetcher`]; tests inject counting fakes to pin down
/// the single-flight guarantee without a network.
pub trait DescFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// HTTP GET fetcher over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl DescFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        let client = self.client.clone();
        let timeout = self.timeout;
        let url = url.to_string();
        async move {
            let response = client.get(&url).timeout(timeout).send().await.map_err(|err| {
                FetchError::Transport {
                    url: url.clone(),
                    message: err.to_string(),
                }
            })?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                    body,
                });
            }
            response.text().await.map_err(|err| FetchError::Transport {
                url,
                message: err.to_string(),
            })
        }
    }
}

/// Builds the fully resolved descriptor URL from a profile and the
/// (service, doctype) pair, URL-encoding every substituted value.
pub fn build_desc_url(profile: &Profile, service_code: &str, doctype_code: &str) -> String {
    let encode = |s: &str| utf8_percent_encode(s, NON_ALPHANUMERIC).to_string();
    let base = profile.desc_base_url.trim_end_matches('/');
    let relative = profile
        .desc_url_template
        .trim_start_matches('/')
        .replace("{service}", &encode(service_code))
        .replace("{doctype}", &encode(doctype_code))
        .replace("{version}", &encode(&profile.desc_version));
    format!("{base}/{relative}")
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<String>, FetchError>>>;

/// Session-scoped descriptor resolver with per-URL single-flight caching.
pub struct DescriptorAcquirer<F: DescFetcher> {
    fetcher: Arc<F>,
    cache: Mutex<HashMap<String, SharedFetch>>,
}

impl<F: DescFetcher> DescriptorAcquirer<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drops all memoized entries; the next request per URL re-fetches.
    pub fn clear_cache(&self) {
        self.cache.lock().expect("cache lock").clear();
    }

    /// Fetches descriptor text for `url`, joining an in-flight fetch when one
    /// exists. Successes and failures are both memoized.
    pub async fn fetch_text(&self, url: &str) -> Result<Arc<String>, FetchError> {
        let shared = {
            let mut cache = self.cache.lock().expect("cache lock");
            match cache.get(url) {
                Some(existing) => existing.clone(),
                None => {
                    let fetcher = Arc::clone(&self.fetcher);
                    let fetch_url = url.to_string();
                    // Detached task: waiter cancellation must not cancel the
                    // shared fetch for everyone else.
                    let handle =
                        tokio::spawn(async move { fetcher.fetch(&fetch_url).await.map(Arc::new) });
                    let err_url = url.to_string();
                    let shared = async move {
                        handle
                            .await
                            .unwrap_or_else(|_| Err(FetchError::Aborted { url: err_url }))
                    }
                    .boxed()
                    .shared();
                    cache.insert(url.to_string(), shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    /// Resolves descriptor metadata for a (service, doctype) pair.
    ///
    /// Falls back to a local `<doctype>.desc` file when the remote call
    /// fails or returns nothing parseable; the fetch error is surfaced only
    /// when no fallback exists.
    pub async fn resolve(
        &self,
        profile: &Profile,
        service_code: &str,
        doctype_code: &str,
    ) -> Result<Option<DescriptorMeta>, FetchError> {
        let url = build_desc_url(profile, service_code, doctype_code);
        match self.fetch_text(&url).await {
            Ok(text) => {
                if let Some(meta) = descriptor::parse_descriptor(&text) {
                    debug!("Resolved descriptor for {service_code}/{doctype_code} from {url}");
                    return Ok(Some(meta));
                }
                debug!("Remote descriptor at {url} was not usable, trying local fallback");
                Ok(load_local(profile, doctype_code))
            }
            Err(err) => {
                warn!("Descriptor fetch failed ({err}), trying local fallback");
                match load_local(profile, doctype_code) {
                    Some(meta) => Ok(Some(meta)),
                    None => Err(err),
                }
            }
        }
    }
}

fn load_local(profile: &Profile, doctype_code: &str) -> Option<DescriptorMeta> {
    let dir = profile.desc_dir.as_ref()?;
    let path = dir.join(format!("{doctype_code}.desc"));
    let xml = std::fs::read_to_string(&path).ok()?;
    debug!("Loaded local descriptor {path:?}");
    descriptor::parse_descriptor(&xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
        response: Result<String, FetchError>,
        delay: Duration,
    }

    impl DescFetcher for CountingFetcher {
        fn fetch(&self, _url: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self.response.clone();
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                response
            }
        }
    }

    const DESC_XML: &str = r#"<form><content table="dc_orders"/></form>"#;

    fn counting(response: Result<String, FetchError>) -> (CountingFetcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            CountingFetcher {
                calls: Arc::clone(&calls),
                response,
                delay: Duration::from_millis(20),
            },
            calls,
        )
    }

    #[test]
    fn url_template_substitution_encodes_values() {
        let profile = Profile {
            desc_base_url: "http://host:18080/".to_string(),
            desc_url_template: "/forms/{service}/{doctype}/{version}/{doctype}.desc".to_string(),
            desc_version: "1.0".to_string(),
            ..Profile::default()
        };
        let url = build_desc_url(&profile, "svc one", "DT/7");
        assert_eq!(
            url,
            "http://host:18080/forms/svc%20one/DT%2F7/1%2E0/DT%2F7.desc"
        );
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let (fetcher, calls) = counting(Ok(DESC_XML.to_string()));
        let acquirer = Arc::new(DescriptorAcquirer::new(fetcher));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let acquirer = Arc::clone(&acquirer);
            handles.push(tokio::spawn(async move {
                acquirer.fetch_text("http://x/desc").await
            }));
        }
        for handle in handles {
            let text = handle.await.unwrap().unwrap();
            assert_eq!(text.as_str(), DESC_XML);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_memoized_until_cache_clear() {
        let (fetcher, calls) = counting(Err(FetchError::Transport {
            url: "http://x/desc".to_string(),
            message: "connection refused".to_string(),
        }));
        let acquirer = DescriptorAcquirer::new(fetcher);

        assert!(acquirer.fetch_text("http://x/desc").await.is_err());
        assert!(acquirer.fetch_text("http://x/desc").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        acquirer.clear_cache();
        assert!(acquirer.fetch_text("http://x/desc").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropping_one_waiter_keeps_the_shared_fetch_alive() {
        let (fetcher, calls) = counting(Ok(DESC_XML.to_string()));
        let acquirer = Arc::new(DescriptorAcquirer::new(fetcher));

        let impatient = {
            let acquirer = Arc::clone(&acquirer);
            tokio::spawn(async move { acquirer.fetch_text("http://x/desc").await })
        };
        impatient.abort();

        let text = acquirer.fetch_text("http://x/desc").await.unwrap();
        assert_eq!(text.as_str(), DESC_XML);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_falls_back_to_local_descriptor_on_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ORDER.desc"), DESC_XML).unwrap();
        let profile = Profile {
            desc_dir: Some(dir.path().to_path_buf()),
            ..Profile::default()
        };

        let (fetcher, _) = counting(Err(FetchError::Transport {
            url: "http://x".to_string(),
            message: "down".to_string(),
        }));
        let acquirer = DescriptorAcquirer::new(fetcher);
        let meta = acquirer
            .resolve(&profile, "SVC", "ORDER")
            .await
            .unwrap()
            .expect("local fallback");
        assert_eq!(meta.content_table.as_deref(), Some("dc_orders"));
    }

    #[tokio::test]
    async fn resolve_surfaces_fetch_error_without_fallback() {
        let (fetcher, _) = counting(Err(FetchError::Transport {
            url: "http://x".to_string(),
            message: "down".to_string(),
        }));
        let acquirer = DescriptorAcquirer::new(fetcher);
        let err = acquirer
            .resolve(&Profile::default(), "SVC", "ORDER")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn unusable_remote_descriptor_resolves_to_none() {
        let (fetcher, _) = counting(Ok("not xml at all <".to_string()));
        let acquirer = DescriptorAcquirer::new(fetcher);
        let meta = acquirer
            .resolve(&Profile::default(), "SVC", "ORDER")
            .await
            .unwrap();
        assert!(meta.is_none());
    }
}
