//! The scan pipeline.
//!
//! [`Scanner`] owns every shared resource (HTTP clients, resolver, cache,
//! capability implementations) and runs the full pipeline for one request:
//! canonicalize, consult the cache, trace redirects, fan out the independent
//! detectors, run the dependent analyzers, aggregate the verdict, store and
//! notify. Detectors fail open; the only fatal error is an unscannable URL.
//!
//! [`ScannerBuilder`] wires defaults (RDAP age lookup, ip-api geolocation,
//! headless-browser capture) while letting tests and embedders swap any
//! capability for a mock.

use futures::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::cache::{ScanCache, DEFAULT_MAX_AGE};
use crate::canonical::canonicalize_url;
use crate::config::{Settings, SettingsStore, DEFAULT_CACHE_PATH, DEFAULT_POPULAR_DOMAINS, SCREENSHOT_RETENTION};
use crate::error::{InitializationError, ScanError};
use crate::geoip::{GeoInfo, GeoLookup, IpApiGeoLookup};
use crate::heuristics::{self, HeuristicReport};
use crate::intel::{self, IntelVerdict};
use crate::jurisdiction::analyze_jurisdictions;
use crate::models::{ScanReport, ScanRequest};
use crate::notify::{Webhook, WebhookNotifier};
use crate::redirects::trace_redirect_chain;
use crate::reputation::analyze_reputation;
use crate::scheduler::Scheduler;
use crate::tls::{analyze_certificate, SslReport};
use crate::verdict::{self, VerdictInput};
use crate::visual::{
    analyze_visual, purge_stale_screenshots, HeadlessBrowser, ScreenshotCapture, VisionClassifier,
};
use crate::whois::{analyze_domain_age, AgeLookup, AgeReport, RdapAgeLookup};

/// Default per-request HTTP timeout in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Default directory for captured screenshots.
const DEFAULT_SCREENSHOT_DIR: &str = "./screenshots";

/// Output of one independent detector in the fan-out phase.
enum DetectorOutput {
    Age(AgeReport),
    Geo(Option<GeoInfo>),
    Ssl(SslReport),
    Intel(Vec<IntelVerdict>),
}

/// Configures and builds a [`Scanner`].
pub struct ScannerBuilder {
    cache_path: String,
    cache_max_age: Duration,
    settings: SettingsStore,
    scheduler: Option<Scheduler>,
    popular_domains: Vec<String>,
    timeout_seconds: u64,
    screenshot_dir: PathBuf,
    webhooks: Vec<Webhook>,
    age: Option<Arc<dyn AgeLookup>>,
    geo: Option<Arc<dyn GeoLookup>>,
    capture: Option<Arc<dyn ScreenshotCapture>>,
    vision: Option<Arc<dyn VisionClassifier>>,
}

impl Default for ScannerBuilder {
    fn default() -> Self {
        Self {
            cache_path: DEFAULT_CACHE_PATH.to_string(),
            cache_max_age: DEFAULT_MAX_AGE,
            settings: SettingsStore::default(),
            scheduler: None,
            popular_domains: DEFAULT_POPULAR_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
            webhooks: Vec::new(),
            age: None,
            geo: None,
            capture: None,
            vision: None,
        }
    }
}

impl ScannerBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SQLite cache path.
    pub fn with_cache_path(mut self, path: impl Into<String>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Sets the maximum age of cache entries served as hits.
    pub fn with_cache_max_age(mut self, max_age: Duration) -> Self {
        self.cache_max_age = max_age;
        self
    }

    /// Sets the shared settings store.
    pub fn with_settings(mut self, settings: SettingsStore) -> Self {
        self.settings = settings;
        self
    }

    /// Forces a scheduler mode instead of runtime detection.
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Replaces the popular-domain list used by the typosquatting check.
    pub fn with_popular_domains(mut self, domains: Vec<String>) -> Self {
        self.popular_domains = domains;
        self
    }

    /// Sets the per-request HTTP timeout.
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the directory screenshots are written to.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Adds webhooks notified on malicious verdicts.
    pub fn with_webhooks(mut self, webhooks: Vec<Webhook>) -> Self {
        self.webhooks = webhooks;
        self
    }

    /// Replaces the registration-age lookup.
    pub fn with_age_lookup(mut self, age: Arc<dyn AgeLookup>) -> Self {
        self.age = Some(age);
        self
    }

    /// Replaces the geolocation lookup.
    pub fn with_geo_lookup(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }

    /// Replaces the screenshot capture.
    pub fn with_capture(mut self, capture: Arc<dyn ScreenshotCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Installs a vision classifier for screenshot analysis.
    pub fn with_vision(mut self, vision: Arc<dyn VisionClassifier>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Builds the scanner, opening the cache and wiring default capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error when an HTTP client cannot be constructed or the
    /// cache database cannot be opened.
    pub async fn build(self) -> Result<Scanner, InitializationError> {
        crate::initialization::init_crypto_provider();

        let client = crate::initialization::init_client(self.timeout_seconds)?;
        let probe_client = crate::initialization::init_probe_client(self.timeout_seconds)?;
        let cache = ScanCache::open(&self.cache_path)
            .await
            .map_err(InitializationError::CacheError)?;

        let age = self
            .age
            .unwrap_or_else(|| Arc::new(RdapAgeLookup::new(Arc::clone(&client))));
        let geo = self.geo.unwrap_or_else(|| {
            let resolver = crate::initialization::init_resolver();
            Arc::new(IpApiGeoLookup::new(resolver, Arc::clone(&client)))
        });
        let capture = self
            .capture
            .unwrap_or_else(|| Arc::new(HeadlessBrowser::new(self.screenshot_dir.clone())));
        let scheduler = self.scheduler.unwrap_or_else(Scheduler::detect);
        let notifier = WebhookNotifier::new(Arc::clone(&client), self.webhooks);

        Ok(Scanner {
            client,
            probe_client,
            cache,
            cache_max_age: self.cache_max_age,
            settings: self.settings,
            scheduler,
            popular_domains: self.popular_domains,
            screenshot_dir: self.screenshot_dir,
            age,
            geo,
            capture,
            vision: self.vision,
            notifier,
        })
    }
}

/// Runs the full scan pipeline for URLs.
pub struct Scanner {
    client: Arc<reqwest::Client>,
    probe_client: Arc<reqwest::Client>,
    cache: ScanCache,
    cache_max_age: Duration,
    settings: SettingsStore,
    scheduler: Scheduler,
    popular_domains: Vec<String>,
    screenshot_dir: PathBuf,
    age: Arc<dyn AgeLookup>,
    geo: Arc<dyn GeoLookup>,
    capture: Arc<dyn ScreenshotCapture>,
    vision: Option<Arc<dyn VisionClassifier>>,
    notifier: WebhookNotifier,
}

impl Scanner {
    /// Scans one URL.
    ///
    /// Returns the report and whether it was served from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidUrl`] when the input cannot be
    /// canonicalized into an http/https URL with a host. Detector failures
    /// never surface here; they degrade into absent sub-reports.
    pub async fn scan(&self, request: &ScanRequest) -> Result<(ScanReport, bool), ScanError> {
        let url = canonicalize_url(&request.url);
        validate_url(&url)?;

        if !request.skip_cache {
            if let Some(report) = self.cache.get(&url, self.cache_max_age).await {
                log::info!("Cache hit for {url}");
                return Ok((report, true));
            }
        }

        let settings = self.settings.get();
        log::info!("Scanning {url}");

        let chain = if request.trace_redirects {
            trace_redirect_chain(&self.probe_client, &url).await
        } else {
            vec![url.clone()]
        };
        let final_url = chain.last().cloned().unwrap_or_else(|| url.clone());

        let (heuristics, final_heuristics) =
            self.run_heuristics(&url, &final_url, &settings).await;
        let domain = final_heuristics
            .as_ref()
            .unwrap_or(&heuristics)
            .domain
            .clone();

        let outputs = self
            .run_independent_detectors(request, &final_url, &domain, &settings)
            .await;
        let mut whois = None;
        let mut geo = None;
        let mut ssl = None;
        let mut external_intel = Vec::new();
        for output in outputs {
            match output {
                DetectorOutput::Age(report) => whois = Some(report),
                DetectorOutput::Geo(info) => geo = info,
                DetectorOutput::Ssl(report) => ssl = Some(report),
                DetectorOutput::Intel(verdicts) => external_intel = verdicts,
            }
        }

        let reputation = analyze_reputation(&domain, whois.as_ref(), geo.as_ref());

        let jurisdiction = if request.trace_redirects {
            Some(
                analyze_jurisdictions(
                    &chain,
                    self.geo.as_ref(),
                    settings.jurisdiction_jump_limit,
                )
                .await,
            )
        } else {
            None
        };

        let (visual, screenshot_path) = if request.check_visual {
            let vision = if settings.enable_vision_ai {
                self.vision.as_deref()
            } else {
                None
            };
            match analyze_visual(&final_url, &domain, self.capture.as_ref(), vision).await {
                Some((report, path)) => (Some(report), Some(path)),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        let verdict = verdict::evaluate(&VerdictInput {
            heuristics: &heuristics,
            final_heuristics: final_heuristics.as_ref(),
            whois: whois.as_ref(),
            ssl: ssl.as_ref(),
            geo: geo.as_ref(),
            reputation: &reputation,
            jurisdiction: jurisdiction.as_ref(),
            intel: &external_intel,
            visual: visual.as_ref(),
        });

        let report = ScanReport {
            url: url.clone(),
            final_url,
            domain,
            redirect_chain: chain,
            heuristics,
            final_heuristics,
            whois,
            ssl,
            geo,
            reputation,
            jurisdiction,
            external_intel,
            visual,
            screenshot_path: screenshot_path.map(|p| p.display().to_string()),
            is_malicious: verdict.is_malicious,
            reasons: verdict.reasons,
            scanned_at: chrono::Utc::now(),
        };

        if let Err(e) = self.cache.set(&report).await {
            log::warn!("Failed to cache report for {url}: {e}");
        }
        if report.is_malicious {
            log::warn!("{url} flagged as malicious: {}", report.reasons.join("; "));
            if self.notifier.is_active() {
                self.notifier.dispatch(&report);
            }
        }

        Ok((report, false))
    }

    /// Scans a batch of requests, preserving input order.
    pub async fn scan_batch(
        &self,
        requests: &[ScanRequest],
    ) -> Vec<Result<(ScanReport, bool), ScanError>> {
        let futures = requests
            .iter()
            .map(|request| self.scan(request).boxed())
            .collect();
        self.scheduler.join_all(futures).await
    }

    /// Releases held resources and purges stale screenshots.
    pub async fn shutdown(&self) {
        self.capture.shutdown().await;
        let dir = self.screenshot_dir.clone();
        let purged = self
            .scheduler
            .offload(move || purge_stale_screenshots(&dir, SCREENSHOT_RETENTION))
            .await;
        if let Err(e) = purged {
            log::warn!("Screenshot purge failed: {e}");
        }
    }

    /// Read access to the scan cache (history, stats).
    pub fn cache(&self) -> &ScanCache {
        &self.cache
    }

    /// Runs lexical heuristics over the input and final URLs off the reactor.
    async fn run_heuristics(
        &self,
        url: &str,
        final_url: &str,
        settings: &Settings,
    ) -> (HeuristicReport, Option<HeuristicReport>) {
        let url = url.to_string();
        let final_url = if final_url != url {
            Some(final_url.to_string())
        } else {
            None
        };
        let popular = self.popular_domains.clone();
        let settings = settings.clone();
        self.scheduler
            .offload(move || {
                let first = heuristics::analyze(&url, &popular, &settings);
                let second = final_url
                    .as_deref()
                    .map(|u| heuristics::analyze(u, &popular, &settings));
                (first, second)
            })
            .await
    }

    /// Fans out the independent detectors for one final URL.
    async fn run_independent_detectors(
        &self,
        request: &ScanRequest,
        final_url: &str,
        domain: &str,
        settings: &Settings,
    ) -> Vec<DetectorOutput> {
        let providers = if request.check_intel {
            intel::build_providers(Arc::clone(&self.client), &request.credentials)
        } else {
            Vec::new()
        };

        let mut futures: Vec<futures::future::BoxFuture<'_, DetectorOutput>> = Vec::new();

        if request.check_age {
            let min_age = settings.min_domain_age_days;
            futures.push(
                async move {
                    let age_days = self.age.lookup_age(domain).await;
                    DetectorOutput::Age(analyze_domain_age(age_days, min_age))
                }
                .boxed(),
            );
        }

        futures.push(
            async move { DetectorOutput::Geo(self.geo.lookup(domain).await) }.boxed(),
        );

        if request.check_certificate {
            futures.push(
                async move { DetectorOutput::Ssl(analyze_certificate(final_url).await) }.boxed(),
            );
        }

        if !providers.is_empty() {
            let scheduler = self.scheduler;
            futures.push(
                async move {
                    DetectorOutput::Intel(
                        intel::gather_intel(&providers, final_url, &scheduler).await,
                    )
                }
                .boxed(),
            );
        }

        self.scheduler.join_all(futures).await
    }
}

fn validate_url(url: &str) -> Result<(), ScanError> {
    let parsed = Url::parse(url).map_err(|e| ScanError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.host_str().is_none() {
        return Err(ScanError::InvalidUrl {
            url: url.to_string(),
            message: "missing host".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_http_and_https() {
        assert!(validate_url("http://example.com/").is_ok());
        assert!(validate_url("https://example.com/path").is_ok());
    }

    #[test]
    fn test_validate_rejects_other_schemes() {
        let err = validate_url("ftp://example.com/").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_validate_rejects_hostless() {
        assert!(validate_url("not a url").is_err());
    }
}
