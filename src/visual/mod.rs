//! Visual impersonation analysis.
//!
//! A screenshot of the rendered page anchors this detector: without a
//! capture there is no visual evidence and no visual findings. Over a
//! successful capture two layers score the page, a lexical impersonation
//! score on the host (sensitive keywords and protected brand names) and an
//! optional pluggable vision classifier. Both capture and classification
//! are capability traits so tests run without a browser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::OnceCell;

use crate::config::{PROTECTED_BRANDS, SCREENSHOT_TIMEOUT, SENSITIVE_KEYWORDS};
use crate::models::RiskTier;

/// Score above which visual risk is decisive.
const HIGH_VISUAL_SCORE: u32 = 70;
/// Score above which visual risk is elevated.
const MEDIUM_VISUAL_SCORE: u32 = 30;
/// Added when the host carries a sensitive phishing keyword.
const SENSITIVE_KEYWORD_SCORE: u32 = 40;

/// Visual findings for one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualReport {
    /// Tier derived from the final score.
    pub impersonation_risk: RiskTier,
    /// Final visual score, 0-100.
    pub vision_score: u32,
    /// Human-readable findings.
    pub findings: Vec<String>,
    /// Which layer produced the score.
    pub analysis_provider: String,
}

/// Capability: capture a screenshot of a rendered page.
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    /// Captures `url` and returns the image path.
    ///
    /// # Errors
    ///
    /// Returns an error when no browser is available or rendering fails.
    async fn capture(&self, url: &str, domain: &str) -> anyhow::Result<PathBuf>;

    /// Releases any held browser resources.
    async fn shutdown(&self) {}
}

/// Capability: classify a screenshot for brand impersonation.
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    /// Stable provider name reported in [`VisualReport`].
    fn name(&self) -> &'static str;

    /// Scores the screenshot, returning a 0-100 score and findings.
    ///
    /// # Errors
    ///
    /// Returns an error when the classifier backend is unavailable.
    async fn classify(&self, screenshot: &Path, domain: &str)
        -> anyhow::Result<(u32, Vec<String>)>;
}

/// Capture implementation that always declines.
pub struct DisabledCapture;

#[async_trait]
impl ScreenshotCapture for DisabledCapture {
    async fn capture(&self, _url: &str, _domain: &str) -> anyhow::Result<PathBuf> {
        anyhow::bail!("screenshot capture disabled")
    }
}

/// Headless Chromium screenshot capture.
///
/// The browser binary is discovered once: the `LINKGUARD_BROWSER` variable
/// wins, otherwise well-known binary names are searched on `PATH`. Each
/// capture is a short-lived browser process killed on timeout.
pub struct HeadlessBrowser {
    output_dir: PathBuf,
    binary: OnceCell<Option<PathBuf>>,
}

const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "headless_shell",
];

impl HeadlessBrowser {
    /// Creates a capture writing screenshots under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            binary: OnceCell::new(),
        }
    }

    async fn find_binary(&self) -> Option<PathBuf> {
        self.binary
            .get_or_init(|| async {
                if let Ok(path) = std::env::var("LINKGUARD_BROWSER") {
                    return Some(PathBuf::from(path));
                }
                let path_var = std::env::var_os("PATH")?;
                for dir in std::env::split_paths(&path_var) {
                    for candidate in BROWSER_CANDIDATES {
                        let full = dir.join(candidate);
                        if full.is_file() {
                            return Some(full);
                        }
                    }
                }
                None
            })
            .await
            .clone()
    }
}

#[async_trait]
impl ScreenshotCapture for HeadlessBrowser {
    async fn capture(&self, url: &str, domain: &str) -> anyhow::Result<PathBuf> {
        let binary = self
            .find_binary()
            .await
            .ok_or_else(|| anyhow::anyhow!("no headless browser found on PATH"))?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output = self.output_dir.join(format!(
            "{}-{}.png",
            domain.replace(['/', ':'], "_"),
            chrono::Utc::now().timestamp_millis()
        ));

        let mut child = tokio::process::Command::new(&binary)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--window-size=1280,800")
            .arg(format!("--screenshot={}", output.display()))
            .arg(url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let status = tokio::time::timeout(SCREENSHOT_TIMEOUT, child.wait())
            .await
            .map_err(|_| anyhow::anyhow!("screenshot of {url} timed out"))??;

        if !status.success() {
            anyhow::bail!("browser exited with {status} for {url}");
        }
        if !output.is_file() {
            anyhow::bail!("browser produced no screenshot for {url}");
        }
        Ok(output)
    }
}

/// Lexical impersonation score over a host.
///
/// Sensitive keywords add a fixed amount; a protected brand name appearing
/// in a host that is not the brand's own domain takes the brand's score if
/// it is higher.
pub fn score_impersonation(host: &str) -> (u32, Vec<String>) {
    let host = host.to_ascii_lowercase();
    let mut score = 0u32;
    let mut findings = Vec::new();

    if SENSITIVE_KEYWORDS.iter().any(|kw| host.contains(kw)) {
        score += SENSITIVE_KEYWORD_SCORE;
        findings.push("URL contains sensitive phishing keyword".to_string());
    }

    for (brand, legit_domain, brand_score) in PROTECTED_BRANDS {
        let is_legit = host == *legit_domain || host.ends_with(&format!(".{legit_domain}"));
        if host.contains(brand) && !is_legit {
            score = score.max(*brand_score);
            findings.push(format!("Potential {brand} brand impersonation"));
        }
    }

    (score.min(100), findings)
}

/// Derives the risk tier from a 0-100 score.
pub fn score_tier(score: u32) -> RiskTier {
    if score > HIGH_VISUAL_SCORE {
        RiskTier::High
    } else if score > MEDIUM_VISUAL_SCORE {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Runs the visual pipeline for one URL.
///
/// A screenshot is captured first; without one there is no rendered page to
/// judge, so a capture failure drops the whole visual layer and returns
/// `None`. On success the lexical score runs over the host and, when a
/// classifier is configured, its score is merged in; classifier failures
/// fall back to the lexical layer alone.
pub async fn analyze_visual(
    url: &str,
    domain: &str,
    capture: &dyn ScreenshotCapture,
    vision: Option<&dyn VisionClassifier>,
) -> Option<(VisualReport, PathBuf)> {
    let path = match capture.capture(url, domain).await {
        Ok(path) => path,
        Err(e) => {
            log::debug!("Screenshot capture failed for {url}: {e}");
            return None;
        }
    };

    let (mut score, mut findings) = score_impersonation(domain);
    let mut provider = "lexical".to_string();

    if let Some(vision) = vision {
        match vision.classify(&path, domain).await {
            Ok((vision_score, vision_findings)) => {
                if vision_score > score {
                    score = vision_score;
                }
                findings.extend(vision_findings);
                provider = vision.name().to_string();
            }
            Err(e) => log::warn!("Vision classification failed for {url}: {e}"),
        }
    }

    let report = VisualReport {
        impersonation_risk: score_tier(score),
        vision_score: score,
        findings,
        analysis_provider: provider,
    };
    Some((report, path))
}

/// Deletes screenshots older than `max_age` from `dir`.
///
/// Returns the number of files removed. A missing directory is not an
/// error; it just means nothing was ever captured.
pub fn purge_stale_screenshots(dir: &Path, max_age: Duration) -> anyhow::Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut removed = 0usize;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|e| e == "png") != Some(true) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let stale = now
            .duration_since(modified)
            .map(|age| age > max_age)
            .unwrap_or(false);
        if stale {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!("Purged {removed} stale screenshots from {}", dir.display());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Capture that copies nothing and returns a fixed path.
    pub struct MockCapture(pub PathBuf);

    #[async_trait]
    impl ScreenshotCapture for MockCapture {
        async fn capture(&self, _url: &str, _domain: &str) -> anyhow::Result<PathBuf> {
            Ok(self.0.clone())
        }
    }

    /// Classifier that returns a fixed score.
    pub struct MockVisionClassifier(pub u32);

    #[async_trait]
    impl VisionClassifier for MockVisionClassifier {
        fn name(&self) -> &'static str {
            "mock-vision"
        }
        async fn classify(
            &self,
            _screenshot: &Path,
            _domain: &str,
        ) -> anyhow::Result<(u32, Vec<String>)> {
            Ok((self.0, vec!["Mock classification".to_string()]))
        }
    }

    #[test]
    fn test_clean_host_scores_zero() {
        let (score, findings) = score_impersonation("example.com");
        assert_eq!(score, 0);
        assert!(findings.is_empty());
        assert_eq!(score_tier(score), RiskTier::Low);
    }

    #[test]
    fn test_sensitive_keyword_is_medium() {
        let (score, findings) = score_impersonation("secure-update.example.com");
        assert_eq!(score, SENSITIVE_KEYWORD_SCORE);
        assert_eq!(findings, vec!["URL contains sensitive phishing keyword"]);
        assert_eq!(score_tier(score), RiskTier::Medium);
    }

    #[test]
    fn test_brand_impersonation_is_high() {
        let (score, findings) = score_impersonation("paypal-login.example.com");
        assert_eq!(score, 90);
        assert_eq!(score_tier(score), RiskTier::High);
        assert!(findings
            .iter()
            .any(|f| f.contains("paypal brand impersonation")));
    }

    #[test]
    fn test_legitimate_brand_domain_not_flagged() {
        let (score, findings) = score_impersonation("www.paypal.com");
        assert_eq!(score, 0);
        assert!(findings.is_empty());

        let (score, _) = score_impersonation("paypal.com");
        assert_eq!(score, 0);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(score_tier(30), RiskTier::Low);
        assert_eq!(score_tier(31), RiskTier::Medium);
        assert_eq!(score_tier(70), RiskTier::Medium);
        assert_eq!(score_tier(71), RiskTier::High);
    }

    #[tokio::test]
    async fn test_vision_score_overrides_when_higher() {
        let capture = MockCapture(PathBuf::from("/tmp/shot.png"));
        let vision = MockVisionClassifier(85);
        let (report, path) =
            analyze_visual("http://example.com/", "example.com", &capture, Some(&vision))
                .await
                .expect("capture succeeds");
        assert_eq!(report.vision_score, 85);
        assert_eq!(report.impersonation_risk, RiskTier::High);
        assert_eq!(report.analysis_provider, "mock-vision");
        assert_eq!(path, PathBuf::from("/tmp/shot.png"));
    }

    #[tokio::test]
    async fn test_lexical_only_without_classifier() {
        let capture = MockCapture(PathBuf::from("/tmp/shot.png"));
        let (report, _) = analyze_visual(
            "http://paypal-login.example.com/",
            "paypal-login.example.com",
            &capture,
            None,
        )
        .await
        .expect("capture succeeds");
        assert_eq!(report.analysis_provider, "lexical");
        assert_eq!(report.vision_score, 90);
        assert_eq!(report.impersonation_risk, RiskTier::High);
    }

    #[tokio::test]
    async fn test_capture_failure_omits_visual_findings() {
        // Even a blatant brand lookalike produces no visual report when no
        // screenshot exists to back it up.
        let result = analyze_visual(
            "http://paypal-login.example.com/",
            "paypal-login.example.com",
            &DisabledCapture,
            None,
        )
        .await;
        assert!(result.is_none());
    }

    #[test]
    fn test_purge_removes_only_stale_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("old.png");
        let fresh = dir.path().join("new.png");
        let other = dir.path().join("notes.txt");
        std::fs::write(&stale, b"png").unwrap();
        std::fs::write(&fresh, b"png").unwrap();
        std::fs::write(&other, b"txt").unwrap();

        // Everything was just written, nothing is stale yet.
        let removed = purge_stale_screenshots(dir.path(), Duration::from_secs(3600)).unwrap();
        assert_eq!(removed, 0);

        // With a zero retention the pngs go, the txt stays.
        let removed = purge_stale_screenshots(dir.path(), Duration::from_secs(0)).unwrap();
        assert_eq!(removed, 2);
        assert!(other.is_file());
    }

    #[test]
    fn test_purge_missing_dir_is_ok() {
        let removed =
            purge_stale_screenshots(Path::new("/nonexistent/linkguard-shots"), Duration::ZERO)
                .unwrap();
        assert_eq!(removed, 0);
    }
}
