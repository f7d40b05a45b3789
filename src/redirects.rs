//! HTTP redirect chain tracing.
//!
//! Follows redirect chains manually, using a client with redirects disabled,
//! to record the full path from the initial URL to the final destination.
//! Only `Location` headers are followed; response bodies are never executed
//! or parsed. Tracing is best-effort: any network error ends the chain with
//! whatever was gathered so far.

use reqwest::Url;

use crate::config::{MAX_REDIRECT_HOPS, PROBE_TIMEOUT};

/// Follows header-based redirects from `start_url`, up to the hop limit.
///
/// Returns the ordered chain of visited URLs. The chain always contains at
/// least the start URL, never repeats an entry consecutively, and its last
/// element is the final URL used by downstream detectors. Network errors
/// mid-chain are logged and swallowed; the partial chain is returned.
///
/// # Arguments
///
/// * `client` - HTTP client with redirects disabled (for manual tracking)
/// * `start_url` - The initial URL to start from
pub async fn trace_redirect_chain(client: &reqwest::Client, start_url: &str) -> Vec<String> {
    let mut chain: Vec<String> = vec![start_url.to_string()];
    let mut current = start_url.to_string();

    for _ in 0..MAX_REDIRECT_HOPS {
        let response = match tokio::time::timeout(PROBE_TIMEOUT, client.get(&current).send()).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                log::debug!("Redirect probe failed for {current}: {e}");
                break;
            }
            Err(_) => {
                log::debug!("Redirect probe timed out for {current}");
                break;
            }
        };

        let status = response.status().as_u16();
        if !matches!(status, 301 | 302 | 303 | 307 | 308) {
            break;
        }

        let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
        else {
            log::warn!("Redirect status {status} for {current} but no usable Location header");
            break;
        };

        // Relative Location values resolve against the previous hop.
        let next = match Url::parse(location)
            .or_else(|_| Url::parse(&current).and_then(|base| base.join(location)))
        {
            Ok(url) => url.to_string(),
            Err(e) => {
                log::warn!("Unparseable Location '{location}' from {current}: {e}");
                break;
            }
        };

        if next == current {
            break;
        }

        chain.push(next.clone());
        current = next;
    }

    chain
}
