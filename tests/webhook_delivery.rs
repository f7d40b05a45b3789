//! Webhook delivery against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use linkguard::config::DEFAULT_POPULAR_DOMAINS;
use linkguard::heuristics;
use linkguard::notify::{sign, Webhook, WebhookNotifier, SIGNATURE_HEADER};
use linkguard::reputation::analyze_reputation;
use linkguard::{ScanReport, Settings};

fn malicious_report(url: &str) -> ScanReport {
    let settings = Settings::default();
    let heuristics = heuristics::analyze(url, DEFAULT_POPULAR_DOMAINS, &settings);
    let domain = heuristics.domain.clone();
    ScanReport {
        url: url.to_string(),
        final_url: url.to_string(),
        domain: domain.clone(),
        redirect_chain: vec![url.to_string()],
        heuristics,
        final_heuristics: None,
        whois: None,
        ssl: None,
        geo: None,
        reputation: analyze_reputation(&domain, None, None),
        jurisdiction: None,
        external_intel: Vec::new(),
        visual: None,
        screenshot_path: None,
        is_malicious: true,
        reasons: vec!["Flagged by test".to_string()],
        scanned_at: chrono::Utc::now(),
    }
}

async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<wiremock::Request> {
    for _ in 0..50 {
        if let Some(requests) = server.received_requests().await {
            if requests.len() >= count {
                return requests;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap_or_default()
}

#[tokio::test]
async fn signed_delivery_carries_a_valid_signature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(
        Arc::new(reqwest::Client::new()),
        vec![Webhook {
            url: format!("{}/hook", server.uri()),
            description: "signed".to_string(),
            secret: Some("shared-secret".to_string()),
            active: true,
        }],
    );

    notifier.dispatch(&malicious_report("http://phish.example/"));
    let requests = wait_for_requests(&server, 1).await;
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    let signature = request
        .headers
        .get(SIGNATURE_HEADER)
        .expect("signature header")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(signature, sign("shared-secret", &request.body));

    let payload: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(payload["url"], "http://phish.example/");
    assert_eq!(payload["is_malicious"], true);
    assert_eq!(payload["reasons"][0], "Flagged by test");
}

#[tokio::test]
async fn unsigned_delivery_has_no_signature_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(
        Arc::new(reqwest::Client::new()),
        vec![Webhook {
            url: format!("{}/hook", server.uri()),
            description: "unsigned".to_string(),
            secret: None,
            active: true,
        }],
    );

    notifier.dispatch(&malicious_report("http://phish.example/"));
    let requests = wait_for_requests(&server, 1).await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get(SIGNATURE_HEADER).is_none());
}

#[tokio::test]
async fn inactive_webhooks_receive_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(
        Arc::new(reqwest::Client::new()),
        vec![Webhook {
            url: format!("{}/hook", server.uri()),
            description: "off".to_string(),
            secret: None,
            active: false,
        }],
    );

    notifier.dispatch(&malicious_report("http://phish.example/"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn one_failing_endpoint_does_not_block_the_other() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(
        Arc::new(reqwest::Client::new()),
        vec![
            Webhook {
                url: format!("{}/bad", server.uri()),
                description: "failing".to_string(),
                secret: None,
                active: true,
            },
            Webhook {
                url: format!("{}/good", server.uri()),
                description: "healthy".to_string(),
                secret: None,
                active: true,
            },
        ],
    );

    notifier.dispatch(&malicious_report("http://phish.example/"));
    let requests = wait_for_requests(&server, 2).await;

    let paths: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert!(paths.contains(&"/good".to_string()));
    assert!(paths.contains(&"/bad".to_string()));
}
