use anyhow::Result;
use cointab::config::ApiCredentials;
use cointab::exchanges::{ExchangeAdapter, PoloniexAdapter};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> ApiCredentials {
    ApiCredentials {
        key: "api-key".to_string(),
        secret: "api-secret".to_string(),
        passphrase: None,
    }
}

#[tokio::test]
async fn poloniex_fetch_parses_signed_balance_response() -> Result<()> {
    let server = MockServer::start().await;

    let body = r#"{
        "BTC": "1.25",
        "ETH": "0.00000000",
        "XRP": "250.5"
    }"#;
    Mock::given(method("POST"))
        .and(path("/tradingApi"))
        .and(header_exists("Key"))
        .and(header_exists("Sign"))
        .and(body_string_contains("command=returnBalances"))
        .and(body_string_contains("nonce="))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = PoloniexAdapter::new(credentials()).with_base_url(server.uri());
    let balances = adapter.fetch_balances().await?;

    assert_eq!(balances["BTC"], 1.25);
    assert_eq!(balances["ETH"], 0.0);
    assert_eq!(balances["XRP"], 250.5);
    Ok(())
}

#[tokio::test]
async fn poloniex_error_payload_fails_the_fetch() {
    let server = MockServer::start().await;

    let body = r#"{ "error": "Invalid API key/secret pair." }"#;
    Mock::given(method("POST"))
        .and(path("/tradingApi"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let adapter = PoloniexAdapter::new(credentials()).with_base_url(server.uri());
    let err = adapter.fetch_balances().await.unwrap_err();

    assert!(err.to_string().contains("Invalid API key/secret pair"));
}

#[tokio::test]
async fn poloniex_http_error_status_fails_the_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tradingApi"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let adapter = PoloniexAdapter::new(credentials()).with_base_url(server.uri());
    let err = adapter.fetch_balances().await.unwrap_err();

    assert!(err.to_string().contains("403"));
}
