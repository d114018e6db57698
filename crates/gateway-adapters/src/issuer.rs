//! Issuer adapter (C6) - bounded-timeout RPC to the card simulator.
//!
//! Response codes follow ISO-8583-style two-character codes: `00` approved,
//! `05` do-not-honor, `51` insufficient funds, `54` expired card, `N7` CVV
//! mismatch, `96` system error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::error::{AdapterError, AdapterResult};

pub const DEFAULT_ISSUER_TIMEOUT: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerAuthorizeRequest {
    pub merchant_id: uuid::Uuid,
    pub amount: i64,
    pub currency: String,
    pub card_number: String,
    pub card_exp_month: u32,
    pub card_exp_year: u32,
    pub cvv: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerResponse {
    pub approved: bool,
    pub auth_code: Option<String>,
    pub response_code: String,
    pub response_message: String,
    pub decline_reason: Option<String>,
    pub avs: Option<String>,
    pub cvv_result: Option<String>,
}

/// The issuer's authorize/capture/void/refund surface. Every call must be
/// wrapped by the caller in [`tokio::time::timeout`] (or use the
/// `with_timeout` wrapper below); a timed-out or network-failed call never
/// leaves a Transaction row in a pending state — the engine persists
/// `failed` and records the raw error in the audit row.
#[async_trait]
pub trait IssuerAdapter: Send + Sync {
    async fn authorize(&self, req: IssuerAuthorizeRequest) -> AdapterResult<IssuerResponse>;
    async fn capture(&self, auth_code: &str, amount: i64) -> AdapterResult<IssuerResponse>;
    async fn void(&self, auth_code: &str) -> AdapterResult<IssuerResponse>;
    async fn refund(&self, auth_code: &str, amount: i64) -> AdapterResult<IssuerResponse>;
}

/// Runs `adapter_call` under `timeout`, translating elapsed deadlines into
/// [`AdapterError::Timeout`].
pub async fn with_timeout<F, T>(timeout: Duration, adapter_call: F) -> AdapterResult<T>
where
    F: std::future::Future<Output = AdapterResult<T>>,
{
    match tokio::time::timeout(timeout, adapter_call).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout(timeout)),
    }
}

/// HTTP-backed issuer adapter, exercised by integration tests against a
/// live card-simulator endpoint; never exercised by unit tests.
pub struct HttpIssuerAdapter {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpIssuerAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl IssuerAdapter for HttpIssuerAdapter {
    async fn authorize(&self, req: IssuerAuthorizeRequest) -> AdapterResult<IssuerResponse> {
        with_timeout(self.timeout, async {
            let resp = self
                .client
                .post(format!("{}/authorize", self.base_url))
                .json(&req)
                .send()
                .await
                .map_err(|e| AdapterError::Network(e.to_string()))?;
            resp.json::<IssuerResponse>()
                .await
                .map_err(|e| AdapterError::Protocol(e.to_string()))
        })
        .await
    }

    async fn capture(&self, auth_code: &str, amount: i64) -> AdapterResult<IssuerResponse> {
        with_timeout(self.timeout, async {
            let resp = self
                .client
                .post(format!("{}/capture", self.base_url))
                .json(&serde_json::json!({ "auth_code": auth_code, "amount": amount }))
                .send()
                .await
                .map_err(|e| AdapterError::Network(e.to_string()))?;
            resp.json::<IssuerResponse>()
                .await
                .map_err(|e| AdapterError::Protocol(e.to_string()))
        })
        .await
    }

    async fn void(&self, auth_code: &str) -> AdapterResult<IssuerResponse> {
        with_timeout(self.timeout, async {
            let resp = self
                .client
                .post(format!("{}/void", self.base_url))
                .json(&serde_json::json!({ "auth_code": auth_code }))
                .send()
                .await
                .map_err(|e| AdapterError::Network(e.to_string()))?;
            resp.json::<IssuerResponse>()
                .await
                .map_err(|e| AdapterError::Protocol(e.to_string()))
        })
        .await
    }

    async fn refund(&self, auth_code: &str, amount: i64) -> AdapterResult<IssuerResponse> {
        with_timeout(self.timeout, async {
            let resp = self
                .client
                .post(format!("{}/refund", self.base_url))
                .json(&serde_json::json!({ "auth_code": auth_code, "amount": amount }))
                .send()
                .await
                .map_err(|e| AdapterError::Network(e.to_string()))?;
            resp.json::<IssuerResponse>()
                .await
                .map_err(|e| AdapterError::Protocol(e.to_string()))
        })
        .await
    }
}

/// In-memory issuer fake for unit tests. Declines cards whose number ends
/// in a recognized test suffix; approves everything else.
#[derive(Default)]
pub struct MockIssuerAdapter;

impl MockIssuerAdapter {
    fn decline_for(card_number: &str) -> Option<(&'static str, &'static str, &'static str)> {
        match card_number.chars().rev().take(4).collect::<String>().chars().rev().collect::<String>().as_str() {
            "0002" => Some(("05", "Do Not Honor", "do_not_honor")),
            "0051" => Some(("51", "Insufficient Funds", "insufficient_funds")),
            "0054" => Some(("54", "Expired Card", "expired_card")),
            _ => None,
        }
    }
}

#[async_trait]
impl IssuerAdapter for MockIssuerAdapter {
    async fn authorize(&self, req: IssuerAuthorizeRequest) -> AdapterResult<IssuerResponse> {
        if let Some((code, message, reason)) = Self::decline_for(&req.card_number) {
            return Ok(IssuerResponse {
                approved: false,
                auth_code: None,
                response_code: code.to_string(),
                response_message: message.to_string(),
                decline_reason: Some(reason.to_string()),
                avs: None,
                cvv_result: None,
            });
        }

        Ok(IssuerResponse {
            approved: true,
            auth_code: Some(format!("AUTH{}", uuid::Uuid::new_v4().simple())),
            response_code: "00".to_string(),
            response_message: "Approved".to_string(),
            decline_reason: None,
            avs: Some("Y".to_string()),
            cvv_result: req.cvv.map(|_| "M".to_string()),
        })
    }

    async fn capture(&self, auth_code: &str, _amount: i64) -> AdapterResult<IssuerResponse> {
        if auth_code.is_empty() {
            warn!("capture called with empty auth_code");
        }
        Ok(IssuerResponse {
            approved: true,
            auth_code: Some(auth_code.to_string()),
            response_code: "00".to_string(),
            response_message: "Captured".to_string(),
            decline_reason: None,
            avs: None,
            cvv_result: None,
        })
    }

    async fn void(&self, auth_code: &str) -> AdapterResult<IssuerResponse> {
        Ok(IssuerResponse {
            approved: true,
            auth_code: Some(auth_code.to_string()),
            response_code: "00".to_string(),
            response_message: "Voided".to_string(),
            decline_reason: None,
            avs: None,
            cvv_result: None,
        })
    }

    async fn refund(&self, auth_code: &str, _amount: i64) -> AdapterResult<IssuerResponse> {
        Ok(IssuerResponse {
            approved: true,
            auth_code: Some(auth_code.to_string()),
            response_code: "00".to_string(),
            response_message: "Refunded".to_string(),
            decline_reason: None,
            avs: None,
            cvv_result: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(card_number: &str) -> IssuerAuthorizeRequest {
        IssuerAuthorizeRequest {
            merchant_id: uuid::Uuid::new_v4(),
            amount: 10_000,
            currency: "USD".to_string(),
            card_number: card_number.to_string(),
            card_exp_month: 12,
            card_exp_year: 2030,
            cvv: Some("123".to_string()),
        }
    }

    #[tokio::test]
    async fn approves_standard_test_card() {
        let issuer = MockIssuerAdapter;
        let resp = issuer.authorize(req("4111111111114242")).await.unwrap();
        assert!(resp.approved);
        assert!(resp.auth_code.is_some());
    }

    #[tokio::test]
    async fn declines_do_not_honor_suffix() {
        let issuer = MockIssuerAdapter;
        let resp = issuer.authorize(req("4111111110000002")).await.unwrap();
        assert!(!resp.approved);
        assert_eq!(resp.response_code, "05");
    }

    #[tokio::test]
    async fn timeout_wrapper_trips_on_slow_call() {
        let result: AdapterResult<()> = with_timeout(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AdapterError::Timeout(_))));
    }
}
