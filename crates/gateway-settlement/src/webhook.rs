//! Webhook dispatcher (C11): at-least-once delivery with exponential
//! backoff and an HMAC-signed envelope so merchants can verify authenticity.

use std::sync::Arc;

use chrono::Duration;
use gateway_db::{DbWebhookDelivery, MerchantRepo, WebhookDeliveryRepo};
use gateway_engine::Clock;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{SettlementError, SettlementResult};

type HmacSha256 = Hmac<Sha256>;

/// 1-indexed: the first retry after an initial failed attempt waits 5m, the
/// second 15m, and so on. A delivery is exhausted once `attempt_count`
/// reaches this length plus the initial attempt (5 total tries).
pub const BACKOFF_SCHEDULE: [Duration; 4] = [Duration::minutes(5), Duration::minutes(15), Duration::hours(1), Duration::hours(6)];

pub const MAX_ATTEMPTS: i32 = 5;

pub const OUTBOUND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub struct WebhookDispatcher {
    deliveries: WebhookDeliveryRepo,
    merchants: MerchantRepo,
    client: Client,
    clock: Arc<dyn Clock>,
    signing_secret: Vec<u8>,
}

impl WebhookDispatcher {
    pub fn new(deliveries: WebhookDeliveryRepo, merchants: MerchantRepo, clock: Arc<dyn Clock>, signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            deliveries,
            merchants,
            client: Client::new(),
            clock,
            signing_secret: signing_secret.into(),
        }
    }

    /// Enqueues a delivery for a significant payment event (authorized,
    /// captured, voided, refunded, intent.succeeded, intent.canceled). The
    /// payload always carries `payment_id` and `event_type` so handlers can
    /// dedupe against at-least-once redelivery.
    pub async fn enqueue(&self, merchant_id: Uuid, payment_id: Uuid, event_type: &str, mut payload: serde_json::Value) -> SettlementResult<DbWebhookDelivery> {
        let merchant = self.merchants.require_by_id(merchant_id).await?;
        let url = merchant.webhook_url.ok_or(SettlementError::NoWebhookUrl(merchant_id))?;

        if let Some(obj) = payload.as_object_mut() {
            obj.insert("payment_id".to_string(), serde_json::json!(payment_id));
            obj.insert("event_type".to_string(), serde_json::json!(event_type));
        }

        let row = self.deliveries.enqueue(merchant_id, payment_id, event_type, &url, payload).await?;
        Ok(row)
    }

    /// One retry-worker pass: delivers every due row, updating its ledger
    /// entry based on the response. Returns the number of rows attempted.
    pub async fn dispatch_due(&self) -> SettlementResult<usize> {
        let now = self.clock.now();
        let due = self.deliveries.find_due(now, MAX_ATTEMPTS).await?;
        let count = due.len();

        for delivery in due {
            self.deliver_one(delivery).await?;
        }

        Ok(count)
    }

    async fn deliver_one(&self, delivery: DbWebhookDelivery) -> SettlementResult<()> {
        let body = serde_json::to_vec(&delivery.payload).map_err(|e| SettlementError::Internal(e.to_string()))?;
        let signature = sign_with_secret(&self.signing_secret, &body);

        let result = self
            .client
            .post(&delivery.url)
            .header("content-type", "application/json")
            .header("X-Gateway-Signature", format!("sha256={signature}"))
            .timeout(OUTBOUND_TIMEOUT)
            .body(body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                self.deliveries.mark_delivered(delivery.id, resp.status().as_u16() as i32, self.clock.now()).await?;
            }
            Ok(resp) => {
                let status_code = resp.status().as_u16() as i32;
                self.schedule_retry_or_exhaust(&delivery, Some(status_code)).await?;
            }
            Err(_) => {
                self.schedule_retry_or_exhaust(&delivery, None).await?;
            }
        }

        Ok(())
    }

    async fn schedule_retry_or_exhaust(&self, delivery: &DbWebhookDelivery, status_code: Option<i32>) -> SettlementResult<()> {
        let attempt = delivery.attempt_count;
        if attempt + 1 >= MAX_ATTEMPTS {
            self.deliveries.mark_exhausted(delivery.id, status_code).await?;
        } else {
            let backoff = BACKOFF_SCHEDULE[attempt as usize % BACKOFF_SCHEDULE.len()];
            let next_retry_at = self.clock.now() + backoff;
            self.deliveries.mark_retry(delivery.id, status_code, next_retry_at).await?;
        }
        Ok(())
    }
}

fn sign_with_secret(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_changes_with_body() {
        let a = sign_with_secret(b"secret", b"{\"a\":1}");
        let b = sign_with_secret(b"secret", b"{\"a\":2}");
        assert_ne!(a, b);
    }

    #[test]
    fn signature_is_deterministic() {
        let a = sign_with_secret(b"secret", b"payload");
        let b = sign_with_secret(b"secret", b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn backoff_schedule_matches_spec() {
        assert_eq!(BACKOFF_SCHEDULE[0], Duration::minutes(5));
        assert_eq!(BACKOFF_SCHEDULE[1], Duration::minutes(15));
        assert_eq!(BACKOFF_SCHEDULE[2], Duration::hours(1));
        assert_eq!(BACKOFF_SCHEDULE[3], Duration::hours(6));
    }
}
