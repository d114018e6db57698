//! Background schedulers (§5): independent long-lived tasks driven by
//! monotonic timers, each honoring a process-wide shutdown signal.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::watch;
use tracing::{error, info};

use crate::batch::SettlementEngine;
use crate::webhook::WebhookDispatcher;

const BATCH_CUT_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const PAYOUT_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const AUTO_VOID_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);
const WEBHOOK_RETRY_INTERVAL: StdDuration = StdDuration::from_secs(30);
const INTENT_EXPIRY_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Runs the batch cut followed immediately by auto-void, preserving the
/// ordering guarantee from §4.7: a transaction captured just before its
/// authorization would have expired must settle, not void.
pub async fn run_settlement_loop(engine: Arc<SettlementEngine>, mut shutdown: watch::Receiver<bool>) {
    let mut batch_tick = tokio::time::interval(BATCH_CUT_INTERVAL);
    let mut payout_tick = tokio::time::interval(PAYOUT_INTERVAL);
    let mut void_tick = tokio::time::interval(AUTO_VOID_INTERVAL);

    loop {
        tokio::select! {
            _ = batch_tick.tick() => {
                let yesterday = chrono::Utc::now().date_naive() - chrono::Duration::days(1);
                match engine.cut_batches(yesterday).await {
                    Ok(batches) => info!(count = batches.len(), batch_date = %yesterday, "settlement batches cut"),
                    Err(e) => error!(error = %e, "settlement batch cut failed"),
                }
                match engine.auto_void_expired().await {
                    Ok(voided) => info!(count = voided.len(), "auto-voided expired authorizations"),
                    Err(e) => error!(error = %e, "auto-void failed"),
                }
            }
            _ = payout_tick.tick() => {
                match engine.run_payouts(|_batch| true).await {
                    Ok(settled) => info!(count = settled.len(), "settlement batches paid out"),
                    Err(e) => error!(error = %e, "payout sweep failed"),
                }
            }
            _ = void_tick.tick() => {
                match engine.auto_void_expired().await {
                    Ok(voided) if !voided.is_empty() => info!(count = voided.len(), "auto-voided expired authorizations"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "auto-void failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("settlement loop shutting down");
                    break;
                }
            }
        }
    }
}

pub async fn run_webhook_retry_loop(dispatcher: Arc<WebhookDispatcher>, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(WEBHOOK_RETRY_INTERVAL);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match dispatcher.dispatch_due().await {
                    Ok(n) if n > 0 => info!(count = n, "webhook deliveries attempted"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "webhook retry pass failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("webhook retry loop shutting down");
                    break;
                }
            }
        }
    }
}

pub async fn run_intent_expiry_loop(intents: Arc<gateway_engine::PaymentIntentEngine>, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(INTENT_EXPIRY_INTERVAL);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match intents.expire_due().await {
                    Ok(expired) if !expired.is_empty() => info!(count = expired.len(), "payment intents expired"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "intent expiry sweep failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("intent expiry loop shutting down");
                    break;
                }
            }
        }
    }
}
