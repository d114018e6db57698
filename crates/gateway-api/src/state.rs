//! Application state shared across handlers: database, auth, the business
//! engines, and the webhook dispatcher.

use std::sync::Arc;

use gateway_auth::AuthService;
use gateway_db::Database;
use gateway_engine::Engines;
use gateway_settlement::WebhookDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    pub engines: Arc<Engines>,
    pub webhooks: Arc<WebhookDispatcher>,
}

impl AppState {
    pub fn new(db: Arc<Database>, auth: Arc<AuthService>, engines: Arc<Engines>, webhooks: Arc<WebhookDispatcher>) -> Self {
        Self { db, auth, engines, webhooks }
    }
}
