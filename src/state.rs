/*
 * Responsibility
 * - 起動時に一度だけ組み立てる共有コンテキスト (AppState)
 *   - verifier: Arc<dyn TokenVerifier>, verify_timeout, http limits
 * - Clone 前提で持つ (内部は Arc/Copy)
 */
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpLimits;
use crate::services::auth::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub verify_timeout: Duration,
    pub http: HttpLimits,
}

impl AppState {
    pub fn new(verifier: Arc<dyn TokenVerifier>, verify_timeout: Duration) -> Self {
        Self {
            verifier,
            verify_timeout,
            http: HttpLimits::default(),
        }
    }

    pub fn with_http_limits(mut self, http: HttpLimits) -> Self {
        self.http = http;
        self
    }
}
