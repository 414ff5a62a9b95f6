/*
 * Responsibility
 * - URL 構造を定義
 * - ゲートが必要な範囲 (/ と未定義パス全部) と不要な範囲 (/livez, /readyz) をここで決める
 */
use axum::{Router, routing::any};

use crate::api::handlers::{
    health::{livez, readyz},
    welcome::welcome,
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router {
    let guarded = Router::new().route("/", any(welcome)).fallback(welcome);
    let guarded = middleware::auth::access::apply(guarded, state);

    Router::new()
        .route("/livez", any(livez))
        .route("/readyz", any(readyz))
        .merge(guarded)
}
