/*
 * Responsibility
 * - tracing / panic hook 初期化
 * - Config 読み込み → verifier 生成 → Router 組み立て
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{api, config::Config, middleware, services::auth::build_verifier, state::AppState};

/// Default filter: this crate and the access log at info, dependencies at
/// warn. `RUST_LOG` overrides it, e.g.
/// `RUST_LOG=cf_access_gate=debug,tower_http=debug cargo run`.
const DEFAULT_LOG_FILTER: &str = "warn,cf_access_gate=info,tower_http=info";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let location = info.location().map(|l| l.to_string());
        tracing::error!(location = ?location, "panic: {}", panic_message(info));

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

fn panic_message<'a>(info: &'a panic::PanicHookInfo<'_>) -> &'a str {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s
    } else {
        "<non-string payload>"
    }
}

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env().inspect_err(|err| {
        tracing::error!(error = %err, "refusing to start");
    })?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        team_domain = %config.team_domain,
        "starting access gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    let verifier = build_verifier(config)?;
    Ok(AppState::new(verifier, config.verify_timeout).with_http_limits(config.http))
}

/// Full router: health checks, the guarded welcome route, and HTTP-level middleware.
pub fn build_router(state: AppState) -> Router {
    middleware::http::apply(api::routes(&state), &state.http)
}
