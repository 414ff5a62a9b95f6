/*
 * Responsibility
 * - Cloudflare Access トークンで保護する HTTP ゲートの公開モジュール
 * - binary (main.rs) と tests/ の両方から使う
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
