/*
 * Responsibility
 * - 外部と話すサービス層 (トークン検証・署名鍵取得)
 */
pub mod auth;
