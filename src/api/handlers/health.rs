/*
 * Responsibility
 * - /livez, /readyz (疎通用、メソッドを問わず固定の本文)
 * - ゲートを通さない
 */
pub async fn livez() -> &'static str {
    "ok"
}

pub async fn readyz() -> &'static str {
    "ready"
}
