/*
 * Responsibility
 * - ゲートの内側で動く保護対象 handler (固定の本文を返すだけ)
 */
pub async fn welcome() -> &'static str {
    "welcome"
}
