/*
 * Responsibility
 * - tokio runtime 起動
 * - app::run() の呼び出し（ロジックは置かない）
 * - 設定エラーは main から返して exit(1)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cf_access_gate::app::run().await
}
