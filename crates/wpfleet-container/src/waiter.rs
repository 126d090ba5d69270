//! 準備完了待機モジュール（Exponential Backoff）
//!
//! コンテナ内でプローブコマンドを繰り返し実行し、終了コード 0 を
//! 返した時点で準備完了とみなします。固定時間のsleepより厳密です。

use crate::error::{ContainerError, Result};
use crate::runtime::ContainerRuntime;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use wpfleet_core::WaitConfig;

/// プローブが成功するまで待機
///
/// # Returns
/// * `Ok(())` - プローブが成功した
/// * `Err(ContainerError::ServiceWaitTimeout)` - リトライ上限に達した
pub async fn wait_until_ready(
    runtime: &dyn ContainerRuntime,
    container: &str,
    probe: &[String],
    config: &WaitConfig,
) -> Result<()> {
    for attempt in 0..config.max_retries {
        match runtime.exec(container, probe).await {
            Ok(output) if output.success() => {
                debug!("{} は準備完了です（{}回目）", container, attempt + 1);
                return Ok(());
            }
            Ok(output) => {
                debug!(
                    "{} はまだ準備中です（終了コード {}）",
                    container, output.exit_code
                );
            }
            // コンテナが消えた場合は待っても無駄
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => {
                debug!("{} のプローブに失敗: {}", container, e);
            }
        }

        // 最後の試行でなければ待機
        if attempt + 1 < config.max_retries {
            sleep(Duration::from_millis(config.delay_for_attempt(attempt))).await;
        }
    }

    Err(ContainerError::ServiceWaitTimeout {
        service: container.to_string(),
        max_retries: config.max_retries,
    })
}
