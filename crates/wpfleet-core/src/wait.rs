use serde::{Deserialize, Serialize};

/// 準備完了待機の設定（Exponential Backoff）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// 最大リトライ回数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 初期待機時間（ミリ秒）
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// 最大待機時間（ミリ秒）
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Exponential倍率
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_retries() -> u32 {
    12
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    10000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl WaitConfig {
    /// 指定回数目の待機時間を計算（ミリ秒）
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        (delay as u64).min(self.max_delay_ms)
    }
}
