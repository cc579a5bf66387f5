//! 运行状态快照
//!
//! 编排器每个 tick 通过 watch 通道发布一份；外部叠加层只读渲染，不反向影响控制循环。

use serde::Serialize;

use crate::stages::TOTAL_STAGES;

/// 运行所处的粗粒度阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    /// 世界未就绪，也没有可操作的界面
    AwaitingWorld,
    /// 正在走角色创建流程
    CreatingCharacter,
    /// 引导阶段推进中
    Onboarding,
    /// 引导完成，走收尾路线
    Navigating,
    /// 运行结束（到达目的地或按配置直接收尾）
    Finished,
}

/// 导航进度报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavReport {
    pub message: String,
    pub percent: u8,
    pub eta_secs: u64,
}

/// 对外发布的状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub phase: RunPhase,
    pub stage: String,
    pub stage_number: u8,
    pub total_stages: u8,
    pub progress_signal: i32,
    pub navigation: Option<NavReport>,
    pub retry_diagnostics: String,
    pub elapsed_secs: u64,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            phase: RunPhase::AwaitingWorld,
            stage: "Not started".to_string(),
            stage_number: 0,
            total_stages: TOTAL_STAGES,
            progress_signal: 0,
            navigation: None,
            retry_diagnostics: "no errors".to_string(),
            elapsed_secs: 0,
        }
    }
}
