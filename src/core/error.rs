//! 错误类型：世界客户端故障与运行级致命错误
//!
//! WorldError 属于瞬时故障，在调度边界折算进重试台账，控制循环继续；
//! ControlError 才会终止整次运行。

use thiserror::Error;

use crate::stages::Stage;

/// 世界客户端边界上的故障
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("world client is not connected")]
    Disconnected,

    #[error("world request failed: {0}")]
    RequestFailed(String),
}

/// 终止整次运行的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// 非哨兵阶段没有注册处理器：装配错误，不能靠重试掩盖
    #[error("no stage handler registered for stage: {0}")]
    MissingStageHandler(Stage),

    /// 同一阶段连续多个 tick 毫无进展，顶层预算耗尽
    #[error("run stalled in stage {stage}: {reports} consecutive no-progress ticks")]
    RunStalled { stage: String, reports: u32 },
}
