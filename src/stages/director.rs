//! 阶段调度
//!
//! `StageDirector` 每个 tick 做两件事：从进度信号推出当前阶段（detect），
//! 把执行权交给对应的阶段处理器（dispatch）。阶段一旦变化就清空重试台账，
//! 上一阶段的失败历史不会污染下一阶段的预算。

use std::collections::HashMap;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::BotConfig;
use crate::core::{ControlError, RetryLedger, WorldError};
use crate::stages::{build_handlers, Stage, StageContext, StageHandler};
use crate::world::WorldClient;

pub struct StageDirector {
    handlers: HashMap<Stage, Box<dyn StageHandler>>,
    retries: RetryLedger,
    current_stage: Stage,
    last_signal: i32,
}

impl StageDirector {
    pub fn new(max_retries: u32) -> Self {
        Self::with_handlers(build_handlers(), max_retries)
    }

    pub fn with_handlers(
        handlers: HashMap<Stage, Box<dyn StageHandler>>,
        max_retries: u32,
    ) -> Self {
        Self {
            handlers,
            retries: RetryLedger::new(max_retries),
            current_stage: Stage::NotStarted,
            last_signal: 0,
        }
    }

    /// 读环境、推阶段。未就绪与已完成是两个信号之外的哨兵，直接短路返回。
    pub async fn detect(&mut self, world: &dyn WorldClient) -> Result<Stage, WorldError> {
        if !world.is_ready().await? {
            return Ok(Stage::CharacterCreation);
        }
        if world.onboarding_complete().await? {
            return Ok(Stage::Completed);
        }

        let signal = world.progress_signal().await?;
        self.last_signal = signal;
        let stage = Stage::from_signal(signal);

        if stage != self.current_stage {
            info!(
                from = %self.current_stage,
                to = %stage,
                signal,
                "onboarding stage changed"
            );
            self.current_stage = stage;
            self.retries.reset_all();
        }

        Ok(stage)
    }

    /// 把一个 tick 交给阶段处理器。返回 Ok(true) = 阶段在推进（或还在重试预算内），
    /// Ok(false) = 预算耗尽、阶段卡死；没有注册处理器的非哨兵阶段是结构性错误。
    pub async fn dispatch(
        &mut self,
        stage: Stage,
        world: &dyn WorldClient,
        config: &BotConfig,
    ) -> Result<bool, ControlError> {
        if stage.is_sentinel() {
            return Ok(true);
        }

        let handler = self
            .handlers
            .get_mut(&stage)
            .ok_or(ControlError::MissingStageHandler(stage))?;

        let start = Instant::now();
        let mut ctx = StageContext {
            world,
            config,
            retries: &mut self.retries,
        };
        let result = handler.execute(&mut ctx).await;

        let outcome = match &result {
            Ok(true) => "ok",
            Ok(false) => "stalled",
            Err(_) => "error",
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "stage_audit",
            "stage": stage.key(),
            "outcome": outcome,
            "duration_ms": duration_ms,
        });
        tracing::info!(audit = %audit.to_string(), "stage");

        match result {
            Ok(progressing) => Ok(progressing),
            Err(err) => {
                warn!(stage = %stage, error = %err, "stage action raised an error");
                Ok(self
                    .retries
                    .record_failure(&format!("stage_{}", stage.key()), err.to_string()))
            }
        }
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    pub fn last_signal(&self) -> i32 {
        self.last_signal
    }

    pub fn diagnostics(&self) -> String {
        self.retries.diagnostics()
    }
}
