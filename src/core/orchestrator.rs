//! 主控循环
//!
//! 固定节拍驱动整次运行：探测世界 → 建角 → 引导阶段调度 → 收尾导航。
//! 间隔是固定延迟而非固定频率：上一个 tick 的活（包括处理器内部的有界等待）
//! 干完才睡。取消是协作式的，进行中的等待会自然结束，循环在下个检查点退出。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::core::{ControlError, RunPhase, StatusSnapshot};
use crate::nav::WaypointNavigator;
use crate::screens::character_creation::CharacterCreator;
use crate::stages::{Stage, StageDirector, TOTAL_STAGES};
use crate::world::{NameSource, WorldClient};

/// 单个 tick 的裁决
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Continue,
    Finished,
}

/// 整次运行的编排器：独占全部可变状态，单线程推进
pub struct Orchestrator {
    world: Arc<dyn WorldClient>,
    config: BotConfig,
    director: StageDirector,
    navigator: WaypointNavigator,
    creator: CharacterCreator,
    names: Arc<dyn NameSource>,
    status_tx: watch::Sender<StatusSnapshot>,
    cancel: CancellationToken,
    started_at: tokio::time::Instant,
    consecutive_stalls: u32,
    last_dispatched_stage: Stage,
    name_announced: bool,
}

impl Orchestrator {
    pub fn new(
        world: Arc<dyn WorldClient>,
        config: BotConfig,
        names: Arc<dyn NameSource>,
    ) -> (Self, watch::Receiver<StatusSnapshot>) {
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());
        let max_retries = config.bot.max_retries;
        let orchestrator = Self {
            world,
            director: StageDirector::new(max_retries),
            navigator: WaypointNavigator::with_default_route(max_retries),
            creator: CharacterCreator::new(max_retries),
            config,
            names,
            status_tx,
            cancel: CancellationToken::new(),
            started_at: tokio::time::Instant::now(),
            consecutive_stalls: 0,
            last_dispatched_stage: Stage::NotStarted,
            name_announced: false,
        };
        (orchestrator, status_rx)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 跑完整次运行，直到完成、被取消或顶层预算耗尽
    pub async fn run(&mut self) -> Result<(), ControlError> {
        info!(
            tick_interval_ms = self.config.bot.tick_interval_ms,
            max_retries = self.config.bot.max_retries,
            "control loop starting"
        );
        self.started_at = tokio::time::Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                info!("control loop cancelled");
                return Ok(());
            }
            if self.tick().await? == TickOutcome::Finished {
                info!(
                    elapsed_secs = self.started_at.elapsed().as_secs(),
                    "run finished"
                );
                return Ok(());
            }
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("control loop cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(Duration::from_millis(self.config.bot.tick_interval_ms)) => {}
            }
        }
    }

    /// 每个 tick 至多推进一件事：建角、一个阶段动作或一步导航
    async fn tick(&mut self) -> Result<TickOutcome, ControlError> {
        let ready = match self.world.is_ready().await {
            Ok(ready) => ready,
            Err(err) => {
                warn!(error = %err, "world probe failed, waiting");
                self.publish(RunPhase::AwaitingWorld);
                return Ok(TickOutcome::Continue);
            }
        };
        if !ready {
            return self.handle_setup().await;
        }

        let complete = match self.world.onboarding_complete().await {
            Ok(complete) => complete,
            Err(err) => {
                warn!(error = %err, "world probe failed, waiting");
                self.publish(RunPhase::AwaitingWorld);
                return Ok(TickOutcome::Continue);
            }
        };
        if complete {
            return self.handle_completion().await;
        }

        self.progress_onboarding().await
    }

    /// 世界未就绪：要么建角界面挂着，要么只能等
    async fn handle_setup(&mut self) -> Result<TickOutcome, ControlError> {
        match CharacterCreator::is_open(self.world.as_ref()).await {
            Ok(true) => {
                if !self.name_announced {
                    let name = self.names.next_name();
                    info!(name = %name, "creating a character");
                    self.name_announced = true;
                }
                match self.creator.create(self.world.as_ref(), &self.config).await {
                    Ok(true) => info!("character creation finished"),
                    Ok(false) => debug!("character creation did not finish, will retry"),
                    Err(err) => warn!(error = %err, "character creation hit a world fault"),
                }
                self.publish(RunPhase::CreatingCharacter);
            }
            Ok(false) => {
                debug!("world not ready and no creation screen, waiting");
                self.publish(RunPhase::AwaitingWorld);
            }
            Err(err) => {
                warn!(error = %err, "world probe failed, waiting");
                self.publish(RunPhase::AwaitingWorld);
            }
        }
        Ok(TickOutcome::Continue)
    }

    /// 引导已整体完成：按配置原地收尾，或朝银行走一步
    async fn handle_completion(&mut self) -> Result<TickOutcome, ControlError> {
        if !self.config.navigation.walk_to_destination {
            info!("onboarding complete; destination walk disabled, finishing here");
            self.publish(RunPhase::Finished);
            return Ok(TickOutcome::Finished);
        }
        match self.navigator.step(self.world.as_ref(), &self.config).await {
            Ok(true) => {
                self.publish(RunPhase::Finished);
                return Ok(TickOutcome::Finished);
            }
            Ok(false) => debug!("still on the road"),
            Err(err) => warn!(error = %err, "navigation step hit a world fault"),
        }
        self.publish(RunPhase::Navigating);
        Ok(TickOutcome::Continue)
    }

    /// 探测当前阶段并调度一次处理器；连续无进展达到上限时终止运行
    async fn progress_onboarding(&mut self) -> Result<TickOutcome, ControlError> {
        let stage = match self.director.detect(self.world.as_ref()).await {
            Ok(stage) => stage,
            Err(err) => {
                warn!(error = %err, "stage detection failed, keeping the last stage");
                self.publish(RunPhase::Onboarding);
                return Ok(TickOutcome::Continue);
            }
        };
        if stage != self.last_dispatched_stage {
            self.consecutive_stalls = 0;
            self.last_dispatched_stage = stage;
        }

        let progressed = self
            .director
            .dispatch(stage, self.world.as_ref(), &self.config)
            .await?;
        if progressed {
            self.consecutive_stalls = 0;
        } else {
            self.consecutive_stalls += 1;
            warn!(
                stage = %stage,
                stalls = self.consecutive_stalls,
                diagnostics = %self.director.diagnostics(),
                "stage reported no progress"
            );
            if self.consecutive_stalls > self.config.bot.max_retries {
                return Err(ControlError::RunStalled {
                    stage: stage.to_string(),
                    reports: self.consecutive_stalls,
                });
            }
        }
        self.publish(RunPhase::Onboarding);
        Ok(TickOutcome::Continue)
    }

    /// 发布一份只读状态快照；没有接收方也无所谓
    fn publish(&self, phase: RunPhase) {
        // 进入收尾阶段后世界侧不再产生阶段探测，按完成态投影
        let stage = match phase {
            RunPhase::Navigating | RunPhase::Finished => Stage::Completed,
            _ => self.director.current_stage(),
        };
        let navigation = matches!(phase, RunPhase::Navigating | RunPhase::Finished)
            .then(|| self.navigator.report());
        let retry_diagnostics = match phase {
            RunPhase::Navigating | RunPhase::Finished => self.navigator.diagnostics(),
            RunPhase::CreatingCharacter => self.creator.diagnostics(),
            _ => self.director.diagnostics(),
        };
        let snapshot = StatusSnapshot {
            phase,
            stage: stage.display_name().to_string(),
            stage_number: stage.stage_number(),
            total_stages: TOTAL_STAGES,
            progress_signal: self.director.last_signal(),
            navigation,
            retry_diagnostics,
            elapsed_secs: self.started_at.elapsed().as_secs(),
        };
        let _ = self.status_tx.send(snapshot);
    }
}
