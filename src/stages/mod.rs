//! 引导阶段：进度信号到阶段的映射、处理器接口与注册表
//!
//! 阶段顺序即枚举声明顺序。进度信号区间来自外部世界的引导脚本，区间之间留有空洞，
//! 未命中任何区间时回落到 NotStarted。NotStarted 与 CharacterCreation 共享信号
//! 出现之前的同一退化区间，先声明者优先。

pub mod advisor;
pub mod chapel;
pub mod chef;
pub mod combat;
pub mod departure;
mod dialogue;
pub mod director;
pub mod island_guide;
pub mod magic;
pub mod mining;
pub mod quest;
pub mod survival;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::config::BotConfig;
use crate::core::{RetryLedger, WorldError};
use crate::world::WorldClient;

pub use director::StageDirector;

/// 展示用总阶段数（完成 = 12/12）
pub const TOTAL_STAGES: u8 = 12;

/// 引导阶段，按发生顺序声明
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    NotStarted,
    CharacterCreation,
    IslandGuide,
    SurvivalInstructor,
    HeadChef,
    QuestMentor,
    MiningForeman,
    CombatTrainer,
    AccountAdvisor,
    ChapelMonk,
    MagicTutor,
    DepartureGuide,
    Completed,
}

impl Stage {
    /// 声明顺序的全量列表；from_signal 按此顺序线性扫描
    pub const ALL: [Stage; 13] = [
        Stage::NotStarted,
        Stage::CharacterCreation,
        Stage::IslandGuide,
        Stage::SurvivalInstructor,
        Stage::HeadChef,
        Stage::QuestMentor,
        Stage::MiningForeman,
        Stage::CombatTrainer,
        Stage::AccountAdvisor,
        Stage::ChapelMonk,
        Stage::MagicTutor,
        Stage::DepartureGuide,
        Stage::Completed,
    ];

    /// 进度信号的闭区间 [low, high]
    pub fn signal_range(self) -> (i32, i32) {
        match self {
            Stage::NotStarted => (0, 2),
            Stage::CharacterCreation => (0, 2),
            Stage::IslandGuide => (3, 40),
            Stage::SurvivalInstructor => (50, 120),
            Stage::HeadChef => (130, 200),
            Stage::QuestMentor => (210, 280),
            Stage::MiningForeman => (300, 390),
            Stage::CombatTrainer => (400, 520),
            Stage::AccountAdvisor => (525, 560),
            Stage::ChapelMonk => (570, 620),
            Stage::MagicTutor => (630, 670),
            Stage::DepartureGuide => (680, 999),
            Stage::Completed => (1000, i32::MAX),
        }
    }

    /// 信号 → 阶段：按声明顺序取第一个命中的区间，空洞回落到 NotStarted
    pub fn from_signal(signal: i32) -> Stage {
        for stage in Stage::ALL {
            let (low, high) = stage.signal_range();
            if signal >= low && signal <= high {
                return stage;
            }
        }
        Stage::NotStarted
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Stage::NotStarted => "Not started",
            Stage::CharacterCreation => "Character creation",
            Stage::IslandGuide => "Island guide",
            Stage::SurvivalInstructor => "Survival instructor",
            Stage::HeadChef => "Head chef",
            Stage::QuestMentor => "Quest mentor",
            Stage::MiningForeman => "Mining foreman",
            Stage::CombatTrainer => "Combat trainer",
            Stage::AccountAdvisor => "Account advisor",
            Stage::ChapelMonk => "Chapel monk",
            Stage::MagicTutor => "Magic tutor",
            Stage::DepartureGuide => "Departure guide",
            Stage::Completed => "Completed",
        }
    }

    /// 重试键与日志里用的蛇形短名
    pub fn key(self) -> &'static str {
        match self {
            Stage::NotStarted => "not_started",
            Stage::CharacterCreation => "character_creation",
            Stage::IslandGuide => "island_guide",
            Stage::SurvivalInstructor => "survival",
            Stage::HeadChef => "chef",
            Stage::QuestMentor => "quest",
            Stage::MiningForeman => "mining",
            Stage::CombatTrainer => "combat",
            Stage::AccountAdvisor => "advisor",
            Stage::ChapelMonk => "chapel",
            Stage::MagicTutor => "magic",
            Stage::DepartureGuide => "departure",
            Stage::Completed => "completed",
        }
    }

    /// 展示序号（n/12）；Completed 固定记 12
    pub fn stage_number(self) -> u8 {
        match self {
            Stage::NotStarted | Stage::CharacterCreation => 0,
            Stage::IslandGuide => 1,
            Stage::SurvivalInstructor => 2,
            Stage::HeadChef => 3,
            Stage::QuestMentor => 4,
            Stage::MiningForeman => 5,
            Stage::CombatTrainer => 6,
            Stage::AccountAdvisor => 7,
            Stage::ChapelMonk => 8,
            Stage::MagicTutor => 9,
            Stage::DepartureGuide => 10,
            Stage::Completed => 12,
        }
    }

    /// 哨兵阶段没有处理器：要么还没进入引导，要么已经结束
    pub fn is_sentinel(self) -> bool {
        matches!(
            self,
            Stage::NotStarted | Stage::CharacterCreation | Stage::Completed
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 一次阶段调度借给处理器的上下文：世界句柄、配置与调度器的重试台账
pub struct StageContext<'a> {
    pub world: &'a dyn WorldClient,
    pub config: &'a BotConfig,
    pub retries: &'a mut RetryLedger,
}

/// 阶段处理器：每次调用至多发起一个对外可见动作，且只从世界状态重推进度，
/// 不依赖内部步骤计数（崩溃后可从任意世界状态续跑）。
///
/// 返回 Ok(true) 表示仍在推进（动作成功，或失败但预算内）；Ok(false) 表示该阶段
/// 卡住；Err 表示世界故障，由调度器折算成瞬时失败。
#[async_trait]
pub trait StageHandler: Send {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError>;
}

/// 组建全部非哨兵阶段的处理器映射；启动时调用一次
pub fn build_handlers() -> HashMap<Stage, Box<dyn StageHandler>> {
    let mut handlers: HashMap<Stage, Box<dyn StageHandler>> = HashMap::new();
    handlers.insert(Stage::IslandGuide, Box::new(island_guide::IslandGuide::new()));
    handlers.insert(
        Stage::SurvivalInstructor,
        Box::new(survival::SurvivalInstructor::new()),
    );
    handlers.insert(Stage::HeadChef, Box::new(chef::HeadChef::new()));
    handlers.insert(Stage::QuestMentor, Box::new(quest::QuestMentor::new()));
    handlers.insert(Stage::MiningForeman, Box::new(mining::MiningForeman::new()));
    handlers.insert(Stage::CombatTrainer, Box::new(combat::CombatTrainer::new()));
    handlers.insert(Stage::AccountAdvisor, Box::new(advisor::AccountAdvisor::new()));
    handlers.insert(Stage::ChapelMonk, Box::new(chapel::ChapelMonk::new()));
    handlers.insert(Stage::MagicTutor, Box::new(magic::MagicTutor::new()));
    handlers.insert(
        Stage::DepartureGuide,
        Box::new(departure::DepartureGuide::new()),
    );
    handlers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_zero_prefers_the_first_declared_stage() {
        // NotStarted 与 CharacterCreation 区间相同，声明顺序决定裁决
        assert_eq!(Stage::from_signal(0), Stage::NotStarted);
        assert_eq!(Stage::from_signal(2), Stage::NotStarted);
    }

    #[test]
    fn test_signal_inside_a_range_maps_to_that_stage() {
        assert_eq!(Stage::from_signal(3), Stage::IslandGuide);
        assert_eq!(Stage::from_signal(35), Stage::IslandGuide);
        assert_eq!(Stage::from_signal(40), Stage::IslandGuide);
    }

    #[test]
    fn test_signals_in_the_same_range_map_to_the_same_stage() {
        assert_eq!(Stage::from_signal(50), Stage::SurvivalInstructor);
        assert_eq!(Stage::from_signal(120), Stage::SurvivalInstructor);
    }

    #[test]
    fn test_terminal_range_is_open_ended() {
        assert_eq!(Stage::from_signal(1000), Stage::Completed);
        assert_eq!(Stage::from_signal(999_999), Stage::Completed);
        assert_eq!(Stage::from_signal(i32::MAX), Stage::Completed);
    }

    #[test]
    fn test_gaps_between_ranges_fall_back_to_not_started() {
        assert_eq!(Stage::from_signal(45), Stage::NotStarted);
        assert_eq!(Stage::from_signal(125), Stage::NotStarted);
        assert_eq!(Stage::from_signal(295), Stage::NotStarted);
    }

    #[test]
    fn test_declared_order_is_the_stage_order() {
        assert!(Stage::NotStarted < Stage::CharacterCreation);
        assert!(Stage::IslandGuide < Stage::SurvivalInstructor);
        assert!(Stage::DepartureGuide < Stage::Completed);
    }

    #[test]
    fn test_stage_numbers_for_display() {
        assert_eq!(Stage::NotStarted.stage_number(), 0);
        assert_eq!(Stage::IslandGuide.stage_number(), 1);
        assert_eq!(Stage::DepartureGuide.stage_number(), 10);
        assert_eq!(Stage::Completed.stage_number(), 12);
    }

    #[test]
    fn test_every_non_sentinel_stage_has_a_handler() {
        let handlers = build_handlers();
        for stage in Stage::ALL {
            if stage.is_sentinel() {
                assert!(!handlers.contains_key(&stage), "{} should be a sentinel", stage);
            } else {
                assert!(handlers.contains_key(&stage), "{} is missing a handler", stage);
            }
        }
    }
}
