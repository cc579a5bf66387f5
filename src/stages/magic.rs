//! 魔法导师阶段：领法术介绍，用风击打一只鸡
//!
//! 基线经验在打开法术面板时采样，之后靠「经验涨没涨」判断施法是否生效。

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until, Panel, Skill};

pub(crate) const TUTOR_NAME: &str = "Magic Tutor";
pub(crate) const TARGET_NAME: &str = "Chicken";
pub(crate) const SPELL_NAME: &str = "Wind Strike";
pub(crate) const EXIT_LADDER_ID: u32 = 9729;

const KEY_TALK: &str = "magic_talk";
const KEY_OPEN_PANEL: &str = "magic_open_panel";
const KEY_CAST: &str = "magic_cast";
const KEY_EXIT: &str = "magic_exit_ladder";

#[derive(Debug, Default)]
pub struct MagicTutor {
    baseline_xp: Option<i32>,
}

impl MagicTutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn should_talk_to_tutor(&self) -> bool {
        self.baseline_xp.unwrap_or(0) == 0
    }

    fn needs_to_open_magic_panel(&self) -> bool {
        true
    }

    async fn needs_to_cast_spell(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let baseline = self.baseline_xp.unwrap_or(0);
        let current = ctx.world.skill_xp(Skill::Magic).await?;
        Ok(current == baseline || baseline == 0)
    }

    async fn talk_to_tutor(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("magic: talking to the tutor");
        let world_client = ctx.world;
        if !world_client.interact_npc(TUTOR_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "tutor is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn open_magic_panel(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("magic: opening the magic panel");
        if ctx.world.open_panel(Panel::Magic).await? {
            world::pace(ctx.config).await;
            self.baseline_xp = Some(ctx.world.skill_xp(Skill::Magic).await?);
            ctx.retries.record_success(KEY_OPEN_PANEL);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_OPEN_PANEL, "could not open the magic panel"))
        }
    }

    async fn cast_wind_strike(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        let baseline = self.baseline_xp.unwrap_or(0);

        if world_client.is_animating().await? || world_client.is_in_combat().await? {
            debug!("magic: mid-cast, waiting");
            tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;
            if world_client.skill_xp(Skill::Magic).await? > baseline {
                ctx.retries.record_success(KEY_CAST);
            }
            return Ok(true);
        }

        debug!("magic: casting at the practice target");
        if !world_client.cast_spell_on_npc(SPELL_NAME, TARGET_NAME).await? {
            return Ok(ctx.retries.record_failure(KEY_CAST, "could not start the cast"));
        }
        world::pace(ctx.config).await;
        let landed = wait_until(
            move || {
                let w = world_client;
                async move { Ok(w.skill_xp(Skill::Magic).await? > baseline) }
            },
            10_000,
        )
        .await?;
        if landed {
            ctx.retries.record_success(KEY_CAST);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_CAST, "no experience from the cast"))
        }
    }

    async fn exit_down_ladder(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("magic: climbing down the ladder");
        if ctx.world.interact_object(EXIT_LADDER_ID, "Climb-down").await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_EXIT);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_EXIT, "could not climb the ladder"))
        }
    }
}

#[async_trait]
impl StageHandler for MagicTutor {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_tutor() {
            return self.talk_to_tutor(ctx).await;
        }
        if self.needs_to_open_magic_panel() {
            return self.open_magic_panel(ctx).await;
        }
        if self.needs_to_cast_spell(ctx).await? {
            return self.cast_wind_strike(ctx).await;
        }
        self.exit_down_ladder(ctx).await
    }
}
