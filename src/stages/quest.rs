//! 任务导师阶段：对话推进全靠信号方驱动，处理器只负责下梯子

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, Panel};

pub(crate) const MENTOR_NAME: &str = "Quest Mentor";
pub(crate) const LADDER_ID: u32 = 9727;

const KEY_TALK: &str = "quest_talk";
const KEY_QUEST_PANEL: &str = "quest_open_panel";
const KEY_SETTINGS: &str = "quest_open_settings";
const KEY_EXIT: &str = "quest_climb_down";

#[derive(Debug, Default)]
pub struct QuestMentor;

impl QuestMentor {
    pub fn new() -> Self {
        Self
    }

    fn should_talk_to_mentor(&self) -> bool {
        false
    }

    fn needs_to_open_quest_panel(&self) -> bool {
        false
    }

    fn needs_to_check_settings(&self) -> bool {
        false
    }

    async fn talk_to_mentor(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("quest: talking to the mentor");
        let world_client = ctx.world;
        if !world_client.interact_npc(MENTOR_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "mentor is not reachable"));
        }
        world::pace(ctx.config).await;
        if world::wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn open_quest_panel(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("quest: opening the quest panel");
        if ctx.world.open_panel(Panel::Quests).await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_QUEST_PANEL);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_QUEST_PANEL, "could not open the quest panel"))
        }
    }

    async fn open_settings_panel(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("quest: opening the settings panel");
        if ctx.world.open_panel(Panel::Settings).await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_SETTINGS);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_SETTINGS, "could not open the settings panel"))
        }
    }

    async fn climb_down_ladder(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("quest: climbing down the ladder");
        if ctx.world.interact_object(LADDER_ID, "Climb-down").await? {
            world::pace(ctx.config).await;
            tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;
            ctx.retries.record_success(KEY_EXIT);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_EXIT, "could not climb the ladder"))
        }
    }
}

#[async_trait]
impl StageHandler for QuestMentor {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_mentor() {
            return self.talk_to_mentor(ctx).await;
        }
        if self.needs_to_open_quest_panel() {
            return self.open_quest_panel(ctx).await;
        }
        if self.needs_to_check_settings() {
            return self.open_settings_panel(ctx).await;
        }
        self.climb_down_ladder(ctx).await
    }
}
