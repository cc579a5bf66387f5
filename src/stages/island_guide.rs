//! 岛屿向导阶段：开场讲解，听完后穿门去生存教官

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until};

pub(crate) const GUIDE_NAME: &str = "Island Guide";
pub(crate) const EXIT_DOOR_ID: u32 = 9398;

const KEY_TALK: &str = "island_guide_talk";
const KEY_EXIT: &str = "island_guide_exit_door";

#[derive(Debug, Default)]
pub struct IslandGuide;

impl IslandGuide {
    pub fn new() -> Self {
        Self
    }

    async fn should_talk_to_guide(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        Ok(!ctx.world.is_dialogue_open().await?)
    }

    async fn talk_to_guide(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("island guide: talking to the guide");
        let world_client = ctx.world;
        if !world_client.interact_npc(GUIDE_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "guide is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 5_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn exit_through_door(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("island guide: leaving through the door");
        if ctx.world.interact_object(EXIT_DOOR_ID, "Open").await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_EXIT);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_EXIT, "could not open the exit door"))
        }
    }
}

#[async_trait]
impl StageHandler for IslandGuide {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_guide(ctx).await? {
            return self.talk_to_guide(ctx).await;
        }
        self.exit_through_door(ctx).await
    }
}
