//! 礼拜堂修士阶段：听祈祷介绍，埋掉修士给的骨头

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until, Item, Panel};

pub(crate) const MONK_NAME: &str = "Chapel Monk";
pub(crate) const EXIT_DOOR_ID: u32 = 9722;

const KEY_TALK: &str = "chapel_talk";
const KEY_PRAYER_PANEL: &str = "chapel_open_prayer";
const KEY_BURY: &str = "chapel_bury_bones";
const KEY_EXIT: &str = "chapel_exit_door";

#[derive(Debug, Default)]
pub struct ChapelMonk;

impl ChapelMonk {
    pub fn new() -> Self {
        Self
    }

    async fn should_talk_to_monk(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        Ok(!ctx.world.has_item(Item::Bones).await?)
    }

    fn needs_to_open_prayer_panel(&self) -> bool {
        false
    }

    async fn needs_to_bury_bones(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        ctx.world.has_item(Item::Bones).await
    }

    async fn talk_to_monk(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("chapel: talking to the monk");
        let world_client = ctx.world;
        if !world_client.interact_npc(MONK_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "monk is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn open_prayer_panel(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("chapel: opening the prayer panel");
        if ctx.world.open_panel(Panel::Prayer).await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_PRAYER_PANEL);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_PRAYER_PANEL, "could not open the prayer panel"))
        }
    }

    async fn bury_bones(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("chapel: burying the bones");
        let world_client = ctx.world;
        if !world_client.interact_item(Item::Bones, "Bury").await? {
            return Ok(ctx.retries.record_failure(KEY_BURY, "could not bury the bones"));
        }
        world::pace(ctx.config).await;
        let buried = wait_until(
            move || {
                let w = world_client;
                async move { Ok(!w.has_item(Item::Bones).await?) }
            },
            3_000,
        )
        .await?;
        if buried {
            ctx.retries.record_success(KEY_BURY);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_BURY, "the bones are still in the bag"))
        }
    }

    async fn exit_through_door(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("chapel: leaving through the door");
        if ctx.world.interact_object(EXIT_DOOR_ID, "Open").await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_EXIT);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_EXIT, "could not open the door"))
        }
    }
}

#[async_trait]
impl StageHandler for ChapelMonk {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_monk(ctx).await? {
            return self.talk_to_monk(ctx).await;
        }
        if self.needs_to_open_prayer_panel() {
            return self.open_prayer_panel(ctx).await;
        }
        if self.needs_to_bury_bones(ctx).await? {
            return self.bury_bones(ctx).await;
        }
        self.exit_through_door(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::core::RetryLedger;
    use crate::world::mock::MockWorld;

    #[tokio::test(start_paused = true)]
    async fn test_talks_until_bones_are_handed_over() {
        let world = MockWorld::new();
        world.set_pages_per_talk(1);
        world.grant_on_talk(MONK_NAME, vec![Item::Bones]);
        let config = BotConfig::default();
        let mut retries = RetryLedger::new(10);
        let mut handler = ChapelMonk::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["npc:Chapel Monk:Talk-to".to_string()]);
        assert!(world.inventory_contains(Item::Bones));
    }

    #[tokio::test(start_paused = true)]
    async fn test_buries_bones_once_held() {
        let world = MockWorld::new();
        world.give_item(Item::Bones);
        world.consume_on_item_action(Item::Bones, "Bury");
        let config = BotConfig::default();
        let mut retries = RetryLedger::new(10);
        let mut handler = ChapelMonk::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["item:Bones:Bury".to_string()]);
        assert!(!world.inventory_contains(Item::Bones));
    }
}
