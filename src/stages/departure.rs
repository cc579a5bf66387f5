//! 送行向导阶段：最后一段对话，处理账户类型选单，然后离岛

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::screens::account_select;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until};

pub(crate) const GUIDE_NAME: &str = "Departure Guide";
pub(crate) const EXIT_DOOR_ID: u32 = 9398;

const KEY_TALK: &str = "departure_talk";
const KEY_EXIT: &str = "departure_exit_door";

#[derive(Debug, Default)]
pub struct DepartureGuide;

impl DepartureGuide {
    pub fn new() -> Self {
        Self
    }

    fn should_talk_to_guide(&self) -> bool {
        true
    }

    async fn talk_to_guide(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("departure: talking to the guide");
        let world_client = ctx.world;
        if !world_client.interact_npc(GUIDE_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "guide is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn exit_through_door(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("departure: leaving the island");
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
impl StageHandler for DepartureGuide {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if account_select::is_selection_open(ctx.world).await? {
            return account_select::handle_selection(ctx.world, ctx.config, ctx.retries).await;
        }
        if self.should_talk_to_guide() {
            return self.talk_to_guide(ctx).await;
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
    async fn test_selection_screen_takes_priority_over_talking() {
        let world = MockWorld::new();
        world.show_widget(account_select::SELECTION_GROUP, 0);
        world.click_closes_group(account_select::SELECTION_GROUP, 15);
        let mut config = BotConfig::default();
        config.account.ironman_mode = true;
        config.account.ironman_kind = crate::config::IronmanKind::Hardcore;
        let mut retries = RetryLedger::new(10);
        let mut handler = DepartureGuide::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(
            world.interactions(),
            vec!["widget:558:13".to_string(), "widget:558:15".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_talks_when_nothing_else_is_showing() {
        let world = MockWorld::new();
        world.set_pages_per_talk(2);
        let config = BotConfig::default();
        let mut retries = RetryLedger::new(10);
        let mut handler = DepartureGuide::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["npc:Departure Guide:Talk-to".to_string()]);
    }
}
