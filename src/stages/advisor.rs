//! 账户顾问阶段：听完理财介绍，顺手把被打开的银行界面关掉

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until};

pub(crate) const ADVISOR_NAME: &str = "Account Advisor";
pub(crate) const BANK_BOOTH_ID: u32 = 10355;
pub(crate) const EXIT_DOOR_ID: u32 = 9721;

const KEY_TALK: &str = "advisor_talk";
const KEY_CLOSE_BANK: &str = "advisor_close_bank";
const KEY_OPEN_BANK: &str = "advisor_open_bank";
const KEY_EXIT: &str = "advisor_exit_door";

#[derive(Debug, Default)]
pub struct AccountAdvisor;

impl AccountAdvisor {
    pub fn new() -> Self {
        Self
    }

    async fn should_talk_to_advisor(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        Ok(!ctx.world.is_dialogue_open().await?)
    }

    fn needs_to_open_bank(&self) -> bool {
        false
    }

    async fn talk_to_advisor(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("advisor: talking to the advisor");
        let world_client = ctx.world;
        if !world_client.interact_npc(ADVISOR_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "advisor is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn close_bank_screen(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("advisor: bank screen is open, closing it");
        let world_client = ctx.world;
        world_client.close_bank().await?;
        world::pace(ctx.config).await;
        let closed = wait_until(
            move || {
                let w = world_client;
                async move { Ok(!w.is_bank_open().await?) }
            },
            3_000,
        )
        .await?;
        if closed {
            ctx.retries.record_success(KEY_CLOSE_BANK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_CLOSE_BANK, "bank screen did not close"))
        }
    }

    async fn open_bank(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("advisor: opening the bank");
        let world_client = ctx.world;
        if !world_client.interact_object(BANK_BOOTH_ID, "Use").await? {
            return Ok(ctx.retries.record_failure(KEY_OPEN_BANK, "bank booth is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_bank_open(), 5_000).await? {
            ctx.retries.record_success(KEY_OPEN_BANK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_OPEN_BANK, "bank screen did not open"))
        }
    }

    async fn exit_through_door(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("advisor: leaving through the door");
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
impl StageHandler for AccountAdvisor {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if ctx.world.is_bank_open().await? {
            return self.close_bank_screen(ctx).await;
        }
        if self.should_talk_to_advisor(ctx).await? {
            return self.talk_to_advisor(ctx).await;
        }
        if self.needs_to_open_bank() {
            return self.open_bank(ctx).await;
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
    async fn test_open_bank_screen_is_closed_before_anything_else() {
        let world = MockWorld::new();
        world.set_bank_open(true);
        let config = BotConfig::default();
        let mut retries = RetryLedger::new(10);
        let mut handler = AccountAdvisor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["bank:close".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_talks_whenever_nothing_is_on_screen() {
        let world = MockWorld::new();
        world.set_pages_per_talk(1);
        let config = BotConfig::default();
        let mut retries = RetryLedger::new(10);
        let mut handler = AccountAdvisor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["npc:Account Advisor:Talk-to".to_string()]);
    }
}
