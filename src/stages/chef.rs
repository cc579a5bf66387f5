//! 主厨阶段：领面粉和水，和面，用灶台烤面包，再从门离开

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until, Item};

pub(crate) const CHEF_NAME: &str = "Head Chef";
pub(crate) const RANGE_ID: u32 = 9736;
pub(crate) const EXIT_DOOR_ID: u32 = 9710;

const KEY_TALK: &str = "chef_talk";
const KEY_DOUGH: &str = "chef_make_dough";
const KEY_COOK: &str = "chef_cook_dough";
const KEY_EXIT: &str = "chef_exit_door";

#[derive(Debug, Default)]
pub struct HeadChef;

impl HeadChef {
    pub fn new() -> Self {
        Self
    }

    async fn should_talk_to_chef(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(!world_client.has_item(Item::PotOfFlour).await?
            && !world_client.has_item(Item::BucketOfWater).await?)
    }

    async fn needs_to_make_dough(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::PotOfFlour).await?
            && world_client.has_item(Item::BucketOfWater).await?
            && !world_client.has_item(Item::Dough).await?)
    }

    async fn needs_to_cook_dough(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        ctx.world.has_item(Item::Dough).await
    }

    async fn talk_to_chef(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("chef: talking to the chef");
        let world_client = ctx.world;
        if !world_client.interact_npc(CHEF_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "chef is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 5_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn make_dough(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        if !world_client.has_item(Item::PotOfFlour).await?
            || !world_client.has_item(Item::BucketOfWater).await?
        {
            warn!("chef: missing an ingredient for dough");
            return Ok(false);
        }
        debug!("chef: mixing dough");
        if !world_client.combine_items(Item::PotOfFlour, Item::BucketOfWater).await? {
            return Ok(ctx.retries.record_failure(KEY_DOUGH, "could not mix the ingredients"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.has_item(Item::Dough), 5_000).await? {
            ctx.retries.record_success(KEY_DOUGH);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_DOUGH, "mixing produced no dough"))
        }
    }

    async fn cook_dough(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("chef: baking the dough");
        let world_client = ctx.world;
        if !world_client.use_item_on_object(Item::Dough, RANGE_ID).await? {
            return Ok(ctx.retries.record_failure(KEY_COOK, "range is not reachable"));
        }
        world::pace(ctx.config).await;
        let baked = wait_until(
            move || {
                let w = world_client;
                async move { Ok(!w.has_item(Item::Dough).await?) }
            },
            10_000,
        )
        .await?;
        if baked {
            ctx.retries.record_success(KEY_COOK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_COOK, "the dough did not cook"))
        }
    }

    async fn exit_through_door(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("chef: leaving through the door");
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
impl StageHandler for HeadChef {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_chef(ctx).await? {
            return self.talk_to_chef(ctx).await;
        }
        if self.needs_to_make_dough(ctx).await? {
            return self.make_dough(ctx).await;
        }
        if self.needs_to_cook_dough(ctx).await? {
            return self.cook_dough(ctx).await;
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

    fn setup() -> (MockWorld, BotConfig, RetryLedger) {
        (MockWorld::new(), BotConfig::default(), RetryLedger::new(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixes_dough_with_both_ingredients() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::PotOfFlour);
        world.give_item(Item::BucketOfWater);
        world.combine_recipe(
            Item::PotOfFlour,
            Item::BucketOfWater,
            vec![Item::PotOfFlour, Item::BucketOfWater],
            Some(Item::Dough),
        );
        let mut handler = HeadChef::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["combine:PotOfFlour+BucketOfWater".to_string()]);
        assert!(world.inventory_contains(Item::Dough));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bakes_dough_on_the_range() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Dough);
        world.use_effect(Item::Dough, RANGE_ID, vec![Item::Dough], Some(Item::Bread));
        let mut handler = HeadChef::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["use:Dough@9736".to_string()]);
        assert!(world.inventory_contains(Item::Bread));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_no_recipe_step_applies() {
        // 只剩面粉（水被消耗掉的残局）：没有可做的步骤，走门
        let (world, config, mut retries) = setup();
        world.give_item(Item::PotOfFlour);
        let mut handler = HeadChef::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["object:9710:Open".to_string()]);
    }
}
