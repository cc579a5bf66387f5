//! 生存教官阶段：领工具、伐木、生火、捕虾、烤虾，然后穿闸门离开

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until, Item};

pub(crate) const INSTRUCTOR_NAME: &str = "Survival Instructor";
pub(crate) const TREE_ID: u32 = 9730;
pub(crate) const FISHING_SPOT_ID: u32 = 10091;
pub(crate) const FIRE_ID: u32 = 26185;
pub(crate) const EXIT_GATE_ID: u32 = 9716;

const KEY_TALK: &str = "survival_talk";
const KEY_CHOP: &str = "survival_chop_tree";
const KEY_FIRE: &str = "survival_light_fire";
const KEY_FISH: &str = "survival_catch_shrimp";
const KEY_COOK: &str = "survival_cook_shrimp";
const KEY_EXIT: &str = "survival_exit_gate";

#[derive(Debug, Default)]
pub struct SurvivalInstructor;

impl SurvivalInstructor {
    pub fn new() -> Self {
        Self
    }

    async fn should_talk_to_instructor(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(!world_client.has_item(Item::Hatchet).await?
            && !world_client.has_item(Item::Tinderbox).await?)
    }

    async fn needs_to_chop_tree(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::Hatchet).await? && !world_client.has_item(Item::Logs).await?)
    }

    async fn needs_to_light_fire(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::Logs).await? && world_client.has_item(Item::Tinderbox).await?)
    }

    async fn needs_to_catch_shrimp(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::FishingNet).await?
            && !world_client.has_item(Item::RawShrimp).await?
            && !world_client.has_item(Item::CookedShrimp).await?)
    }

    async fn needs_to_cook_shrimp(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        ctx.world.has_item(Item::RawShrimp).await
    }

    async fn talk_to_instructor(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("survival: talking to the instructor");
        let world_client = ctx.world;
        if !world_client.interact_npc(INSTRUCTOR_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "instructor is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn chop_tree(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        if world_client.is_animating().await? {
            // 已经在砍了，等着就行
            tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;
            return Ok(true);
        }
        debug!("survival: chopping a tree");
        if !world_client.interact_object(TREE_ID, "Chop down").await? {
            return Ok(ctx.retries.record_failure(KEY_CHOP, "tree is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.has_item(Item::Logs), 10_000).await? {
            ctx.retries.record_success(KEY_CHOP);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_CHOP, "chopping produced no logs"))
        }
    }

    async fn light_fire(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("survival: lighting a fire");
        let world_client = ctx.world;
        if !world_client.combine_items(Item::Tinderbox, Item::Logs).await? {
            return Ok(ctx.retries.record_failure(KEY_FIRE, "could not use the tinderbox"));
        }
        world::pace(ctx.config).await;
        let lit = wait_until(
            move || {
                let w = world_client;
                async move { Ok(!w.has_item(Item::Logs).await?) }
            },
            15_000,
        )
        .await?;
        if lit {
            ctx.retries.record_success(KEY_FIRE);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_FIRE, "the logs never caught fire"))
        }
    }

    async fn catch_shrimp(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        if world_client.is_animating().await? {
            tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;
            return Ok(true);
        }
        debug!("survival: netting shrimp");
        if !world_client.interact_object(FISHING_SPOT_ID, "Net").await? {
            return Ok(ctx.retries.record_failure(KEY_FISH, "fishing spot is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.has_item(Item::RawShrimp), 8_000).await? {
            ctx.retries.record_success(KEY_FISH);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_FISH, "caught nothing"))
        }
    }

    async fn cook_shrimp(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("survival: cooking the shrimp");
        let world_client = ctx.world;
        if !world_client.use_item_on_object(Item::RawShrimp, FIRE_ID).await? {
            return Ok(ctx.retries.record_failure(KEY_COOK, "no fire to cook on"));
        }
        world::pace(ctx.config).await;
        let cooked = wait_until(
            move || {
                let w = world_client;
                async move { Ok(!w.has_item(Item::RawShrimp).await?) }
            },
            5_000,
        )
        .await?;
        if cooked {
            ctx.retries.record_success(KEY_COOK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_COOK, "the shrimp did not cook"))
        }
    }

    async fn exit_through_gate(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("survival: leaving through the gate");
        if ctx.world.interact_object(EXIT_GATE_ID, "Open").await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_EXIT);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_EXIT, "could not open the gate"))
        }
    }
}

#[async_trait]
impl StageHandler for SurvivalInstructor {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_instructor(ctx).await? {
            return self.talk_to_instructor(ctx).await;
        }
        if self.needs_to_chop_tree(ctx).await? {
            return self.chop_tree(ctx).await;
        }
        if self.needs_to_light_fire(ctx).await? {
            return self.light_fire(ctx).await;
        }
        if self.needs_to_catch_shrimp(ctx).await? {
            return self.catch_shrimp(ctx).await;
        }
        if self.needs_to_cook_shrimp(ctx).await? {
            return self.cook_shrimp(ctx).await;
        }
        self.exit_through_gate(ctx).await
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
    async fn test_talks_first_when_toolless() {
        let (world, config, mut retries) = setup();
        world.set_pages_per_talk(1);
        let mut handler = SurvivalInstructor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["npc:Survival Instructor:Talk-to".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chops_a_tree_once_equipped_with_an_axe() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Hatchet);
        world.give_item(Item::Tinderbox);
        world.yield_on_object(TREE_ID, Item::Logs);
        let mut handler = SurvivalInstructor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        let log = world.interactions();
        assert_eq!(log, vec!["object:9730:Chop down".to_string()]);
        assert!(world.inventory_contains(Item::Logs));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lights_a_fire_with_logs_in_the_bag() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Hatchet);
        world.give_item(Item::Tinderbox);
        world.give_item(Item::Logs);
        world.combine_recipe(Item::Tinderbox, Item::Logs, vec![Item::Logs], None);
        let mut handler = SurvivalInstructor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        let log = world.interactions();
        assert_eq!(log, vec!["combine:Tinderbox+Logs".to_string()]);
        assert!(!world.inventory_contains(Item::Logs));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_visible_action_per_tick() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::FishingNet);
        world.give_item(Item::Hatchet);
        world.give_item(Item::Tinderbox);
        world.give_item(Item::Logs);
        world.combine_recipe(Item::Tinderbox, Item::Logs, vec![Item::Logs], None);
        let mut handler = SurvivalInstructor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        // 火和虾都排队时，一个 tick 只会点火
        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_out_an_ongoing_animation() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Hatchet);
        world.set_animating(true);
        let mut handler = SurvivalInstructor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert!(world.interactions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_chop_is_counted_and_retryable() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Hatchet);
        // 没有掉落规则：砍了也不会出木柴，等待超时
        let mut handler = SurvivalInstructor::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(retries.attempt_count(KEY_CHOP), 1);
    }
}
