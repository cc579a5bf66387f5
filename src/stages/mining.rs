//! 采矿工头阶段：领镐子，挖铜锡、熔青铜锭、打短剑，最后出闸门

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until, Item};

pub(crate) const FOREMAN_NAME: &str = "Mining Foreman";
pub(crate) const COPPER_ROCK_ID: u32 = 10079;
pub(crate) const TIN_ROCK_ID: u32 = 10080;
pub(crate) const FURNACE_ID: u32 = 10082;
pub(crate) const ANVIL_ID: u32 = 10083;
pub(crate) const EXIT_GATE_ID: u32 = 9720;

/// 锻造界面里短剑一栏的控件地址
pub(crate) const SMITH_GROUP: u32 = 312;
pub(crate) const SMITH_DAGGER_CHILD: u32 = 9;

const KEY_TALK: &str = "mining_talk";
const KEY_COPPER: &str = "mining_mine_copper";
const KEY_TIN: &str = "mining_mine_tin";
const KEY_SMELT: &str = "mining_smelt";
const KEY_SMITH: &str = "mining_smith";
const KEY_EXIT: &str = "mining_exit_gate";

#[derive(Debug, Default)]
pub struct MiningForeman;

impl MiningForeman {
    pub fn new() -> Self {
        Self
    }

    async fn should_talk_to_foreman(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        Ok(!ctx.world.has_item(Item::Pickaxe).await?)
    }

    async fn needs_copper_ore(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::Pickaxe).await?
            && !world_client.has_item(Item::CopperOre).await?
            && !world_client.has_item(Item::BronzeBar).await?)
    }

    async fn needs_tin_ore(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::CopperOre).await?
            && !world_client.has_item(Item::TinOre).await?
            && !world_client.has_item(Item::BronzeBar).await?)
    }

    async fn needs_to_smelt_bar(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::CopperOre).await?
            && world_client.has_item(Item::TinOre).await?
            && !world_client.has_item(Item::BronzeBar).await?)
    }

    async fn needs_to_smith_dagger(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::BronzeBar).await?
            && !world_client.has_item(Item::BronzeDagger).await?)
    }

    async fn talk_to_foreman(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("mining: talking to the foreman");
        let world_client = ctx.world;
        if !world_client.interact_npc(FOREMAN_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "foreman is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn mine_rock(
        &self,
        ctx: &mut StageContext<'_>,
        rock_id: u32,
        ore: Item,
        key: &str,
    ) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        if world_client.is_animating().await? {
            debug!("mining: already swinging, waiting");
            tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;
            return Ok(true);
        }
        debug!(rock_id, "mining: mining a rock");
        if !world_client.interact_object(rock_id, "Mine").await? {
            return Ok(ctx.retries.record_failure(key, "rock is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.has_item(ore), 10_000).await? {
            ctx.retries.record_success(key);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(key, "mining produced no ore"))
        }
    }

    async fn smelt_bronze_bar(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        if !world_client.has_item(Item::CopperOre).await?
            || !world_client.has_item(Item::TinOre).await?
        {
            warn!("mining: missing an ore for smelting");
            return Ok(false);
        }
        debug!("mining: smelting a bronze bar");
        if !world_client.interact_object(FURNACE_ID, "Use").await? {
            return Ok(ctx.retries.record_failure(KEY_SMELT, "furnace is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.has_item(Item::BronzeBar), 5_000).await? {
            ctx.retries.record_success(KEY_SMELT);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_SMELT, "smelting produced no bar"))
        }
    }

    async fn smith_bronze_dagger(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        if !world_client.has_item(Item::BronzeBar).await? {
            warn!("mining: no bar to smith");
            return Ok(false);
        }
        debug!("mining: smithing a dagger");
        if !world_client.interact_object(ANVIL_ID, "Smith").await? {
            return Ok(ctx.retries.record_failure(KEY_SMITH, "anvil is not reachable"));
        }
        world::pace(ctx.config).await;
        // 等锻造界面弹出来再点短剑那一栏
        tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;
        if !world_client.click_widget(SMITH_GROUP, SMITH_DAGGER_CHILD).await? {
            return Ok(ctx.retries.record_failure(KEY_SMITH, "smithing screen did not answer"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.has_item(Item::BronzeDagger), 5_000).await? {
            ctx.retries.record_success(KEY_SMITH);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_SMITH, "smithing produced no dagger"))
        }
    }

    async fn exit_through_gate(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("mining: leaving through the gate");
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
impl StageHandler for MiningForeman {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_foreman(ctx).await? {
            return self.talk_to_foreman(ctx).await;
        }
        if self.needs_copper_ore(ctx).await? {
            return self.mine_rock(ctx, COPPER_ROCK_ID, Item::CopperOre, KEY_COPPER).await;
        }
        if self.needs_tin_ore(ctx).await? {
            return self.mine_rock(ctx, TIN_ROCK_ID, Item::TinOre, KEY_TIN).await;
        }
        if self.needs_to_smelt_bar(ctx).await? {
            return self.smelt_bronze_bar(ctx).await;
        }
        if self.needs_to_smith_dagger(ctx).await? {
            return self.smith_bronze_dagger(ctx).await;
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
    async fn test_mines_copper_before_tin() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Pickaxe);
        world.yield_on_object(COPPER_ROCK_ID, Item::CopperOre);
        let mut handler = MiningForeman::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["object:10079:Mine".to_string()]);
        assert!(world.inventory_contains(Item::CopperOre));
    }

    #[tokio::test(start_paused = true)]
    async fn test_smelts_once_both_ores_are_held() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Pickaxe);
        world.give_item(Item::CopperOre);
        world.give_item(Item::TinOre);
        world.effect_on_object(FURNACE_ID, vec![Item::CopperOre, Item::TinOre], Some(Item::BronzeBar));
        let mut handler = MiningForeman::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["object:10082:Use".to_string()]);
        assert!(world.inventory_contains(Item::BronzeBar));
        assert!(!world.inventory_contains(Item::CopperOre));
    }

    #[tokio::test(start_paused = true)]
    async fn test_smithing_clicks_the_dagger_slot() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Pickaxe);
        world.give_item(Item::BronzeBar);
        world.effect_on_click(SMITH_GROUP, SMITH_DAGGER_CHILD, vec![Item::BronzeBar], Some(Item::BronzeDagger));
        let mut handler = MiningForeman::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(
            world.interactions(),
            vec!["object:10083:Smith".to_string(), "widget:312:9".to_string()]
        );
        assert!(world.inventory_contains(Item::BronzeDagger));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_with_the_dagger_made() {
        let (world, config, mut retries) = setup();
        world.give_item(Item::Pickaxe);
        world.give_item(Item::BronzeBar);
        world.give_item(Item::BronzeDagger);
        let mut handler = MiningForeman::new();
        let mut ctx = StageContext {
            world: &world,
            config: &config,
            retries: &mut retries,
        };

        assert!(handler.execute(&mut ctx).await.unwrap());
        assert_eq!(world.interactions(), vec!["object:9720:Open".to_string()]);
    }
}
