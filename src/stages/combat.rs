//! 战斗教官阶段：穿戴短剑和盾牌，打一只大老鼠

use async_trait::async_trait;
use tracing::debug;

use crate::core::WorldError;
use crate::stages::dialogue::drain_dialogue;
use crate::stages::{StageContext, StageHandler};
use crate::world::{self, wait_until, Item, Panel};

pub(crate) const TRAINER_NAME: &str = "Combat Trainer";
pub(crate) const RAT_NAME: &str = "Giant Rat";
pub(crate) const EXIT_LADDER_ID: u32 = 9726;

const KEY_TALK: &str = "combat_talk";
const KEY_OPEN_EQUIPMENT: &str = "combat_open_equipment";
const KEY_EQUIP_DAGGER: &str = "combat_equip_dagger";
const KEY_EQUIP_SHIELD: &str = "combat_equip_shield";
const KEY_OPEN_COMBAT: &str = "combat_open_combat";
const KEY_KILL: &str = "combat_kill_rat";
const KEY_EXIT: &str = "combat_exit_ladder";

#[derive(Debug, Default)]
pub struct CombatTrainer;

impl CombatTrainer {
    pub fn new() -> Self {
        Self
    }

    async fn should_talk_to_trainer(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(!world_client.has_item(Item::WoodenShield).await?
            && !world_client.is_equipped(Item::WoodenShield).await?)
    }

    async fn needs_to_open_equipment(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::BronzeDagger).await?
            && !world_client.is_equipped(Item::BronzeDagger).await?)
    }

    async fn needs_to_equip_dagger(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::BronzeDagger).await?
            && !world_client.is_equipped(Item::BronzeDagger).await?)
    }

    async fn needs_to_equip_shield(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.has_item(Item::WoodenShield).await?
            && !world_client.is_equipped(Item::WoodenShield).await?)
    }

    async fn needs_to_open_combat(&self, ctx: &StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        Ok(world_client.is_equipped(Item::BronzeDagger).await?
            && world_client.is_equipped(Item::WoodenShield).await?)
    }

    fn needs_to_kill_rat(&self) -> bool {
        true
    }

    async fn talk_to_trainer(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("combat: talking to the trainer");
        let world_client = ctx.world;
        if !world_client.interact_npc(TRAINER_NAME, "Talk-to").await? {
            return Ok(ctx.retries.record_failure(KEY_TALK, "trainer is not reachable"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_dialogue_open(), 3_000).await? {
            ctx.retries.record_success(KEY_TALK);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_TALK, "dialogue did not open"))
        }
    }

    async fn open_equipment_panel(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("combat: opening the equipment panel");
        if ctx.world.open_panel(Panel::Equipment).await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_OPEN_EQUIPMENT);
            Ok(true)
        } else {
            Ok(ctx
                .retries
                .record_failure(KEY_OPEN_EQUIPMENT, "could not open the equipment panel"))
        }
    }

    async fn equip_dagger(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("combat: equipping the dagger");
        let world_client = ctx.world;
        if !world_client.equip_item(Item::BronzeDagger).await? {
            return Ok(ctx.retries.record_failure(KEY_EQUIP_DAGGER, "could not wield the dagger"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_equipped(Item::BronzeDagger), 3_000).await? {
            ctx.retries.record_success(KEY_EQUIP_DAGGER);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_EQUIP_DAGGER, "dagger never showed as worn"))
        }
    }

    async fn equip_shield(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("combat: equipping the shield");
        let world_client = ctx.world;
        if !world_client.equip_item(Item::WoodenShield).await? {
            return Ok(ctx.retries.record_failure(KEY_EQUIP_SHIELD, "could not wield the shield"));
        }
        world::pace(ctx.config).await;
        if wait_until(move || world_client.is_equipped(Item::WoodenShield), 3_000).await? {
            ctx.retries.record_success(KEY_EQUIP_SHIELD);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_EQUIP_SHIELD, "shield never showed as worn"))
        }
    }

    async fn open_combat_panel(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("combat: opening the combat panel");
        if ctx.world.open_panel(Panel::Combat).await? {
            world::pace(ctx.config).await;
            ctx.retries.record_success(KEY_OPEN_COMBAT);
            Ok(true)
        } else {
            Ok(ctx.retries.record_failure(KEY_OPEN_COMBAT, "could not open the combat panel"))
        }
    }

    async fn kill_rat(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        let world_client = ctx.world;
        if world_client.is_in_combat().await? {
            debug!("combat: already fighting, waiting it out");
            wait_until(
                move || {
                    let w = world_client;
                    async move { Ok(!w.is_in_combat().await?) }
                },
                30_000,
            )
            .await?;
            ctx.retries.record_success(KEY_KILL);
            return Ok(true);
        }
        debug!("combat: attacking a rat");
        if !world_client.interact_npc(RAT_NAME, "Attack").await? {
            return Ok(ctx.retries.record_failure(KEY_KILL, "no rat to attack"));
        }
        world::pace(ctx.config).await;
        if !wait_until(move || world_client.is_in_combat(), 5_000).await? {
            return Ok(ctx.retries.record_failure(KEY_KILL, "never entered combat"));
        }
        wait_until(
            move || {
                let w = world_client;
                async move { Ok(!w.is_in_combat().await?) }
            },
            30_000,
        )
        .await?;
        ctx.retries.record_success(KEY_KILL);
        Ok(true)
    }

    async fn exit_down_ladder(&self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        debug!("combat: climbing down the ladder");
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
impl StageHandler for CombatTrainer {
    async fn execute(&mut self, ctx: &mut StageContext<'_>) -> Result<bool, WorldError> {
        if ctx.world.is_dialogue_open().await? {
            drain_dialogue(ctx.world, ctx.config).await?;
            return Ok(true);
        }
        if self.should_talk_to_trainer(ctx).await? {
            return self.talk_to_trainer(ctx).await;
        }
        if self.needs_to_open_equipment(ctx).await? {
            return self.open_equipment_panel(ctx).await;
        }
        if self.needs_to_equip_dagger(ctx).await? {
            return self.equip_dagger(ctx).await;
        }
        if self.needs_to_equip_shield(ctx).await? {
            return self.equip_shield(ctx).await;
        }
        if self.needs_to_open_combat(ctx).await? {
            return self.open_combat_panel(ctx).await;
        }
        if self.needs_to_kill_rat() {
            return self.kill_rat(ctx).await;
        }
        self.exit_down_ladder(ctx).await
    }
}
