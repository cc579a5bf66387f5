//! 供测试使用的内存版世界客户端
//!
//! 真实客户端在进程外；这里用一张可脚本化的状态表顶替它：每个动作记一条
//! 交互串，规则表决定动作的后果（消耗、产物、信号推进、界面开关）。
//! 断言一律读交互串列表，而不是去猜内部状态。

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::WorldError;

use super::types::{Item, Panel, Skill, WorldPoint};
use super::WorldClient;

/// 动作后果：先消耗再产出
#[derive(Debug, Clone, Default)]
struct Effect {
    consumes: Vec<Item>,
    yields: Option<Item>,
}

/// 点击界面组件的后果
#[derive(Debug, Clone, Default)]
struct ClickEffect {
    consumes: Vec<Item>,
    yields: Option<Item>,
    closes_group: bool,
    sets_ready: bool,
    completes: bool,
    sets_signal: Option<i32>,
    teleport_to: Option<WorldPoint>,
}

struct MockState {
    ready: bool,
    complete: bool,
    progress_signal: i32,
    position: Option<WorldPoint>,
    animating: bool,
    in_combat: bool,
    bank_open: bool,
    accept_actions: bool,
    disconnected: bool,
    walk_teleports: bool,
    dialogue_pages: u32,
    pages_per_talk: u32,
    option_pending: bool,
    inventory: HashSet<Item>,
    equipped: HashSet<Item>,
    skill_xp: HashMap<Skill, i32>,
    visible_widgets: HashSet<(u32, u32)>,
    // 规则表
    grants_on_talk: HashMap<String, Vec<Item>>,
    talk_shows_widget: HashMap<String, (u32, u32)>,
    object_effects: HashMap<u32, Effect>,
    combine_effects: HashMap<(Item, Item), Effect>,
    use_effects: HashMap<(Item, u32), Effect>,
    item_action_consumes: HashSet<(Item, String)>,
    cast_xp: HashMap<String, (Skill, i32)>,
    click_effects: HashMap<(u32, u32), ClickEffect>,
    advance_signal_on: HashMap<String, i32>,
    interactions: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            ready: true,
            complete: false,
            progress_signal: 0,
            position: None,
            animating: false,
            in_combat: false,
            bank_open: false,
            accept_actions: true,
            disconnected: false,
            walk_teleports: false,
            dialogue_pages: 0,
            pages_per_talk: 0,
            option_pending: false,
            inventory: HashSet::new(),
            equipped: HashSet::new(),
            skill_xp: HashMap::new(),
            visible_widgets: HashSet::new(),
            grants_on_talk: HashMap::new(),
            talk_shows_widget: HashMap::new(),
            object_effects: HashMap::new(),
            combine_effects: HashMap::new(),
            use_effects: HashMap::new(),
            item_action_consumes: HashSet::new(),
            cast_xp: HashMap::new(),
            click_effects: HashMap::new(),
            advance_signal_on: HashMap::new(),
            interactions: Vec::new(),
        }
    }
}

pub struct MockWorld {
    state: Mutex<MockState>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// 完整引导剧本：从建角界面一路到离岛走向银行。
    ///
    /// 每个阶段用其最后一个可达动作推进进度信号；对话在每次交谈后开一页。
    /// 生存与厨师阶段的推进点是合成动作本身（点火、和面），与处理器的
    /// 谓词顺序在脚本世界里实际走到的位置一致。
    pub fn scripted_onboarding() -> Self {
        let world = Self::new();
        {
            let mut state = world.lock();
            state.ready = false;
            state.pages_per_talk = 1;
            state.walk_teleports = true;
            // 建角界面一开始就挂着
            state.visible_widgets.insert((679, 0));
            state.click_effects.insert(
                (679, 66),
                ClickEffect {
                    closes_group: true,
                    sets_ready: true,
                    sets_signal: Some(3),
                    ..ClickEffect::default()
                },
            );

            for (interaction, signal) in [
                ("npc:Island Guide:Talk-to", 50),
                ("combine:Tinderbox+Logs", 130),
                ("combine:PotOfFlour+BucketOfWater", 210),
                ("object:9727:Climb-down", 300),
                ("object:9720:Open", 400),
                ("panel:Equipment", 525),
                ("npc:Account Advisor:Talk-to", 570),
                ("item:Bones:Bury", 630),
                ("npc:Magic Tutor:Talk-to", 680),
            ] {
                state.advance_signal_on.insert(interaction.to_string(), signal);
            }

            // 各教官发的家当
            state.grants_on_talk.insert(
                "Survival Instructor".to_string(),
                vec![Item::Hatchet, Item::Tinderbox, Item::FishingNet],
            );
            state.grants_on_talk.insert(
                "Head Chef".to_string(),
                vec![Item::PotOfFlour, Item::BucketOfWater],
            );
            state
                .grants_on_talk
                .insert("Mining Foreman".to_string(), vec![Item::Pickaxe]);
            state
                .grants_on_talk
                .insert("Combat Trainer".to_string(), vec![Item::WoodenShield]);
            state
                .grants_on_talk
                .insert("Chapel Monk".to_string(), vec![Item::Bones]);
            // 离岛向导谈完弹出账户类型选择
            state
                .talk_shows_widget
                .insert("Departure Guide".to_string(), (558, 0));

            // 采集与合成
            state.object_effects.insert(9730, yields(Item::Logs));
            state.object_effects.insert(10091, yields(Item::RawShrimp));
            state.object_effects.insert(10079, yields(Item::CopperOre));
            state.object_effects.insert(10080, yields(Item::TinOre));
            state.object_effects.insert(
                10082,
                Effect {
                    consumes: vec![Item::CopperOre, Item::TinOre],
                    yields: Some(Item::BronzeBar),
                },
            );
            state.combine_effects.insert(
                (Item::Tinderbox, Item::Logs),
                Effect {
                    consumes: vec![Item::Logs],
                    yields: None,
                },
            );
            state.combine_effects.insert(
                (Item::PotOfFlour, Item::BucketOfWater),
                Effect {
                    consumes: vec![Item::PotOfFlour, Item::BucketOfWater],
                    yields: Some(Item::Dough),
                },
            );
            state.use_effects.insert(
                (Item::RawShrimp, 26185),
                Effect {
                    consumes: vec![Item::RawShrimp],
                    yields: Some(Item::CookedShrimp),
                },
            );
            state.use_effects.insert(
                (Item::Dough, 9736),
                Effect {
                    consumes: vec![Item::Dough],
                    yields: Some(Item::Bread),
                },
            );
            state
                .item_action_consumes
                .insert((Item::Bones, "Bury".to_string()));
            state
                .cast_xp
                .insert("Wind Strike".to_string(), (Skill::Magic, 8));
            // 锻造界面里点短剑那一栏
            state.click_effects.insert(
                (312, 9),
                ClickEffect {
                    consumes: vec![Item::BronzeBar],
                    yields: Some(Item::BronzeDagger),
                    ..ClickEffect::default()
                },
            );
            // 确认账户类型即离岛：整体完成并传送到城堡庭院
            state.click_effects.insert(
                (558, 15),
                ClickEffect {
                    closes_group: true,
                    completes: true,
                    teleport_to: Some(WorldPoint::new(3222, 3222, 0)),
                    ..ClickEffect::default()
                },
            );
        }
        world
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 记录一次动作并套用信号推进规则；返回动作是否被接受
    fn record_action(&self, interaction: String) -> bool {
        let mut state = self.lock();
        if !state.accept_actions {
            return false;
        }
        if let Some(signal) = state.advance_signal_on.get(&interaction).copied() {
            state.progress_signal = signal;
        }
        state.interactions.push(interaction);
        true
    }

    fn apply_effect(&self, effect: &Effect) {
        let mut state = self.lock();
        for item in &effect.consumes {
            state.inventory.remove(item);
        }
        if let Some(item) = effect.yields {
            state.inventory.insert(item);
        }
    }

    // --- 剧本开关 ---

    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    pub fn set_complete(&self, complete: bool) {
        self.lock().complete = complete;
    }

    pub fn set_progress_signal(&self, signal: i32) {
        self.lock().progress_signal = signal;
    }

    pub fn set_position(&self, point: WorldPoint) {
        self.lock().position = Some(point);
    }

    pub fn set_animating(&self, animating: bool) {
        self.lock().animating = animating;
    }

    pub fn set_bank_open(&self, open: bool) {
        self.lock().bank_open = open;
    }

    /// 关掉后所有动作都「不被接受」（返回 false 且不记录）
    pub fn set_accept_actions(&self, accept: bool) {
        self.lock().accept_actions = accept;
    }

    /// 断线：三个状态探测（就绪/信号/完成）开始返回错误
    pub fn set_disconnected(&self, disconnected: bool) {
        self.lock().disconnected = disconnected;
    }

    /// 开启后 walk_toward 直接把人放到目标点
    pub fn walk_teleports(&self, enabled: bool) {
        self.lock().walk_teleports = enabled;
    }

    pub fn set_dialogue_pages(&self, pages: u32) {
        self.lock().dialogue_pages = pages;
    }

    /// 此后每次 Talk-to 都会开这么多页对话
    pub fn set_pages_per_talk(&self, pages: u32) {
        self.lock().pages_per_talk = pages;
    }

    pub fn set_option_pending(&self, pending: bool) {
        self.lock().option_pending = pending;
    }

    pub fn set_skill_xp(&self, skill: Skill, xp: i32) {
        self.lock().skill_xp.insert(skill, xp);
    }

    pub fn give_item(&self, item: Item) {
        self.lock().inventory.insert(item);
    }

    pub fn set_equipped(&self, item: Item) {
        self.lock().equipped.insert(item);
    }

    /// 一次性规则：下次与该 NPC 交谈时把这批物品放进背包
    pub fn grant_on_talk(&self, name: &str, items: Vec<Item>) {
        self.lock().grants_on_talk.insert(name.to_string(), items);
    }

    /// 对该物体的任何交互都产出一件物品
    pub fn yield_on_object(&self, object_id: u32, item: Item) {
        self.lock().object_effects.insert(object_id, yields(item));
    }

    pub fn effect_on_object(&self, object_id: u32, consumes: Vec<Item>, yields: Option<Item>) {
        self.lock()
            .object_effects
            .insert(object_id, Effect { consumes, yields });
    }

    pub fn combine_recipe(&self, a: Item, b: Item, consumes: Vec<Item>, yields: Option<Item>) {
        self.lock()
            .combine_effects
            .insert((a, b), Effect { consumes, yields });
    }

    pub fn use_effect(&self, item: Item, object_id: u32, consumes: Vec<Item>, yields: Option<Item>) {
        self.lock()
            .use_effects
            .insert((item, object_id), Effect { consumes, yields });
    }

    /// 对物品执行该动作时把它从背包里消掉
    pub fn consume_on_item_action(&self, item: Item, action: &str) {
        self.lock()
            .item_action_consumes
            .insert((item, action.to_string()));
    }

    pub fn grant_xp_on_cast(&self, spell: &str, skill: Skill, amount: i32) {
        self.lock().cast_xp.insert(spell.to_string(), (skill, amount));
    }

    pub fn show_widget(&self, group: u32, child: u32) {
        self.lock().visible_widgets.insert((group, child));
    }

    /// 点击该组件时收起整个组
    pub fn click_closes_group(&self, group: u32, child: u32) {
        self.lock()
            .click_effects
            .entry((group, child))
            .or_default()
            .closes_group = true;
    }

    pub fn effect_on_click(&self, group: u32, child: u32, consumes: Vec<Item>, yields: Option<Item>) {
        let mut state = self.lock();
        let effect = state.click_effects.entry((group, child)).or_default();
        effect.consumes = consumes;
        effect.yields = yields;
    }

    // --- 断言探针 ---

    pub fn interactions(&self) -> Vec<String> {
        self.lock().interactions.clone()
    }

    pub fn inventory_contains(&self, item: Item) -> bool {
        self.lock().inventory.contains(&item)
    }

    pub fn equipped_contains(&self, item: Item) -> bool {
        self.lock().equipped.contains(&item)
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn yields(item: Item) -> Effect {
    Effect {
        consumes: Vec::new(),
        yields: Some(item),
    }
}

#[async_trait]
impl WorldClient for MockWorld {
    async fn is_ready(&self) -> Result<bool, WorldError> {
        let state = self.lock();
        if state.disconnected {
            return Err(WorldError::Disconnected);
        }
        Ok(state.ready)
    }

    async fn progress_signal(&self) -> Result<i32, WorldError> {
        let state = self.lock();
        if state.disconnected {
            return Err(WorldError::Disconnected);
        }
        Ok(state.progress_signal)
    }

    async fn onboarding_complete(&self) -> Result<bool, WorldError> {
        let state = self.lock();
        if state.disconnected {
            return Err(WorldError::Disconnected);
        }
        Ok(state.complete)
    }

    async fn position(&self) -> Result<Option<WorldPoint>, WorldError> {
        Ok(self.lock().position)
    }

    async fn is_animating(&self) -> Result<bool, WorldError> {
        Ok(self.lock().animating)
    }

    async fn is_in_combat(&self) -> Result<bool, WorldError> {
        Ok(self.lock().in_combat)
    }

    async fn skill_xp(&self, skill: Skill) -> Result<i32, WorldError> {
        Ok(self.lock().skill_xp.get(&skill).copied().unwrap_or(0))
    }

    async fn has_item(&self, item: Item) -> Result<bool, WorldError> {
        Ok(self.lock().inventory.contains(&item))
    }

    async fn is_equipped(&self, item: Item) -> Result<bool, WorldError> {
        Ok(self.lock().equipped.contains(&item))
    }

    async fn equip_item(&self, item: Item) -> Result<bool, WorldError> {
        if !self.record_action(format!("equip:{item:?}")) {
            return Ok(false);
        }
        let mut state = self.lock();
        if state.inventory.remove(&item) {
            state.equipped.insert(item);
        }
        Ok(true)
    }

    async fn combine_items(&self, a: Item, b: Item) -> Result<bool, WorldError> {
        if !self.record_action(format!("combine:{a:?}+{b:?}")) {
            return Ok(false);
        }
        let effect = self.lock().combine_effects.get(&(a, b)).cloned();
        if let Some(effect) = effect {
            self.apply_effect(&effect);
        }
        Ok(true)
    }

    async fn use_item_on_object(&self, item: Item, object_id: u32) -> Result<bool, WorldError> {
        if !self.record_action(format!("use:{item:?}@{object_id}")) {
            return Ok(false);
        }
        let effect = self.lock().use_effects.get(&(item, object_id)).cloned();
        if let Some(effect) = effect {
            self.apply_effect(&effect);
        }
        Ok(true)
    }

    async fn interact_item(&self, item: Item, action: &str) -> Result<bool, WorldError> {
        if !self.record_action(format!("item:{item:?}:{action}")) {
            return Ok(false);
        }
        let mut state = self.lock();
        if state.item_action_consumes.contains(&(item, action.to_string())) {
            state.inventory.remove(&item);
        }
        Ok(true)
    }

    async fn interact_npc(&self, name: &str, action: &str) -> Result<bool, WorldError> {
        if !self.record_action(format!("npc:{name}:{action}")) {
            return Ok(false);
        }
        if action == "Talk-to" {
            let mut state = self.lock();
            state.dialogue_pages = state.pages_per_talk;
            if let Some(items) = state.grants_on_talk.remove(name) {
                for item in items {
                    state.inventory.insert(item);
                }
            }
            if let Some(widget) = state.talk_shows_widget.get(name).copied() {
                state.visible_widgets.insert(widget);
            }
        }
        Ok(true)
    }

    async fn interact_object(&self, object_id: u32, action: &str) -> Result<bool, WorldError> {
        if !self.record_action(format!("object:{object_id}:{action}")) {
            return Ok(false);
        }
        let effect = self.lock().object_effects.get(&object_id).cloned();
        if let Some(effect) = effect {
            self.apply_effect(&effect);
        }
        Ok(true)
    }

    async fn cast_spell_on_npc(&self, spell: &str, npc: &str) -> Result<bool, WorldError> {
        if !self.record_action(format!("cast:{spell}@{npc}")) {
            return Ok(false);
        }
        let reward = self.lock().cast_xp.get(spell).copied();
        if let Some((skill, amount)) = reward {
            let mut state = self.lock();
            *state.skill_xp.entry(skill).or_insert(0) += amount;
        }
        Ok(true)
    }

    async fn open_panel(&self, panel: Panel) -> Result<bool, WorldError> {
        Ok(self.record_action(format!("panel:{panel:?}")))
    }

    async fn is_widget_visible(&self, group: u32, child: u32) -> Result<bool, WorldError> {
        Ok(self.lock().visible_widgets.contains(&(group, child)))
    }

    async fn click_widget(&self, group: u32, child: u32) -> Result<bool, WorldError> {
        if !self.record_action(format!("widget:{group}:{child}")) {
            return Ok(false);
        }
        let effect = self.lock().click_effects.get(&(group, child)).cloned();
        if let Some(effect) = effect {
            let mut state = self.lock();
            for item in &effect.consumes {
                state.inventory.remove(item);
            }
            if let Some(item) = effect.yields {
                state.inventory.insert(item);
            }
            if effect.closes_group {
                state.visible_widgets.retain(|(g, _)| *g != group);
            }
            if effect.sets_ready {
                state.ready = true;
            }
            if effect.completes {
                state.complete = true;
            }
            if let Some(signal) = effect.sets_signal {
                state.progress_signal = signal;
            }
            if let Some(point) = effect.teleport_to {
                state.position = Some(point);
            }
        }
        Ok(true)
    }

    async fn is_bank_open(&self) -> Result<bool, WorldError> {
        Ok(self.lock().bank_open)
    }

    async fn close_bank(&self) -> Result<bool, WorldError> {
        if !self.record_action("bank:close".to_string()) {
            return Ok(false);
        }
        self.lock().bank_open = false;
        Ok(true)
    }

    async fn is_dialogue_open(&self) -> Result<bool, WorldError> {
        let state = self.lock();
        Ok(state.dialogue_pages > 0 || state.option_pending)
    }

    async fn has_continue_prompt(&self) -> Result<bool, WorldError> {
        Ok(self.lock().dialogue_pages > 0)
    }

    async fn has_option_prompt(&self) -> Result<bool, WorldError> {
        Ok(self.lock().option_pending)
    }

    async fn continue_dialogue(&self) -> Result<(), WorldError> {
        if self.record_action("dialogue:continue".to_string()) {
            let mut state = self.lock();
            state.dialogue_pages = state.dialogue_pages.saturating_sub(1);
        }
        Ok(())
    }

    async fn choose_option(&self, index: u32) -> Result<(), WorldError> {
        if self.record_action(format!("dialogue:option:{index}")) {
            self.lock().option_pending = false;
        }
        Ok(())
    }

    async fn walk_toward(&self, target: WorldPoint) -> Result<bool, WorldError> {
        if !self.record_action(format!("walk:{}:{}", target.x, target.y)) {
            return Ok(false);
        }
        let mut state = self.lock();
        if state.walk_teleports {
            state.position = Some(target);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_actions_are_recorded_in_order() {
        let world = MockWorld::new();
        world.interact_npc("Island Guide", "Talk-to").await.unwrap();
        world.interact_object(9398, "Open").await.unwrap();
        assert_eq!(
            world.interactions(),
            vec![
                "npc:Island Guide:Talk-to".to_string(),
                "object:9398:Open".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_actions_are_not_recorded() {
        let world = MockWorld::new();
        world.set_accept_actions(false);
        assert!(!world.interact_npc("Island Guide", "Talk-to").await.unwrap());
        assert!(world.interactions().is_empty());
    }

    #[tokio::test]
    async fn test_disconnection_fails_the_status_probes() {
        let world = MockWorld::new();
        world.set_disconnected(true);
        assert_eq!(world.is_ready().await, Err(WorldError::Disconnected));
        assert_eq!(world.progress_signal().await, Err(WorldError::Disconnected));
        assert_eq!(world.onboarding_complete().await, Err(WorldError::Disconnected));

        world.set_disconnected(false);
        assert!(world.is_ready().await.unwrap());
    }

    #[tokio::test]
    async fn test_talk_grants_are_one_shot() {
        let world = MockWorld::new();
        world.grant_on_talk("Chapel Monk", vec![Item::Bones]);
        world.consume_on_item_action(Item::Bones, "Bury");

        world.interact_npc("Chapel Monk", "Talk-to").await.unwrap();
        assert!(world.inventory_contains(Item::Bones));
        world.interact_item(Item::Bones, "Bury").await.unwrap();
        assert!(!world.inventory_contains(Item::Bones));

        // 再谈一次不会重新发放
        world.interact_npc("Chapel Monk", "Talk-to").await.unwrap();
        assert!(!world.inventory_contains(Item::Bones));
    }

    #[tokio::test]
    async fn test_scripted_confirm_starts_the_run() {
        let world = MockWorld::scripted_onboarding();
        assert!(!world.is_ready().await.unwrap());
        assert!(world.is_widget_visible(679, 0).await.unwrap());

        world.click_widget(679, 66).await.unwrap();
        assert!(world.is_ready().await.unwrap());
        assert!(!world.is_widget_visible(679, 0).await.unwrap());
        assert_eq!(world.progress_signal().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_scripted_departure_confirm_completes_and_teleports() {
        let world = MockWorld::scripted_onboarding();
        world.interact_npc("Departure Guide", "Talk-to").await.unwrap();
        assert!(world.is_widget_visible(558, 0).await.unwrap());

        world.click_widget(558, 15).await.unwrap();
        assert!(world.onboarding_complete().await.unwrap());
        assert!(!world.is_widget_visible(558, 0).await.unwrap());
        assert_eq!(
            world.position().await.unwrap(),
            Some(WorldPoint::new(3222, 3222, 0))
        );
    }
}
