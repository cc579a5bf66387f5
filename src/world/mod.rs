//! 外部世界边界
//!
//! `WorldClient` 是控制核心与模拟世界客户端之间的唯一接口：环境读数、玩家状态、
//! 背包与界面操作、对话与移动。动作方法的布尔返回值表示「动作已被接受」，
//! 动作的后果一律通过之后的有界等待重新观测。

pub mod mock;
pub mod types;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::config::BotConfig;
use crate::core::WorldError;

pub use types::{Item, Panel, Skill, WorldPoint};

/// 有界等待的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 模拟世界客户端。所有方法都可能因连接问题失败，调用方负责把失败折算成瞬时错误。
#[async_trait]
pub trait WorldClient: Send + Sync {
    // --- 环境读数 ---

    /// 世界是否就绪（已登录且客户端可用）
    async fn is_ready(&self) -> Result<bool, WorldError>;

    /// 引导进度信号（单调递增的整数）
    async fn progress_signal(&self) -> Result<i32, WorldError>;

    /// 引导是否已整体完成（独立于进度信号的终态标记）
    async fn onboarding_complete(&self) -> Result<bool, WorldError>;

    /// 玩家当前位置；读不到时返回 None
    async fn position(&self) -> Result<Option<WorldPoint>, WorldError>;

    // --- 玩家状态 ---

    async fn is_animating(&self) -> Result<bool, WorldError>;

    async fn is_in_combat(&self) -> Result<bool, WorldError>;

    async fn skill_xp(&self, skill: Skill) -> Result<i32, WorldError>;

    // --- 背包与装备 ---

    async fn has_item(&self, item: Item) -> Result<bool, WorldError>;

    async fn is_equipped(&self, item: Item) -> Result<bool, WorldError>;

    async fn equip_item(&self, item: Item) -> Result<bool, WorldError>;

    /// 背包内两件物品互相使用（如火绒盒点木柴）
    async fn combine_items(&self, a: Item, b: Item) -> Result<bool, WorldError>;

    /// 把背包物品用在世界物体上（如生虾放到火上）
    async fn use_item_on_object(&self, item: Item, object_id: u32) -> Result<bool, WorldError>;

    /// 对背包物品执行命名动作（如埋骨头）
    async fn interact_item(&self, item: Item, action: &str) -> Result<bool, WorldError>;

    // --- 世界交互 ---

    async fn interact_npc(&self, name: &str, action: &str) -> Result<bool, WorldError>;

    async fn interact_object(&self, object_id: u32, action: &str) -> Result<bool, WorldError>;

    async fn cast_spell_on_npc(&self, spell: &str, npc: &str) -> Result<bool, WorldError>;

    // --- 界面 ---

    async fn open_panel(&self, panel: Panel) -> Result<bool, WorldError>;

    async fn is_widget_visible(&self, group: u32, child: u32) -> Result<bool, WorldError>;

    async fn click_widget(&self, group: u32, child: u32) -> Result<bool, WorldError>;

    async fn is_bank_open(&self) -> Result<bool, WorldError>;

    async fn close_bank(&self) -> Result<bool, WorldError>;

    // --- 对话 ---

    async fn is_dialogue_open(&self) -> Result<bool, WorldError>;

    async fn has_continue_prompt(&self) -> Result<bool, WorldError>;

    async fn has_option_prompt(&self) -> Result<bool, WorldError>;

    async fn continue_dialogue(&self) -> Result<(), WorldError>;

    async fn choose_option(&self, index: u32) -> Result<(), WorldError>;

    // --- 移动 ---

    /// 朝目标走一步（寻路在客户端侧）；返回请求是否被接受
    async fn walk_toward(&self, target: WorldPoint) -> Result<bool, WorldError>;
}

/// 反复评估谓词直到为真或超时；超时不是错误，只是「还没发生」
pub async fn wait_until<F, Fut>(mut condition: F, timeout_ms: u64) -> Result<bool, WorldError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<bool, WorldError>> + Send,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition().await? {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// 动作间距：基础延迟，启用抖动时附加 0–200ms
pub async fn pace(config: &BotConfig) {
    let base = config.bot.action_delay_ms;
    let delay = if config.bot.randomize_delay {
        base + rand::thread_rng().gen_range(0..200)
    } else {
        base
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// 区间随机停顿（界面点击节奏）
pub async fn pace_between(low_ms: u64, high_ms: u64) {
    let delay = rand::thread_rng().gen_range(low_ms..=high_ms);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// 名字生成协作方的边界；生成与查重都在控制核心之外
pub trait NameSource: Send + Sync {
    fn next_name(&self) -> String;
}

/// 简单轮换名字池（演练与测试用）
pub struct NamePool {
    names: Vec<String>,
    cursor: AtomicUsize,
}

impl NamePool {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl NameSource for NamePool {
    fn next_name(&self) -> String {
        if self.names.is_empty() {
            return "Wanderer".to_string();
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.names.len();
        self.names[index].clone()
    }
}
