//! 建角界面
//!
//! 外观不影响后续任何逻辑，所以七个造型槽和五个配色槽全部随机点几下，
//! 节奏上模仿人手：随机起始方向、偶尔折返、点击间随机停顿。

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::core::{RetryLedger, WorldError};
use crate::world::{self, wait_until, WorldClient};

pub const CREATION_GROUP: u32 = 679;
pub(crate) const BASE_MODEL_CHILD: u32 = 62;
pub(crate) const CONFIRM_CHILD: u32 = 66;

/// 造型槽的左右箭头子控件（头、下颌、躯干、手臂、手、腿、脚）
const DESIGN_ARROWS: [(u32, u32); 7] = [
    (13, 14),
    (17, 18),
    (21, 22),
    (25, 26),
    (29, 30),
    (33, 34),
    (37, 38),
];

/// 配色槽的左右箭头子控件（发色、上装、下装、鞋、肤色）
const COLOR_ARROWS: [(u32, u32); 5] = [(41, 42), (45, 46), (49, 50), (53, 54), (57, 58)];

const KEY_BASE_MODEL: &str = "create_base_model";
const KEY_DESIGN: &str = "create_design";
const KEY_COLORS: &str = "create_colors";
const KEY_CONFIRM: &str = "create_confirm";

pub struct CharacterCreator {
    retries: RetryLedger,
}

impl CharacterCreator {
    pub fn new(max_retries: u32) -> Self {
        Self {
            retries: RetryLedger::new(max_retries),
        }
    }

    pub async fn is_open(world: &dyn WorldClient) -> Result<bool, WorldError> {
        world.is_widget_visible(CREATION_GROUP, 0).await
    }

    /// 走完一整套建角流程。任何一步没生效都返回 Ok(false)，
    /// 让调用方下个 tick 重头再来（界面状态会被重新探测）。
    pub async fn create(
        &mut self,
        world: &dyn WorldClient,
        config: &BotConfig,
    ) -> Result<bool, WorldError> {
        if !Self::is_open(world).await? {
            warn!("character creation screen is not open");
            return Ok(false);
        }

        if !self.select_base_model(world).await? {
            self.retries.record_failure(KEY_BASE_MODEL, "base model button did not answer");
            return Ok(false);
        }
        self.retries.record_success(KEY_BASE_MODEL);

        if !self.randomize_design(world).await? {
            self.retries.record_failure(KEY_DESIGN, "could not randomize the design");
            return Ok(false);
        }
        self.retries.record_success(KEY_DESIGN);

        if !self.randomize_colors(world).await? {
            self.retries.record_failure(KEY_COLORS, "could not randomize the colors");
            return Ok(false);
        }
        self.retries.record_success(KEY_COLORS);

        if !self.confirm(world, config).await? {
            self.retries.record_failure(KEY_CONFIRM, "creation screen did not close");
            return Ok(false);
        }
        self.retries.record_success(KEY_CONFIRM);

        info!("character created");
        Ok(true)
    }

    async fn select_base_model(&self, world: &dyn WorldClient) -> Result<bool, WorldError> {
        debug!("creation: picking the base model");
        if !world.click_widget(CREATION_GROUP, BASE_MODEL_CHILD).await? {
            return Ok(false);
        }
        world::pace_between(300, 600).await;
        Ok(true)
    }

    async fn randomize_design(&self, world: &dyn WorldClient) -> Result<bool, WorldError> {
        debug!("creation: randomizing the design slots");
        for (left, right) in DESIGN_ARROWS {
            self.click_arrows(world, left, right, 3).await?;
            world::pace_between(200, 400).await;
        }
        Ok(true)
    }

    async fn randomize_colors(&self, world: &dyn WorldClient) -> Result<bool, WorldError> {
        debug!("creation: randomizing the color slots");
        for (left, right) in COLOR_ARROWS {
            self.click_arrows(world, left, right, 4).await?;
            world::pace_between(200, 400).await;
        }
        Ok(true)
    }

    async fn click_arrows(
        &self,
        world: &dyn WorldClient,
        left: u32,
        right: u32,
        max_clicks: u32,
    ) -> Result<(), WorldError> {
        let clicks = rand::thread_rng().gen_range(1..=max_clicks);
        let mut click_left = rand::thread_rng().gen_bool(0.5);
        for _ in 0..clicks {
            let child = if click_left { left } else { right };
            world.click_widget(CREATION_GROUP, child).await?;
            world::pace_between(100, 250).await;
            if rand::thread_rng().gen_bool(0.3) {
                click_left = !click_left;
            }
        }
        Ok(())
    }

    async fn confirm(
        &self,
        world: &dyn WorldClient,
        config: &BotConfig,
    ) -> Result<bool, WorldError> {
        debug!("creation: confirming");
        if !world.click_widget(CREATION_GROUP, CONFIRM_CHILD).await? {
            return Ok(false);
        }
        world::pace(config).await;
        wait_until(
            move || {
                let w = world;
                async move { Ok(!w.is_widget_visible(CREATION_GROUP, 0).await?) }
            },
            5_000,
        )
        .await
    }

    pub fn diagnostics(&self) -> String {
        self.retries.diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::mock::MockWorld;

    #[tokio::test(start_paused = true)]
    async fn test_full_pass_ends_with_the_confirm_click() {
        let world = MockWorld::new();
        world.show_widget(CREATION_GROUP, 0);
        world.click_closes_group(CREATION_GROUP, CONFIRM_CHILD);
        let config = BotConfig::default();
        let mut creator = CharacterCreator::new(10);

        assert!(creator.create(&world, &config).await.unwrap());
        let log = world.interactions();
        assert_eq!(log.first().unwrap(), "widget:679:62");
        assert_eq!(log.last().unwrap(), "widget:679:66");
        // 12 个槽至少各点一下，加上基础模型和确认
        assert!(log.len() >= 14);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refuses_to_run_when_the_screen_is_closed() {
        let world = MockWorld::new();
        let config = BotConfig::default();
        let mut creator = CharacterCreator::new(10);

        assert!(!creator.create(&world, &config).await.unwrap());
        assert!(world.interactions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_confirm_is_recorded() {
        let world = MockWorld::new();
        world.show_widget(CREATION_GROUP, 0);
        // 没有关闭效果：确认点下去界面不动
        let config = BotConfig::default();
        let mut creator = CharacterCreator::new(10);

        assert!(!creator.create(&world, &config).await.unwrap());
        assert!(creator.diagnostics().contains("create_confirm"));
    }
}
