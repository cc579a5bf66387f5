//! 账户类型选单
//!
//! 离岛前弹出的一次性界面：按配置点普通或某种铁人模式，再点确认。

use tracing::{debug, info};

use crate::config::{BotConfig, IronmanKind};
use crate::core::{RetryLedger, WorldError};
use crate::world::{self, wait_until, WorldClient};

pub const SELECTION_GROUP: u32 = 558;
const OPTION_REGULAR: u32 = 11;
const OPTION_IRONMAN: u32 = 12;
const OPTION_HARDCORE: u32 = 13;
const OPTION_ULTIMATE: u32 = 14;
pub(crate) const CONFIRM_CHILD: u32 = 15;

const KEY_SELECT: &str = "account_select_option";
const KEY_CONFIRM: &str = "account_select_confirm";

pub async fn is_selection_open(world: &dyn WorldClient) -> Result<bool, WorldError> {
    world.is_widget_visible(SELECTION_GROUP, 0).await
}

/// 在选单上走完「选类型 → 确认 → 等关闭」。失败计入调用方的台账。
pub async fn handle_selection(
    world: &dyn WorldClient,
    config: &BotConfig,
    retries: &mut RetryLedger,
) -> Result<bool, WorldError> {
    let (child, label) = if config.account.ironman_mode {
        match config.account.ironman_kind {
            IronmanKind::Regular => (OPTION_IRONMAN, IronmanKind::Regular.display_name()),
            IronmanKind::Hardcore => (OPTION_HARDCORE, IronmanKind::Hardcore.display_name()),
            IronmanKind::Ultimate => (OPTION_ULTIMATE, IronmanKind::Ultimate.display_name()),
        }
    } else {
        (OPTION_REGULAR, "Regular Account")
    };
    info!(account_type = label, "selecting account type");

    if !world.click_widget(SELECTION_GROUP, child).await? {
        return Ok(retries.record_failure(KEY_SELECT, format!("{label} option did not answer")));
    }
    world::pace_between(300, 600).await;
    world::pace(config).await;

    debug!("confirming the account type");
    if !world.click_widget(SELECTION_GROUP, CONFIRM_CHILD).await? {
        return Ok(retries.record_failure(KEY_CONFIRM, "confirm button did not answer"));
    }
    world::pace_between(400, 700).await;

    let closed = wait_until(
        move || {
            let w = world;
            async move { Ok(!w.is_widget_visible(SELECTION_GROUP, 0).await?) }
        },
        5_000,
    )
    .await?;

    if closed {
        retries.record_success(KEY_SELECT);
        retries.record_success(KEY_CONFIRM);
        info!("account type confirmed");
        Ok(true)
    } else {
        Ok(retries.record_failure(KEY_CONFIRM, "selection screen did not close"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::mock::MockWorld;

    #[tokio::test(start_paused = true)]
    async fn test_defaults_to_the_regular_option() {
        let world = MockWorld::new();
        world.show_widget(SELECTION_GROUP, 0);
        world.click_closes_group(SELECTION_GROUP, CONFIRM_CHILD);
        let config = BotConfig::default();
        let mut retries = RetryLedger::new(10);

        assert!(handle_selection(&world, &config, &mut retries).await.unwrap());
        assert_eq!(
            world.interactions(),
            vec!["widget:558:11".to_string(), "widget:558:15".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ultimate_ironman_hits_its_own_child() {
        let world = MockWorld::new();
        world.show_widget(SELECTION_GROUP, 0);
        world.click_closes_group(SELECTION_GROUP, CONFIRM_CHILD);
        let mut config = BotConfig::default();
        config.account.ironman_mode = true;
        config.account.ironman_kind = IronmanKind::Ultimate;
        let mut retries = RetryLedger::new(10);

        assert!(handle_selection(&world, &config, &mut retries).await.unwrap());
        assert_eq!(world.interactions()[0], "widget:558:14");
    }

    #[tokio::test(start_paused = true)]
    async fn test_screen_that_stays_open_counts_a_retry() {
        let world = MockWorld::new();
        world.show_widget(SELECTION_GROUP, 0);
        let config = BotConfig::default();
        let mut retries = RetryLedger::new(10);

        assert!(handle_selection(&world, &config, &mut retries).await.unwrap());
        assert_eq!(retries.attempt_count(KEY_CONFIRM), 1);
    }
}
