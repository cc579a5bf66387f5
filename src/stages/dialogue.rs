//! 对话推进：所有阶段处理器的第一个谓词
//!
//! 引导各阶段的讲解都通过对话进行，阻塞一切其它动作；继续提示点继续（带抖动停顿），
//! 选项提示固定选第 1 项（原速停顿）。

use std::time::Duration;

use tracing::debug;

use crate::config::BotConfig;
use crate::core::WorldError;
use crate::world::{self, WorldClient};

/// 引导对话没有需要分支的选项，一律选第 1 项
const DEFAULT_OPTION: u32 = 1;

/// 把当前打开的对话向前推一步；调用方在 is_dialogue_open 为真时进入
pub(crate) async fn drain_dialogue(
    world_client: &dyn WorldClient,
    config: &BotConfig,
) -> Result<(), WorldError> {
    if world_client.has_continue_prompt().await? {
        debug!("dialogue: continue");
        world_client.continue_dialogue().await?;
        world::pace(config).await;
    }
    if world_client.has_option_prompt().await? {
        debug!(option = DEFAULT_OPTION, "dialogue: choosing an option");
        world_client.choose_option(DEFAULT_OPTION).await?;
        tokio::time::sleep(Duration::from_millis(config.bot.action_delay_ms)).await;
    }
    Ok(())
}
