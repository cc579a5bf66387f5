//! Sherpa - 模拟世界新手引导自动化
//!
//! 入口：初始化日志、装配世界客户端与编排器，跑完整次引导。

use std::sync::Arc;

use anyhow::Context;
use sherpa::config::{load_config, BotConfig};
use sherpa::core::Orchestrator;
use sherpa::world::mock::MockWorld;
use sherpa::world::NamePool;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let config = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        BotConfig::default()
    });

    // 真实客户端接入前，对脚本化的模拟世界跑完整流程
    let world = Arc::new(MockWorld::scripted_onboarding());
    let names = Arc::new(NamePool::new(vec![
        "Breezy".to_string(),
        "Fernweh".to_string(),
        "Quiller".to_string(),
    ]));

    let (mut orchestrator, mut status_rx) = Orchestrator::new(world, config, names);
    let cancel = orchestrator.cancel_token();

    // Ctrl+C -> 协作式取消
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });

    // 状态行：只在内容变化时打一条
    tokio::spawn(async move {
        let mut last_line = String::new();
        while status_rx.changed().await.is_ok() {
            let snapshot = status_rx.borrow().clone();
            let line = match &snapshot.navigation {
                Some(nav) => format!(
                    "[{:?}] {} ({}/{}) - {} ({}%, eta {}s)",
                    snapshot.phase,
                    snapshot.stage,
                    snapshot.stage_number,
                    snapshot.total_stages,
                    nav.message,
                    nav.percent,
                    nav.eta_secs
                ),
                None => format!(
                    "[{:?}] {} ({}/{}) signal={}",
                    snapshot.phase,
                    snapshot.stage,
                    snapshot.stage_number,
                    snapshot.total_stages,
                    snapshot.progress_signal
                ),
            };
            if line != last_line {
                tracing::info!("{line}");
                last_line = line;
            }
        }
    });

    orchestrator.run().await.context("control loop failed")?;
    Ok(())
}
