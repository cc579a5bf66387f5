//! 完整引导流程集成测试：脚本化世界从建角跑到银行

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sherpa::config::BotConfig;
    use sherpa::core::{ControlError, Orchestrator, RunPhase};
    use sherpa::world::mock::MockWorld;
    use sherpa::world::NamePool;

    fn fast_config() -> BotConfig {
        let mut config = BotConfig::default();
        config.bot.action_delay_ms = 10;
        config.bot.randomize_delay = false;
        config.bot.tick_interval_ms = 10;
        config
    }

    fn names() -> Arc<NamePool> {
        Arc::new(NamePool::new(vec!["Breezy".to_string()]))
    }

    fn index_of(log: &[String], needle: &str) -> usize {
        log.iter()
            .position(|entry| entry == needle)
            .unwrap_or_else(|| panic!("{needle} not found in the interaction log"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_run_reaches_the_bank() {
        let world = Arc::new(MockWorld::scripted_onboarding());
        let (mut orchestrator, status_rx) = Orchestrator::new(world.clone(), fast_config(), names());

        orchestrator.run().await.unwrap();

        let snapshot = status_rx.borrow().clone();
        assert_eq!(snapshot.phase, RunPhase::Finished);
        assert_eq!(snapshot.stage, "Completed");
        assert_eq!(snapshot.stage_number, 12);
        let nav = snapshot.navigation.expect("navigation report should be published");
        assert_eq!(nav.percent, 100);
        assert_eq!(nav.message, "Arrived at the bank");

        let log = world.interactions();
        // 建角确认在引导动作之前
        let confirm = index_of(&log, "widget:679:66");
        let guide = index_of(&log, "npc:Island Guide:Talk-to");
        let ladder = index_of(&log, "object:9727:Climb-down");
        let smith = index_of(&log, "widget:312:9");
        let depart = index_of(&log, "widget:558:15");
        assert!(confirm < guide);
        assert!(guide < ladder);
        assert!(ladder < smith);
        assert!(smith < depart);

        // 离岛后才开始走路，路上开了城门
        let first_walk = log
            .iter()
            .position(|entry| entry.starts_with("walk:"))
            .expect("the navigator should have walked");
        assert!(depart < first_walk);
        assert!(log.contains(&"object:24063:Open".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_disabled_run_stops_at_completion() {
        let world = Arc::new(MockWorld::scripted_onboarding());
        let mut config = fast_config();
        config.navigation.walk_to_destination = false;
        let (mut orchestrator, status_rx) = Orchestrator::new(world.clone(), config, names());

        orchestrator.run().await.unwrap();

        assert_eq!(status_rx.borrow().phase, RunPhase::Finished);
        let log = world.interactions();
        assert!(log.iter().all(|entry| !entry.starts_with("walk:")));
        // 引导本身照常跑完
        assert!(log.contains(&"widget:558:15".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresponsive_world_aborts_with_a_stall() {
        let world = Arc::new(MockWorld::new());
        world.set_progress_signal(3);
        world.set_accept_actions(false);
        let mut config = fast_config();
        config.bot.max_retries = 2;
        let (mut orchestrator, _status_rx) = Orchestrator::new(world, config, names());

        let err = orchestrator.run().await.unwrap_err();
        match err {
            ControlError::RunStalled { stage, reports } => {
                assert_eq!(stage, "Island guide");
                assert_eq!(reports, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_an_idle_run() {
        let world = Arc::new(MockWorld::new());
        world.set_progress_signal(0);
        let (mut orchestrator, _status_rx) = Orchestrator::new(world, fast_config(), names());
        let cancel = orchestrator.cancel_token();

        let handle = tokio::spawn(async move { orchestrator.run().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }
}
