//! 路点导航器：离岛后沿固定路线走到西岸银行。
//!
//! 每个 tick 只推进一小步：观察位置、判断卡死、顺手开门、
//! 到了就推进路点索引，没到就朝当前路点再走一次。到达终点后锁存，
//! 之后的调用全部是无副作用的成功。

pub mod route;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::core::{NavReport, RetryLedger, WorldError};
use crate::world::types::WorldPoint;
use crate::world::{self, WorldClient};
use route::Waypoint;

/// 卡死恢复时朝斜向挪动的格数
const RECOVERY_STEP: i32 = 2;
/// ETA 估算里的固定常数（秒）
const ETA_BASE_SECS: u64 = 30;

/// 沿路点列表行进的导航器。索引只增不减，到达终点后永久锁存。
pub struct WaypointNavigator {
    route: Vec<Waypoint>,
    waypoint_index: usize,
    reached_destination: bool,
    last_position: Option<WorldPoint>,
    last_position_change: Instant,
    consecutive_recoveries: u32,
    retries: RetryLedger,
}

impl WaypointNavigator {
    pub fn new(route: Vec<Waypoint>, max_retries: u32) -> Self {
        Self {
            reached_destination: route.is_empty(),
            route,
            waypoint_index: 0,
            last_position: None,
            last_position_change: Instant::now(),
            consecutive_recoveries: 0,
            retries: RetryLedger::new(max_retries),
        }
    }

    pub fn with_default_route(max_retries: u32) -> Self {
        Self::new(route::default_route(), max_retries)
    }

    pub fn arrived(&self) -> bool {
        self.reached_destination
    }

    /// 推进一个 tick。返回 `Ok(true)` 表示已到终点（含锁存后的重复调用），
    /// `Ok(false)` 表示这个 tick 做了事但还在路上。
    pub async fn step(
        &mut self,
        world_client: &dyn WorldClient,
        config: &BotConfig,
    ) -> Result<bool, WorldError> {
        if self.reached_destination {
            return Ok(true);
        }

        let Some(position) = world_client.position().await? else {
            debug!("navigator: no position reading yet");
            return Ok(false);
        };
        self.observe_position(position);

        if self.is_stuck(config) {
            self.attempt_unstuck(world_client, position).await?;
            return Ok(false);
        }

        self.try_clear_obstacles(world_client, config, position)
            .await?;

        let Some(destination) = self.route.last() else {
            self.reached_destination = true;
            return Ok(true);
        };
        if position.tile_distance(&destination.point) <= config.navigation.destination_radius {
            info!(label = destination.label, "navigator: reached the destination");
            self.reached_destination = true;
            return Ok(true);
        }

        let index = self.waypoint_index.min(self.route.len() - 1);
        let waypoint = self.route[index];
        // 中途路点用较宽的判定半径；终点只认上面的 destination_radius。
        if index + 1 < self.route.len()
            && position.tile_distance(&waypoint.point) <= config.navigation.arrival_radius
        {
            debug!(
                label = waypoint.label,
                index, "navigator: waypoint reached, moving on"
            );
            self.retries.reset(&waypoint_key(index));
            self.waypoint_index = index + 1;
            return Ok(false);
        }

        let key = waypoint_key(index);
        if world_client.walk_toward(waypoint.point).await? {
            self.retries.record_success(&key);
            debug!(
                label = waypoint.label,
                x = waypoint.point.x,
                y = waypoint.point.y,
                "navigator: heading to the next waypoint"
            );
        } else {
            self.retries
                .record_failure(&key, "walk request was not accepted");
        }
        Ok(false)
    }

    fn observe_position(&mut self, position: WorldPoint) {
        if self.last_position != Some(position) {
            self.last_position = Some(position);
            self.last_position_change = Instant::now();
            self.consecutive_recoveries = 0;
        }
    }

    fn is_stuck(&self, config: &BotConfig) -> bool {
        self.last_position_change.elapsed().as_millis() as u64
            >= config.navigation.stuck_threshold_ms
    }

    /// 朝斜向挪两格打破寻路僵局，然后重置静止计时。只扰动状态，
    /// 不保证脱困；下个 tick 的正常逻辑会重新评估。
    async fn attempt_unstuck(
        &mut self,
        world_client: &dyn WorldClient,
        position: WorldPoint,
    ) -> Result<(), WorldError> {
        self.consecutive_recoveries += 1;
        if self.consecutive_recoveries > 1 {
            error!(
                recoveries = self.consecutive_recoveries,
                x = position.x,
                y = position.y,
                "navigator: still stuck after a recovery nudge"
            );
        } else {
            warn!(
                x = position.x,
                y = position.y,
                "navigator: position has not changed for a while, nudging"
            );
        }
        let target = position.offset(RECOVERY_STEP, RECOVERY_STEP);
        world_client.walk_toward(target).await?;
        self.last_position_change = Instant::now();
        Ok(())
    }

    /// 看一眼当前及下一个路点附带的障碍，离得够近就顺手点开。
    /// 纯尽力而为，开不开都不影响后面的走路判定。
    async fn try_clear_obstacles(
        &self,
        world_client: &dyn WorldClient,
        config: &BotConfig,
        position: WorldPoint,
    ) -> Result<(), WorldError> {
        let start = self.waypoint_index.min(self.route.len().saturating_sub(1));
        for waypoint in self.route.iter().skip(start).take(2) {
            let Some(obstacle) = waypoint.obstacle else {
                continue;
            };
            if position.tile_distance(&obstacle.location) > obstacle.radius {
                continue;
            }
            if world_client
                .interact_object(obstacle.object_id, "Open")
                .await?
            {
                debug!(
                    object_id = obstacle.object_id,
                    near = waypoint.label,
                    "navigator: opened an obstacle on the way"
                );
                world::pace(config).await;
            }
        }
        Ok(())
    }

    /// 完成百分比：按走完的路点数折算，到达后恒为 100。
    pub fn progress_percent(&self) -> u8 {
        if self.reached_destination || self.route.is_empty() {
            return 100;
        }
        (self.waypoint_index * 100 / self.route.len()) as u8
    }

    /// 粗略 ETA：剩余直线距离加一个固定常数，只用于展示。
    pub fn eta_secs(&self) -> u64 {
        if self.reached_destination {
            return 0;
        }
        let Some(destination) = self.route.last() else {
            return 0;
        };
        let Some(position) = self.last_position else {
            return ETA_BASE_SECS;
        };
        let distance = position.tile_distance(&destination.point);
        if distance == i32::MAX {
            return ETA_BASE_SECS;
        }
        distance as u64 + ETA_BASE_SECS
    }

    pub fn status_message(&self) -> String {
        if self.reached_destination {
            return "Arrived at the bank".to_string();
        }
        let index = self.waypoint_index.min(self.route.len() - 1);
        format!(
            "Heading to {} ({}/{})",
            self.route[index].label,
            index + 1,
            self.route.len()
        )
    }

    pub fn report(&self) -> NavReport {
        NavReport {
            message: self.status_message(),
            percent: self.progress_percent(),
            eta_secs: self.eta_secs(),
        }
    }

    pub fn diagnostics(&self) -> String {
        self.retries.diagnostics()
    }
}

fn waypoint_key(index: usize) -> String {
    format!("waypoint_{index}")
}
