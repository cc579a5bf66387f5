//! 离岛后的固定路线：从城堡庭院一路走到西岸银行。
//!
//! 途中两处会被关上的门（城门、银行门）作为路点附带的障碍记录，
//! 由导航器在靠近时顺手点开。

use crate::world::types::WorldPoint;

/// 路上挡道的城门
pub const CITY_GATE_ID: u32 = 24063;
/// 银行入口的门
pub const BANK_DOOR_ID: u32 = 24101;

/// 路点附近需要交互才能通过的物体
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub object_id: u32,
    pub location: WorldPoint,
    /// 离这个距离以内才尝试点它
    pub radius: i32,
}

/// 一段路线中的节点
#[derive(Debug, Clone, Copy)]
pub struct Waypoint {
    pub label: &'static str,
    pub point: WorldPoint,
    pub obstacle: Option<Obstacle>,
}

impl Waypoint {
    const fn open(label: &'static str, point: WorldPoint) -> Self {
        Self {
            label,
            point,
            obstacle: None,
        }
    }

    const fn gated(label: &'static str, point: WorldPoint, obstacle: Obstacle) -> Self {
        Self {
            label,
            point,
            obstacle: Some(obstacle),
        }
    }
}

/// 默认路线：终点是最后一个路点（西岸银行）。
pub fn default_route() -> Vec<Waypoint> {
    vec![
        Waypoint::open("castle courtyard", WorldPoint::new(3222, 3218, 0)),
        Waypoint::open("west road", WorldPoint::new(3200, 3220, 0)),
        Waypoint::open("riverside village", WorldPoint::new(3093, 3244, 0)),
        Waypoint::gated(
            "city gate",
            WorldPoint::new(2966, 3346, 0),
            Obstacle {
                object_id: CITY_GATE_ID,
                location: WorldPoint::new(2966, 3346, 0),
                radius: 8,
            },
        ),
        Waypoint::gated(
            "west bank",
            WorldPoint::new(2945, 3368, 0),
            Obstacle {
                object_id: BANK_DOOR_ID,
                location: WorldPoint::new(2946, 3368, 0),
                radius: 5,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_ends_at_the_bank() {
        let route = default_route();
        assert_eq!(route.len(), 5);
        let last = route.last().unwrap();
        assert_eq!(last.label, "west bank");
        assert_eq!(last.point, WorldPoint::new(2945, 3368, 0));
    }

    #[test]
    fn test_gated_waypoints_carry_their_obstacle() {
        let route = default_route();
        let gate = route.iter().find(|w| w.label == "city gate").unwrap();
        assert_eq!(gate.obstacle.unwrap().object_id, CITY_GATE_ID);
        let bank = route.iter().find(|w| w.label == "west bank").unwrap();
        assert_eq!(bank.obstacle.unwrap().object_id, BANK_DOOR_ID);
    }
}
