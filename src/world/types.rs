//! 世界侧的值类型：坐标、物品、技能、界面面板
//!
//! 对应外部客户端暴露的名词；控制核心只做相等比较与日志展示，不解释其含义。

use serde::Serialize;

/// 世界坐标（x/y 为图块坐标，plane 为楼层）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl WorldPoint {
    pub const fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    /// 同层棋盘距离（两轴差的最大值）；跨层视为不可达
    pub fn tile_distance(&self, other: &WorldPoint) -> i32 {
        if self.plane != other.plane {
            return i32::MAX;
        }
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// 平移出一个新坐标
    pub fn offset(&self, dx: i32, dy: i32) -> WorldPoint {
        WorldPoint::new(self.x + dx, self.y + dy, self.plane)
    }
}

/// 引导各阶段涉及的物品
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Item {
    Hatchet,
    Tinderbox,
    Logs,
    FishingNet,
    RawShrimp,
    CookedShrimp,
    PotOfFlour,
    BucketOfWater,
    Dough,
    Bread,
    Pickaxe,
    CopperOre,
    TinOre,
    BronzeBar,
    BronzeDagger,
    WoodenShield,
    Bones,
}

/// 技能（引导期间只有少数几项会动）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Skill {
    Attack,
    Magic,
    Prayer,
    Cooking,
    Fishing,
    Mining,
    Woodcutting,
}

/// 客户端侧边栏面板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Panel {
    Inventory,
    Equipment,
    Combat,
    Magic,
    Prayer,
    Quests,
    Settings,
}
