//! 运行配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SHERPA__*` 覆盖（双下划线表示嵌套，
//! 如 `SHERPA__BOT__MAX_RETRIES=5`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    #[serde(default)]
    pub bot: BotSection,
    #[serde(default)]
    pub account: AccountSection,
    #[serde(default)]
    pub navigation: NavigationSection,
}

/// [bot] 段：动作节奏与重试预算
#[derive(Debug, Clone, Deserialize)]
pub struct BotSection {
    /// 相邻动作之间的基础延迟（毫秒）
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
    /// 是否在基础延迟上附加 0–200ms 抖动
    #[serde(default = "default_randomize_delay")]
    pub randomize_delay: bool,
    /// 单个动作键允许的最大失败次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// tick 间隔（毫秒）；上一个 tick 跑完后再等这么久
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_action_delay_ms() -> u64 {
    600
}

fn default_randomize_delay() -> bool {
    true
}

fn default_max_retries() -> u32 {
    10
}

fn default_tick_interval_ms() -> u64 {
    600
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            action_delay_ms: default_action_delay_ms(),
            randomize_delay: default_randomize_delay(),
            max_retries: default_max_retries(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// [account] 段：离岛前的账户类型选择
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AccountSection {
    /// 是否选择铁人模式
    #[serde(default)]
    pub ironman_mode: bool,
    /// 铁人类型；仅在 ironman_mode = true 时生效
    #[serde(default)]
    pub ironman_kind: IronmanKind,
}

/// 铁人模式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IronmanKind {
    #[default]
    Regular,
    Hardcore,
    Ultimate,
}

impl IronmanKind {
    /// 选择界面上的展示名
    pub fn display_name(self) -> &'static str {
        match self {
            IronmanKind::Regular => "Ironman",
            IronmanKind::Hardcore => "Hardcore Ironman",
            IronmanKind::Ultimate => "Ultimate Ironman",
        }
    }
}

/// [navigation] 段：完成后的收尾导航
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationSection {
    /// 完成后是否走到银行；关闭则引导一完成就收尾
    #[serde(default = "default_walk_to_destination")]
    pub walk_to_destination: bool,
    /// 位置多久不变判为卡死（毫秒）
    #[serde(default = "default_stuck_threshold_ms")]
    pub stuck_threshold_ms: u64,
    /// 判定到达普通路点的距离（格）
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius: i32,
    /// 判定到达最终目的地的距离（格）
    #[serde(default = "default_destination_radius")]
    pub destination_radius: i32,
}

fn default_walk_to_destination() -> bool {
    true
}

fn default_stuck_threshold_ms() -> u64 {
    15_000
}

fn default_arrival_radius() -> i32 {
    10
}

fn default_destination_radius() -> i32 {
    5
}

impl Default for NavigationSection {
    fn default() -> Self {
        Self {
            walk_to_destination: default_walk_to_destination(),
            stuck_threshold_ms: default_stuck_threshold_ms(),
            arrival_radius: default_arrival_radius(),
            destination_radius: default_destination_radius(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot: BotSection::default(),
            account: AccountSection::default(),
            navigation: NavigationSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 SHERPA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SHERPA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<BotConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SHERPA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_documented_values() {
        let config = BotConfig::default();
        assert_eq!(config.bot.action_delay_ms, 600);
        assert!(config.bot.randomize_delay);
        assert_eq!(config.bot.max_retries, 10);
        assert_eq!(config.bot.tick_interval_ms, 600);
        assert!(!config.account.ironman_mode);
        assert_eq!(config.account.ironman_kind, IronmanKind::Regular);
        assert!(config.navigation.walk_to_destination);
        assert_eq!(config.navigation.stuck_threshold_ms, 15_000);
        assert_eq!(config.navigation.arrival_radius, 10);
        assert_eq!(config.navigation.destination_radius, 5);
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.toml");
        std::fs::write(
            &path,
            "[bot]\naction_delay_ms = 123\n\n[account]\nironman_mode = true\nironman_kind = \"hardcore\"\n",
        )
        .unwrap();

        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.bot.action_delay_ms, 123);
        assert!(config.account.ironman_mode);
        assert_eq!(config.account.ironman_kind, IronmanKind::Hardcore);
        // 未覆盖的键保持默认
        assert_eq!(config.navigation.arrival_radius, 10);
    }

    #[test]
    fn test_ironman_display_names() {
        assert_eq!(IronmanKind::Regular.display_name(), "Ironman");
        assert_eq!(IronmanKind::Hardcore.display_name(), "Hardcore Ironman");
        assert_eq!(IronmanKind::Ultimate.display_name(), "Ultimate Ironman");
    }
}
