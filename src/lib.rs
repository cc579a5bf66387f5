//! Sherpa - 模拟世界新手引导自动化
//!
//! 模块划分：
//! - **config**: 运行配置加载（TOML + 环境变量）
//! - **core**: 错误类型、重试台账、状态投影与主控循环
//! - **nav**: 离岛后的路点导航与卡死恢复
//! - **screens**: 建角与账户类型两张全屏界面
//! - **stages**: 进度信号到阶段的映射、调度器与各阶段处理器
//! - **world**: 外部世界客户端边界与测试用模拟实现

pub mod config;
pub mod core;
pub mod nav;
pub mod screens;
pub mod stages;
pub mod world;
