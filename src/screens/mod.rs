//! 引导之外的两块全屏界面：建角界面与账户类型选单

pub mod account_select;
pub mod character_creation;
