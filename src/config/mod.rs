// ==========================================
// 巡逻排班系统 - 配置层
// ==========================================
// 职责: 应用配置加载（文件 + 环境变量 + 默认值）
// ==========================================

pub mod app_config;

pub use app_config::{AppConfig, ConfigError, ConfigResult, SheetNames, CONFIG_ENV, SOURCE_ENV};
