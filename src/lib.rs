// ==========================================
// 巡逻排班系统 - 核心库
// ==========================================
// 职责: 船员 → 巡逻岗位分配 + 值班表回写
// 数据源: 单一表格文件（月度值班表 + 人员/证书/船艇/岗位表）
// 定位: 决策支持（人工确认后提交）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "pl");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 表格数据源 - 工作簿网格与持久化
pub mod source;

// 快照缓存 - 惰性加载 + 原子替换
pub mod cache;

// 数据加载层 - 各数据集加载器
pub mod loader;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    Certificate, CertificateBuckets, CrewMember, CrewRole, CrewSlot, DateRange, MonthlyBalance,
    Outcome, Patrol, PatrolAssignment, PatrolDraft, PatrolPreview, Tier, Vessel,
};

// 引擎
pub use engine::{
    CertificateClassifier, ChangeNotifier, DatasetKey, EligibilityQuery, EligibilityResolver,
    EligibilityScanner, PatrolCommitter, RoleNormalizer,
};

// API
pub use api::{ApiError, PatrolApi};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Grafik patroli";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
