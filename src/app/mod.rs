// ==========================================
// 巡逻排班系统 - 应用层
// ==========================================
// 职责: 组件装配与生命周期
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_source_path, AppState};
