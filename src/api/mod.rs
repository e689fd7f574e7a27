// ==========================================
// 巡逻排班系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 CLI 或其他前端调用
// ==========================================

pub mod error;
pub mod patrol_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult, Broken, Invalid, Missing};
pub use patrol_api::{candidate_names, PatrolApi};
