// ==========================================
// 巡逻排班系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、校验规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod certificate;
pub mod crew;
pub mod month;
pub mod patrol;
pub mod patrol_draft;
pub mod types;
pub mod vessel;

// 重导出核心类型
pub use certificate::{Certificate, CertificateBuckets};
pub use crew::{CrewMember, MonthlyBalance};
pub use patrol::{Patrol, PatrolAssignment, PatrolPreview, PreviewRow};
pub use patrol_draft::{CrewSlot, PatrolDraft};
pub use types::{DateRange, DomainError, DomainResult, Field, Outcome, Tier};
pub use vessel::{CrewRole, Vessel};
