// ==========================================
// 巡逻排班系统 - 引擎层
// ==========================================
// 职责: 岗位规范化、证书分档、资格判定、巡逻提交、变更通知
// 红线: 引擎不直接解析表格布局，布局常量归加载层
// ==========================================

pub mod certificate_classifier;
pub mod eligibility;
pub mod events;
pub mod patrol_commit;
pub mod role_normalizer;

// 重导出核心引擎
pub use certificate_classifier::CertificateClassifier;
pub use eligibility::{EligibilityQuery, EligibilityResolver, EligibilityScanner, EligibleCrew};
pub use events::{CacheInvalidator, ChangeListener, ChangeNotifier, DatasetKey, SubscriptionId};
pub use patrol_commit::{CommitError, CommitMode, CommitReceipt, CommitResult, PatrolCommitter};
pub use role_normalizer::RoleNormalizer;
