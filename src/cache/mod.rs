// ==========================================
// 巡逻排班系统 - 缓存层
// ==========================================
// 职责: 惰性加载 + 原子替换的不可变快照
// ==========================================

pub mod snapshot_cache;

pub use snapshot_cache::{LoadState, SnapshotCache};
