// ==========================================
// 巡逻排班系统 - 数据集加载层
// ==========================================
// 职责: 从表格数据源构建不可变数据集快照
// 依赖: 值班表 → 名册；船艇、岗位需求独立加载
// 每个加载器独占一个 SnapshotCache（独立加载锁）
// ==========================================

pub mod crew_role;
pub mod duty_schedule;
pub mod error;
pub mod roster;
pub mod vessel;

pub use crew_role::{CrewRoleLoader, CrewRoleSnapshot};
pub use duty_schedule::{DutyScheduleLoader, MonthIndex, MonthSheet, MonthlySchedule};
pub use error::{LoadError, LoadResult};
pub use roster::{RosterLoader, RosterSheets, RosterSnapshot};
pub use vessel::{VesselLoader, VesselSnapshot};

use crate::cache::LoadState;
use crate::engine::events::{ChangeNotifier, DatasetKey};
use crate::source::{Sheet, SourceHandle};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ==========================================
// DatasetLoader Trait
// ==========================================

/// 数据集加载器的统一控制面（失效、重载、状态）
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    /// 对应的数据集键
    fn key(&self) -> DatasetKey;

    fn state(&self) -> LoadState;

    /// 标记过期，旧快照保持可见
    fn invalidate(&self);

    /// 强制重新加载
    async fn reload(&self) -> LoadResult<()>;
}

// ==========================================
// LoaderContext - 加载器共享依赖
// ==========================================
#[derive(Clone)]
pub struct LoaderContext {
    pub source: Arc<SourceHandle>,
    pub notifier: Arc<ChangeNotifier>,
    /// 应用级关闭信号，加载在行间检查
    pub shutdown: CancellationToken,
}

impl LoaderContext {
    pub fn new(
        source: Arc<SourceHandle>,
        notifier: Arc<ChangeNotifier>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            notifier,
            shutdown,
        }
    }

    pub(crate) fn check_cancelled(&self) -> LoadResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        Ok(())
    }
}

/// 表头行（第 1 行）中非空白的列: (列号, 表头文本)
pub(crate) fn header_columns(sheet: &Sheet) -> Vec<(u32, &str)> {
    (1..=sheet.last_column())
        .map(|col| (col, sheet.cell_trimmed(1, col)))
        .filter(|(_, header)| !header.is_empty())
        .collect()
}
