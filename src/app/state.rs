// ==========================================
// 巡逻排班系统 - 应用状态
// ==========================================
// 职责: 组件装配
//   打开数据源 → 变更通知器 → 各加载器 → 资格判定/提交引擎 → API
// 名册缓存订阅值班表变更（提交后自动失效）
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ApiResult, PatrolApi};
use crate::config::AppConfig;
use crate::domain::{DomainError, Field};
use crate::engine::{
    CacheInvalidator, ChangeNotifier, DatasetKey, EligibilityResolver, EligibilityScanner,
    PatrolCommitter, SubscriptionId,
};
use crate::loader::{
    CrewRoleLoader, DatasetLoader, DutyScheduleLoader, LoaderContext, RosterLoader, VesselLoader,
};
use crate::source::SourceHandle;

/// 应用状态
///
/// 持有共享资源与 API 实例；drop 前应调用 `shutdown`
pub struct AppState {
    pub config: AppConfig,
    pub source: Arc<SourceHandle>,
    pub notifier: Arc<ChangeNotifier>,

    pub schedule_loader: Arc<DutyScheduleLoader>,
    pub roster_loader: Arc<RosterLoader>,
    pub vessel_loader: Arc<VesselLoader>,
    pub crew_role_loader: Arc<CrewRoleLoader>,

    pub scanner: Arc<EligibilityScanner>,
    pub committer: Arc<PatrolCommitter>,

    /// 巡逻排班API
    pub patrol_api: Arc<PatrolApi>,

    shutdown: CancellationToken,
    roster_invalidation: SubscriptionId,
}

impl AppState {
    /// 按配置打开数据源并装配全部组件
    ///
    /// # 返回
    /// - Err(ApiError::Validation): 未配置数据源路径
    /// - Err(ApiError::NotFound / Structural): 数据源不存在或不含工作表
    pub fn new(config: AppConfig) -> ApiResult<Self> {
        let path = config
            .source_path
            .clone()
            .ok_or(ApiError::from(DomainError::Blank(Field::SourcePath)))?;
        tracing::info!("初始化AppState，数据源: {}", path.display());

        let source = SourceHandle::open(&path)?;
        Ok(Self::with_source(config, source))
    }

    /// 使用已打开的数据源装配（测试可传入内存存储）
    pub fn with_source(config: AppConfig, source: SourceHandle) -> Self {
        let source = Arc::new(source);
        let notifier = Arc::new(ChangeNotifier::new());
        let shutdown = CancellationToken::new();
        let ctx = LoaderContext::new(source.clone(), notifier.clone(), shutdown.clone());

        // ==========================================
        // 加载器
        // ==========================================
        let schedule_loader = Arc::new(DutyScheduleLoader::new(ctx.clone()));
        let roster_loader = Arc::new(RosterLoader::new(
            ctx.clone(),
            schedule_loader.clone(),
            config.roster_sheets(),
            config.year(),
        ));
        let vessel_loader = Arc::new(VesselLoader::new(ctx.clone(), &config.sheets.vessels));
        let crew_role_loader = Arc::new(CrewRoleLoader::new(
            ctx,
            &config.sheets.crew_roles,
            &config.crew_role_prefix,
        ));

        // 值班表变更 → 名册过期
        let roster_target: Arc<dyn DatasetLoader> = roster_loader.clone();
        let roster_invalidation = notifier.subscribe(
            &[DatasetKey::DutySchedule],
            Arc::new(CacheInvalidator::new(&roster_target)),
        );

        // ==========================================
        // 引擎
        // ==========================================
        let resolver = Arc::new(EligibilityResolver::new(roster_loader.clone()));
        let scanner = Arc::new(EligibilityScanner::new(resolver));
        let committer = Arc::new(PatrolCommitter::new(
            source.clone(),
            &config.duty_marker,
            config.commit_mode,
        ));

        let patrol_api = Arc::new(PatrolApi::new(
            source.clone(),
            notifier.clone(),
            schedule_loader.clone(),
            roster_loader.clone(),
            vessel_loader.clone(),
            crew_role_loader.clone(),
            scanner.clone(),
            committer.clone(),
        ));

        notifier.publish(DatasetKey::SourceOpened);
        tracing::info!("AppState初始化完成 (提交模式: {:?})", config.commit_mode);

        Self {
            config,
            source,
            notifier,
            schedule_loader,
            roster_loader,
            vessel_loader,
            crew_role_loader,
            scanner,
            committer,
            patrol_api,
            shutdown,
            roster_invalidation,
        }
    }

    /// 取消进行中的加载与资格计算
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.scanner.cancel_current();
        self.notifier.unsubscribe(self.roster_invalidation);
        tracing::info!("AppState已关闭");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// 获取默认数据源路径
///
/// # 返回
/// - 若设置了环境变量 `PATROL_ROSTER_SOURCE`，则使用该路径
/// - 否则使用用户文档目录下的 `grafik.xlsx`
pub fn get_default_source_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(crate::config::SOURCE_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::document_dir().map(|dir| dir.join("grafik.xlsx"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LoadState;
    use crate::source::{MemoryStorage, Workbook};

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.sheet_or_insert("Zasoby").set_cell(2, 2, "Jan Kowalski");
        let certs = wb.sheet_or_insert("Swiadectwa");
        certs.set_cell(2, 1, "1");
        certs.set_cell(2, 3, "Mechanik");
        certs.set_cell(2, 4, "KAT III");
        let vessels = wb.sheet_or_insert("Jednostki");
        vessels.set_cell(1, 1, "KAT III");
        vessels.set_cell(2, 1, "SG-311");
        let roles = wb.sheet_or_insert("Zalogi");
        roles.set_cell(1, 1, "KAT III");
        roles.set_cell(2, 1, "Mechanik");
        wb.sheet_or_insert("MARZEC").set_cell(2, 3, "Jan Kowalski");
        wb
    }

    fn state() -> AppState {
        let config = AppConfig {
            schedule_year: Some(2024),
            ..AppConfig::default()
        };
        let source = SourceHandle::from_storage(Box::new(MemoryStorage::new(workbook()))).unwrap();
        AppState::with_source(config, source)
    }

    #[test]
    fn test_new_requires_source_path() {
        let err = AppState::new(AppConfig::default()).err().unwrap();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn test_schedule_change_invalidates_roster() {
        let state = state();
        state.roster_loader.ensure_loaded().await.unwrap();
        assert_eq!(state.roster_loader.state(), LoadState::Ready);

        state.notifier.publish(DatasetKey::DutySchedule);
        assert_eq!(state.roster_loader.state(), LoadState::Unloaded);
        // 旧快照仍可读
        assert!(state.roster_loader.snapshot().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_loads() {
        let state = state();
        state.shutdown();
        assert!(state.is_shut_down());

        let err = state.patrol_api.list_crew().await.err().unwrap();
        assert_eq!(err.kind(), "cancelled");
    }
}
