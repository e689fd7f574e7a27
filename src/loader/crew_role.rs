// ==========================================
// 巡逻排班系统 - 岗位需求加载器
// ==========================================
// 岗位表（默认 "Zalogi"）: 仅接受表头以固定前缀（默认 "KAT"）开头的列，
// 每列读取全部非空白单元格；(类别, 岗位) 去重（忽略大小写）
// ==========================================

use crate::cache::{LoadState, SnapshotCache};
use crate::domain::CrewRole;
use crate::engine::events::DatasetKey;
use crate::loader::error::{LoadError, LoadResult};
use crate::loader::{header_columns, DatasetLoader, LoaderContext};
use crate::source::Workbook;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Default)]
pub struct CrewRoleSnapshot {
    roles: Vec<CrewRole>,
}

impl CrewRoleSnapshot {
    /// 源表顺序
    pub fn all(&self) -> &[CrewRole] {
        &self.roles
    }

    /// 某类别所需岗位（源表顺序）
    pub fn by_category(&self, category: &str) -> Vec<CrewRole> {
        let category = category.trim();
        self.roles
            .iter()
            .filter(|r| r.category().eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    /// 去重后的类别（源表顺序）
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.roles
            .iter()
            .filter(|r| seen.insert(r.category().to_uppercase()))
            .map(|r| r.category().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

pub struct CrewRoleLoader {
    ctx: LoaderContext,
    sheet_name: String,
    prefix: String,
    cache: SnapshotCache<CrewRoleSnapshot>,
}

impl CrewRoleLoader {
    /// # 参数
    /// - `prefix`: 类别列表头前缀（忽略大小写）
    pub fn new(ctx: LoaderContext, sheet_name: &str, prefix: &str) -> Self {
        let notifier = ctx.notifier.clone();
        let cache = SnapshotCache::new("crew_roles")
            .on_published(move |_| notifier.publish(DatasetKey::CrewRoles));
        Self {
            ctx,
            sheet_name: sheet_name.to_string(),
            prefix: prefix.trim().to_uppercase(),
            cache,
        }
    }

    pub async fn ensure_loaded(&self) -> LoadResult<Arc<CrewRoleSnapshot>> {
        self.cache.ensure_loaded(|| self.build()).await
    }

    pub async fn load(&self) -> LoadResult<Arc<CrewRoleSnapshot>> {
        self.cache.load(|| self.build()).await
    }

    pub async fn refresh(&self) -> LoadResult<Arc<CrewRoleSnapshot>> {
        self.cache.refresh(|| self.build()).await
    }

    #[instrument(skip(self))]
    async fn build(&self) -> LoadResult<CrewRoleSnapshot> {
        self.ctx.check_cancelled()?;
        let snapshot = self.ctx.source.read(|wb| self.build_from(wb))??;
        tracing::info!("已加载 {} 个岗位需求", snapshot.roles.len());
        Ok(snapshot)
    }

    fn build_from(&self, workbook: &Workbook) -> LoadResult<CrewRoleSnapshot> {
        let sheet = workbook
            .sheet(&self.sheet_name)
            .ok_or_else(|| LoadError::SheetNotFound(self.sheet_name.clone()))?;

        let mut seen = HashSet::new();
        let mut roles = Vec::new();

        for (col, category) in header_columns(sheet) {
            self.ctx.check_cancelled()?;
            if !category.to_uppercase().starts_with(&self.prefix) {
                tracing::debug!("跳过第 {} 列: {:?} 不是类别列", col, category);
                continue;
            }

            for row in 2..=sheet.last_row() {
                let role = sheet.cell_trimmed(row, col);
                if role.is_empty() {
                    continue;
                }
                match CrewRole::new(category, role) {
                    Ok(crew_role) => {
                        if seen.insert(crew_role.clone()) {
                            roles.push(crew_role);
                        } else {
                            tracing::debug!("跳过重复岗位: {} - {}", category, role);
                        }
                    }
                    Err(e) => tracing::warn!("岗位 {} {} 无效: {}", category, role, e),
                }
            }
        }

        Ok(CrewRoleSnapshot { roles })
    }
}

#[async_trait]
impl DatasetLoader for CrewRoleLoader {
    fn key(&self) -> DatasetKey {
        DatasetKey::CrewRoles
    }

    fn state(&self) -> LoadState {
        self.cache.state()
    }

    fn invalidate(&self) {
        self.cache.invalidate();
    }

    async fn reload(&self) -> LoadResult<()> {
        self.load().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::ChangeNotifier;
    use crate::source::{MemoryStorage, SourceHandle};
    use tokio_util::sync::CancellationToken;

    fn loader(wb: Workbook) -> CrewRoleLoader {
        let source = SourceHandle::from_storage(Box::new(MemoryStorage::new(wb))).unwrap();
        CrewRoleLoader::new(
            LoaderContext::new(
                Arc::new(source),
                Arc::new(ChangeNotifier::new()),
                CancellationToken::new(),
            ),
            "Zalogi",
            "KAT",
        )
    }

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_or_insert("Zalogi");
        sheet.set_cell(1, 1, "KAT III");
        sheet.set_cell(2, 1, "Dowódca");
        sheet.set_cell(4, 1, "Mechanik"); // 中间空白行不终止读取
        sheet.set_cell(5, 1, "mechanik");
        sheet.set_cell(1, 2, "Uwagi");
        sheet.set_cell(2, 2, "nie jest rolą");
        sheet.set_cell(1, 3, "kat ii");
        sheet.set_cell(2, 3, "Motorzysta");
        wb
    }

    #[tokio::test]
    async fn test_only_prefixed_columns_deduplicated() {
        let snapshot = loader(workbook()).ensure_loaded().await.unwrap();

        let roles: Vec<String> = snapshot.all().iter().map(|r| r.to_string()).collect();
        assert_eq!(snapshot.len(), 3);
        assert!(!roles.iter().any(|r| r.contains("nie jest")));
        assert_eq!(snapshot.by_category("KAT III").len(), 2);
        assert_eq!(snapshot.by_category("KAT II").len(), 1);
        assert_eq!(snapshot.categories(), vec!["KAT III".to_string(), "kat ii".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_sheet_fails_load() {
        let mut wb = Workbook::new();
        wb.sheet_or_insert("Inne").set_cell(1, 1, "x");
        let err = loader(wb).ensure_loaded().await.unwrap_err();
        assert!(matches!(err, LoadError::SheetNotFound(_)));
    }
}
