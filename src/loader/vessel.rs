// ==========================================
// 巡逻排班系统 - 船艇加载器
// ==========================================
// 船艇表（默认 "Jednostki"）: 第 1 行每列表头为类别，
// 其下逐行为舷号，遇到第一个空白单元格该列结束
// ==========================================

use crate::cache::{LoadState, SnapshotCache};
use crate::domain::Vessel;
use crate::engine::events::DatasetKey;
use crate::loader::error::{LoadError, LoadResult};
use crate::loader::{header_columns, DatasetLoader, LoaderContext};
use crate::source::Workbook;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Default)]
pub struct VesselSnapshot {
    vessels: Vec<Vessel>,
}

impl VesselSnapshot {
    /// 按 (类别, 舷号) 排序
    pub fn all(&self) -> &[Vessel] {
        &self.vessels
    }

    /// 某类别的船艇（类别忽略大小写，按舷号排序）
    pub fn by_category(&self, category: &str) -> Vec<Vessel> {
        let category = category.trim();
        self.vessels
            .iter()
            .filter(|v| v.category().eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    pub fn find(&self, category: &str, hull_number: &str) -> Option<&Vessel> {
        let (category, hull_number) = (category.trim(), hull_number.trim());
        self.vessels.iter().find(|v| {
            v.category().eq_ignore_ascii_case(category)
                && v.hull_number().eq_ignore_ascii_case(hull_number)
        })
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }
}

pub struct VesselLoader {
    ctx: LoaderContext,
    sheet_name: String,
    cache: SnapshotCache<VesselSnapshot>,
}

impl VesselLoader {
    pub fn new(ctx: LoaderContext, sheet_name: &str) -> Self {
        let notifier = ctx.notifier.clone();
        let cache = SnapshotCache::new("vessels")
            .on_published(move |_| notifier.publish(DatasetKey::Vessels));
        Self {
            ctx,
            sheet_name: sheet_name.to_string(),
            cache,
        }
    }

    pub async fn ensure_loaded(&self) -> LoadResult<Arc<VesselSnapshot>> {
        self.cache.ensure_loaded(|| self.build()).await
    }

    pub async fn load(&self) -> LoadResult<Arc<VesselSnapshot>> {
        self.cache.load(|| self.build()).await
    }

    pub async fn refresh(&self) -> LoadResult<Arc<VesselSnapshot>> {
        self.cache.refresh(|| self.build()).await
    }

    #[instrument(skip(self))]
    async fn build(&self) -> LoadResult<VesselSnapshot> {
        self.ctx.check_cancelled()?;
        let snapshot = self.ctx.source.read(|wb| self.build_from(wb))??;
        tracing::info!("已加载 {} 艘船艇", snapshot.vessels.len());
        Ok(snapshot)
    }

    fn build_from(&self, workbook: &Workbook) -> LoadResult<VesselSnapshot> {
        let sheet = workbook
            .sheet(&self.sheet_name)
            .ok_or_else(|| LoadError::SheetNotFound(self.sheet_name.clone()))?;

        let mut vessels = Vec::new();
        for (col, category) in header_columns(sheet) {
            self.ctx.check_cancelled()?;
            let mut row = 2;
            while !sheet.is_blank(row, col) {
                let hull = sheet.cell_trimmed(row, col);
                match Vessel::new(category, hull) {
                    Ok(vessel) => vessels.push(vessel),
                    Err(e) => tracing::warn!("船艇 {} {} 无效: {}", category, hull, e),
                }
                row += 1;
            }
        }

        vessels.sort_by(|a, b| {
            (a.category(), a.hull_number()).cmp(&(b.category(), b.hull_number()))
        });
        vessels.dedup();
        Ok(VesselSnapshot { vessels })
    }
}

#[async_trait]
impl DatasetLoader for VesselLoader {
    fn key(&self) -> DatasetKey {
        DatasetKey::Vessels
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

    fn loader() -> VesselLoader {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_or_insert("Jednostki");
        sheet.set_cell(1, 1, "KAT III");
        sheet.set_cell(2, 1, "SG-312");
        sheet.set_cell(3, 1, "SG-311");
        sheet.set_cell(5, 1, "SG-399"); // 第 4 行空白之后不再读取
        // 第 2 列表头空白
        sheet.set_cell(2, 2, "SG-000");
        sheet.set_cell(1, 3, "KAT II");
        sheet.set_cell(2, 3, "SG-201");

        let source = SourceHandle::from_storage(Box::new(MemoryStorage::new(wb))).unwrap();
        VesselLoader::new(
            LoaderContext::new(
                Arc::new(source),
                Arc::new(ChangeNotifier::new()),
                CancellationToken::new(),
            ),
            "Jednostki",
        )
    }

    #[tokio::test]
    async fn test_columns_stop_at_first_blank() {
        let snapshot = loader().ensure_loaded().await.unwrap();

        let labels: Vec<String> = snapshot.all().iter().map(Vessel::label).collect();
        assert_eq!(
            labels,
            vec!["SG-201 (KAT II)", "SG-311 (KAT III)", "SG-312 (KAT III)"]
        );
    }

    #[tokio::test]
    async fn test_by_category_case_insensitive() {
        let snapshot = loader().ensure_loaded().await.unwrap();

        let hulls: Vec<String> = snapshot
            .by_category("kat iii")
            .iter()
            .map(|v| v.hull_number().to_string())
            .collect();
        assert_eq!(hulls, vec!["SG-311", "SG-312"]);
        assert!(snapshot.by_category("KAT IV").is_empty());
        assert!(snapshot.find("KAT II", "sg-201").is_some());
    }
}
