// ==========================================
// 巡逻排班系统 - 数据源句柄
// ==========================================
// 进程内单写者: 网格由读写锁保护，锁不跨 await 持有
// 持久化只在显式调用 persist() 时发生
// ==========================================

use crate::source::error::{SourceError, SourceResult};
use crate::source::storage::{CsvDirectoryStorage, WorkbookStorage, XlsxStorage};
use crate::source::workbook::Workbook;
use std::path::Path;
use std::sync::RwLock;

pub struct SourceHandle {
    location: String,
    grid: RwLock<Workbook>,
    storage: Box<dyn WorkbookStorage>,
}

impl SourceHandle {
    /// 按路径打开数据源
    ///
    /// # 规则
    /// - 目录 → CSV 目录存储
    /// - .xlsx / .xls → Excel 存储（.xlsx 回写原文件）
    pub fn open(path: &Path) -> SourceResult<Self> {
        if !path.exists() {
            return Err(SourceError::FileNotFound(path.display().to_string()));
        }

        let storage: Box<dyn WorkbookStorage> = if path.is_dir() {
            Box::new(CsvDirectoryStorage::new(path))
        } else {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            match ext.as_str() {
                "xlsx" | "xls" => Box::new(XlsxStorage::new(path)),
                _ => return Err(SourceError::UnsupportedFormat(ext)),
            }
        };

        Self::from_storage(storage)
    }

    /// 从任意存储后端加载
    pub fn from_storage(storage: Box<dyn WorkbookStorage>) -> SourceResult<Self> {
        let workbook = storage.load()?;
        if workbook.sheet_count() == 0 {
            return Err(SourceError::NoSheets);
        }

        tracing::info!(
            "数据源已打开: {} ({} 个工作表)",
            storage.describe(),
            workbook.sheet_count()
        );

        Ok(Self {
            location: storage.describe(),
            grid: RwLock::new(workbook),
            storage,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// 只读访问网格
    pub fn read<R>(&self, f: impl FnOnce(&Workbook) -> R) -> SourceResult<R> {
        let guard = self
            .grid
            .read()
            .map_err(|e| SourceError::LockPoisoned(e.to_string()))?;
        Ok(f(&guard))
    }

    /// 读写访问网格
    pub fn write<R>(&self, f: impl FnOnce(&mut Workbook) -> R) -> SourceResult<R> {
        let mut guard = self
            .grid
            .write()
            .map_err(|e| SourceError::LockPoisoned(e.to_string()))?;
        Ok(f(&mut guard))
    }

    /// 持久化当前网格
    pub fn persist(&self) -> SourceResult<()> {
        let guard = self
            .grid
            .read()
            .map_err(|e| SourceError::LockPoisoned(e.to_string()))?;
        self.storage.save(&guard)?;
        tracing::info!("数据源已保存: {}", self.location);
        Ok(())
    }

    /// 重新从存储读取（丢弃未保存的修改）
    pub fn reload(&self) -> SourceResult<()> {
        let workbook = self.storage.load()?;
        if workbook.sheet_count() == 0 {
            return Err(SourceError::NoSheets);
        }
        self.write(|grid| *grid = workbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::storage::MemoryStorage;

    #[test]
    fn test_open_rejects_empty_workbook() {
        let result = SourceHandle::from_storage(Box::new(MemoryStorage::new(Workbook::new())));
        assert!(matches!(result, Err(SourceError::NoSheets)));
    }

    #[test]
    fn test_open_rejects_missing_and_unsupported() {
        assert!(matches!(
            SourceHandle::open(Path::new("brak.xlsx")),
            Err(SourceError::FileNotFound(_))
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            SourceHandle::open(file.path()),
            Err(SourceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_write_then_reload_discards_unsaved() {
        let mut wb = Workbook::new();
        wb.sheet_or_insert("MARZEC").set_cell(1, 1, "x");
        let handle = SourceHandle::from_storage(Box::new(MemoryStorage::new(wb))).unwrap();

        handle
            .write(|grid| grid.sheet_or_insert("MARZEC").set_cell(2, 2, "P"))
            .unwrap();
        assert_eq!(
            handle
                .read(|grid| grid.sheet("MARZEC").map(|s| s.cell_text(2, 2).to_string()))
                .unwrap()
                .as_deref(),
            Some("P")
        );

        handle.reload().unwrap();
        assert!(handle
            .read(|grid| grid.sheet("MARZEC").map(|s| s.is_blank(2, 2)))
            .unwrap()
            .unwrap());
    }
}
