// ==========================================
// 巡逻排班系统 - 工作簿存储后端
// ==========================================
// CSV 目录: 每个工作表一个 "<表名>.csv"，可读可写
// Excel: calamine 读取；.xlsx 经 rust_xlsxwriter 回写原文件
// 内存: 测试与离线场景
// ==========================================

use crate::source::error::{SourceError, SourceResult};
use crate::source::workbook::{column_letters, Sheet, Workbook};
use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ==========================================
// WorkbookStorage Trait
// ==========================================
pub trait WorkbookStorage: Send + Sync {
    /// 读取整个工作簿
    fn load(&self) -> SourceResult<Workbook>;

    /// 持久化整个工作簿
    fn save(&self, workbook: &Workbook) -> SourceResult<()>;

    /// 存储位置描述（日志用）
    fn describe(&self) -> String;
}

// ==========================================
// CSV 目录存储
// ==========================================
pub struct CsvDirectoryStorage {
    dir: PathBuf,
}

impl CsvDirectoryStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn read_sheet(path: &Path, name: &str) -> SourceResult<Sheet> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_path(path)?;

        let mut sheet = Sheet::new(name);
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            for (col_idx, value) in record.iter().enumerate() {
                sheet.set_cell(row_idx as u32 + 1, col_idx as u32 + 1, value);
            }
        }
        Ok(sheet)
    }

    fn write_sheet(&self, sheet: &Sheet) -> SourceResult<()> {
        let target = self.dir.join(format!("{}.csv", sheet.name()));
        let staging = self.dir.join(format!("{}.csv.tmp", sheet.name()));

        {
            let mut writer = WriterBuilder::new().flexible(true).from_path(&staging)?;
            let last_col = sheet.last_column();
            for row in 1..=sheet.last_row() {
                let record: Vec<&str> = (1..=last_col).map(|col| sheet.cell_text(row, col)).collect();
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }

        // 先写临时文件再替换，避免写到一半的文件被读取
        fs::rename(&staging, &target)?;
        Ok(())
    }
}

impl WorkbookStorage for CsvDirectoryStorage {
    fn load(&self) -> SourceResult<Workbook> {
        if !self.dir.is_dir() {
            return Err(SourceError::FileNotFound(self.dir.display().to_string()));
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .collect();
        entries.sort();

        let mut workbook = Workbook::new();
        for path in entries {
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(name) if !name.trim().is_empty() => name.to_string(),
                _ => continue,
            };
            let sheet = Self::read_sheet(&path, &name)?;
            tracing::debug!("读取工作表 {} ({} 行)", name, sheet.last_row());
            workbook.insert_sheet(sheet);
        }

        Ok(workbook)
    }

    fn save(&self, workbook: &Workbook) -> SourceResult<()> {
        fs::create_dir_all(&self.dir)?;
        for sheet in workbook.sheets() {
            self.write_sheet(sheet)?;
        }
        tracing::debug!("已写入 {} 个工作表到 {}", workbook.sheet_count(), self.dir.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv-dir:{}", self.dir.display())
    }
}

// ==========================================
// Excel 存储
// ==========================================
// .xlsx: calamine 读取，rust_xlsxwriter 整体回写到同一文件
// .xls: 只读，持久化返回 UnsupportedFormat
pub struct XlsxStorage {
    path: PathBuf,
}

impl XlsxStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn is_writable(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("xlsx"))
            .unwrap_or(false)
    }

    fn write_sheet(target: &mut rust_xlsxwriter::Worksheet, sheet: &Sheet) -> SourceResult<()> {
        target.set_name(sheet.name())?;

        let last_col = sheet.last_column();
        for row in 1..=sheet.last_row() {
            for col in 1..=last_col {
                let text = sheet.cell_text(row, col);
                if text.is_empty() {
                    continue;
                }
                let xl_col = u16::try_from(col - 1)
                    .map_err(|_| SourceError::InvalidColumn(column_letters(col)))?;
                match excel_number(text) {
                    Some(number) => target.write_number(row - 1, xl_col, number)?,
                    None => target.write_string(row - 1, xl_col, text)?,
                };
            }
        }
        Ok(())
    }
}

/// 读取时数字单元格按 f64 显示格式转成文本；回写时仅对能原样还原的文本写数字
fn excel_number(text: &str) -> Option<f64> {
    let number: f64 = text.parse().ok()?;
    (number.is_finite() && number.to_string() == text).then_some(number)
}

impl WorkbookStorage for XlsxStorage {
    fn load(&self) -> SourceResult<Workbook> {
        if !self.path.exists() {
            return Err(SourceError::FileNotFound(self.path.display().to_string()));
        }

        let mut excel = open_workbook_auto(&self.path)?;
        let mut workbook = Workbook::new();

        for name in excel.sheet_names().to_vec() {
            let range = excel
                .worksheet_range(&name)
                .map_err(|e| SourceError::ExcelParseError(e.to_string()))?;

            let mut sheet = Sheet::new(&name);
            let (row0, col0) = range.start().unwrap_or((0, 0));
            for (r, c, cell) in range.cells() {
                let text = cell.to_string();
                sheet.set_cell(row0 + r as u32 + 1, col0 + c as u32 + 1, &text);
            }
            workbook.insert_sheet(sheet);
        }

        Ok(workbook)
    }

    fn save(&self, workbook: &Workbook) -> SourceResult<()> {
        if !self.is_writable() {
            return Err(SourceError::UnsupportedFormat(format!(
                "{}（.xls 只读）",
                self.path.display()
            )));
        }

        let mut excel = rust_xlsxwriter::Workbook::new();
        for sheet in workbook.sheets() {
            Self::write_sheet(excel.add_worksheet(), sheet)?;
        }

        // 先写同目录临时文件再替换，读取方不会看到写到一半的文件
        let staging = self.path.with_extension("xlsx.tmp");
        excel.save(&staging)?;
        fs::rename(&staging, &self.path)?;

        tracing::debug!(
            "已写入 {} 个工作表到 {}",
            workbook.sheet_count(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("xlsx:{}", self.path.display())
    }
}

// ==========================================
// 内存存储
// ==========================================
#[derive(Default)]
pub struct MemoryStorage {
    initial: Workbook,
    saved: Mutex<Option<Workbook>>,
    save_count: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new(initial: Workbook) -> Self {
        Self {
            initial,
            saved: Mutex::new(None),
            save_count: Mutex::new(0),
        }
    }

    /// 最近一次持久化的内容
    pub fn saved(&self) -> Option<Workbook> {
        self.saved.lock().ok().and_then(|g| g.clone())
    }

    pub fn save_count(&self) -> usize {
        self.save_count.lock().map(|g| *g).unwrap_or(0)
    }
}

impl WorkbookStorage for MemoryStorage {
    fn load(&self) -> SourceResult<Workbook> {
        match self.saved() {
            Some(saved) => Ok(saved),
            None => Ok(self.initial.clone()),
        }
    }

    fn save(&self, workbook: &Workbook) -> SourceResult<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|e| SourceError::LockPoisoned(e.to_string()))?;
        *saved = Some(workbook.clone());

        let mut count = self
            .save_count
            .lock()
            .map_err(|e| SourceError::LockPoisoned(e.to_string()))?;
        *count += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
