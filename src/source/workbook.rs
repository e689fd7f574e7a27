// ==========================================
// 巡逻排班系统 - 工作簿网格
// ==========================================
// 坐标: (行, 列) 均从 1 开始
// 列字母: 26 进制（A=1 … Z=26, AA=27 …）
// 空白单元格不存储
// ==========================================

use crate::source::error::{SourceError, SourceResult};
use std::collections::BTreeMap;

/// 列字母 → 列号
pub fn column_number(letters: &str) -> SourceResult<u32> {
    let letters = letters.trim();
    if letters.is_empty() {
        return Err(SourceError::InvalidColumn(letters.to_string()));
    }

    let mut sum: u32 = 0;
    for ch in letters.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(SourceError::InvalidColumn(letters.to_string()));
        }
        sum = sum
            .checked_mul(26)
            .and_then(|s| s.checked_add(upper as u32 - 'A' as u32 + 1))
            .ok_or_else(|| SourceError::InvalidColumn(letters.to_string()))?;
    }
    Ok(sum)
}

/// 列号 → 列字母（0 返回空串）
pub fn column_letters(mut number: u32) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        let rem = (number - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        number = (number - 1) / 26;
    }
    letters.iter().rev().collect()
}

// ==========================================
// Sheet - 单个工作表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u32), String>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 单元格文本（不存在时为空串）
    pub fn cell_text(&self, row: u32, col: u32) -> &str {
        self.cells
            .get(&(row, col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// 单元格文本（去空白）
    pub fn cell_trimmed(&self, row: u32, col: u32) -> &str {
        self.cell_text(row, col).trim()
    }

    pub fn is_blank(&self, row: u32, col: u32) -> bool {
        self.cell_trimmed(row, col).is_empty()
    }

    /// 写单元格；空白文本等价于清除
    pub fn set_cell(&mut self, row: u32, col: u32, text: &str) {
        if row == 0 || col == 0 {
            return;
        }
        if text.trim().is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), text.to_string());
        }
    }

    /// 最后一个非空行（空表为 0）
    pub fn last_row(&self) -> u32 {
        self.cells.keys().next_back().map(|(r, _)| *r).unwrap_or(0)
    }

    /// 最后一个非空列（空表为 0）
    pub fn last_column(&self) -> u32 {
        self.cells.keys().map(|(_, c)| *c).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ==========================================
// Workbook - 命名工作表集合
// ==========================================
// 工作表名查找忽略大小写
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        let wanted = name.trim().to_uppercase();
        self.sheets.iter().find(|s| s.name.to_uppercase() == wanted)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        let wanted = name.trim().to_uppercase();
        self.sheets
            .iter_mut()
            .find(|s| s.name.to_uppercase() == wanted)
    }

    pub fn require_sheet(&self, name: &str) -> SourceResult<&Sheet> {
        self.sheet(name)
            .ok_or_else(|| SourceError::SheetNotFound(name.to_string()))
    }

    pub fn require_sheet_mut(&mut self, name: &str) -> SourceResult<&mut Sheet> {
        self.sheet_mut(name)
            .ok_or_else(|| SourceError::SheetNotFound(name.to_string()))
    }

    /// 取得工作表，不存在则新建
    pub fn sheet_or_insert(&mut self, name: &str) -> &mut Sheet {
        let idx = match self.sheet_index(name) {
            Some(idx) => idx,
            None => {
                self.sheets.push(Sheet::new(name.trim()));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }

    pub fn insert_sheet(&mut self, sheet: Sheet) {
        match self.sheet_index(&sheet.name) {
            Some(idx) => self.sheets[idx] = sheet,
            None => self.sheets.push(sheet),
        }
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_uppercase();
        self.sheets.iter().position(|s| s.name.to_uppercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_number_base26() {
        assert_eq!(column_number("A").unwrap(), 1);
        assert_eq!(column_number("Z").unwrap(), 26);
        assert_eq!(column_number("AA").unwrap(), 27);
        assert_eq!(column_number("ak").unwrap(), 37);
        assert_eq!(column_number("AQ").unwrap(), 43);
        assert!(column_number("").is_err());
        assert!(column_number("A1").is_err());
    }

    #[test]
    fn test_column_letters_inverse() {
        for n in [1, 26, 27, 37, 52, 53, 702, 703] {
            assert_eq!(column_number(&column_letters(n)).unwrap(), n);
        }
        assert_eq!(column_letters(0), "");
    }

    #[test]
    fn test_sheet_cells_and_extent() {
        let mut sheet = Sheet::new("MARZEC");
        assert_eq!(sheet.last_row(), 0);

        sheet.set_cell(2, 3, "Jan Kowalski");
        sheet.set_cell(5, 1, "x");
        assert_eq!(sheet.last_row(), 5);
        assert_eq!(sheet.last_column(), 3);
        assert_eq!(sheet.cell_text(2, 3), "Jan Kowalski");
        assert!(sheet.is_blank(9, 9));

        sheet.set_cell(5, 1, "   ");
        assert_eq!(sheet.last_row(), 2);
    }

    #[test]
    fn test_sheet_lookup_case_insensitive() {
        let mut wb = Workbook::new();
        wb.sheet_or_insert("Marzec").set_cell(1, 1, "x");
        assert!(wb.sheet("MARZEC").is_some());
        assert!(wb.require_sheet("LUTY").is_err());

        wb.sheet_or_insert("MARZEC").set_cell(1, 2, "y");
        assert_eq!(wb.sheet_count(), 1);
    }
}
