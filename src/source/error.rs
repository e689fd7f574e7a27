// ==========================================
// 巡逻排班系统 - 表格数据源错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 表格数据源错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls 或 CSV 目录）")]
    UnsupportedFormat(String),

    #[error("文件读写失败: {0}")]
    Io(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("Excel 写入失败: {0}")]
    ExcelWriteError(String),

    #[error("CSV 读写失败: {0}")]
    CsvError(String),

    // ===== 结构错误 =====
    #[error("工作簿不含任何工作表")]
    NoSheets,

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error("无效列名: {0}")]
    InvalidColumn(String),

    // ===== 并发错误 =====
    #[error("数据源锁获取失败: {0}")]
    LockPoisoned(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

impl From<csv::Error> for SourceError {
    fn from(err: csv::Error) -> Self {
        SourceError::CsvError(err.to_string())
    }
}

impl From<calamine::Error> for SourceError {
    fn from(err: calamine::Error) -> Self {
        SourceError::ExcelParseError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SourceError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        SourceError::ExcelWriteError(err.to_string())
    }
}

/// Result 类型别名
pub type SourceResult<T> = Result<T, SourceError>;
