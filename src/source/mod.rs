// ==========================================
// 巡逻排班系统 - 表格数据源
// ==========================================
// 职责: 打开数据源 → 可寻址的命名工作表网格
//       单元格文本读写 → 持久化
// ==========================================

pub mod error;
pub mod handle;
pub mod storage;
pub mod workbook;

pub use error::{SourceError, SourceResult};
pub use handle::SourceHandle;
pub use storage::{CsvDirectoryStorage, MemoryStorage, WorkbookStorage, XlsxStorage};
pub use workbook::{column_letters, column_number, Sheet, Workbook};
