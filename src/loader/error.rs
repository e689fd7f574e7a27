// ==========================================
// 巡逻排班系统 - 数据集加载错误类型
// ==========================================
// 结构性错误中止整次加载；单行/单元格问题只记录警告并跳过
// ==========================================

use crate::domain::DomainError;
use crate::source::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    // ===== 结构错误（整次加载失败）=====
    #[error("工作簿不含任何月度值班表")]
    NoMonthSheets,

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    // ===== 查询未命中 =====
    #[error("月份不可用: {0}")]
    MonthNotAvailable(String),

    #[error("船员不存在: {member}（{month}）")]
    MemberNotFound { member: String, month: String },

    #[error(transparent)]
    Validation(#[from] DomainError),

    // ===== 取消（应用关闭）=====
    #[error("加载已取消")]
    Cancelled,

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl LoadError {
    /// 是否为"未找到"类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoadError::SheetNotFound(_)
                | LoadError::MonthNotAvailable(_)
                | LoadError::MemberNotFound { .. }
                | LoadError::Source(SourceError::SheetNotFound(_))
                | LoadError::Source(SourceError::FileNotFound(_))
        )
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
