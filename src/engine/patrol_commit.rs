// ==========================================
// 巡逻排班系统 - 巡逻提交
// ==========================================
// 对 [start, end] 每一天、每个岗位分配:
//   定位月度表 → 按姓名定位行 → 检查当日单元格 → 写入值班标记
// 单元格非空即冲突，绝不覆盖
// 全部成功后才持久化；整个写入 + 持久化过程持有专用提交锁
// 模式:
//   Incremental（默认）: 逐格写入，失败前已写入的格子留在内存网格中，
//                        随下一次成功提交一并持久化
//   Staged: 先校验全部格子，全部空闲才写入
// ==========================================

use crate::domain::month::{month_sheet_name, parse_month_name};
use crate::domain::{DomainError, Field, Patrol};
use crate::loader::duty_schedule::{day_column, find_member_row};
use crate::source::{SourceError, SourceHandle, Workbook};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// 提交错误
// ==========================================
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("月度值班表不存在: {0}")]
    MonthSheetMissing(String),

    #[error("船员 {member} 不在 {month} 值班表中")]
    MemberRowMissing { member: String, month: String },

    #[error("冲突: 船员 {member} 在 {} 已有记录 {existing:?}", .date.format("%d.%m.%Y"))]
    Conflict {
        member: String,
        date: NaiveDate,
        existing: String,
    },

    #[error("巡逻数据无效: {0}")]
    Validation(#[from] DomainError),

    /// 增量模式中途失败，已写入的格子留在网格中尚未保存
    #[error("{cause}（已写入 {written} 个单元格，未保存）")]
    Partial {
        written: usize,
        #[source]
        cause: Box<CommitError>,
    },

    #[error("后台任务失败: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl CommitError {
    /// 失败时留在内存网格中的格子数
    pub fn unsaved_cells(&self) -> usize {
        match self {
            CommitError::Partial { written, .. } => *written,
            _ => 0,
        }
    }

    /// 去掉 Partial 包装后的根本原因
    pub fn root(&self) -> &CommitError {
        match self {
            CommitError::Partial { cause, .. } => cause.root(),
            other => other,
        }
    }
}

pub type CommitResult<T> = Result<T, CommitError>;

// ==========================================
// 提交模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    #[default]
    Incremental,
    Staged,
}

/// 提交回执
#[derive(Debug, Clone, Serialize)]
pub struct CommitReceipt {
    pub id: Uuid,
    pub cells_written: usize,
    pub persisted_at: DateTime<Local>,
}

/// 一个待写入的格子
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CellTarget {
    sheet: String,
    row: u32,
    col: u32,
}

// ==========================================
// PatrolCommitter
// ==========================================
pub struct PatrolCommitter {
    source: Arc<SourceHandle>,
    marker: String,
    mode: CommitMode,
    commit_lock: Mutex<()>,
}

impl PatrolCommitter {
    /// # 参数
    /// - `marker`: 写入值班表的标记（默认 "P"）
    pub fn new(source: Arc<SourceHandle>, marker: &str, mode: CommitMode) -> Self {
        Self {
            source,
            marker: marker.trim().to_string(),
            mode,
            commit_lock: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// 将巡逻写入值班表并持久化
    ///
    /// 成功后由调用方负责数据集失效与通知
    #[instrument(skip(self, patrol), fields(
        range = %patrol.range(),
        vessel = %patrol.vessel(),
        mode = ?self.mode
    ))]
    pub async fn commit(&self, patrol: &Patrol) -> CommitResult<CommitReceipt> {
        if patrol.assignments().is_empty() {
            return Err(DomainError::NoCrew.into());
        }
        if self.marker.is_empty() {
            return Err(DomainError::Blank(Field::DutyMarker).into());
        }

        let _guard = self.commit_lock.lock().await;
        tracing::info!("开始提交巡逻: {} {}", patrol.range(), patrol.vessel().label());

        let written = match self.mode {
            CommitMode::Incremental => self.source.write(|wb| -> CommitResult<usize> {
                let mut written = 0;
                match write_incremental(wb, patrol, &self.marker, &mut written) {
                    Ok(()) => Ok(written),
                    Err(cause) if written > 0 => Err(CommitError::Partial {
                        written,
                        cause: Box::new(cause),
                    }),
                    Err(cause) => Err(cause),
                }
            })?,
            CommitMode::Staged => self.source.write(|wb| -> CommitResult<usize> {
                let targets = plan_cells(wb, patrol, &self.marker)?;
                for target in &targets {
                    if let Some(sheet) = wb.sheet_mut(&target.sheet) {
                        sheet.set_cell(target.row, target.col, &self.marker);
                    }
                }
                Ok(targets.len())
            })?,
        };

        let written = match written {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("巡逻提交失败: {}", e);
                return Err(e);
            }
        };

        let source = self.source.clone();
        tokio::task::spawn_blocking(move || source.persist())
            .await
            .map_err(|e| CommitError::TaskFailed(e.to_string()))??;

        let receipt = CommitReceipt {
            id: Uuid::new_v4(),
            cells_written: written,
            persisted_at: Local::now(),
        };
        tracing::info!("巡逻已写入值班表: {} 个单元格 (回执 {})", written, receipt.id);
        Ok(receipt)
    }
}

/// 月份序号 → 工作簿中的实际表名（接受无变音符号写法）
fn month_sheet_for(workbook: &Workbook, month: u32) -> Option<String> {
    workbook
        .sheets()
        .find(|s| parse_month_name(s.name()) == Some(month))
        .map(|s| s.name().to_string())
}

/// 定位 (日期, 船员) 对应的格子并检查是否空闲
fn locate_free_cell(
    workbook: &Workbook,
    date: NaiveDate,
    member: &str,
) -> CommitResult<CellTarget> {
    let month_name = month_sheet_name(date.month()).unwrap_or_default();
    let sheet_name = month_sheet_for(workbook, date.month())
        .ok_or_else(|| CommitError::MonthSheetMissing(month_name.to_string()))?;
    let sheet = workbook
        .sheet(&sheet_name)
        .ok_or_else(|| CommitError::MonthSheetMissing(sheet_name.clone()))?;

    let row = find_member_row(sheet, member).ok_or_else(|| CommitError::MemberRowMissing {
        member: member.to_string(),
        month: month_name.to_string(),
    })?;
    let col = day_column(date.day());

    let existing = sheet.cell_trimmed(row, col);
    if !existing.is_empty() {
        return Err(CommitError::Conflict {
            member: member.to_string(),
            date,
            existing: existing.to_string(),
        });
    }

    Ok(CellTarget {
        sheet: sheet_name,
        row,
        col,
    })
}

/// 逐日逐岗写入；遇错即停，已写入的格子保留并计入 written
fn write_incremental(
    workbook: &mut Workbook,
    patrol: &Patrol,
    marker: &str,
    written: &mut usize,
) -> CommitResult<()> {
    for date in patrol.range().days() {
        for assignment in patrol.assignments() {
            let target = locate_free_cell(workbook, date, assignment.member.name())?;
            if let Some(sheet) = workbook.sheet_mut(&target.sheet) {
                sheet.set_cell(target.row, target.col, marker);
                *written += 1;
                tracing::debug!(
                    "写入 {} {} → {}!{}:{}",
                    assignment.member.name(),
                    date,
                    target.sheet,
                    target.row,
                    target.col
                );
            }
        }
    }
    Ok(())
}

/// 预检全部格子；同一次提交内重复命中同一格同样视为冲突
fn plan_cells(workbook: &Workbook, patrol: &Patrol, marker: &str) -> CommitResult<Vec<CellTarget>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for date in patrol.range().days() {
        for assignment in patrol.assignments() {
            let target = locate_free_cell(workbook, date, assignment.member.name())?;
            if !seen.insert(target.clone()) {
                return Err(CommitError::Conflict {
                    member: assignment.member.name().to_string(),
                    date,
                    existing: marker.to_string(),
                });
            }
            targets.push(target);
        }
    }
    Ok(targets)
}
