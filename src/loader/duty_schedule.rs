// ==========================================
// 巡逻排班系统 - 月度值班表加载器
// ==========================================
// 每月一个工作表，以大写波兰语月份名命名
// 列布局为固定常量（不在运行时探测）:
//   C 姓名 | D 期初工时 | E..AI 第 1..31 日 | AK 期末工时
//   AM 勤务 | AN 待命 | AO 休假 | AP 借调 | AQ 病假
// 数据集快照只保存可用月份索引；按 (月份, 姓名) 查询时线性扫描姓名列
// ==========================================

use crate::cache::{LoadState, SnapshotCache};
use crate::domain::month::{month_sheet_name, parse_month_name};
use crate::domain::{DomainError, Field, MonthlyBalance};
use crate::engine::events::DatasetKey;
use crate::loader::error::{LoadError, LoadResult};
use crate::loader::{DatasetLoader, LoaderContext};
use crate::source::{Sheet, Workbook};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

// ===== 固定布局 =====
pub const FIRST_DATA_ROW: u32 = 2;
pub const NAME_COLUMN: u32 = 3; // C
pub const START_HOURS_COLUMN: u32 = 4; // D
pub const FIRST_DAY_COLUMN: u32 = 5; // E = 第 1 日
pub const DAYS_IN_BLOCK: u32 = 31; // E..AI
pub const END_HOURS_COLUMN: u32 = 37; // AK
pub const DUTY_TOTAL_COLUMN: u32 = 39; // AM
pub const STANDBY_TOTAL_COLUMN: u32 = 40; // AN
pub const LEAVE_TOTAL_COLUMN: u32 = 41; // AO
pub const DETACHED_TOTAL_COLUMN: u32 = 42; // AP
pub const SICK_TOTAL_COLUMN: u32 = 43; // AQ

/// 日号 (1-31) → 列号
pub fn day_column(day: u32) -> u32 {
    FIRST_DAY_COLUMN + day - 1
}

/// 按姓名列查找船员所在行（忽略大小写与首尾空白）
pub(crate) fn find_member_row(sheet: &Sheet, name: &str) -> Option<u32> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    (FIRST_DATA_ROW..=sheet.last_row())
        .find(|&row| sheet.cell_trimmed(row, NAME_COLUMN).to_lowercase() == wanted)
}

// ==========================================
// 月份索引（数据集快照）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSheet {
    /// 月份序号 1-12
    pub number: u32,
    /// 规范月份名（带变音符号）
    pub name: &'static str,
    /// 工作簿中实际的工作表名
    pub sheet_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct MonthIndex {
    months: Vec<MonthSheet>,
}

impl MonthIndex {
    /// 按月份序号排序
    pub fn months(&self) -> &[MonthSheet] {
        &self.months
    }

    pub fn names(&self) -> Vec<String> {
        self.months.iter().map(|m| m.name.to_string()).collect()
    }

    /// 按月份名查找（大小写、变音符号不敏感）
    pub fn find(&self, month: &str) -> Option<&MonthSheet> {
        let number = parse_month_name(month)?;
        self.months.iter().find(|m| m.number == number)
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// 扫描工作簿中的月度工作表
fn scan_months(workbook: &Workbook) -> LoadResult<MonthIndex> {
    let mut months: Vec<MonthSheet> = Vec::new();

    for sheet in workbook.sheets() {
        let Some(number) = parse_month_name(sheet.name()) else {
            continue;
        };
        let Some(name) = month_sheet_name(number) else {
            continue;
        };
        if months.iter().any(|m| m.number == number) {
            tracing::warn!("月份 {} 存在重复工作表，忽略 {}", name, sheet.name());
            continue;
        }
        tracing::debug!("找到月度工作表 {}", sheet.name());
        months.push(MonthSheet {
            number,
            name,
            sheet_name: sheet.name().to_string(),
        });
    }

    if months.is_empty() {
        return Err(LoadError::NoMonthSheets);
    }

    months.sort_by_key(|m| m.number);
    Ok(MonthIndex { months })
}

// ==========================================
// MonthlySchedule - 单个船员单月的值班数据
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySchedule {
    pub month: &'static str,
    pub balance: MonthlyBalance,
    /// 日号 → 值班代码（稀疏）
    pub duties: BTreeMap<u32, String>,
}

/// 在已锁定的工作簿中读取 (月份, 姓名) 对应的值班数据
pub(crate) fn read_month_in(
    workbook: &Workbook,
    month: &MonthSheet,
    name: &str,
) -> LoadResult<MonthlySchedule> {
    let sheet = workbook
        .sheet(&month.sheet_name)
        .ok_or_else(|| LoadError::SheetNotFound(month.sheet_name.clone()))?;

    let row = find_member_row(sheet, name).ok_or_else(|| LoadError::MemberNotFound {
        member: name.trim().to_string(),
        month: month.name.to_string(),
    })?;

    Ok(read_schedule_row(sheet, row, month.name))
}

fn read_schedule_row(sheet: &Sheet, row: u32, month: &'static str) -> MonthlySchedule {
    let balance = MonthlyBalance {
        start_hours: read_number(sheet, row, START_HOURS_COLUMN),
        end_hours: read_number(sheet, row, END_HOURS_COLUMN),
        duty: read_number(sheet, row, DUTY_TOTAL_COLUMN),
        standby: read_number(sheet, row, STANDBY_TOTAL_COLUMN),
        leave: read_number(sheet, row, LEAVE_TOTAL_COLUMN),
        detached: read_number(sheet, row, DETACHED_TOTAL_COLUMN),
        sick: read_number(sheet, row, SICK_TOTAL_COLUMN),
    };

    let duties = (1..=DAYS_IN_BLOCK)
        .filter_map(|day| {
            let code = sheet.cell_trimmed(row, day_column(day));
            (!code.is_empty()).then(|| (day, code.to_string()))
        })
        .collect();

    MonthlySchedule {
        month,
        balance,
        duties,
    }
}

/// 数值单元格: 空白为 0；无法解析记录警告后按 0 处理
fn read_number(sheet: &Sheet, row: u32, col: u32) -> f64 {
    let text = sheet.cell_trimmed(row, col);
    if text.is_empty() {
        return 0.0;
    }
    match text.replace(',', ".").parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            tracing::warn!(
                "工作表 {} 第 {} 行第 {} 列数值无法解析: {:?}",
                sheet.name(),
                row,
                col,
                text
            );
            0.0
        }
    }
}

// ==========================================
// DutyScheduleLoader
// ==========================================
pub struct DutyScheduleLoader {
    ctx: LoaderContext,
    cache: SnapshotCache<MonthIndex>,
}

impl DutyScheduleLoader {
    pub fn new(ctx: LoaderContext) -> Self {
        let notifier = ctx.notifier.clone();
        let cache = SnapshotCache::new("duty_schedule")
            .on_published(move |_| notifier.publish(DatasetKey::DutySchedule));
        Self { ctx, cache }
    }

    pub async fn ensure_loaded(&self) -> LoadResult<Arc<MonthIndex>> {
        self.cache.ensure_loaded(|| self.build()).await
    }

    pub async fn load(&self) -> LoadResult<Arc<MonthIndex>> {
        self.cache.load(|| self.build()).await
    }

    pub async fn refresh(&self) -> LoadResult<Arc<MonthIndex>> {
        self.cache.refresh(|| self.build()).await
    }

    pub fn snapshot(&self) -> Option<Arc<MonthIndex>> {
        self.cache.snapshot()
    }

    /// 可用月份（规范名，按月份序号排序）
    pub async fn available_months(&self) -> LoadResult<Vec<String>> {
        Ok(self.ensure_loaded().await?.names())
    }

    /// 读取某船员某月的值班数据
    ///
    /// # 返回
    /// - `MonthNotAvailable`: 月份工作表不存在
    /// - `MemberNotFound`: 该月工作表中没有此姓名
    #[instrument(skip(self))]
    pub async fn read_month(&self, month: &str, name: &str) -> LoadResult<MonthlySchedule> {
        if month.trim().is_empty() {
            return Err(LoadError::Validation(DomainError::Blank(Field::Month)));
        }
        if name.trim().is_empty() {
            return Err(LoadError::Validation(DomainError::Blank(Field::MemberName)));
        }

        let index = self.ensure_loaded().await?;
        let sheet = index
            .find(month)
            .ok_or_else(|| LoadError::MonthNotAvailable(month.trim().to_string()))?;

        self.ctx.source.read(|wb| read_month_in(wb, sheet, name))?
    }

    #[instrument(skip(self))]
    async fn build(&self) -> LoadResult<MonthIndex> {
        self.ctx.check_cancelled()?;
        let index = self.ctx.source.read(scan_months)??;
        tracing::info!("已加载 {} 个月度值班表", index.len());
        Ok(index)
    }
}

#[async_trait]
impl DatasetLoader for DutyScheduleLoader {
    fn key(&self) -> DatasetKey {
        DatasetKey::DutySchedule
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
