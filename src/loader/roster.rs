// ==========================================
// 巡逻排班系统 - 船员名册加载器
// ==========================================
// 名册表（默认 "Zasoby"）: B 列姓名，自第 2 行起，id = 行号 - 1
// 证书表（默认 "Swiadectwa"）: A 列船员 id，C 列岗位，D 列类别原文，
//   自第 2 行起读到 A 列第一个空白单元格为止
// 每名船员合并所有可用月份的值班代码与月度结余
// 坏行记录警告后跳过；名册表或证书表缺失则整次加载失败
// ==========================================

use crate::cache::{LoadState, SnapshotCache};
use crate::domain::month::month_day_to_date;
use crate::domain::{Certificate, CrewMember};
use crate::engine::events::DatasetKey;
use crate::loader::duty_schedule::{read_month_in, DutyScheduleLoader, MonthIndex};
use crate::loader::error::{LoadError, LoadResult};
use crate::loader::{DatasetLoader, LoaderContext};
use crate::source::{Sheet, Workbook};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

const FIRST_DATA_ROW: u32 = 2;
const ROSTER_NAME_COLUMN: u32 = 2; // B
const CERT_ID_COLUMN: u32 = 1; // A
const CERT_ROLE_COLUMN: u32 = 3; // C
const CERT_CATEGORY_COLUMN: u32 = 4; // D

/// 名册相关工作表名
#[derive(Debug, Clone)]
pub struct RosterSheets {
    pub roster: String,
    pub certificates: String,
}

impl Default for RosterSheets {
    fn default() -> Self {
        Self {
            roster: "Zasoby".to_string(),
            certificates: "Swiadectwa".to_string(),
        }
    }
}

// ==========================================
// RosterSnapshot
// ==========================================
#[derive(Debug, Default)]
pub struct RosterSnapshot {
    members: Vec<Arc<CrewMember>>,
    certificates: Vec<Certificate>,
}

impl RosterSnapshot {
    /// 按 id 排序
    pub fn members(&self) -> &[Arc<CrewMember>] {
        &self.members
    }

    pub fn member(&self, id: u32) -> Option<&Arc<CrewMember>> {
        self.members
            .binary_search_by_key(&id, |m| m.id())
            .ok()
            .map(|idx| &self.members[idx])
    }

    /// 按姓名查找（忽略大小写与首尾空白）
    pub fn member_by_name(&self, name: &str) -> Option<&Arc<CrewMember>> {
        let wanted = name.trim().to_lowercase();
        self.members
            .iter()
            .find(|m| m.name().to_lowercase() == wanted)
    }

    /// 某船员的证书（按岗位名排序）
    ///
    /// 证书按 (船员 id, 岗位) 排序存放，二分定位该船员的连续区段
    pub fn certificates_for(&self, member_id: u32) -> &[Certificate] {
        let start = self
            .certificates
            .partition_point(|c| c.member_id() < member_id);
        let len = self.certificates[start..].partition_point(|c| c.member_id() == member_id);
        &self.certificates[start..start + len]
    }

    /// 全部证书（按船员 id、岗位排序）
    pub fn all_certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ==========================================
// RosterLoader
// ==========================================
pub struct RosterLoader {
    ctx: LoaderContext,
    schedule: Arc<DutyScheduleLoader>,
    sheets: RosterSheets,
    year: i32,
    cache: SnapshotCache<RosterSnapshot>,
}

impl RosterLoader {
    /// # 参数
    /// - `schedule`: 值班表加载器（名册依赖其月份索引）
    /// - `year`: 由月份名 + 日号重建日期时使用的年份
    pub fn new(
        ctx: LoaderContext,
        schedule: Arc<DutyScheduleLoader>,
        sheets: RosterSheets,
        year: i32,
    ) -> Self {
        let notifier = ctx.notifier.clone();
        let cache = SnapshotCache::new("roster")
            .on_published(move |_| notifier.publish(DatasetKey::Roster));
        Self {
            ctx,
            schedule,
            sheets,
            year,
            cache,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub async fn ensure_loaded(&self) -> LoadResult<Arc<RosterSnapshot>> {
        self.cache.ensure_loaded(|| self.build()).await
    }

    pub async fn load(&self) -> LoadResult<Arc<RosterSnapshot>> {
        self.cache.load(|| self.build()).await
    }

    pub async fn refresh(&self) -> LoadResult<Arc<RosterSnapshot>> {
        self.cache.refresh(|| self.build()).await
    }

    pub fn snapshot(&self) -> Option<Arc<RosterSnapshot>> {
        self.cache.snapshot()
    }

    #[instrument(skip(self))]
    async fn build(&self) -> LoadResult<RosterSnapshot> {
        self.ctx.check_cancelled()?;
        let months = self.schedule.ensure_loaded().await?;

        let snapshot = self
            .ctx
            .source
            .read(|wb| self.build_from(wb, &months))??;

        tracing::info!(
            "已加载 {} 名船员、{} 条证书",
            snapshot.members.len(),
            snapshot.certificates.len()
        );
        Ok(snapshot)
    }

    fn build_from(&self, workbook: &Workbook, months: &MonthIndex) -> LoadResult<RosterSnapshot> {
        let roster = workbook
            .sheet(&self.sheets.roster)
            .ok_or_else(|| LoadError::SheetNotFound(self.sheets.roster.clone()))?;
        let cert_sheet = workbook
            .sheet(&self.sheets.certificates)
            .ok_or_else(|| LoadError::SheetNotFound(self.sheets.certificates.clone()))?;

        let mut members = Vec::new();
        for row in FIRST_DATA_ROW..=roster.last_row() {
            self.ctx.check_cancelled()?;
            if let Some(member) = self.read_member(workbook, roster, row, months) {
                members.push(Arc::new(member));
            }
        }
        members.sort_by_key(|m| m.id());

        let mut certificates = self.read_certificates(cert_sheet)?;
        certificates.sort_by(|a, b| (a.member_id(), a.role()).cmp(&(b.member_id(), b.role())));

        Ok(RosterSnapshot {
            members,
            certificates,
        })
    }

    fn read_member(
        &self,
        workbook: &Workbook,
        roster: &Sheet,
        row: u32,
        months: &MonthIndex,
    ) -> Option<CrewMember> {
        let name = roster.cell_trimmed(row, ROSTER_NAME_COLUMN);
        if name.is_empty() {
            return None;
        }

        let mut member = match CrewMember::new(row - 1, name) {
            Ok(member) => member,
            Err(e) => {
                tracing::warn!("名册第 {} 行无效，已跳过: {}", row, e);
                return None;
            }
        };

        for month in months.months() {
            let schedule = match read_month_in(workbook, month, name) {
                Ok(schedule) => schedule,
                Err(e) => {
                    tracing::debug!("{} 无 {} 值班数据: {}", name, month.name, e);
                    continue;
                }
            };

            if let Err(e) = member.add_monthly_balance(schedule.month, schedule.balance) {
                tracing::warn!("{} 月度结余无效: {}", name, e);
            }
            for (day, code) in &schedule.duties {
                match month_day_to_date(month.name, *day, self.year) {
                    Some(date) => {
                        if let Err(e) = member.add_duty(date, code) {
                            tracing::warn!("{} 值班记录无效: {}", name, e);
                        }
                    }
                    None => tracing::warn!(
                        "{} 的值班记录日期无效: {} {} 日",
                        name,
                        month.name,
                        day
                    ),
                }
            }
        }

        tracing::debug!("加载船员 {} (id={})", member.name(), member.id());
        Some(member)
    }

    fn read_certificates(&self, sheet: &Sheet) -> LoadResult<Vec<Certificate>> {
        let mut certificates = Vec::new();
        let mut row = FIRST_DATA_ROW;

        while !sheet.is_blank(row, CERT_ID_COLUMN) {
            self.ctx.check_cancelled()?;
            if let Some(cert) = parse_certificate_row(sheet, row) {
                certificates.push(cert);
            }
            row += 1;
        }
        Ok(certificates)
    }
}

fn parse_certificate_row(sheet: &Sheet, row: u32) -> Option<Certificate> {
    let id_text = sheet.cell_trimmed(row, CERT_ID_COLUMN);
    let role = sheet.cell_trimmed(row, CERT_ROLE_COLUMN);
    let category = sheet.cell_trimmed(row, CERT_CATEGORY_COLUMN);

    if role.is_empty() || category.is_empty() {
        tracing::warn!("证书表第 {} 行数据不完整，已跳过", row);
        return None;
    }

    let Ok(member_id) = id_text.parse::<u32>() else {
        tracing::warn!("证书表第 {} 行船员 id 无效: {:?}", row, id_text);
        return None;
    };

    match Certificate::new(member_id, role, category) {
        Ok(cert) => Some(cert),
        Err(e) => {
            tracing::warn!("证书表第 {} 行无效: {}", row, e);
            None
        }
    }
}

#[async_trait]
impl DatasetLoader for RosterLoader {
    fn key(&self) -> DatasetKey {
        DatasetKey::Roster
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
