// ==========================================
// 巡逻排班系统 - 巡逻排班 API
// ==========================================
// 职责: 名册/船艇/岗位/月份查询、资格判定、巡逻草稿、提交
// 提交成功后: 发布 DutySchedule 变更 → 名册缓存失效 → 刷新名册
// 增量提交中途失败且网格已有改动时同样发布，候选结果与网格保持一致
// ==========================================

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult, Missing};
use crate::domain::{
    Certificate, CertificateBuckets, CrewMember, CrewRole, DateRange, DomainError, Field,
    MonthlyBalance, Outcome, Patrol, PatrolDraft, PatrolPreview, Vessel,
};
use crate::engine::{
    CertificateClassifier, ChangeNotifier, CommitReceipt, DatasetKey, EligibilityQuery,
    EligibilityScanner, EligibleCrew, PatrolCommitter,
};
use crate::loader::{
    CrewRoleLoader, DutyScheduleLoader, MonthlySchedule, RosterLoader, VesselLoader,
};
use crate::source::SourceHandle;

/// 巡逻排班API
///
/// 职责：
/// 1. 数据集查询（名册、证书、船艇、岗位需求、月份）
/// 2. 候选船员计算（新请求取代进行中的计算）
/// 3. 巡逻草稿组装与提交
/// 4. 数据源重新读取
pub struct PatrolApi {
    source: Arc<SourceHandle>,
    notifier: Arc<ChangeNotifier>,
    schedule: Arc<DutyScheduleLoader>,
    roster: Arc<RosterLoader>,
    vessels: Arc<VesselLoader>,
    roles: Arc<CrewRoleLoader>,
    scanner: Arc<EligibilityScanner>,
    committer: Arc<PatrolCommitter>,
}

impl PatrolApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<SourceHandle>,
        notifier: Arc<ChangeNotifier>,
        schedule: Arc<DutyScheduleLoader>,
        roster: Arc<RosterLoader>,
        vessels: Arc<VesselLoader>,
        roles: Arc<CrewRoleLoader>,
        scanner: Arc<EligibilityScanner>,
        committer: Arc<PatrolCommitter>,
    ) -> Self {
        Self {
            source,
            notifier,
            schedule,
            roster,
            vessels,
            roles,
            scanner,
            committer,
        }
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    // ==========================================
    // 名册与证书
    // ==========================================

    /// 全部船员（按 id 排序）
    pub async fn list_crew(&self) -> ApiResult<Vec<Arc<CrewMember>>> {
        Ok(self.roster.ensure_loaded().await?.members().to_vec())
    }

    pub async fn get_member(&self, member_id: u32) -> ApiResult<Arc<CrewMember>> {
        self.roster
            .ensure_loaded()
            .await?
            .member(member_id)
            .cloned()
            .ok_or(ApiError::NotFound(Missing::MemberId(member_id)))
    }

    pub async fn find_member(&self, name: &str) -> ApiResult<Arc<CrewMember>> {
        if name.trim().is_empty() {
            return Err(DomainError::Blank(Field::MemberName).into());
        }
        self.roster
            .ensure_loaded()
            .await?
            .member_by_name(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(Missing::Member(name.trim().to_string())))
    }

    /// 某船员的证书（按岗位排序）
    pub async fn list_certificates(&self, member_id: u32) -> ApiResult<Vec<Certificate>> {
        let roster = self.roster.ensure_loaded().await?;
        if roster.member(member_id).is_none() {
            return Err(ApiError::NotFound(Missing::MemberId(member_id)));
        }
        Ok(roster.certificates_for(member_id).to_vec())
    }

    pub async fn certificate_buckets(&self, member_id: u32) -> ApiResult<CertificateBuckets> {
        let certificates = self.list_certificates(member_id).await?;
        Ok(CertificateClassifier::classify(&certificates))
    }

    /// 某船员某月的工时汇总
    pub async fn monthly_balance(&self, member_id: u32, month: &str) -> ApiResult<MonthlyBalance> {
        let member = self.get_member(member_id).await?;
        let month = crate::domain::month::month_key(month);
        member
            .balance_for(&month)
            .copied()
            .ok_or_else(|| {
                ApiError::NotFound(Missing::Balance {
                    member: member.name().to_string(),
                    month: month.clone(),
                })
            })
    }

    // ==========================================
    // 值班表
    // ==========================================

    pub async fn available_months(&self) -> ApiResult<Vec<String>> {
        Ok(self.schedule.available_months().await?)
    }

    pub async fn month_schedule(&self, month: &str, name: &str) -> ApiResult<MonthlySchedule> {
        Ok(self.schedule.read_month(month, name).await?)
    }

    // ==========================================
    // 船艇与岗位需求
    // ==========================================

    pub async fn list_categories(&self) -> ApiResult<Vec<String>> {
        Ok(self.roles.ensure_loaded().await?.categories())
    }

    pub async fn list_vessels(&self, category: &str) -> ApiResult<Vec<Vessel>> {
        let category = required(category, Field::Category)?;
        Ok(self.vessels.ensure_loaded().await?.by_category(category))
    }

    pub async fn list_roles(&self, category: &str) -> ApiResult<Vec<CrewRole>> {
        let category = required(category, Field::Category)?;
        Ok(self.roles.ensure_loaded().await?.by_category(category))
    }

    // ==========================================
    // 资格判定
    // ==========================================

    /// 候选船员（按姓名排序）；被新请求取代时返回 `Outcome::Cancelled`
    pub async fn find_eligible(
        &self,
        category: &str,
        role: &str,
        range: DateRange,
        exclusions: &HashSet<u32>,
    ) -> ApiResult<EligibleCrew> {
        let query = EligibilityQuery::new(category, role, range).excluding(exclusions.iter().copied());
        let outcome = self.scanner.scan(query).await?;
        Ok(outcome.map(|mut members| {
            members.sort_by(|a, b| a.name().cmp(b.name()));
            members
        }))
    }

    /// 为草稿中的某个岗位槽位计算候选（排除已分配船员）
    pub async fn eligible_for_slot(&self, draft: &PatrolDraft, role: &str) -> ApiResult<EligibleCrew> {
        let category = draft
            .category()
            .ok_or(ApiError::from(DomainError::NoCategory))?;
        self.find_eligible(category, role, draft.range(), &draft.exclusions())
            .await
    }

    pub fn cancel_eligibility(&self) {
        self.scanner.cancel_current();
    }

    // ==========================================
    // 巡逻草稿与提交
    // ==========================================

    /// 新建草稿: 选定日期、类别与船艇，按类别生成岗位槽位
    pub async fn new_draft(
        &self,
        range: DateRange,
        category: &str,
        hull_number: &str,
    ) -> ApiResult<PatrolDraft> {
        let category = required(category, Field::Category)?;
        let hull_number = required(hull_number, Field::HullNumber)?;

        let (roles, vessels) =
            futures::try_join!(self.roles.ensure_loaded(), self.vessels.ensure_loaded())?;
        let vessel = vessels
            .find(category, hull_number)
            .cloned()
            .ok_or_else(|| {
                ApiError::NotFound(Missing::Vessel {
                    category: category.to_string(),
                    hull: hull_number.to_string(),
                })
            })?;

        let mut draft = PatrolDraft::new(range);
        draft.select_category(category, roles.all());
        if draft.slots().is_empty() {
            return Err(ApiError::NotFound(Missing::CategoryRoles(category.to_string())));
        }
        draft.select_vessel(vessel)?;
        Ok(draft)
    }

    /// 按姓名为草稿槽位分配船员
    pub async fn assign_by_name(
        &self,
        draft: &mut PatrolDraft,
        role: &str,
        name: &str,
    ) -> ApiResult<()> {
        let member = self.find_member(name).await?;
        draft.assign(role, member)?;
        Ok(())
    }

    pub fn preview(&self, draft: &PatrolDraft) -> ApiResult<PatrolPreview> {
        Ok(draft.preview()?)
    }

    pub async fn commit_draft(&self, draft: &PatrolDraft) -> ApiResult<CommitReceipt> {
        if !draft.can_commit() {
            return Err(DomainError::IncompleteDraft.into());
        }
        let patrol = draft.to_patrol()?;
        self.commit_patrol(&patrol).await
    }

    /// 提交巡逻；网格有改动时通知并刷新名册
    pub async fn commit_patrol(&self, patrol: &Patrol) -> ApiResult<CommitReceipt> {
        match self.committer.commit(patrol).await {
            Ok(receipt) => {
                self.refresh_after_write().await;
                Ok(receipt)
            }
            Err(err) => {
                let unsaved = err.unsaved_cells();
                if unsaved > 0 {
                    // 已写入的格子留在网格中，随下一次成功提交保存
                    tracing::warn!("提交中途失败，{} 个单元格留在未保存的网格中", unsaved);
                    self.refresh_after_write().await;
                }
                Err(err.into())
            }
        }
    }

    async fn refresh_after_write(&self) {
        self.notifier.publish(DatasetKey::DutySchedule);
        if let Err(e) = self.roster.refresh().await {
            // 刷新失败只影响视图
            tracing::warn!("写入后刷新名册失败: {}", e);
        }
    }

    // ==========================================
    // 数据源
    // ==========================================

    /// 重新读取数据源文件并刷新全部数据集
    pub async fn reload_source(&self) -> ApiResult<()> {
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || source.reload())
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;
        tracing::info!("数据源已重新读取: {}", self.source.location());
        self.notifier.publish(DatasetKey::SourceOpened);
        self.refresh_all().await
    }

    /// 刷新全部数据集（值班表先行，名册依赖其月份索引）
    pub async fn refresh_all(&self) -> ApiResult<()> {
        self.schedule.refresh().await?;
        futures::try_join!(
            self.roster.refresh(),
            self.vessels.refresh(),
            self.roles.refresh()
        )?;
        Ok(())
    }
}

fn required(value: &str, field: Field) -> ApiResult<&str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Blank(field).into());
    }
    Ok(value)
}

/// 候选结果中的船员姓名（已取消时为 None）
pub fn candidate_names(outcome: &EligibleCrew) -> Option<Vec<String>> {
    match outcome {
        Outcome::Completed(members) => {
            Some(members.iter().map(|m| m.name().to_string()).collect())
        }
        Outcome::Cancelled => None,
    }
}
