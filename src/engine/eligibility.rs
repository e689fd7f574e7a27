// ==========================================
// 巡逻排班系统 - 资格判定引擎
// ==========================================
// 输入: 类别 + 岗位槽位 + 排除集 + 日期区间
// 步骤:
//   1. 类别或岗位未设置 → 空结果
//   2. 取名册快照
//   3. 去掉排除集中的船员（同一巡逻其他槽位已分配）
//   4. 去掉区间内（含两端）有任何值班记录的船员
//   5. 证书分档后，对应类别档内须有与槽位等价的岗位证书
// 结果只写入本次调用自有的缓冲区；取消在成员之间检查
// ==========================================

use crate::domain::{CrewMember, DateRange, Outcome, Tier};
use crate::engine::certificate_classifier::CertificateClassifier;
use crate::engine::role_normalizer::RoleNormalizer;
use crate::loader::{LoadResult, RosterLoader};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// 每处理若干名船员让出一次执行权，使取代请求能及时生效
const YIELD_EVERY: usize = 32;

// ==========================================
// EligibilityQuery
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityQuery {
    pub category: Option<String>,
    pub role_slot: Option<String>,
    /// 同一巡逻中已分配到其他槽位的船员 id
    pub exclusions: HashSet<u32>,
    pub range: DateRange,
}

impl EligibilityQuery {
    pub fn new(category: &str, role_slot: &str, range: DateRange) -> Self {
        Self {
            category: Some(category.to_string()),
            role_slot: Some(role_slot.to_string()),
            exclusions: HashSet::new(),
            range,
        }
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.exclusions.extend(ids);
        self
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn role_slot(&self) -> Option<&str> {
        self.role_slot.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

pub type EligibleCrew = Outcome<Vec<Arc<CrewMember>>>;

// ==========================================
// EligibilityResolver
// ==========================================
pub struct EligibilityResolver {
    roster: Arc<RosterLoader>,
}

impl EligibilityResolver {
    pub fn new(roster: Arc<RosterLoader>) -> Self {
        Self { roster }
    }

    /// 计算候选船员（顺序不保证，由调用方排序）
    ///
    /// # 返回
    /// - `Completed(members)`: 扫描完成
    /// - `Cancelled`: 扫描途中观察到取消
    /// - `Err`: 名册加载失败
    #[instrument(skip(self, query, cancel), fields(
        category = ?query.category,
        role = ?query.role_slot,
        range = %query.range
    ))]
    pub async fn find_eligible(
        &self,
        query: &EligibilityQuery,
        cancel: &CancellationToken,
    ) -> LoadResult<EligibleCrew> {
        let (Some(category), Some(role)) = (query.category(), query.role_slot()) else {
            return Ok(Outcome::Completed(Vec::new()));
        };
        let Some(tier) = Tier::from_category(category) else {
            tracing::warn!("未知类别 {:?}，没有对应的证书档", category);
            return Ok(Outcome::Completed(Vec::new()));
        };

        let roster = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Outcome::Cancelled),
            roster = self.roster.ensure_loaded() => roster?,
        };

        let mut eligible = Vec::new();
        for (idx, member) in roster.members().iter().enumerate() {
            if idx % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
            if cancel.is_cancelled() {
                tracing::debug!("资格扫描已取消（已处理 {} 人）", idx);
                return Ok(Outcome::Cancelled);
            }

            if query.exclusions.contains(&member.id()) {
                continue;
            }
            if member.has_duty_within(&query.range) {
                continue;
            }

            let buckets = CertificateClassifier::classify(roster.certificates_for(member.id()));
            let qualified = buckets
                .for_tier(tier)
                .iter()
                .any(|cert| RoleNormalizer::are_equivalent(cert.role(), role));
            if qualified {
                eligible.push(member.clone());
            }
        }

        tracing::info!("资格判定完成: {} 名候选船员", eligible.len());
        Ok(Outcome::Completed(eligible))
    }
}

// ==========================================
// EligibilityScanner - 新请求取代进行中的扫描
// ==========================================
pub struct EligibilityScanner {
    resolver: Arc<EligibilityResolver>,
    current: Mutex<Option<(u64, CancellationToken)>>,
    generation: AtomicU64,
}

impl EligibilityScanner {
    pub fn new(resolver: Arc<EligibilityResolver>) -> Self {
        Self {
            resolver,
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// 发起扫描；先向上一轮扫描发出取消信号
    pub async fn scan(&self, query: EligibilityQuery) -> LoadResult<EligibleCrew> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let token = CancellationToken::new();

        if let Some((_, previous)) = self.slot().replace((generation, token.clone())) {
            previous.cancel();
        }

        let result = self.resolver.find_eligible(&query, &token).await;

        let mut slot = self.slot();
        if matches!(slot.as_ref(), Some((g, _)) if *g == generation) {
            *slot = None;
        }
        result
    }

    /// 取消进行中的扫描（如有）
    pub fn cancel_current(&self) {
        if let Some((_, token)) = self.slot().take() {
            token.cancel();
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<(u64, CancellationToken)>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::ChangeNotifier;
    use crate::loader::duty_schedule::NAME_COLUMN;
    use crate::loader::{DutyScheduleLoader, LoaderContext, RosterSheets};
    use crate::source::{MemoryStorage, SourceHandle, Workbook};
    use chrono::NaiveDate;

    fn resolver() -> Arc<EligibilityResolver> {
        let mut wb = Workbook::new();
        let zasoby = wb.sheet_or_insert("Zasoby");
        let certs_rows = [("Jan Kowalski", "Mechanik"), ("Adam Nowak", "Oficer mechanik")];
        for (idx, (name, _)) in certs_rows.iter().enumerate() {
            zasoby.set_cell(idx as u32 + 2, 2, name);
        }
        let certs = wb.sheet_or_insert("Swiadectwa");
        for (idx, (_, role)) in certs_rows.iter().enumerate() {
            let row = idx as u32 + 2;
            certs.set_cell(row, 1, &(idx + 1).to_string());
            certs.set_cell(row, 3, role);
            certs.set_cell(row, 4, "KAT III");
        }
        let marzec = wb.sheet_or_insert("MARZEC");
        marzec.set_cell(2, NAME_COLUMN, "Jan Kowalski");
        marzec.set_cell(3, NAME_COLUMN, "Adam Nowak");

        let source = SourceHandle::from_storage(Box::new(MemoryStorage::new(wb))).unwrap();
        let ctx = LoaderContext::new(
            Arc::new(source),
            Arc::new(ChangeNotifier::new()),
            CancellationToken::new(),
        );
        let schedule = Arc::new(DutyScheduleLoader::new(ctx.clone()));
        let roster = Arc::new(RosterLoader::new(ctx, schedule, RosterSheets::default(), 2024));
        Arc::new(EligibilityResolver::new(roster))
    }

    fn march(from: u32, to: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, from).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, to).unwrap(),
        )
        .unwrap()
    }

    fn names(outcome: EligibleCrew) -> Vec<String> {
        let mut names: Vec<String> = outcome
            .completed()
            .unwrap()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_unset_inputs_short_circuit() {
        let resolver = resolver();
        let token = CancellationToken::new();

        let mut query = EligibilityQuery::new("KAT III", "Mechanik", march(10, 15));
        query.category = None;
        assert_eq!(names(resolver.find_eligible(&query, &token).await.unwrap()), Vec::<String>::new());

        let query = EligibilityQuery::new("KAT III", "  ", march(10, 15));
        assert_eq!(names(resolver.find_eligible(&query, &token).await.unwrap()), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_alias_roles_match_slot() {
        let resolver = resolver();
        let query = EligibilityQuery::new("KAT III", "Mechanik", march(10, 15));
        let result = resolver
            .find_eligible(&query, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(names(result), vec!["Adam Nowak", "Jan Kowalski"]);
    }

    #[tokio::test]
    async fn test_cancelled_token_yields_cancelled() {
        let resolver = resolver();
        let token = CancellationToken::new();
        token.cancel();

        let query = EligibilityQuery::new("KAT III", "Mechanik", march(10, 15));
        let result = resolver.find_eligible(&query, &token).await.unwrap();
        assert!(result.is_cancelled());
    }

    #[tokio::test]
    async fn test_new_scan_supersedes_previous() {
        let scanner = EligibilityScanner::new(resolver());
        let query = EligibilityQuery::new("KAT III", "Mechanik", march(10, 15));

        let (first, second) = tokio::join!(scanner.scan(query.clone()), scanner.scan(query));

        assert!(first.unwrap().is_cancelled());
        assert_eq!(names(second.unwrap()), vec!["Adam Nowak", "Jan Kowalski"]);
    }
}
