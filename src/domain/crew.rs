// ==========================================
// 巡逻排班系统 - 船员领域模型
// ==========================================
// 身份: 正整数 id（每次加载内稳定），相等性仅按 id
// 可变部分（值班/月度结余）只在加载器构建期间写入，
// 发布进快照（Arc）后不再修改
// ==========================================

use crate::domain::month::month_key;
use crate::domain::types::{DateRange, DomainError, DomainResult, Field};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

// ==========================================
// MonthlyBalance - 月度工时结余
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub start_hours: f64, // 期初工时
    pub end_hours: f64,   // 期末工时
    pub duty: f64,        // 勤务
    pub standby: f64,     // 待命
    pub leave: f64,       // 休假
    pub detached: f64,    // 借调
    pub sick: f64,        // 病假
}

// ==========================================
// CrewMember - 船员
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct CrewMember {
    id: u32,
    name: String,
    duties: BTreeMap<NaiveDate, String>,
    balances: BTreeMap<String, MonthlyBalance>,
}

impl CrewMember {
    pub fn new(id: u32, name: &str) -> DomainResult<Self> {
        if id == 0 {
            return Err(DomainError::ZeroMemberId);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Blank(Field::MemberName));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            duties: BTreeMap::new(),
            balances: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 记录某日值班代码（空代码拒绝）
    pub fn add_duty(&mut self, date: NaiveDate, code: &str) -> DomainResult<()> {
        let code = code.trim();
        if code.is_empty() {
            tracing::debug!("值班代码为空: member={}, date={}", self.name, date);
            return Err(DomainError::Blank(Field::DutyCode));
        }
        self.duties.insert(date, code.to_string());
        Ok(())
    }

    /// 记录月度结余（月份键大写）
    pub fn add_monthly_balance(&mut self, month: &str, balance: MonthlyBalance) -> DomainResult<()> {
        let key = month_key(month);
        if key.is_empty() {
            return Err(DomainError::Blank(Field::Month));
        }
        self.balances.insert(key, balance);
        Ok(())
    }

    pub fn duties(&self) -> &BTreeMap<NaiveDate, String> {
        &self.duties
    }

    pub fn duty_on(&self, date: NaiveDate) -> Option<&str> {
        self.duties.get(&date).map(String::as_str)
    }

    pub fn balances(&self) -> &BTreeMap<String, MonthlyBalance> {
        &self.balances
    }

    pub fn balance_for(&self, month: &str) -> Option<&MonthlyBalance> {
        self.balances.get(&month_key(month))
    }

    /// 区间内（含两端）是否有任何值班记录
    pub fn has_duty_within(&self, range: &DateRange) -> bool {
        self.duties.range(range.start()..=range.end()).next().is_some()
    }
}

impl PartialEq for CrewMember {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CrewMember {}

impl Hash for CrewMember {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_new_validates_identity() {
        assert!(CrewMember::new(0, "Jan Kowalski").is_err());
        assert!(CrewMember::new(1, "   ").is_err());

        let member = CrewMember::new(1, "  Jan Kowalski ").unwrap();
        assert_eq!(member.name(), "Jan Kowalski");
    }

    #[test]
    fn test_equality_by_id_only() {
        let a = CrewMember::new(7, "Jan Kowalski").unwrap();
        let b = CrewMember::new(7, "Inne Nazwisko").unwrap();
        let c = CrewMember::new(8, "Jan Kowalski").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_has_duty_within_is_boundary_inclusive() {
        let mut member = CrewMember::new(1, "Jan Kowalski").unwrap();
        member.add_duty(d(10), "S").unwrap();

        let starts_on = DateRange::new(d(10), d(15)).unwrap();
        let ends_on = DateRange::new(d(5), d(10)).unwrap();
        let outside = DateRange::new(d(11), d(15)).unwrap();

        assert!(member.has_duty_within(&starts_on));
        assert!(member.has_duty_within(&ends_on));
        assert!(!member.has_duty_within(&outside));
    }

    #[test]
    fn test_balance_lookup_case_insensitive() {
        let mut member = CrewMember::new(1, "Jan Kowalski").unwrap();
        let balance = MonthlyBalance {
            start_hours: 10.0,
            end_hours: 12.5,
            duty: 160.0,
            ..Default::default()
        };
        member.add_monthly_balance("marzec", balance).unwrap();

        assert_eq!(member.balance_for("MARZEC"), Some(&balance));
        assert!(member.balance_for("LUTY").is_none());
        assert!(member.add_duty(d(1), " ").is_err());
    }
}
