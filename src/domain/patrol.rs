// ==========================================
// 巡逻排班系统 - 巡逻领域模型
// ==========================================
// Patrol: 临时对象，校验 → 确认 → 提交/丢弃
// 本身不持久化，只有对值班表的写入被持久化
// ==========================================

use crate::domain::crew::CrewMember;
use crate::domain::types::{DateRange, DomainError, DomainResult, Field};
use crate::domain::vessel::Vessel;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

// ==========================================
// PatrolAssignment - 岗位 → 船员
// ==========================================
#[derive(Debug, Clone)]
pub struct PatrolAssignment {
    pub role: String,
    pub member: Arc<CrewMember>,
}

// ==========================================
// Patrol - 巡逻
// ==========================================
// 不变量:
// - start <= end（每次修改均校验）
// - 每个岗位至多出现一次
// - 同一船员跨岗位重复仅在 allow_repeated_members 时允许
#[derive(Debug, Clone)]
pub struct Patrol {
    range: DateRange,
    category: String,
    vessel: Vessel,
    assignments: Vec<PatrolAssignment>,
    allow_repeated_members: bool,
}

impl Patrol {
    pub fn new(range: DateRange, category: &str, vessel: Vessel) -> DomainResult<Self> {
        let category = category.trim();
        if category.is_empty() {
            return Err(DomainError::Blank(Field::Category));
        }
        Ok(Self {
            range,
            category: category.to_string(),
            vessel,
            assignments: Vec::new(),
            allow_repeated_members: false,
        })
    }

    /// 允许同一船员占用多个岗位
    pub fn allowing_repeated_members(mut self) -> Self {
        self.allow_repeated_members = true;
        self
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn start(&self) -> NaiveDate {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end()
    }

    pub fn set_start(&mut self, start: NaiveDate) -> DomainResult<()> {
        self.range = self.range.with_start(start)?;
        Ok(())
    }

    pub fn set_end(&mut self, end: NaiveDate) -> DomainResult<()> {
        self.range = self.range.with_end(end)?;
        Ok(())
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn vessel(&self) -> &Vessel {
        &self.vessel
    }

    pub fn assignments(&self) -> &[PatrolAssignment] {
        &self.assignments
    }

    /// 分配岗位
    pub fn assign(&mut self, role: &str, member: Arc<CrewMember>) -> DomainResult<()> {
        let role = role.trim();
        if role.is_empty() {
            return Err(DomainError::Blank(Field::Role));
        }
        if self.position_of(role).is_some() {
            return Err(DomainError::DuplicateRole(role.to_string()));
        }
        if !self.allow_repeated_members
            && self.assignments.iter().any(|a| a.member.id() == member.id())
        {
            return Err(DomainError::DuplicateMember(member.name().to_string()));
        }

        self.assignments.push(PatrolAssignment {
            role: role.to_string(),
            member,
        });
        Ok(())
    }

    /// 移除岗位分配，返回被移除的船员
    pub fn unassign(&mut self, role: &str) -> Option<Arc<CrewMember>> {
        let idx = self.position_of(role.trim())?;
        Some(self.assignments.remove(idx).member)
    }

    pub fn clear_crew(&mut self) {
        self.assignments.clear();
    }

    fn position_of(&self, role: &str) -> Option<usize> {
        let wanted = role.to_lowercase();
        self.assignments
            .iter()
            .position(|a| a.role.to_lowercase() == wanted)
    }
}

// ==========================================
// PatrolPreview - 提交前确认视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatrolPreview {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category: String,
    pub vessel: String,
    pub crew: Vec<PreviewRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub role: String,
    pub member: String,
}

impl PatrolPreview {
    pub fn of(patrol: &Patrol) -> Self {
        Self {
            start: patrol.start(),
            end: patrol.end(),
            category: patrol.category().to_string(),
            vessel: patrol.vessel().label(),
            crew: patrol
                .assignments()
                .iter()
                .map(|a| PreviewRow {
                    role: a.role.clone(),
                    member: a.member.name().to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn patrol() -> Patrol {
        let range = DateRange::new(d(10), d(15)).unwrap();
        Patrol::new(range, "KAT III", Vessel::new("KAT III", "SG-311").unwrap()).unwrap()
    }

    fn member(id: u32, name: &str) -> Arc<CrewMember> {
        Arc::new(CrewMember::new(id, name).unwrap())
    }

    #[test]
    fn test_setters_enforce_date_order() {
        let mut p = patrol();
        assert!(p.set_start(d(16)).is_err());
        assert_eq!(p.start(), d(10));
        assert!(p.set_end(d(9)).is_err());
        assert!(p.set_end(d(20)).is_ok());
        assert_eq!(p.end(), d(20));
    }

    #[test]
    fn test_role_appears_at_most_once() {
        let mut p = patrol();
        p.assign("Mechanik", member(1, "Jan Kowalski")).unwrap();
        let err = p.assign("mechanik", member(2, "Adam Nowak")).unwrap_err();
        assert_eq!(err, DomainError::DuplicateRole("mechanik".to_string()));
    }

    #[test]
    fn test_repeated_member_requires_opt_in() {
        let jan = member(1, "Jan Kowalski");

        let mut strict = patrol();
        strict.assign("Mechanik", jan.clone()).unwrap();
        assert!(strict.assign("Motorzysta", jan.clone()).is_err());

        let mut relaxed = patrol().allowing_repeated_members();
        relaxed.assign("Mechanik", jan.clone()).unwrap();
        assert!(relaxed.assign("Motorzysta", jan).is_ok());
        assert_eq!(relaxed.assignments().len(), 2);
    }

    #[test]
    fn test_unassign_and_preview() {
        let mut p = patrol();
        p.assign("Mechanik", member(1, "Jan Kowalski")).unwrap();
        p.assign("Dowódca", member(2, "Adam Nowak")).unwrap();
        assert_eq!(p.unassign("MECHANIK").unwrap().id(), 1);

        let preview = PatrolPreview::of(&p);
        assert_eq!(preview.vessel, "SG-311 (KAT III)");
        assert_eq!(preview.crew.len(), 1);
        assert_eq!(preview.crew[0].member, "Adam Nowak");
    }
}
