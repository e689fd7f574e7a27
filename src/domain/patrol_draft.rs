// ==========================================
// 巡逻排班系统 - 巡逻草稿（岗位槽位）
// ==========================================
// 组装流程: 选日期 → 选类别（生成岗位槽位）→ 选船艇 → 逐槽位分配
// 已分配船员作为资格查询的排除集
// ==========================================

use crate::domain::crew::CrewMember;
use crate::domain::patrol::{Patrol, PatrolPreview};
use crate::domain::types::{DateRange, DomainError, DomainResult};
use crate::domain::vessel::{CrewRole, Vessel};
use std::collections::HashSet;
use std::sync::Arc;

// ==========================================
// CrewSlot - 岗位槽位
// ==========================================
#[derive(Debug, Clone)]
pub struct CrewSlot {
    pub role: String,
    pub assigned: Option<Arc<CrewMember>>,
}

impl CrewSlot {
    pub fn is_filled(&self) -> bool {
        self.assigned.is_some()
    }
}

// ==========================================
// PatrolDraft
// ==========================================
#[derive(Debug, Clone)]
pub struct PatrolDraft {
    range: DateRange,
    category: Option<String>,
    vessel: Option<Vessel>,
    slots: Vec<CrewSlot>,
}

impl PatrolDraft {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            category: None,
            vessel: None,
            slots: Vec::new(),
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn set_range(&mut self, range: DateRange) {
        self.range = range;
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn vessel(&self) -> Option<&Vessel> {
        self.vessel.as_ref()
    }

    pub fn slots(&self) -> &[CrewSlot] {
        &self.slots
    }

    /// 选择类别: 重置船艇，并按该类别的岗位需求重建槽位
    pub fn select_category(&mut self, category: &str, roles: &[CrewRole]) {
        let category = category.trim();
        self.vessel = None;
        self.slots = roles
            .iter()
            .filter(|r| r.category().eq_ignore_ascii_case(category))
            .map(|r| CrewSlot {
                role: r.role().to_string(),
                assigned: None,
            })
            .collect();
        self.category = Some(category.to_string());
    }

    /// 选择船艇（须属于当前类别）
    pub fn select_vessel(&mut self, vessel: Vessel) -> DomainResult<()> {
        match &self.category {
            Some(category) if vessel.category().eq_ignore_ascii_case(category) => {
                self.vessel = Some(vessel);
                Ok(())
            }
            Some(category) => Err(DomainError::VesselOutsideCategory {
                vessel: vessel.label(),
                category: category.clone(),
            }),
            None => Err(DomainError::NoCategory),
        }
    }

    /// 向空槽位分配船员
    pub fn assign(&mut self, role: &str, member: Arc<CrewMember>) -> DomainResult<()> {
        if self.exclusions().contains(&member.id()) {
            return Err(DomainError::DuplicateMember(member.name().to_string()));
        }
        let slot = self.slot_mut(role)?;
        if slot.is_filled() {
            return Err(DomainError::DuplicateRole(slot.role.clone()));
        }
        slot.assigned = Some(member);
        Ok(())
    }

    pub fn unassign(&mut self, role: &str) -> DomainResult<Option<Arc<CrewMember>>> {
        Ok(self.slot_mut(role)?.assigned.take())
    }

    /// 已分配船员 id（资格查询排除集）
    pub fn exclusions(&self) -> HashSet<u32> {
        self.slots
            .iter()
            .filter_map(|s| s.assigned.as_ref().map(|m| m.id()))
            .collect()
    }

    pub fn can_commit(&self) -> bool {
        self.category.is_some()
            && self.vessel.is_some()
            && !self.slots.is_empty()
            && self.slots.iter().all(CrewSlot::is_filled)
    }

    pub fn to_patrol(&self) -> DomainResult<Patrol> {
        let (category, vessel) = match (&self.category, &self.vessel) {
            (Some(c), Some(v)) => (c, v),
            _ => return Err(DomainError::IncompleteDraft),
        };
        if self.slots.is_empty() {
            return Err(DomainError::IncompleteDraft);
        }

        let mut patrol = Patrol::new(self.range, category, vessel.clone())?;
        for slot in &self.slots {
            let member = slot
                .assigned
                .clone()
                .ok_or_else(|| DomainError::Unassigned(slot.role.clone()))?;
            patrol.assign(&slot.role, member)?;
        }
        Ok(patrol)
    }

    pub fn preview(&self) -> DomainResult<PatrolPreview> {
        Ok(PatrolPreview::of(&self.to_patrol()?))
    }

    fn slot_mut(&mut self, role: &str) -> DomainResult<&mut CrewSlot> {
        let wanted = role.trim().to_lowercase();
        self.slots
            .iter_mut()
            .find(|s| s.role.to_lowercase() == wanted)
            .ok_or_else(|| DomainError::UnknownRole(role.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        )
        .unwrap()
    }

    fn roles() -> Vec<CrewRole> {
        vec![
            CrewRole::new("KAT III", "Dowódca").unwrap(),
            CrewRole::new("KAT III", "Mechanik").unwrap(),
            CrewRole::new("KAT II", "Motorzysta").unwrap(),
        ]
    }

    fn member(id: u32, name: &str) -> Arc<CrewMember> {
        Arc::new(CrewMember::new(id, name).unwrap())
    }

    #[test]
    fn test_select_category_builds_slots() {
        let mut draft = PatrolDraft::new(range());
        draft.select_category("KAT III", &roles());
        assert_eq!(draft.slots().len(), 2);
        assert!(!draft.can_commit());
    }

    #[test]
    fn test_vessel_must_match_category() {
        let mut draft = PatrolDraft::new(range());
        assert!(draft
            .select_vessel(Vessel::new("KAT III", "SG-311").unwrap())
            .is_err());

        draft.select_category("KAT III", &roles());
        assert!(draft
            .select_vessel(Vessel::new("KAT II", "SG-201").unwrap())
            .is_err());
        assert!(draft
            .select_vessel(Vessel::new("KAT III", "SG-311").unwrap())
            .is_ok());
    }

    #[test]
    fn test_full_draft_converts_to_patrol() {
        let mut draft = PatrolDraft::new(range());
        draft.select_category("KAT III", &roles());
        draft
            .select_vessel(Vessel::new("KAT III", "SG-311").unwrap())
            .unwrap();
        draft.assign("Dowódca", member(2, "Adam Nowak")).unwrap();
        assert!(draft.to_patrol().is_err());

        draft.assign("mechanik", member(1, "Jan Kowalski")).unwrap();
        assert!(draft.can_commit());
        assert_eq!(draft.exclusions(), HashSet::from([1, 2]));

        let patrol = draft.to_patrol().unwrap();
        assert_eq!(patrol.assignments().len(), 2);
        assert_eq!(draft.preview().unwrap().crew.len(), 2);
    }

    #[test]
    fn test_assign_rejects_filled_slot_and_repeated_member() {
        let mut draft = PatrolDraft::new(range());
        draft.select_category("KAT III", &roles());
        draft.assign("Mechanik", member(1, "Jan Kowalski")).unwrap();

        assert!(draft.assign("Mechanik", member(3, "Piotr Wiśniewski")).is_err());
        assert!(draft.assign("Dowódca", member(1, "Jan Kowalski")).is_err());
        assert!(draft.assign("Kucharz", member(3, "Piotr Wiśniewski")).is_err());

        assert_eq!(draft.unassign("Mechanik").unwrap().unwrap().id(), 1);
        assert!(draft.exclusions().is_empty());
    }
}
