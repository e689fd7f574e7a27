// ==========================================
// 巡逻排班系统 - 船艇与岗位需求
// ==========================================

use crate::domain::types::{DomainError, DomainResult, Field};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

// ==========================================
// Vessel - 船艇（类别 + 舷号）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vessel {
    category: String,
    hull_number: String,
}

impl Vessel {
    pub fn new(category: &str, hull_number: &str) -> DomainResult<Self> {
        let category = category.trim();
        let hull_number = hull_number.trim();
        if category.is_empty() {
            return Err(DomainError::Blank(Field::Category));
        }
        if hull_number.is_empty() {
            return Err(DomainError::Blank(Field::HullNumber));
        }
        Ok(Self {
            category: category.to_string(),
            hull_number: hull_number.to_string(),
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn hull_number(&self) -> &str {
        &self.hull_number
    }

    /// 展示标签: "舷号 (类别)"
    pub fn label(&self) -> String {
        format!("{} ({})", self.hull_number, self.category)
    }
}

impl fmt::Display for Vessel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hull_number, self.category)
    }
}

// ==========================================
// CrewRole - 类别所需岗位
// ==========================================
// 表示"该类别需要此岗位"，不是分配
// 相等性: 两字段均忽略大小写
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewRole {
    category: String,
    role: String,
}

impl CrewRole {
    pub fn new(category: &str, role: &str) -> DomainResult<Self> {
        let category = category.trim();
        let role = role.trim();
        if category.is_empty() {
            return Err(DomainError::Blank(Field::Category));
        }
        if role.is_empty() {
            return Err(DomainError::Blank(Field::Role));
        }
        Ok(Self {
            category: category.to_string(),
            role: role.to_string(),
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl PartialEq for CrewRole {
    fn eq(&self, other: &Self) -> bool {
        self.category.to_lowercase() == other.category.to_lowercase()
            && self.role.to_lowercase() == other.role.to_lowercase()
    }
}

impl Eq for CrewRole {}

impl Hash for CrewRole {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.category.to_lowercase().hash(state);
        self.role.to_lowercase().hash(state);
    }
}

impl fmt::Display for CrewRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.role)
    }
}
