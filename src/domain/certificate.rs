// ==========================================
// 巡逻排班系统 - 证书领域模型
// ==========================================

use crate::domain::types::{DomainError, DomainResult, Field, Tier};
use serde::{Deserialize, Serialize};

// ==========================================
// Certificate - 船员岗位证书
// ==========================================
// source_category: 原始类别文本（如 "kat. III"），由分类器分档
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Certificate {
    member_id: u32,
    role: String,
    source_category: String,
}

impl Certificate {
    pub fn new(member_id: u32, role: &str, source_category: &str) -> DomainResult<Self> {
        if member_id == 0 {
            return Err(DomainError::ZeroMemberId);
        }
        let role = role.trim();
        let source_category = source_category.trim();
        if role.is_empty() {
            return Err(DomainError::Blank(Field::Role));
        }
        if source_category.is_empty() {
            return Err(DomainError::Blank(Field::Category));
        }
        Ok(Self {
            member_id,
            role: role.to_string(),
            source_category: source_category.to_string(),
        })
    }

    pub fn member_id(&self) -> u32 {
        self.member_id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn source_category(&self) -> &str {
        &self.source_category
    }
}

// ==========================================
// CertificateBuckets - 按等级分档的证书
// ==========================================
// 每次分类调用新建，不缓存
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CertificateBuckets {
    pub tier_ii: Vec<Certificate>,
    pub tier_iii: Vec<Certificate>,
    pub tier_iv: Vec<Certificate>,
}

impl CertificateBuckets {
    pub fn for_tier(&self, tier: Tier) -> &[Certificate] {
        match tier {
            Tier::II => &self.tier_ii,
            Tier::III => &self.tier_iii,
            Tier::IV => &self.tier_iv,
        }
    }

    pub(crate) fn push(&mut self, tier: Tier, certificate: Certificate) {
        match tier {
            Tier::II => self.tier_ii.push(certificate),
            Tier::III => self.tier_iii.push(certificate),
            Tier::IV => self.tier_iv.push(certificate),
        }
    }

    pub fn total(&self) -> usize {
        self.tier_ii.len() + self.tier_iii.len() + self.tier_iv.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certificate_validation() {
        assert!(Certificate::new(0, "Mechanik", "III").is_err());
        assert!(Certificate::new(1, "", "III").is_err());
        assert!(Certificate::new(1, "Mechanik", "  ").is_err());

        let cert = Certificate::new(1, " Mechanik ", " kat. III ").unwrap();
        assert_eq!(cert.role(), "Mechanik");
        assert_eq!(cert.source_category(), "kat. III");
    }

    #[test]
    fn test_buckets_for_tier() {
        let mut buckets = CertificateBuckets::default();
        buckets.push(Tier::III, Certificate::new(1, "Mechanik", "III").unwrap());

        assert_eq!(buckets.for_tier(Tier::III).len(), 1);
        assert!(buckets.for_tier(Tier::II).is_empty());
        assert_eq!(buckets.total(), 1);
    }
}
