// ==========================================
// 巡逻排班系统 - 证书分档
// ==========================================
// 类别原文去空白、转大写后按 "IV" → "III" → "II" 的顺序做子串匹配，
// 归入第一个命中的等级；全部未命中记录警告，不入任何档
// 顺序不可调换: "III" 与 "IV" 文本均含有可被宽松匹配误判的子串
// 纯函数，无共享状态
// ==========================================

use crate::domain::{Certificate, CertificateBuckets, Tier};

/// 匹配顺序即优先级
const TIER_MARKERS: [(&str, Tier); 3] = [("IV", Tier::IV), ("III", Tier::III), ("II", Tier::II)];

pub struct CertificateClassifier;

impl CertificateClassifier {
    /// 类别原文 → 等级
    pub fn classify_text(source_category: &str) -> Option<Tier> {
        let text = source_category.trim().to_uppercase();
        TIER_MARKERS
            .iter()
            .find(|(marker, _)| text.contains(marker))
            .map(|(_, tier)| *tier)
    }

    /// 将一名船员的证书分档
    pub fn classify<'a, I>(certificates: I) -> CertificateBuckets
    where
        I: IntoIterator<Item = &'a Certificate>,
    {
        let mut buckets = CertificateBuckets::default();
        for cert in certificates {
            match Self::classify_text(cert.source_category()) {
                Some(tier) => buckets.push(tier, cert.clone()),
                None => tracing::warn!(
                    "未识别的证书类别: {:?} (船员 id={}, 岗位={})",
                    cert.source_category(),
                    cert.member_id(),
                    cert.role()
                ),
            }
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(role: &str, category: &str) -> Certificate {
        Certificate::new(1, role, category).unwrap()
    }

    #[test]
    fn test_classify_text_precedence() {
        assert_eq!(CertificateClassifier::classify_text("KAT IV"), Some(Tier::IV));
        assert_eq!(CertificateClassifier::classify_text("kat. iii"), Some(Tier::III));
        assert_eq!(CertificateClassifier::classify_text(" II "), Some(Tier::II));
        assert_eq!(CertificateClassifier::classify_text("KAT I"), None);
        assert_eq!(CertificateClassifier::classify_text("brak"), None);
    }

    #[test]
    fn test_text_with_iv_never_lands_in_lower_tier() {
        // 同时含 "III" 与 "IV" 时 IV 优先
        assert_eq!(CertificateClassifier::classify_text("III/IV"), Some(Tier::IV));
        assert_eq!(CertificateClassifier::classify_text("IIIV"), Some(Tier::IV));
    }

    #[test]
    fn test_classify_buckets_and_skips_unknown() {
        let certs = vec![
            cert("Mechanik", "KAT III"),
            cert("Dowódca", "KAT IV"),
            cert("Motorzysta", "KAT II"),
            cert("Sternik", "inne"),
            cert("Mechanik", "kat.ii"),
        ];

        let buckets = CertificateClassifier::classify(&certs);
        assert_eq!(buckets.tier_iii.len(), 1);
        assert_eq!(buckets.tier_iv.len(), 1);
        assert_eq!(buckets.tier_ii.len(), 2);
        assert_eq!(buckets.total(), 4);
        assert_eq!(buckets.for_tier(Tier::IV)[0].role(), "Dowódca");
    }
}
