// ==========================================
// 巡逻排班系统 - 岗位名规范化
// ==========================================
// 证书表中的岗位缩写/笔误 → 岗位表中的规范名
// 尽力而为: 未登记的写法去空白后原样返回，不构成封闭词表
// ==========================================

/// 别名表（忽略大小写匹配）
const ROLE_ALIASES: [(&str, &str); 6] = [
    ("ZD pokład", "Zastępca dowódcy"),
    ("ZD pokład pokład.", "Zastępca dowódcy"),
    ("Mar. pokładowy", "Marynarz pokładowy"),
    ("Mar.pokładowy", "Marynarz pokładowy"),
    ("Oficer mechanik", "Mechanik"),
    ("Motoszysta", "Motorzysta"), // 数据中的笔误
];

pub struct RoleNormalizer;

impl RoleNormalizer {
    /// 规范化岗位名
    ///
    /// 空白输入原样返回；其余去首尾空白后查别名表
    pub fn normalize(role: &str) -> String {
        if role.trim().is_empty() {
            return role.to_string();
        }

        let trimmed = role.trim();
        let lowered = trimmed.to_lowercase();
        ROLE_ALIASES
            .iter()
            .find(|(alias, _)| alias.to_lowercase() == lowered)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// 规范化后忽略大小写相等
    pub fn are_equivalent(a: &str, b: &str) -> bool {
        Self::normalize(a).to_lowercase() == Self::normalize(b).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve_case_insensitively() {
        assert_eq!(RoleNormalizer::normalize("ZD pokład"), "Zastępca dowódcy");
        assert_eq!(RoleNormalizer::normalize("  zd POKŁAD "), "Zastępca dowódcy");
        assert_eq!(RoleNormalizer::normalize("Mar.pokładowy"), "Marynarz pokładowy");
        assert_eq!(RoleNormalizer::normalize("Motoszysta"), "Motorzysta");
    }

    #[test]
    fn test_unmapped_is_trimmed_and_blank_kept() {
        assert_eq!(RoleNormalizer::normalize("  Kucharz "), "Kucharz");
        assert_eq!(RoleNormalizer::normalize("   "), "   ");
        assert_eq!(RoleNormalizer::normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "ZD pokład",
            "ZD pokład pokład.",
            "Mar. pokładowy",
            "Oficer mechanik",
            "Motoszysta",
            "Dowódca",
            " mechanik ",
            "",
        ];
        for input in inputs {
            let once = RoleNormalizer::normalize(input);
            assert_eq!(RoleNormalizer::normalize(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_equivalence_is_symmetric() {
        let pairs = [
            ("ZD pokład", "Zastępca dowódcy"),
            ("Oficer mechanik", "MECHANIK"),
            ("Motoszysta", "Mechanik"),
            ("Mar. pokładowy", "Mar.pokładowy"),
        ];
        for (a, b) in pairs {
            assert_eq!(
                RoleNormalizer::are_equivalent(a, b),
                RoleNormalizer::are_equivalent(b, a)
            );
        }
        assert!(RoleNormalizer::are_equivalent("ZD pokład", "zastępca dowódcy"));
        assert!(RoleNormalizer::are_equivalent("Mar. pokładowy", "Mar.pokładowy"));
        assert!(!RoleNormalizer::are_equivalent("Motoszysta", "Mechanik"));
    }
}
