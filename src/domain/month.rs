// ==========================================
// 巡逻排班系统 - 月份工作表命名
// ==========================================
// 月度值班表以大写波兰语月份名命名（如 "MARZEC"）
// 解析时同时接受无变音符号写法（"STYCZEN"）
// ==========================================

use chrono::NaiveDate;

const MONTH_NAMES: [&str; 12] = [
    "STYCZEŃ",
    "LUTY",
    "MARZEC",
    "KWIECIEŃ",
    "MAJ",
    "CZERWIEC",
    "LIPIEC",
    "SIERPIEŃ",
    "WRZESIEŃ",
    "PAŹDZIERNIK",
    "LISTOPAD",
    "GRUDZIEŃ",
];

const ASCII_MONTH_NAMES: [&str; 12] = [
    "STYCZEN",
    "LUTY",
    "MARZEC",
    "KWIECIEN",
    "MAJ",
    "CZERWIEC",
    "LIPIEC",
    "SIERPIEN",
    "WRZESIEN",
    "PAZDZIERNIK",
    "LISTOPAD",
    "GRUDZIEN",
];

/// 月份序号 (1-12) → 工作表名
pub fn month_sheet_name(month: u32) -> Option<&'static str> {
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(MONTH_NAMES[(month - 1) as usize])
}

/// 工作表名 → 月份序号（忽略大小写与首尾空白）
pub fn parse_month_name(name: &str) -> Option<u32> {
    let upper = name.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    MONTH_NAMES
        .iter()
        .zip(ASCII_MONTH_NAMES.iter())
        .position(|(full, ascii)| *full == upper || *ascii == upper)
        .map(|idx| idx as u32 + 1)
}

/// 月份名 + 日号 → 日期
///
/// 日号超出该月天数（如 LUTY 30）返回 None
pub fn month_day_to_date(month_name: &str, day: u32, year: i32) -> Option<NaiveDate> {
    let month = parse_month_name(month_name)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 规范化月份键
///
/// 可识别的月份名统一为带变音符号的写法（"styczen" → "STYCZEŃ"），其余仅大写去空白
pub fn month_key(name: &str) -> String {
    match parse_month_name(name).and_then(month_sheet_name) {
        Some(canonical) => canonical.to_string(),
        None => name.trim().to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_sheet_name_bounds() {
        assert_eq!(month_sheet_name(1), Some("STYCZEŃ"));
        assert_eq!(month_sheet_name(3), Some("MARZEC"));
        assert_eq!(month_sheet_name(12), Some("GRUDZIEŃ"));
        assert_eq!(month_sheet_name(0), None);
        assert_eq!(month_sheet_name(13), None);
    }

    #[test]
    fn test_parse_month_name_variants() {
        assert_eq!(parse_month_name("marzec"), Some(3));
        assert_eq!(parse_month_name("PAŹDZIERNIK"), Some(10));
        assert_eq!(parse_month_name("pazdziernik"), Some(10));
        assert_eq!(parse_month_name(" Styczeń "), Some(1));
        assert_eq!(parse_month_name("Zasoby"), None);
        assert_eq!(parse_month_name(""), None);
    }

    #[test]
    fn test_month_day_to_date() {
        assert_eq!(
            month_day_to_date("MARZEC", 12, 2024),
            NaiveDate::from_ymd_opt(2024, 3, 12)
        );
        assert_eq!(month_day_to_date("LUTY", 30, 2024), None);
        assert_eq!(month_day_to_date("NIEZNANY", 1, 2024), None);
    }

    #[test]
    fn test_month_key_is_canonical() {
        assert_eq!(month_key("styczen"), "STYCZEŃ");
        assert_eq!(month_key(" Marzec "), "MARZEC");
        assert_eq!(month_key("inne"), "INNE");
    }
}
