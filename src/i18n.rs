// ==========================================
// 巡逻排班系统 - 国际化
// ==========================================
// 使用 rust-i18n，支持波兰语（默认）和英语
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言（"pl" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use patrol_roster::i18n::t_with_args;
/// let msg = t_with_args("error.not_found.month", &[("month", "MAJ")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// rust-i18n 的语言为全局状态，切换语言的测试需串行
#[cfg(test)]
pub(crate) static LOCALE_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        LOCALE_TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner())
    }

    #[test]
    fn test_set_locale() {
        let _guard = lock();
        set_locale("en");
        assert_eq!(current_locale(), "en");
        set_locale("pl");
        assert_eq!(current_locale(), "pl");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = lock();
        set_locale("pl");
        assert_eq!(t("common.success"), "Operacja zakończona pomyślnie");

        set_locale("en");
        assert_eq!(t("common.success"), "Operation successful");

        set_locale("pl");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = lock();
        set_locale("en");
        let msg = t_with_args(
            "error.conflict",
            &[("member", "Jan Kowalski"), ("date", "10.03.2024"), ("existing", "P")],
        );
        assert_eq!(msg, "Jan Kowalski already has an entry on 10.03.2024: P");

        set_locale("pl");
        let msg = t_with_args("error.not_found.month", &[("month", "MAJ")]);
        assert_eq!(msg, "Brak arkusza miesiąca MAJ");
    }
}
