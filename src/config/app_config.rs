// ==========================================
// 巡逻排班系统 - 应用配置
// ==========================================
// 存储: JSON 文件，所有字段均有默认值
// 查找顺序: 显式路径 → 环境变量 PATROL_ROSTER_CONFIG →
//           <用户配置目录>/patrol-roster/config.json → 内置默认
// 数据源路径可再由 PATROL_ROSTER_SOURCE 覆写
// 值班表列布局是加载层常量，不可配置
// ==========================================

use crate::engine::CommitMode;
use crate::loader::RosterSheets;
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "PATROL_ROSTER_CONFIG";
pub const SOURCE_ENV: &str = "PATROL_ROSTER_SOURCE";

const SUPPORTED_LOCALES: [&str; 2] = ["pl", "en"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(String),

    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 值为出错的配置项名
    #[error("配置项无效: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// 工作表名
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub roster: String,
    pub certificates: String,
    pub vessels: String,
    pub crew_roles: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            roster: "Zasoby".to_string(),
            certificates: "Swiadectwa".to_string(),
            vessels: "Jednostki".to_string(),
            crew_roles: "Zalogi".to_string(),
        }
    }
}

// ==========================================
// AppConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 工作簿路径（.xlsx/.xls 文件或 CSV 目录）
    pub source_path: Option<PathBuf>,
    pub locale: String,
    /// tracing EnvFilter 指令，RUST_LOG 优先
    pub log_filter: String,
    /// 以 JSON 行输出日志
    pub log_json: bool,
    pub duty_marker: String,
    pub commit_mode: CommitMode,
    /// 月份名 + 日号重建日期时使用的年份（缺省为当前年份）
    pub schedule_year: Option<i32>,
    pub sheets: SheetNames,
    pub crew_role_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            locale: "pl".to_string(),
            log_filter: "info".to_string(),
            log_json: false,
            duty_marker: "P".to_string(),
            commit_mode: CommitMode::Incremental,
            schedule_year: None,
            sheets: SheetNames::default(),
            crew_role_prefix: "KAT".to_string(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件读取并校验
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let raw = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::info!("已读取配置文件: {}", path.display());
        Ok(config)
    }

    /// 写出为格式化 JSON
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 用户配置目录下的默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("patrol-roster").join("config.json"))
    }

    /// 按查找顺序解析配置
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok();
        let mut config = Self::resolve_from(explicit, env_path.as_deref(), Self::default_path())?;

        if let Ok(source) = std::env::var(SOURCE_ENV) {
            let trimmed = source.trim();
            if !trimmed.is_empty() {
                config.source_path = Some(PathBuf::from(trimmed));
            }
        }
        Ok(config)
    }

    /// 显式路径与环境变量指定的文件必须存在；默认位置不存在时使用内置默认
    fn resolve_from(
        explicit: Option<&Path>,
        env_path: Option<&str>,
        default_path: Option<PathBuf>,
    ) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env_path.map(str::trim).filter(|p| !p.is_empty()) {
            return Self::from_file(Path::new(path));
        }
        match default_path {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("未找到配置文件，使用内置默认配置");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.duty_marker.trim().is_empty() {
            return Err(ConfigError::Invalid("duty_marker".to_string()));
        }
        if self.crew_role_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("crew_role_prefix".to_string()));
        }
        if !SUPPORTED_LOCALES.contains(&self.locale.as_str()) {
            tracing::warn!("locale 仅支持 {:?}: {}", SUPPORTED_LOCALES, self.locale);
            return Err(ConfigError::Invalid("locale".to_string()));
        }
        let sheets = [
            &self.sheets.roster,
            &self.sheets.certificates,
            &self.sheets.vessels,
            &self.sheets.crew_roles,
        ];
        if sheets.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("sheets".to_string()));
        }
        if let Some(year) = self.schedule_year {
            if !(1900..=9999).contains(&year) {
                tracing::warn!("schedule_year 超出范围: {}", year);
                return Err(ConfigError::Invalid("schedule_year".to_string()));
            }
        }
        Ok(())
    }

    /// 值班日期所属年份
    pub fn year(&self) -> i32 {
        self.schedule_year.unwrap_or_else(|| Local::now().year())
    }

    pub fn roster_sheets(&self) -> RosterSheets {
        RosterSheets {
            roster: self.sheets.roster.clone(),
            certificates: self.sheets.certificates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "commit_mode": "staged", "schedule_year": 2024, "sheets": { "roster": "Kadra" } }"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.commit_mode, CommitMode::Staged);
        assert_eq!(config.year(), 2024);
        assert_eq!(config.sheets.roster, "Kadra");
        assert_eq!(config.sheets.certificates, "Swiadectwa");
        assert_eq!(config.duty_marker, "P");
        assert_eq!(config.locale, "pl");
    }

    #[test]
    fn test_resolution_order() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.json");
        let from_env = dir.path().join("env.json");
        fs::write(&explicit, r#"{ "duty_marker": "X" }"#).unwrap();
        fs::write(&from_env, r#"{ "duty_marker": "E" }"#).unwrap();
        let env = from_env.to_str().unwrap();

        let config = AppConfig::resolve_from(Some(&explicit), Some(env), None).unwrap();
        assert_eq!(config.duty_marker, "X");

        let config = AppConfig::resolve_from(None, Some(env), None).unwrap();
        assert_eq!(config.duty_marker, "E");

        let missing_default = dir.path().join("nope.json");
        let config = AppConfig::resolve_from(None, None, Some(missing_default)).unwrap();
        assert_eq!(config, AppConfig::default());

        let err = AppConfig::resolve_from(Some(&dir.path().join("nope.json")), None, None);
        assert!(matches!(err, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.duty_marker = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.locale = "de".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sheets.vessels = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.source_path = Some(dir.path().join("grafik.xlsx"));
        config.save(&path).unwrap();

        assert_eq!(AppConfig::from_file(&path).unwrap(), config);
    }
}
