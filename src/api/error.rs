// ==========================================
// 巡逻排班系统 - API层错误类型
// ==========================================
// 职责: 将各层错误归入面向用户的五类
//       未找到 / 无效输入 / 冲突 / 已取消 / 结构错误（另有内部错误）
// 用户消息经 i18n 本地化
// ==========================================

use crate::config::ConfigError;
use crate::domain::DomainError;
use crate::engine::CommitError;
use crate::i18n;
use crate::loader::LoadError;
use crate::source::SourceError;
use chrono::NaiveDate;
use thiserror::Error;

/// API层错误类型
///
/// `Display` 为中文日志文本；面向用户的文本只经 `user_message` 生成
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("资源未找到: {0}")]
    NotFound(Missing),

    #[error("无效输入: {0}")]
    Validation(Invalid),

    /// 提交时目标单元格已有内容
    #[error("冲突: {member} @ {} = {existing:?}", .date.format("%d.%m.%Y"))]
    Conflict {
        member: String,
        date: NaiveDate,
        existing: String,
    },

    #[error("操作已取消")]
    Cancelled,

    #[error("数据结构错误: {0}")]
    Structural(Broken),

    /// 明细只进日志
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 未找到的对象
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    #[error("船员 id={0}")]
    MemberId(u32),

    #[error("船员 {0}")]
    Member(String),

    #[error("月度值班表 {0}")]
    Month(String),

    #[error("船员 {member} 不在 {month} 值班表中")]
    MemberInMonth { member: String, month: String },

    #[error("{member} 的 {month} 工时汇总")]
    Balance { member: String, month: String },

    #[error("船艇 {hull} ({category})")]
    Vessel { category: String, hull: String },

    #[error("类别 {0} 的岗位需求")]
    CategoryRoles(String),

    #[error("工作表 {0}")]
    Sheet(String),

    #[error("文件 {0}")]
    File(String),
}

/// 无效输入
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Invalid {
    #[error(transparent)]
    Domain(DomainError),

    #[error("文件格式不支持: {0}")]
    Format(String),

    #[error("无效列名: {0}")]
    Column(String),

    #[error("配置项无效: {0}")]
    Setting(String),

    #[error("配置文件语法错误: 第 {line} 行第 {column} 列")]
    ConfigSyntax { line: usize, column: usize },
}

/// 工作簿结构问题
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Broken {
    #[error("必需工作表缺失: {0}")]
    MissingSheet(String),

    #[error("工作簿不含任何月度值班表")]
    NoMonthSheets,

    #[error("工作簿不含任何工作表")]
    NoSheets,
}

impl ApiError {
    /// 本地化的简短用户消息
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound(missing) => missing.user_message(),
            ApiError::Validation(invalid) => invalid.user_message(),
            ApiError::Conflict {
                member,
                date,
                existing,
            } => i18n::t_with_args(
                "error.conflict",
                &[
                    ("member", member),
                    ("date", &format_date(*date)),
                    ("existing", existing),
                ],
            ),
            ApiError::Cancelled => i18n::t("error.cancelled"),
            ApiError::Structural(broken) => broken.user_message(),
            ApiError::Internal(_) => i18n::t("error.internal"),
        }
    }

    /// 机器可读的错误类别
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Cancelled => "cancelled",
            ApiError::Structural(_) => "structural",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl Missing {
    fn user_message(&self) -> String {
        match self {
            Missing::MemberId(id) => {
                i18n::t_with_args("error.not_found.member_id", &[("id", &id.to_string())])
            }
            Missing::Member(name) => i18n::t_with_args("error.not_found.member", &[("name", name)]),
            Missing::Month(month) => {
                i18n::t_with_args("error.not_found.month", &[("month", month)])
            }
            Missing::MemberInMonth { member, month } => i18n::t_with_args(
                "error.not_found.member_in_month",
                &[("member", member), ("month", month)],
            ),
            Missing::Balance { member, month } => i18n::t_with_args(
                "error.not_found.balance",
                &[("member", member), ("month", month)],
            ),
            Missing::Vessel { category, hull } => i18n::t_with_args(
                "error.not_found.vessel",
                &[("hull", hull), ("category", category)],
            ),
            Missing::CategoryRoles(category) => {
                i18n::t_with_args("error.not_found.category_roles", &[("category", category)])
            }
            Missing::Sheet(sheet) => i18n::t_with_args("error.not_found.sheet", &[("sheet", sheet)]),
            Missing::File(path) => i18n::t_with_args("error.not_found.file", &[("path", path)]),
        }
    }
}

impl Invalid {
    fn user_message(&self) -> String {
        match self {
            Invalid::Domain(err) => domain_message(err),
            Invalid::Format(format) => {
                i18n::t_with_args("error.validation.format", &[("format", format)])
            }
            Invalid::Column(column) => {
                i18n::t_with_args("error.validation.column", &[("column", column)])
            }
            Invalid::Setting(setting) => {
                i18n::t_with_args("error.validation.setting", &[("setting", setting)])
            }
            Invalid::ConfigSyntax { line, column } => i18n::t_with_args(
                "error.validation.config_syntax",
                &[("line", &line.to_string()), ("column", &column.to_string())],
            ),
        }
    }
}

impl Broken {
    fn user_message(&self) -> String {
        match self {
            Broken::MissingSheet(sheet) => {
                i18n::t_with_args("error.structural.missing_sheet", &[("sheet", sheet)])
            }
            Broken::NoMonthSheets => i18n::t("error.structural.no_month_sheets"),
            Broken::NoSheets => i18n::t("error.structural.no_sheets"),
        }
    }
}

fn domain_message(err: &DomainError) -> String {
    match err {
        DomainError::Blank(field) => {
            let field = i18n::t(&format!("field.{}", field.key()));
            i18n::t_with_args("error.validation.blank", &[("field", &field)])
        }
        DomainError::ZeroMemberId => i18n::t("error.validation.zero_member_id"),
        DomainError::InvalidDateRange { start, end } => i18n::t_with_args(
            "error.validation.date_range",
            &[("start", &format_date(*start)), ("end", &format_date(*end))],
        ),
        DomainError::InvalidDate(text) => {
            i18n::t_with_args("error.validation.date", &[("text", text)])
        }
        DomainError::DuplicateRole(role) => {
            i18n::t_with_args("error.validation.duplicate_role", &[("role", role)])
        }
        DomainError::DuplicateMember(member) => {
            i18n::t_with_args("error.validation.duplicate_member", &[("member", member)])
        }
        DomainError::UnknownRole(role) => {
            i18n::t_with_args("error.validation.unknown_role", &[("role", role)])
        }
        DomainError::NoCategory => i18n::t("error.validation.no_category"),
        DomainError::VesselOutsideCategory { vessel, category } => i18n::t_with_args(
            "error.validation.vessel_outside_category",
            &[("vessel", vessel), ("category", category)],
        ),
        DomainError::IncompleteDraft => i18n::t("error.validation.incomplete_draft"),
        DomainError::Unassigned(role) => {
            i18n::t_with_args("error.validation.unassigned", &[("role", role)])
        }
        DomainError::NoCrew => i18n::t("error.validation.no_crew"),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

// ==========================================
// 从下层错误转换
// ==========================================
impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::FileNotFound(path) => ApiError::NotFound(Missing::File(path)),
            SourceError::SheetNotFound(sheet) => ApiError::NotFound(Missing::Sheet(sheet)),
            SourceError::NoSheets => ApiError::Structural(Broken::NoSheets),
            SourceError::UnsupportedFormat(format) => ApiError::Validation(Invalid::Format(format)),
            SourceError::InvalidColumn(column) => ApiError::Validation(Invalid::Column(column)),
            SourceError::Io(_)
            | SourceError::ExcelParseError(_)
            | SourceError::ExcelWriteError(_)
            | SourceError::CsvError(_)
            | SourceError::LockPoisoned(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        match err {
            // 必需工作表缺失属于结构错误
            LoadError::SheetNotFound(sheet) => ApiError::Structural(Broken::MissingSheet(sheet)),
            LoadError::NoMonthSheets => ApiError::Structural(Broken::NoMonthSheets),
            LoadError::MonthNotAvailable(month) => ApiError::NotFound(Missing::Month(month)),
            LoadError::MemberNotFound { member, month } => {
                ApiError::NotFound(Missing::MemberInMonth { member, month })
            }
            LoadError::Validation(err) => err.into(),
            LoadError::Cancelled => ApiError::Cancelled,
            LoadError::Source(source) => source.into(),
        }
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::MonthSheetMissing(month) => ApiError::NotFound(Missing::Month(month)),
            CommitError::MemberRowMissing { member, month } => {
                ApiError::NotFound(Missing::MemberInMonth { member, month })
            }
            CommitError::Conflict {
                member,
                date,
                existing,
            } => ApiError::Conflict {
                member,
                date,
                existing,
            },
            CommitError::Validation(err) => err.into(),
            CommitError::Partial { cause, .. } => (*cause).into(),
            CommitError::TaskFailed(msg) => ApiError::Internal(msg),
            CommitError::Source(source) => source.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Validation(Invalid::Domain(err))
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => ApiError::NotFound(Missing::File(path)),
            ConfigError::Invalid(setting) => ApiError::Validation(Invalid::Setting(setting)),
            ConfigError::Parse(e) => ApiError::Validation(Invalid::ConfigSyntax {
                line: e.line(),
                column: e.column(),
            }),
            ConfigError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
