// ==========================================
// 巡逻排班系统 - 领域类型定义
// ==========================================
// 职责: 日期区间、证书等级、可取消结果、领域校验错误
// ==========================================

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ==========================================
// 领域校验错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}不能为空")]
    Blank(Field),

    #[error("船员 id 必须大于 0")]
    ZeroMemberId,

    #[error("日期区间无效: start={start} > end={end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("日期格式无效: {0}")]
    InvalidDate(String),

    #[error("岗位重复分配: {0}")]
    DuplicateRole(String),

    #[error("船员重复分配: {0}")]
    DuplicateMember(String),

    #[error("未知岗位: {0}")]
    UnknownRole(String),

    #[error("请先选择类别")]
    NoCategory,

    #[error("船艇 {vessel} 不属于类别 {category}")]
    VesselOutsideCategory { vessel: String, category: String },

    #[error("巡逻草稿缺少类别、船艇或岗位")]
    IncompleteDraft,

    #[error("岗位未分配: {0}")]
    Unassigned(String),

    #[error("巡逻没有分配任何船员")]
    NoCrew,
}

/// 校验失败的输入字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    HullNumber,
    Role,
    MemberName,
    Month,
    DutyCode,
    DutyMarker,
    SourcePath,
}

impl Field {
    /// 本地化键后缀（field.<key>）
    pub fn key(&self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::HullNumber => "hull_number",
            Field::Role => "role",
            Field::MemberName => "member_name",
            Field::Month => "month",
            Field::DutyCode => "duty_code",
            Field::DutyMarker => "duty_marker",
            Field::SourcePath => "source_path",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Category => "类别",
            Field::HullNumber => "舷号",
            Field::Role => "岗位名称",
            Field::MemberName => "船员姓名",
            Field::Month => "月份名",
            Field::DutyCode => "值班代码",
            Field::DutyMarker => "值班标记",
            Field::SourcePath => "数据源路径",
        };
        f.write_str(name)
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

// ==========================================
// DateRange - 闭区间日期范围
// ==========================================
// 不变量: start <= end（构造与每次修改均校验）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// 单日区间
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn with_start(self, start: NaiveDate) -> DomainResult<Self> {
        Self::new(start, self.end)
    }

    pub fn with_end(self, end: NaiveDate) -> DomainResult<Self> {
        Self::new(self.start, end)
    }

    /// 区间包含（含两端）
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// 区间天数（含两端）
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// 按日迭代
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days()).map(move |offset| start + Duration::days(offset))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

// ==========================================
// Tier - 证书等级 (KAT II / III / IV)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    II,
    III,
    IV,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::II, Tier::III, Tier::IV];

    /// 类别标签（"KAT II" 等）
    pub fn category_label(&self) -> &'static str {
        match self {
            Tier::II => "KAT II",
            Tier::III => "KAT III",
            Tier::IV => "KAT IV",
        }
    }

    /// 类别文本 → 等级（精确匹配标签，忽略大小写与首尾空白）
    pub fn from_category(category: &str) -> Option<Tier> {
        let trimmed = category.trim();
        Tier::ALL
            .into_iter()
            .find(|tier| tier.category_label().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::II => write!(f, "II"),
            Tier::III => write!(f, "III"),
            Tier::IV => write!(f, "IV"),
        }
    }
}

// ==========================================
// Outcome - 可取消操作的结果
// ==========================================
// 取消不是错误: 调用方据此区分"已被新请求取代"与失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}
