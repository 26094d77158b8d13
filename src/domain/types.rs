// ==========================================
// 设备维保排程系统 - 领域类型定义
// ==========================================
// 红线: 复杂度是"等级制",点数由等级推导,不允许自由填写
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 复杂度 (Complexity)
// ==========================================
// 点数: LOW=1, MEDIUM=2, HIGH=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// 复杂度点数（负载均衡使用）
    pub fn points(&self) -> u32 {
        match self {
            Complexity::Low => 1,
            Complexity::Medium => 2,
            Complexity::High => 3,
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Complexity::Low),
            "MEDIUM" => Some(Complexity::Medium),
            "HIGH" => Some(Complexity::High),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Complexity::Low => "LOW",
            Complexity::Medium => "MEDIUM",
            Complexity::High => "HIGH",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 紧急程度 (Urgency)
// ==========================================
// URGENT 跳过负载均衡，直接派给当前班次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Normal,
    Urgent,
}

impl Urgency {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NORMAL" => Some(Urgency::Normal),
            "URGENT" => Some(Urgency::Urgent),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "NORMAL",
            Urgency::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 工单状态 (Instance Status)
// ==========================================
// 本核心只产生 SCHEDULED；其余状态由执行流程维护
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl InstanceStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SCHEDULED" => Some(InstanceStatus::Scheduled),
            "IN_PROGRESS" => Some(InstanceStatus::InProgress),
            "COMPLETED" => Some(InstanceStatus::Completed),
            "CANCELLED" => Some(InstanceStatus::Cancelled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            InstanceStatus::Scheduled => "SCHEDULED",
            InstanceStatus::InProgress => "IN_PROGRESS",
            InstanceStatus::Completed => "COMPLETED",
            InstanceStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 校验失败原因 (Validation Failure)
// ==========================================
// 边界校验的结构化原因；由 EngineError::Validation 携带
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationFailure {
    /// 周计划生效日期必须是周一
    MustConfigureOnMonday { effective_date: String },
    /// 各班次负载百分比之和必须为 100
    CapacityPercentagesMustSum100 { actual: u64 },
    /// 周期定义非法
    InvalidCadence { detail: String },
    /// 生成窗口超出允许范围
    WindowOutOfRange { weeks_ahead: u32, max_weeks_ahead: u32 },
    /// 其他字段错误
    InvalidField { field: String, detail: String },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::MustConfigureOnMonday { effective_date } => {
                write!(f, "MUST_CONFIGURE_ON_MONDAY: 生效日期{}不是周一", effective_date)
            }
            ValidationFailure::CapacityPercentagesMustSum100 { actual } => {
                write!(f, "CAPACITY_PERCENTAGES_MUST_SUM_100: 实际合计={}", actual)
            }
            ValidationFailure::InvalidCadence { detail } => {
                write!(f, "INVALID_CADENCE: {}", detail)
            }
            ValidationFailure::WindowOutOfRange {
                weeks_ahead,
                max_weeks_ahead,
            } => write!(
                f,
                "WINDOW_OUT_OF_RANGE: weeks_ahead={}, 允许范围=1..={}",
                weeks_ahead, max_weeks_ahead
            ),
            ValidationFailure::InvalidField { field, detail } => {
                write!(f, "INVALID_FIELD: field={}, {}", field, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_points() {
        assert_eq!(Complexity::Low.points(), 1);
        assert_eq!(Complexity::Medium.points(), 2);
        assert_eq!(Complexity::High.points(), 3);
    }

    #[test]
    fn test_db_str_parsing() {
        assert_eq!(Complexity::from_db_str("medium"), Some(Complexity::Medium));
        assert_eq!(Complexity::from_db_str("EXTREME"), None);
        assert_eq!(Urgency::from_db_str("URGENT"), Some(Urgency::Urgent));
        assert_eq!(
            InstanceStatus::from_db_str("IN_PROGRESS"),
            Some(InstanceStatus::InProgress)
        );
        assert_eq!(InstanceStatus::Cancelled.to_string(), "CANCELLED");
    }
}
