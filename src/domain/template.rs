// ==========================================
// 设备维保排程系统 - 周期模板领域模型
// ==========================================
// 职责: 周期定义 (Cadence) + 生成期限 (Horizon) + 模板实体
// 红线: 周期定义必须在边界校验，展开算法内部不再解释非法值
// ==========================================

use crate::domain::types::{Complexity, ValidationFailure};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// Cadence - 周期定义（带标签的变体）
// ==========================================
// 星期编号: 0=周日, 1=周一, ..., 6=周六
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cadence {
    Daily { interval: u32 },
    /// interval 仅保存，展开时不按"每 N 周"跳周
    Weekly { weekdays: BTreeSet<u8>, interval: u32 },
    Monthly { interval: u32 },
    Annual { interval: u32 },
}

impl Cadence {
    /// 校验周期定义
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        let interval = self.interval();
        if interval == 0 {
            return Err(ValidationFailure::InvalidCadence {
                detail: format!("{} 的 interval 必须 >= 1", self.kind_str()),
            });
        }

        if let Cadence::Weekly { weekdays, .. } = self {
            if weekdays.is_empty() {
                return Err(ValidationFailure::InvalidCadence {
                    detail: "WEEKLY 至少需要一个星期".to_string(),
                });
            }
            if let Some(bad) = weekdays.iter().find(|d| **d > 6) {
                return Err(ValidationFailure::InvalidCadence {
                    detail: format!("星期编号越界: {} (允许 0..=6)", bad),
                });
            }
        }

        Ok(())
    }

    pub fn interval(&self) -> u32 {
        match self {
            Cadence::Daily { interval }
            | Cadence::Weekly { interval, .. }
            | Cadence::Monthly { interval }
            | Cadence::Annual { interval } => *interval,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Cadence::Daily { .. } => "DAILY",
            Cadence::Weekly { .. } => "WEEKLY",
            Cadence::Monthly { .. } => "MONTHLY",
            Cadence::Annual { .. } => "ANNUAL",
        }
    }

    /// 星期集合的存储格式: "1,3,5"（非 WEEKLY 返回 None）
    pub fn weekdays_db_str(&self) -> Option<String> {
        match self {
            Cadence::Weekly { weekdays, .. } => Some(
                weekdays
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => None,
        }
    }

    /// 从存储列还原周期定义并校验
    ///
    /// # 参数
    /// - kind: cadence_kind 列
    /// - interval: cadence_interval 列
    /// - weekdays: cadence_weekdays 列（仅 WEEKLY 使用）
    pub fn from_db_parts(
        kind: &str,
        interval: i64,
        weekdays: Option<&str>,
    ) -> Result<Self, ValidationFailure> {
        let interval = u32::try_from(interval).map_err(|_| ValidationFailure::InvalidCadence {
            detail: format!("interval 超出范围: {}", interval),
        })?;

        let cadence = match kind.trim().to_uppercase().as_str() {
            "DAILY" => Cadence::Daily { interval },
            "WEEKLY" => {
                let mut set = BTreeSet::new();
                for part in weekdays.unwrap_or("").split(',') {
                    let part = part.trim();
                    if part.is_empty() {
                        continue;
                    }
                    let day = part.parse::<u8>().map_err(|_| ValidationFailure::InvalidCadence {
                        detail: format!("星期编号无法解析: {}", part),
                    })?;
                    set.insert(day);
                }
                Cadence::Weekly {
                    weekdays: set,
                    interval,
                }
            }
            "MONTHLY" => Cadence::Monthly { interval },
            "ANNUAL" => Cadence::Annual { interval },
            other => {
                return Err(ValidationFailure::InvalidCadence {
                    detail: format!("未知周期类型: {}", other),
                })
            }
        };

        cadence.validate()?;
        Ok(cadence)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.weekdays_db_str() {
            Some(days) => write!(f, "{}[{}]/{}", self.kind_str(), days, self.interval()),
            None => write!(f, "{}/{}", self.kind_str(), self.interval()),
        }
    }
}

// ==========================================
// Horizon - 生成期限
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Horizon {
    Bounded { end_date: NaiveDate },
    Unbounded,
}

impl Horizon {
    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Horizon::Bounded { end_date } => Some(*end_date),
            Horizon::Unbounded => None,
        }
    }

    pub fn from_end_date(end_date: Option<NaiveDate>) -> Self {
        match end_date {
            Some(end_date) => Horizon::Bounded { end_date },
            None => Horizon::Unbounded,
        }
    }
}

// ==========================================
// RecurrenceTemplate - 周期维保模板
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceTemplate {
    // ===== 主键 =====
    pub template_id: String,

    // ===== 维保内容 =====
    pub equipment_id: String,
    pub maintenance_type: String,
    pub description: Option<String>,
    pub priority: i32,
    pub complexity: Complexity,
    pub estimated_hours: f64,
    pub estimated_cost: f64,

    // ===== 周期 =====
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub horizon: Horizon,
    pub time_of_day: Option<NaiveTime>, // 强制时刻（可选）

    // ===== 状态 =====
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RecurrenceTemplate {
    /// 模板级校验（创建/编辑时调用）
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        self.cadence.validate()?;

        if self.equipment_id.trim().is_empty() {
            return Err(ValidationFailure::InvalidField {
                field: "equipment_id".to_string(),
                detail: "设备不能为空".to_string(),
            });
        }
        if self.maintenance_type.trim().is_empty() {
            return Err(ValidationFailure::InvalidField {
                field: "maintenance_type".to_string(),
                detail: "维保类型不能为空".to_string(),
            });
        }
        if !self.estimated_hours.is_finite() || self.estimated_hours < 0.0 {
            return Err(ValidationFailure::InvalidField {
                field: "estimated_hours".to_string(),
                detail: format!("预估工时非法: {}", self.estimated_hours),
            });
        }
        if !self.estimated_cost.is_finite() || self.estimated_cost < 0.0 {
            return Err(ValidationFailure::InvalidField {
                field: "estimated_cost".to_string(),
                detail: format!("预估费用非法: {}", self.estimated_cost),
            });
        }

        Ok(())
    }
}
