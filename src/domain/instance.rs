// ==========================================
// 设备维保排程系统 - 维保工单领域模型
// ==========================================
// 职责: 具体日期的维保工单 + 派工草稿 + 排程列表联合类型
// 说明: 模板与工单是两个独立实体，通过 template_id 显式关联
// ==========================================

use crate::domain::template::RecurrenceTemplate;
use crate::domain::types::{Complexity, InstanceStatus, Urgency};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// MaintenanceInstance - 维保工单
// ==========================================
// 唯一约束: (template_id, scheduled_date)，template_id 非空时生效
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceInstance {
    pub instance_id: String,
    pub template_id: Option<String>, // 单次工单为 None

    // ===== 排程 =====
    pub scheduled_date: NaiveDate,
    pub scheduled_time: Option<NaiveTime>,

    // ===== 维保内容 =====
    pub equipment_id: String,
    pub maintenance_type: String,
    pub complexity_points: u32,
    pub urgency: Urgency,
    pub status: InstanceStatus,

    // ===== 派工结果 =====
    pub assigned_operator_id: Option<String>,
    pub assigned_shift_id: Option<String>,

    pub created_at: NaiveDateTime,
}

impl MaintenanceInstance {
    /// 由模板在指定日期物化工单（尚未派工）
    pub fn from_template(
        template: &RecurrenceTemplate,
        scheduled_date: NaiveDate,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            template_id: Some(template.template_id.clone()),
            scheduled_date,
            scheduled_time: template.time_of_day,
            equipment_id: template.equipment_id.clone(),
            maintenance_type: template.maintenance_type.clone(),
            complexity_points: template.complexity.points(),
            urgency: Urgency::Normal,
            status: InstanceStatus::Scheduled,
            assigned_operator_id: None,
            assigned_shift_id: None,
            created_at,
        }
    }

    /// 由草稿创建单次工单（不关联模板）
    pub fn one_off(draft: &InstanceDraft, created_at: NaiveDateTime) -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            template_id: None,
            scheduled_date: draft.scheduled_date,
            scheduled_time: draft.scheduled_time,
            equipment_id: draft.equipment_id.clone().unwrap_or_default(),
            maintenance_type: draft
                .maintenance_type
                .clone()
                .unwrap_or_else(|| "CORRECTIVE".to_string()),
            complexity_points: draft.complexity.points(),
            urgency: draft.urgency,
            status: InstanceStatus::Scheduled,
            assigned_operator_id: None,
            assigned_shift_id: None,
            created_at,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_operator_id.is_some()
    }
}

// ==========================================
// InstanceDraft - 派工草稿
// ==========================================
// assign_maintenance 只需要 complexity/urgency/scheduled_date；
// 创建单次工单时还需要设备与类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDraft {
    pub complexity: Complexity,
    pub urgency: Urgency,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub scheduled_time: Option<NaiveTime>,
    #[serde(default)]
    pub equipment_id: Option<String>,
    #[serde(default)]
    pub maintenance_type: Option<String>,
}

// ==========================================
// ScheduleListingEntry - 排程列表条目
// ==========================================
// 展示层需要在同一列表里同时展示模板与工单时使用
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entry_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleListingEntry {
    Template {
        template: RecurrenceTemplate,
        equipment_label: String,
    },
    Instance {
        instance: MaintenanceInstance,
        equipment_label: String,
    },
}

impl ScheduleListingEntry {
    /// 排序键: 模板按开始日期，工单按排程日期
    pub fn sort_date(&self) -> NaiveDate {
        match self {
            ScheduleListingEntry::Template { template, .. } => template.start_date,
            ScheduleListingEntry::Instance { instance, .. } => instance.scheduled_date,
        }
    }
}
