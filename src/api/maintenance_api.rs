// ==========================================
// 设备维保排程系统 - 维保排程 API
// ==========================================
// 职责:
// - 模板工单生成（单模板 / 全部启用模板）
// - 派工预览、周班次计划配置
// - 模板创建/编辑/停用、单次工单、排程列表
// 说明:
// - 对外方法读取本地时钟；*_at 变体接收显式 now，供测试与定时任务使用
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::instance::{InstanceDraft, ScheduleListingEntry};
use crate::domain::shift::ShiftCapacityPlan;
use crate::domain::template::{Cadence, Horizon, RecurrenceTemplate};
use crate::domain::types::Complexity;
use crate::engine::error::EngineError;
use crate::engine::lifecycle::{
    AssignmentOutcome, GeneratedInstance, GenerationSummary, SweepSummary,
    TemplateLifecycleController,
};
use crate::repository::RepositoryError;

// ==========================================
// 请求 / 响应
// ==========================================

/// 模板创建/编辑请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRequest {
    pub equipment_id: String,
    pub maintenance_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    pub complexity: Complexity,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub estimated_cost: f64,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub horizon: Horizon,
    #[serde(default)]
    pub time_of_day: Option<NaiveTime>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// 单模板生成结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateInstancesResponse {
    pub template_id: String,
    pub generated: usize,
    pub unassigned: usize,
    pub instances: Vec<GeneratedInstance>,
}

impl From<GenerationSummary> for GenerateInstancesResponse {
    fn from(summary: GenerationSummary) -> Self {
        Self {
            template_id: summary.template_id,
            generated: summary.instances_created,
            unassigned: summary.assignment_failures,
            instances: summary.instances,
        }
    }
}

// ==========================================
// MaintenanceApi - 维保排程 API
// ==========================================
pub struct MaintenanceApi {
    controller: Arc<TemplateLifecycleController>,
}

impl MaintenanceApi {
    pub fn new(controller: Arc<TemplateLifecycleController>) -> Self {
        Self { controller }
    }

    fn local_now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    // ==========================================
    // 工单生成
    // ==========================================

    /// 按模板生成未来 weeks_ahead 周的工单（幂等）
    ///
    /// # 返回
    /// - Ok(GenerateInstancesResponse): generated 为本次新建数量
    /// - Err(NotFound): 模板不存在或已停用
    /// - Err(ValidationFailed): 周期非法 / 窗口超出范围
    pub fn generate_instances(
        &self,
        template_id: &str,
        weeks_ahead: u32,
    ) -> ApiResult<GenerateInstancesResponse> {
        self.generate_instances_at(template_id, weeks_ahead, Self::local_now())
    }

    pub fn generate_instances_at(
        &self,
        template_id: &str,
        weeks_ahead: u32,
        now: NaiveDateTime,
    ) -> ApiResult<GenerateInstancesResponse> {
        if template_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("模板ID不能为空".to_string()));
        }

        let summary = self
            .controller
            .on_regenerate(template_id, weeks_ahead, now)?;
        Ok(summary.into())
    }

    /// 为全部启用模板补齐生成窗口
    ///
    /// 单个模板失败记录在 failures 中，不影响其他模板
    pub fn generate_for_all_active_templates(&self, weeks_ahead: u32) -> ApiResult<SweepSummary> {
        self.generate_for_all_active_templates_at(weeks_ahead, Self::local_now())
    }

    pub fn generate_for_all_active_templates_at(
        &self,
        weeks_ahead: u32,
        now: NaiveDateTime,
    ) -> ApiResult<SweepSummary> {
        Ok(self.controller.on_extend_all(weeks_ahead, now)?)
    }

    // ==========================================
    // 派工 / 班次计划
    // ==========================================

    /// 计算派工结果（不落库）
    ///
    /// 无可派工人员时返回 Unassigned，而不是错误
    pub fn assign_maintenance(&self, draft: &InstanceDraft) -> ApiResult<AssignmentOutcome> {
        self.assign_maintenance_at(draft, Self::local_now())
    }

    pub fn assign_maintenance_at(
        &self,
        draft: &InstanceDraft,
        now: NaiveDateTime,
    ) -> ApiResult<AssignmentOutcome> {
        match self.controller.preview_assignment(draft, now) {
            Ok(assignment) => Ok(AssignmentOutcome::Assigned {
                operator_id: assignment.operator_id,
                shift_id: assignment.shift_id,
            }),
            Err(EngineError::AssignmentUnavailable(reason)) => {
                Ok(AssignmentOutcome::Unassigned { reason })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 配置某周的双人班
    pub fn set_weekly_shift_plan(
        &self,
        double_staffed_shift_id: &str,
        effective_date: NaiveDate,
    ) -> ApiResult<ShiftCapacityPlan> {
        self.set_weekly_shift_plan_at(double_staffed_shift_id, effective_date, Self::local_now())
    }

    pub fn set_weekly_shift_plan_at(
        &self,
        double_staffed_shift_id: &str,
        effective_date: NaiveDate,
        now: NaiveDateTime,
    ) -> ApiResult<ShiftCapacityPlan> {
        if double_staffed_shift_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("双人班班次ID不能为空".to_string()));
        }

        Ok(self
            .controller
            .capacity()
            .set_weekly_plan(double_staffed_shift_id, effective_date, now)?)
    }

    // ==========================================
    // 模板管理
    // ==========================================

    /// 创建模板；启用状态下立即按默认窗口生成工单
    pub fn create_template(&self, request: TemplateRequest) -> ApiResult<GenerateInstancesResponse> {
        self.create_template_at(request, Self::local_now())
    }

    pub fn create_template_at(
        &self,
        request: TemplateRequest,
        now: NaiveDateTime,
    ) -> ApiResult<GenerateInstancesResponse> {
        Self::validate_request(&request)?;

        let template = RecurrenceTemplate {
            template_id: uuid::Uuid::new_v4().to_string(),
            equipment_id: request.equipment_id,
            maintenance_type: request.maintenance_type,
            description: request.description,
            priority: request.priority,
            complexity: request.complexity,
            estimated_hours: request.estimated_hours,
            estimated_cost: request.estimated_cost,
            cadence: request.cadence,
            start_date: request.start_date,
            horizon: request.horizon,
            time_of_day: request.time_of_day,
            active: request.active,
            created_at: now,
            updated_at: now,
        };

        let summary = self.controller.on_create(template, now)?;
        Ok(summary.into())
    }

    /// 编辑模板；已生成的工单保持不变
    pub fn update_template(&self, template_id: &str, request: TemplateRequest) -> ApiResult<()> {
        self.update_template_at(template_id, request, Self::local_now())
    }

    pub fn update_template_at(
        &self,
        template_id: &str,
        request: TemplateRequest,
        now: NaiveDateTime,
    ) -> ApiResult<()> {
        Self::validate_request(&request)?;

        // 已存储记录可能本身非法（正是要修正的对象），此时仍允许覆盖
        let created_at = match self.controller.repos().template_repo.find_by_id(template_id) {
            Ok(Some(existing)) => existing.created_at,
            Ok(None) => {
                return Err(ApiError::NotFound(format!(
                    "maintenance_template(id={})不存在",
                    template_id
                )))
            }
            Err(RepositoryError::InvalidRecord { .. }) => now,
            Err(e) => return Err(e.into()),
        };

        let template = RecurrenceTemplate {
            template_id: template_id.to_string(),
            equipment_id: request.equipment_id,
            maintenance_type: request.maintenance_type,
            description: request.description,
            priority: request.priority,
            complexity: request.complexity,
            estimated_hours: request.estimated_hours,
            estimated_cost: request.estimated_cost,
            cadence: request.cadence,
            start_date: request.start_date,
            horizon: request.horizon,
            time_of_day: request.time_of_day,
            active: request.active,
            created_at,
            updated_at: now,
        };

        Ok(self.controller.on_update(template, now)?)
    }

    /// 停用模板
    pub fn deactivate_template(&self, template_id: &str) -> ApiResult<()> {
        self.deactivate_template_at(template_id, Self::local_now())
    }

    pub fn deactivate_template_at(&self, template_id: &str, now: NaiveDateTime) -> ApiResult<()> {
        if template_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("模板ID不能为空".to_string()));
        }
        Ok(self.controller.on_deactivate(template_id, now)?)
    }

    // ==========================================
    // 单次工单 / 排程列表
    // ==========================================

    /// 创建单次工单并直接派工
    pub fn create_one_off_instance(&self, draft: &InstanceDraft) -> ApiResult<GeneratedInstance> {
        self.create_one_off_instance_at(draft, Self::local_now())
    }

    pub fn create_one_off_instance_at(
        &self,
        draft: &InstanceDraft,
        now: NaiveDateTime,
    ) -> ApiResult<GeneratedInstance> {
        Ok(self.controller.create_one_off(draft, now)?)
    }

    /// 排程列表: 区间内的工单 + 与区间重叠的启用模板
    ///
    /// # 返回
    /// 按日期升序；同日模板排在工单之前
    pub fn list_schedule(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<ScheduleListingEntry>> {
        if from > to {
            return Err(ApiError::InvalidInput(format!(
                "日期区间非法: from={} > to={}",
                from, to
            )));
        }

        let repos = self.controller.repos();
        let mut entries = Vec::new();

        for template_id in repos.template_repo.list_active_ids()? {
            let template = match repos.template_repo.find_by_id(&template_id) {
                Ok(Some(t)) => t,
                Ok(None) => continue,
                Err(RepositoryError::InvalidRecord { reason, .. }) => {
                    tracing::warn!(template_id = %template_id, %reason, "模板记录非法，排程列表跳过");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let overlaps = template.start_date <= to
                && template.horizon.end_date().map_or(true, |end| end >= from);
            if !overlaps {
                continue;
            }

            let equipment_label = self.equipment_label(&template.equipment_id)?;
            entries.push(ScheduleListingEntry::Template {
                template,
                equipment_label,
            });
        }

        for instance in repos.instance_repo.list_in_range(from, to)? {
            let equipment_label = self.equipment_label(&instance.equipment_id)?;
            entries.push(ScheduleListingEntry::Instance {
                instance,
                equipment_label,
            });
        }

        // sort_by_key 稳定排序，保持模板在前
        entries.sort_by_key(|e| e.sort_date());
        Ok(entries)
    }

    fn equipment_label(&self, equipment_id: &str) -> ApiResult<String> {
        Ok(self
            .controller
            .repos()
            .equipment_repo
            .find_label(equipment_id)?
            .unwrap_or_else(|| equipment_id.to_string()))
    }

    fn validate_request(request: &TemplateRequest) -> ApiResult<()> {
        if request.equipment_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("设备ID不能为空".to_string()));
        }
        if request.maintenance_type.trim().is_empty() {
            return Err(ApiError::InvalidInput("维保类型不能为空".to_string()));
        }
        if request.estimated_hours < 0.0 || request.estimated_cost < 0.0 {
            return Err(ApiError::InvalidInput("预估工时/费用不能为负数".to_string()));
        }
        Ok(())
    }
}
