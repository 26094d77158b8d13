// ==========================================
// 设备维保排程系统 - 模板生命周期编排
// ==========================================
// 职责: 模板创建 / 手动重新生成 / 停用 / 周期扫描 的编排
// 流程: 展开日期 → 逐日创建工单 → 派工 → 汇总
// 红线:
// - 重复生成幂等: (template_id, 日期) 冲突视为"已生成"，跳过
// - 派工失败不回滚工单创建，只在汇总中标记未派工
// - 扫描时单个模板失败不影响其他模板
// ==========================================

use crate::config::ScheduleConfigReader;
use crate::domain::instance::{InstanceDraft, MaintenanceInstance};
use crate::domain::template::RecurrenceTemplate;
use crate::domain::types::ValidationFailure;
use crate::engine::assignment::{Assignment, AssignmentEngine};
use crate::engine::error::{EngineError, EngineResult, UnassignedReason};
use crate::engine::recurrence::RecurrenceExpander;
use crate::engine::repositories::MaintenanceRepositories;
use crate::engine::shift_capacity::ShiftCapacityConfig;
use crate::engine::workload::WorkloadTracker;
use crate::repository::RepositoryError;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 汇总结构
// ==========================================

/// 单个工单的派工结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentOutcome {
    Assigned { operator_id: String, shift_id: String },
    Unassigned { reason: UnassignedReason },
}

/// 已创建的工单 + 派工结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedInstance {
    pub instance: MaintenanceInstance,
    pub outcome: AssignmentOutcome,
}

/// 单模板生成汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub template_id: String,
    pub instances_created: usize,
    pub assignment_failures: usize,
    pub conflicts_skipped: usize,
    pub instances: Vec<GeneratedInstance>,
}

/// 扫描中单个模板的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFailure {
    pub template_id: String,
    pub reason: String,
}

/// 周期扫描汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    pub templates_processed: usize,
    pub instances_created: usize,
    pub assignment_failures: usize,
    pub failures: Vec<TemplateFailure>,
}

// ==========================================
// TemplateLifecycleController - 模板生命周期编排
// ==========================================
pub struct TemplateLifecycleController {
    repos: MaintenanceRepositories,
    config: Arc<dyn ScheduleConfigReader>,
    expander: RecurrenceExpander,
    capacity: Arc<ShiftCapacityConfig>,
    assignment: AssignmentEngine,
}

impl TemplateLifecycleController {
    pub fn new(repos: MaintenanceRepositories, config: Arc<dyn ScheduleConfigReader>) -> Self {
        let capacity = Arc::new(ShiftCapacityConfig::new(
            repos.shift_repo.clone(),
            config.clone(),
        ));
        let expander = RecurrenceExpander::new(repos.instance_repo.clone());
        let assignment = AssignmentEngine::new(
            capacity.clone(),
            repos.roster_repo.clone(),
            repos.instance_repo.clone(),
        );

        Self {
            repos,
            config,
            expander,
            capacity,
            assignment,
        }
    }

    pub fn capacity(&self) -> &ShiftCapacityConfig {
        &self.capacity
    }

    pub fn assignment(&self) -> &AssignmentEngine {
        &self.assignment
    }

    pub fn repos(&self) -> &MaintenanceRepositories {
        &self.repos
    }

    // ==========================================
    // 生命周期操作
    // ==========================================

    /// 创建模板；启用状态下按默认窗口立即生成
    #[instrument(skip(self, template, now), fields(template_id = %template.template_id))]
    pub fn on_create(
        &self,
        template: RecurrenceTemplate,
        now: NaiveDateTime,
    ) -> EngineResult<GenerationSummary> {
        template.validate()?;
        // 默认窗口来自配置，先校验再落库
        let window_end = if template.active {
            let weeks_ahead = self.config.get_default_weeks_ahead()?;
            Some(self.resolve_window_end(now.date(), weeks_ahead)?)
        } else {
            None
        };

        self.repos.template_repo.insert(&template)?;
        tracing::info!(cadence = %template.cadence, active = template.active, "模板已创建");

        let Some(window_end) = window_end else {
            return Ok(GenerationSummary {
                template_id: template.template_id,
                ..GenerationSummary::default()
            });
        };

        let mut tracker = WorkloadTracker::new();
        self.generate(&template, window_end, now, &mut tracker)
    }

    /// 编辑模板（周期/期限/内容），不触碰已生成的工单
    #[instrument(skip(self, template, now), fields(template_id = %template.template_id))]
    pub fn on_update(&self, template: RecurrenceTemplate, now: NaiveDateTime) -> EngineResult<()> {
        template.validate()?;
        let updated = RecurrenceTemplate {
            updated_at: now,
            ..template
        };
        self.repos.template_repo.update(&updated)?;
        Ok(())
    }

    /// 手动重新生成（幂等）
    ///
    /// # 返回
    /// - Err(NotFound): 模板不存在或已停用
    /// - Err(Validation): 存储的周期定义非法 / 窗口超出范围
    #[instrument(skip(self, now))]
    pub fn on_regenerate(
        &self,
        template_id: &str,
        weeks_ahead: u32,
        now: NaiveDateTime,
    ) -> EngineResult<GenerationSummary> {
        let window_end = self.resolve_window_end(now.date(), weeks_ahead)?;
        let mut tracker = WorkloadTracker::new();
        self.regenerate_with(template_id, window_end, now, &mut tracker)
    }

    /// 停用模板：停止后续展开，已有工单不变
    #[instrument(skip(self, now))]
    pub fn on_deactivate(&self, template_id: &str, now: NaiveDateTime) -> EngineResult<()> {
        self.repos.template_repo.set_active(template_id, false, now)?;
        tracing::info!("模板已停用");
        Ok(())
    }

    /// 扫描全部启用模板并补齐窗口
    ///
    /// 说明: 同一次扫描共享一个负载累计器，后处理的模板能看到先处理模板的负载
    #[instrument(skip(self, now))]
    pub fn on_extend_all(&self, weeks_ahead: u32, now: NaiveDateTime) -> EngineResult<SweepSummary> {
        let window_end = self.resolve_window_end(now.date(), weeks_ahead)?;
        let template_ids = self.repos.template_repo.list_active_ids()?;

        let mut tracker = WorkloadTracker::new();
        let mut summary = SweepSummary::default();

        for template_id in template_ids {
            match self.regenerate_with(&template_id, window_end, now, &mut tracker) {
                Ok(result) => {
                    summary.templates_processed += 1;
                    summary.instances_created += result.instances_created;
                    summary.assignment_failures += result.assignment_failures;
                }
                Err(e) => {
                    tracing::warn!(template_id = %template_id, error = %e, "模板生成失败，继续处理其他模板");
                    summary.failures.push(TemplateFailure {
                        template_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            templates_processed = summary.templates_processed,
            instances_created = summary.instances_created,
            failures = summary.failures.len(),
            "周期扫描完成"
        );

        Ok(summary)
    }

    /// 创建单次工单（不经过展开），直接派工
    #[instrument(skip(self, draft, now), fields(scheduled_date = %draft.scheduled_date))]
    pub fn create_one_off(
        &self,
        draft: &InstanceDraft,
        now: NaiveDateTime,
    ) -> EngineResult<GeneratedInstance> {
        let equipment_ok = draft
            .equipment_id
            .as_deref()
            .map(|e| !e.trim().is_empty())
            .unwrap_or(false);
        if !equipment_ok {
            return Err(EngineError::Validation(ValidationFailure::InvalidField {
                field: "equipment_id".to_string(),
                detail: "单次工单必须指定设备".to_string(),
            }));
        }

        let mut instance = MaintenanceInstance::one_off(draft, now);
        self.repos.instance_repo.insert(&instance)?;

        let mut tracker = WorkloadTracker::new();
        let outcome = self.assign_and_record(&mut instance, now, &mut tracker)?;
        Ok(GeneratedInstance { instance, outcome })
    }

    /// 仅计算派工（不落库）
    pub fn preview_assignment(
        &self,
        draft: &InstanceDraft,
        now: NaiveDateTime,
    ) -> EngineResult<Assignment> {
        let instance = MaintenanceInstance::one_off(draft, now);
        let mut tracker = WorkloadTracker::new();
        self.assignment.assign(&instance, now, &mut tracker)
    }

    // ==========================================
    // 内部流程
    // ==========================================

    /// 校验窗口周数并计算窗口结束日
    ///
    /// # 返回
    /// - Err(Validation(WindowOutOfRange)): 周数为 0、超过上限，或结束日超出日历范围
    fn resolve_window_end(&self, today: NaiveDate, weeks_ahead: u32) -> EngineResult<NaiveDate> {
        let max_weeks_ahead = self.config.get_max_weeks_ahead()?;
        let out_of_range = || {
            EngineError::Validation(ValidationFailure::WindowOutOfRange {
                weeks_ahead,
                max_weeks_ahead,
            })
        };

        if weeks_ahead == 0 || weeks_ahead > max_weeks_ahead {
            return Err(out_of_range());
        }
        window_end_for(today, weeks_ahead).ok_or_else(out_of_range)
    }

    fn regenerate_with(
        &self,
        template_id: &str,
        window_end: NaiveDate,
        now: NaiveDateTime,
        tracker: &mut WorkloadTracker,
    ) -> EngineResult<GenerationSummary> {
        let template = self
            .repos
            .template_repo
            .find_by_id(template_id)?
            .filter(|t| t.active)
            .ok_or_else(|| EngineError::NotFound {
                entity: "maintenance_template(active)".to_string(),
                id: template_id.to_string(),
            })?;

        self.generate(&template, window_end, now, tracker)
    }

    /// 展开 → 创建 → 派工（按日期升序）
    fn generate(
        &self,
        template: &RecurrenceTemplate,
        window_end: NaiveDate,
        now: NaiveDateTime,
        tracker: &mut WorkloadTracker,
    ) -> EngineResult<GenerationSummary> {
        let dates = self.expander.expand(template, now.date(), window_end)?;

        let mut summary = GenerationSummary {
            template_id: template.template_id.clone(),
            ..GenerationSummary::default()
        };

        for date in dates {
            let mut instance = MaintenanceInstance::from_template(template, date, now);

            match self.repos.instance_repo.insert(&instance) {
                Ok(()) => {}
                Err(RepositoryError::UniqueConstraintViolation(_)) => {
                    // 并发写入方已生成
                    let conflict = EngineError::Conflict {
                        template_id: template.template_id.clone(),
                        scheduled_date: date,
                    };
                    tracing::debug!(%conflict, "工单已存在，跳过");
                    summary.conflicts_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let outcome = self.assign_and_record(&mut instance, now, tracker)?;
            summary.instances_created += 1;
            if matches!(outcome, AssignmentOutcome::Unassigned { .. }) {
                summary.assignment_failures += 1;
            }
            summary.instances.push(GeneratedInstance { instance, outcome });
        }

        tracing::info!(
            template_id = %summary.template_id,
            instances_created = summary.instances_created,
            assignment_failures = summary.assignment_failures,
            conflicts_skipped = summary.conflicts_skipped,
            "模板生成完成"
        );

        Ok(summary)
    }

    /// 派工并回写；无人可派时工单保留为未派工（已选定的目标班次照常回写）
    fn assign_and_record(
        &self,
        instance: &mut MaintenanceInstance,
        now: NaiveDateTime,
        tracker: &mut WorkloadTracker,
    ) -> EngineResult<AssignmentOutcome> {
        match self.assignment.assign(instance, now, tracker) {
            Ok(Assignment {
                operator_id,
                shift_id,
            }) => {
                self.repos.instance_repo.update_assignment(
                    &instance.instance_id,
                    Some(&operator_id),
                    Some(&shift_id),
                )?;
                instance.assigned_operator_id = Some(operator_id.clone());
                instance.assigned_shift_id = Some(shift_id.clone());
                Ok(AssignmentOutcome::Assigned {
                    operator_id,
                    shift_id,
                })
            }
            Err(EngineError::AssignmentUnavailable(reason)) => {
                // 目标班次回写，操作员留空
                if let UnassignedReason::NoOperatorsForShift { shift_id } = &reason {
                    self.repos.instance_repo.update_assignment(
                        &instance.instance_id,
                        None,
                        Some(shift_id),
                    )?;
                    instance.assigned_shift_id = Some(shift_id.clone());
                }
                tracing::warn!(
                    instance_id = %instance.instance_id,
                    scheduled_date = %instance.scheduled_date,
                    %reason,
                    "工单已创建但未派工，需人工处理"
                );
                Ok(AssignmentOutcome::Unassigned { reason })
            }
            Err(e) => Err(e),
        }
    }
}

/// 生成窗口结束日: 含今天在内的 weeks_ahead * 7 天
///
/// weeks_ahead 为 0 或结束日超出日历范围时返回 None
pub fn window_end_for(today: NaiveDate, weeks_ahead: u32) -> Option<NaiveDate> {
    if weeks_ahead == 0 {
        return None;
    }
    let days = Duration::try_days(i64::from(weeks_ahead) * 7 - 1)?;
    today.checked_add_signed(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_end_for() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(
            window_end_for(today, 4),
            NaiveDate::from_ymd_opt(2025, 2, 2)
        );
        assert_eq!(window_end_for(today, 1), NaiveDate::from_ymd_opt(2025, 1, 12));
    }

    #[test]
    fn test_window_end_for_out_of_calendar_range() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(window_end_for(today, 0), None);
        assert_eq!(window_end_for(today, u32::MAX), None);
    }
}
