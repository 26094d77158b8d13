// ==========================================
// 设备维保排程系统 - 自动派工引擎
// ==========================================
// 职责: 为单个工单选择班次与操作员
// 规则:
// 1) URGENT: 当前时刻所在班次；不在任何班次内时取下一个开班的班次
// 2) NORMAL: 取 已消耗点数 / 负载百分比 最小的班次，平局按配置顺序
// 3) 目标班次累加复杂度点数
// 4) 班次内按名单轮询选人；无人可派 → AssignmentUnavailable(NoOperatorsForShift)，
//    负载仍计入目标班次，调用方回写 assigned_shift_id
// 红线: 紧急优先于负载均衡
// ==========================================

use crate::domain::instance::MaintenanceInstance;
use crate::domain::shift::{week_start_of, ShiftCapacityPlan, ShiftDefinition};
use crate::domain::types::Urgency;
use crate::engine::error::{EngineError, EngineResult, UnassignedReason};
use crate::engine::shift_capacity::ShiftCapacityConfig;
use crate::engine::workload::WorkloadTracker;
use crate::repository::{MaintenanceInstanceRepository, OperatorRosterRepository};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// 派工结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub operator_id: String,
    pub shift_id: String,
}

// ==========================================
// AssignmentEngine - 自动派工引擎
// ==========================================
pub struct AssignmentEngine {
    capacity: Arc<ShiftCapacityConfig>,
    roster_repo: Arc<OperatorRosterRepository>,
    instance_repo: Arc<MaintenanceInstanceRepository>,
}

impl AssignmentEngine {
    pub fn new(
        capacity: Arc<ShiftCapacityConfig>,
        roster_repo: Arc<OperatorRosterRepository>,
        instance_repo: Arc<MaintenanceInstanceRepository>,
    ) -> Self {
        Self {
            capacity,
            roster_repo,
            instance_repo,
        }
    }

    /// 为工单派工
    ///
    /// # 参数
    /// - instance: 待派工工单（已落库或草稿均可，不会在此写库）
    /// - now: 当前时刻（URGENT 判定当前班次）
    /// - tracker: 本次调用内的负载累计器
    ///
    /// # 返回
    /// - Ok(Assignment)
    /// - Err(AssignmentUnavailable): 可恢复，工单保持未派工
    #[instrument(skip(self, instance, tracker), fields(
        instance_id = %instance.instance_id,
        scheduled_date = %instance.scheduled_date,
        urgency = %instance.urgency,
        points = instance.complexity_points
    ))]
    pub fn assign(
        &self,
        instance: &MaintenanceInstance,
        now: NaiveDateTime,
        tracker: &mut WorkloadTracker,
    ) -> EngineResult<Assignment> {
        let shifts = self.capacity.active_shifts()?;
        if shifts.is_empty() {
            return Err(EngineError::AssignmentUnavailable(
                UnassignedReason::NoActiveShifts,
            ));
        }

        let plan = self.capacity.plan_for_date(instance.scheduled_date)?;
        let period = week_start_of(instance.scheduled_date);
        self.ensure_seeded(tracker, period)?;

        // 1. 选班次
        let target = match instance.urgency {
            Urgency::Urgent => select_current_shift(&shifts, now.time()),
            Urgency::Normal => select_balanced_shift(&shifts, plan.as_ref(), tracker, period),
        }
        .ok_or(EngineError::AssignmentUnavailable(
            UnassignedReason::NoActiveShifts,
        ))?;

        // 2. 累加负载
        let consumed = tracker.add(period, &target.shift_id, instance.complexity_points);
        tracing::debug!(shift_id = %target.shift_id, consumed, "班次负载已累加");

        // 3. 班次内轮询选人
        let roster = self.roster_repo.list_operators(&target.shift_id)?;
        let slots = match &plan {
            Some(p) => (p.operator_count(&target.shift_id) as usize).min(roster.len()),
            None => roster.len(),
        };
        if slots == 0 {
            tracing::warn!(shift_id = %target.shift_id, "目标班次无可派工人员");
            return Err(EngineError::AssignmentUnavailable(
                UnassignedReason::NoOperatorsForShift {
                    shift_id: target.shift_id.clone(),
                },
            ));
        }

        let slot = tracker.next_slot(period, &target.shift_id, slots);
        let assignment = Assignment {
            operator_id: roster[slot].clone(),
            shift_id: target.shift_id.clone(),
        };

        tracing::debug!(
            operator_id = %assignment.operator_id,
            shift_id = %assignment.shift_id,
            "派工完成"
        );

        Ok(assignment)
    }

    /// 首次触达某周期时，用已落库工单初始化负载
    fn ensure_seeded(&self, tracker: &mut WorkloadTracker, period: NaiveDate) -> EngineResult<()> {
        if tracker.is_seeded(period) {
            return Ok(());
        }
        let rows = self
            .instance_repo
            .load_by_shift(period, period + Duration::days(6))?;
        tracker.seed(period, &rows);
        Ok(())
    }
}

/// 紧急工单: 当前时刻所在班次，不在任何班次内时取最先开班的班次
///
/// shifts 须按配置顺序排列
pub fn select_current_shift(shifts: &[ShiftDefinition], time: NaiveTime) -> Option<&ShiftDefinition> {
    if let Some(current) = shifts.iter().find(|s| s.contains(time)) {
        return Some(current);
    }

    let mut best: Option<(&ShiftDefinition, i64)> = None;
    for shift in shifts {
        let wait = shift.minutes_until_start(time);
        match best {
            Some((_, best_wait)) if best_wait <= wait => {}
            _ => best = Some((shift, wait)),
        }
    }
    best.map(|(s, _)| s)
}

/// 普通工单: 已消耗 / 负载百分比 最小的班次（平局取配置顺序靠前者）
///
/// 说明：
/// - 计划中百分比为 0 的班次不参与均衡
/// - 无计划或计划未覆盖任何启用班次时，各班次等权
pub fn select_balanced_shift<'a>(
    shifts: &'a [ShiftDefinition],
    plan: Option<&ShiftCapacityPlan>,
    tracker: &WorkloadTracker,
    period: NaiveDate,
) -> Option<&'a ShiftDefinition> {
    let weighted: Vec<(&ShiftDefinition, f64)> = match plan {
        Some(p) => shifts
            .iter()
            .map(|s| (s, f64::from(p.load_percentage(&s.shift_id))))
            .filter(|(_, w)| *w > 0.0)
            .collect(),
        None => Vec::new(),
    };
    let weighted = if weighted.is_empty() {
        shifts.iter().map(|s| (s, 1.0)).collect()
    } else {
        weighted
    };

    let mut best: Option<(&ShiftDefinition, f64)> = None;
    for (shift, weight) in weighted {
        let ratio = f64::from(tracker.consumed(period, &shift.shift_id)) / weight;
        match best {
            Some((_, best_ratio)) if best_ratio <= ratio => {}
            _ => best = Some((shift, ratio)),
        }
    }
    best.map(|(s, _)| s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shift::ShiftAllocation;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn shift(id: &str, start: NaiveTime, end: NaiveTime, order: i32) -> ShiftDefinition {
        ShiftDefinition {
            shift_id: id.to_string(),
            shift_name: id.to_string(),
            start_time: start,
            end_time: end,
            sort_order: order,
            active: true,
        }
    }

    fn three_shifts() -> Vec<ShiftDefinition> {
        vec![
            shift("MORNING", t(6, 0), t(14, 0), 1),
            shift("AFTERNOON", t(14, 0), t(22, 0), 2),
            shift("NIGHT", t(22, 0), t(6, 0), 3),
        ]
    }

    fn period() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn test_current_shift_contains_now() {
        let shifts = three_shifts();
        assert_eq!(select_current_shift(&shifts, t(15, 0)).unwrap().shift_id, "AFTERNOON");
        assert_eq!(select_current_shift(&shifts, t(3, 0)).unwrap().shift_id, "NIGHT");
    }

    #[test]
    fn test_current_shift_falls_back_to_next_start() {
        // 08:00-12:00 与 13:00-17:00 之间有空档
        let shifts = vec![
            shift("AM", t(8, 0), t(12, 0), 1),
            shift("PM", t(13, 0), t(17, 0), 2),
        ];
        assert_eq!(select_current_shift(&shifts, t(12, 30)).unwrap().shift_id, "PM");
        assert_eq!(select_current_shift(&shifts, t(20, 0)).unwrap().shift_id, "AM");
    }

    #[test]
    fn test_balanced_equal_weights_prefers_least_loaded() {
        let shifts = three_shifts();
        let mut tracker = WorkloadTracker::new();

        let mut picks = Vec::new();
        for points in [1u32, 2, 3] {
            let s = select_balanced_shift(&shifts, None, &tracker, period()).unwrap();
            picks.push(s.shift_id.clone());
            tracker.add(period(), &s.shift_id, points);
        }

        assert_eq!(picks, vec!["MORNING", "AFTERNOON", "NIGHT"]);
        assert_eq!(tracker.period_total(period()), 6);
    }

    #[test]
    fn test_balanced_respects_plan_weights() {
        let shifts = three_shifts();
        let plan = ShiftCapacityPlan {
            effective_week_start: period(),
            double_staffed_shift_id: "AFTERNOON".to_string(),
            allocations: vec![
                ShiftAllocation {
                    shift_id: "MORNING".to_string(),
                    load_percentage: 30,
                    operator_count: 1,
                },
                ShiftAllocation {
                    shift_id: "AFTERNOON".to_string(),
                    load_percentage: 60,
                    operator_count: 2,
                },
                ShiftAllocation {
                    shift_id: "NIGHT".to_string(),
                    load_percentage: 10,
                    operator_count: 1,
                },
            ],
            created_at: period().and_hms_opt(0, 0, 0).unwrap(),
        };

        let mut tracker = WorkloadTracker::new();
        tracker.add(period(), "MORNING", 3); // 3/30 = 0.1
        tracker.add(period(), "AFTERNOON", 5); // 5/60 ≈ 0.083
        tracker.add(period(), "NIGHT", 1); // 1/10 = 0.1

        let s = select_balanced_shift(&shifts, Some(&plan), &tracker, period()).unwrap();
        assert_eq!(s.shift_id, "AFTERNOON");
    }

    #[test]
    fn test_balanced_tie_uses_configuration_order() {
        let shifts = three_shifts();
        let mut tracker = WorkloadTracker::new();
        tracker.add(period(), "MORNING", 2);
        tracker.add(period(), "AFTERNOON", 1);
        tracker.add(period(), "NIGHT", 1);

        let s = select_balanced_shift(&shifts, None, &tracker, period()).unwrap();
        assert_eq!(s.shift_id, "AFTERNOON");
    }
}
