// ==========================================
// 设备维保排程系统 - 班次产能配置
// ==========================================
// 职责: 按周配置双人班，推导各班次负载百分比与人数，并按日期查询生效计划
// 红线:
// - 生效日期必须是周一，否则不落库
// - 任何被接受的计划，负载百分比合计必须为 100
// ==========================================

use crate::config::{LoadDistributionTable, ScheduleConfigReader};
use crate::domain::shift::{ShiftAllocation, ShiftCapacityPlan, ShiftDefinition};
use crate::domain::types::ValidationFailure;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::ShiftRepository;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ShiftCapacityConfig - 班次产能配置
// ==========================================
pub struct ShiftCapacityConfig {
    shift_repo: Arc<ShiftRepository>,
    config: Arc<dyn ScheduleConfigReader>,
}

impl ShiftCapacityConfig {
    pub fn new(shift_repo: Arc<ShiftRepository>, config: Arc<dyn ScheduleConfigReader>) -> Self {
        Self { shift_repo, config }
    }

    /// 配置某一周的双人班
    ///
    /// # 参数
    /// - double_staffed_shift_id: 双人班班次
    /// - effective_date: 生效日期（必须是周一）
    /// - now: 创建时间
    ///
    /// # 返回
    /// - Ok(plan): 已落库的周计划
    /// - Err(Validation(MustConfigureOnMonday)): 非周一，不落库
    /// - Err(NotFound): 双人班班次不存在或未启用
    #[instrument(skip(self, now))]
    pub fn set_weekly_plan(
        &self,
        double_staffed_shift_id: &str,
        effective_date: NaiveDate,
        now: NaiveDateTime,
    ) -> EngineResult<ShiftCapacityPlan> {
        if effective_date.weekday() != Weekday::Mon {
            return Err(EngineError::Validation(
                ValidationFailure::MustConfigureOnMonday {
                    effective_date: effective_date.to_string(),
                },
            ));
        }

        let shifts = self.shift_repo.list_active_shifts()?;
        if !shifts.iter().any(|s| s.shift_id == double_staffed_shift_id) {
            return Err(EngineError::NotFound {
                entity: "shift_definition".to_string(),
                id: double_staffed_shift_id.to_string(),
            });
        }

        let table = self.config.get_load_distribution()?;
        let allocations = build_allocations(&table, &shifts, double_staffed_shift_id)?;

        let plan = ShiftCapacityPlan {
            effective_week_start: effective_date,
            double_staffed_shift_id: double_staffed_shift_id.to_string(),
            allocations,
            created_at: now,
        };

        let total = plan.total_percentage();
        if total != 100 {
            return Err(EngineError::Validation(
                ValidationFailure::CapacityPercentagesMustSum100 { actual: total },
            ));
        }

        self.shift_repo.save_plan(&plan)?;

        tracing::info!(
            week_start = %plan.effective_week_start,
            double_staffed = %plan.double_staffed_shift_id,
            "周班次计划已保存"
        );

        Ok(plan)
    }

    /// 查询日期所适用的周计划
    pub fn plan_for_date(&self, date: NaiveDate) -> EngineResult<Option<ShiftCapacityPlan>> {
        Ok(self.shift_repo.find_plan_for_date(date)?)
    }

    /// 启用班次（按配置顺序）
    pub fn active_shifts(&self) -> EngineResult<Vec<ShiftDefinition>> {
        Ok(self.shift_repo.list_active_shifts()?)
    }
}

/// 按分配表推导各班次负载与人数（结果按班次配置顺序）
///
/// 规则：
/// - 双人班: double_staffed_share% / double_staffed_operators 人
/// - 其余班次按配置顺序依次取 remaining_shares，人数 single_operators
pub fn build_allocations(
    table: &LoadDistributionTable,
    shifts: &[ShiftDefinition],
    double_staffed_shift_id: &str,
) -> Result<Vec<ShiftAllocation>, ValidationFailure> {
    table.validate()?;

    let remaining_count = shifts
        .iter()
        .filter(|s| s.shift_id != double_staffed_shift_id)
        .count();
    if remaining_count != table.remaining_shares.len() {
        return Err(ValidationFailure::InvalidField {
            field: crate::config::config_keys::LOAD_DISTRIBUTION.to_string(),
            detail: format!(
                "其余班次数量={}，但分配表提供了{}个份额",
                remaining_count,
                table.remaining_shares.len()
            ),
        });
    }

    let mut remaining_shares = table.remaining_shares.iter();
    let allocations = shifts
        .iter()
        .map(|shift| {
            if shift.shift_id == double_staffed_shift_id {
                ShiftAllocation {
                    shift_id: shift.shift_id.clone(),
                    load_percentage: table.double_staffed_share,
                    operator_count: table.double_staffed_operators,
                }
            } else {
                ShiftAllocation {
                    shift_id: shift.shift_id.clone(),
                    load_percentage: remaining_shares.next().copied().unwrap_or(0),
                    operator_count: table.single_operators,
                }
            }
        })
        .collect();

    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn shift(id: &str, order: i32) -> ShiftDefinition {
        ShiftDefinition {
            shift_id: id.to_string(),
            shift_name: id.to_string(),
            start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            sort_order: order,
            active: true,
        }
    }

    #[test]
    fn test_build_allocations_default_table() {
        let shifts = vec![shift("A", 1), shift("B", 2), shift("C", 3)];
        let allocations =
            build_allocations(&LoadDistributionTable::default(), &shifts, "B").unwrap();

        assert_eq!(allocations.len(), 3);
        assert_eq!(allocations[0].shift_id, "A");
        assert_eq!(allocations[0].load_percentage, 30);
        assert_eq!(allocations[0].operator_count, 1);
        assert_eq!(allocations[1].load_percentage, 60);
        assert_eq!(allocations[1].operator_count, 2);
        assert_eq!(allocations[2].load_percentage, 10);
        assert_eq!(
            allocations.iter().map(|a| a.load_percentage).sum::<u32>(),
            100
        );
    }

    #[test]
    fn test_build_allocations_rejects_share_count_mismatch() {
        let shifts = vec![shift("A", 1), shift("B", 2)];
        let result = build_allocations(&LoadDistributionTable::default(), &shifts, "A");
        assert!(matches!(result, Err(ValidationFailure::InvalidField { .. })));
    }
}
