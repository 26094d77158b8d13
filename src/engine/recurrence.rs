// ==========================================
// 设备维保排程系统 - 周期展开引擎
// ==========================================
// 职责: 把周期模板展开为窗口内的具体日期，并剔除已物化的日期
// 输入: 模板 + 今天 + 窗口结束日
// 输出: 升序的候选日期列表
// 窗口: [max(今天, 开始日), min(窗口结束日, 期限结束日)]
// ==========================================

use crate::domain::template::{Cadence, RecurrenceTemplate};
use crate::engine::error::EngineResult;
use crate::repository::MaintenanceInstanceRepository;
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// RecurrenceExpander - 周期展开引擎
// ==========================================
pub struct RecurrenceExpander {
    instance_repo: Arc<MaintenanceInstanceRepository>,
}

impl RecurrenceExpander {
    pub fn new(instance_repo: Arc<MaintenanceInstanceRepository>) -> Self {
        Self { instance_repo }
    }

    /// 展开模板，返回尚未物化的日期（升序）
    ///
    /// 规则：
    /// 1) 周期定义非法 → Validation
    /// 2) 有效窗口为空（如期限结束日早于有效开始日）→ 空列表，不报错
    /// 3) 每个候选日期都先查存储，已存在的直接丢弃
    #[instrument(skip(self, template), fields(
        template_id = %template.template_id,
        cadence = %template.cadence
    ))]
    pub fn expand(
        &self,
        template: &RecurrenceTemplate,
        today: NaiveDate,
        window_end: NaiveDate,
    ) -> EngineResult<Vec<NaiveDate>> {
        template.cadence.validate()?;

        let (window_start, window_end) = match effective_window(template, today, window_end) {
            Some(w) => w,
            None => {
                tracing::debug!("有效窗口为空，跳过展开");
                return Ok(Vec::new());
            }
        };

        let latest = match template.cadence {
            Cadence::Daily { .. } => self
                .instance_repo
                .latest_scheduled_date(&template.template_id)?,
            _ => None,
        };

        let candidates = candidate_dates(template, latest, window_start, window_end);
        let candidate_count = candidates.len();

        let mut dates = Vec::with_capacity(candidate_count);
        for date in candidates {
            if self.instance_repo.exists(&template.template_id, date)? {
                continue;
            }
            dates.push(date);
        }

        tracing::debug!(
            %window_start,
            %window_end,
            candidate_count,
            new_count = dates.len(),
            "周期展开完成"
        );

        Ok(dates)
    }
}

/// 计算有效窗口（闭区间），为空时返回 None
pub fn effective_window(
    template: &RecurrenceTemplate,
    today: NaiveDate,
    window_end: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    let start = today.max(template.start_date);
    let end = match template.horizon.end_date() {
        Some(horizon_end) => window_end.min(horizon_end),
        None => window_end,
    };

    if end < start {
        None
    } else {
        Some((start, end))
    }
}

/// 按周期生成窗口内的候选日期（升序，未去重存储）
///
/// # 参数
/// - latest_materialized: 最近一次已物化日期，仅 DAILY 作为步进锚点
/// - window_start / window_end: 闭区间
pub fn candidate_dates(
    template: &RecurrenceTemplate,
    latest_materialized: Option<NaiveDate>,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<NaiveDate> {
    match &template.cadence {
        Cadence::Daily { interval } => {
            let anchor = latest_materialized
                .filter(|d| *d >= template.start_date)
                .unwrap_or(template.start_date);
            daily_dates(anchor, *interval, window_start, window_end)
        }
        Cadence::Weekly { weekdays, .. } => {
            let mut dates = Vec::new();
            let mut day = window_start;
            while day <= window_end {
                let weekday = day.weekday().num_days_from_sunday() as u8;
                if weekdays.contains(&weekday) {
                    dates.push(day);
                }
                day += Duration::days(1);
            }
            dates
        }
        Cadence::Monthly { interval } => {
            month_step_dates(template.start_date, *interval, window_start, window_end)
        }
        Cadence::Annual { interval } => match interval.checked_mul(12) {
            Some(months) => month_step_dates(template.start_date, months, window_start, window_end),
            None => Vec::new(),
        },
    }
}

fn daily_dates(
    anchor: NaiveDate,
    interval: u32,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<NaiveDate> {
    let step = i64::from(interval.max(1));
    let mut day = anchor;

    // 跳到窗口内第一个落在步进网格上的日期
    if day < window_start {
        let gap = (window_start - day).num_days();
        let steps = (gap + step - 1) / step;
        day += Duration::days(steps * step);
    }

    let mut dates = Vec::new();
    while day <= window_end {
        dates.push(day);
        day += Duration::days(step);
    }
    dates
}

/// 从锚点按 k * months 步进（每次都从锚点计算，月末截断不会累积漂移）
fn month_step_dates(
    anchor: NaiveDate,
    months: u32,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<NaiveDate> {
    let months = months.max(1);
    let mut dates = Vec::new();

    for k in 0u32.. {
        let offset = match k.checked_mul(months) {
            Some(o) => o,
            None => break,
        };
        let day = match anchor.checked_add_months(Months::new(offset)) {
            Some(d) => d,
            None => break,
        };
        if day > window_end {
            break;
        }
        if day >= window_start {
            dates.push(day);
        }
    }

    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::Horizon;
    use crate::domain::types::Complexity;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn template(cadence: Cadence, start: NaiveDate, horizon: Horizon) -> RecurrenceTemplate {
        let ts = start.and_hms_opt(0, 0, 0).unwrap();
        RecurrenceTemplate {
            template_id: "T1".to_string(),
            equipment_id: "EQ-1".to_string(),
            maintenance_type: "PREVENTIVE".to_string(),
            description: None,
            priority: 0,
            complexity: Complexity::Low,
            estimated_hours: 1.0,
            estimated_cost: 0.0,
            cadence,
            start_date: start,
            horizon,
            time_of_day: None,
            active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_weekly_mon_wed_fri_january() {
        let t = template(
            Cadence::Weekly {
                weekdays: [1u8, 3, 5].into_iter().collect(),
                interval: 1,
            },
            d(2025, 1, 6),
            Horizon::Bounded {
                end_date: d(2025, 1, 31),
            },
        );
        let (start, end) = effective_window(&t, d(2025, 1, 6), d(2025, 2, 2)).unwrap();
        let dates = candidate_dates(&t, None, start, end);

        assert_eq!(dates.len(), 12);
        assert_eq!(dates.first(), Some(&d(2025, 1, 6)));
        assert_eq!(dates.last(), Some(&d(2025, 1, 31)));
        for date in &dates {
            let wd = date.weekday().num_days_from_sunday();
            assert!([1, 3, 5].contains(&wd), "{} 不是周一/三/五", date);
        }
    }

    #[test]
    fn test_weekly_interval_not_applied() {
        let t = template(
            Cadence::Weekly {
                weekdays: [1u8].into_iter().collect(),
                interval: 2,
            },
            d(2025, 1, 6),
            Horizon::Unbounded,
        );
        let dates = candidate_dates(&t, None, d(2025, 1, 6), d(2025, 1, 26));
        assert_eq!(dates, vec![d(2025, 1, 6), d(2025, 1, 13), d(2025, 1, 20)]);
    }

    #[test]
    fn test_daily_steps_from_start_into_window() {
        let t = template(Cadence::Daily { interval: 3 }, d(2025, 1, 1), Horizon::Unbounded);
        let dates = candidate_dates(&t, None, d(2025, 1, 5), d(2025, 1, 12));
        assert_eq!(dates, vec![d(2025, 1, 7), d(2025, 1, 10)]);
    }

    #[test]
    fn test_daily_steps_from_latest_materialized() {
        let t = template(Cadence::Daily { interval: 2 }, d(2025, 1, 1), Horizon::Unbounded);
        let dates = candidate_dates(&t, Some(d(2025, 1, 8)), d(2025, 1, 8), d(2025, 1, 13));
        assert_eq!(dates, vec![d(2025, 1, 8), d(2025, 1, 10), d(2025, 1, 12)]);
    }

    #[test]
    fn test_monthly_clamps_month_end_without_drift() {
        let t = template(Cadence::Monthly { interval: 1 }, d(2025, 1, 31), Horizon::Unbounded);
        let dates = candidate_dates(&t, None, d(2025, 1, 31), d(2025, 4, 30));
        assert_eq!(
            dates,
            vec![d(2025, 1, 31), d(2025, 2, 28), d(2025, 3, 31), d(2025, 4, 30)]
        );
    }

    #[test]
    fn test_annual_interval() {
        let t = template(Cadence::Annual { interval: 2 }, d(2020, 3, 15), Horizon::Unbounded);
        let dates = candidate_dates(&t, None, d(2021, 1, 1), d(2026, 12, 31));
        assert_eq!(dates, vec![d(2022, 3, 15), d(2024, 3, 15), d(2026, 3, 15)]);
    }

    #[test]
    fn test_horizon_before_effective_start_is_empty() {
        let t = template(
            Cadence::Daily { interval: 1 },
            d(2025, 1, 1),
            Horizon::Bounded {
                end_date: d(2025, 1, 10),
            },
        );
        assert!(effective_window(&t, d(2025, 2, 1), d(2025, 3, 1)).is_none());
    }

    #[test]
    fn test_unbounded_is_capped_by_window() {
        let t = template(Cadence::Daily { interval: 1 }, d(2025, 1, 1), Horizon::Unbounded);
        let (start, end) = effective_window(&t, d(2025, 1, 1), d(2025, 1, 7)).unwrap();
        assert_eq!(candidate_dates(&t, None, start, end).len(), 7);
    }
}
