// ==========================================
// 设备维保排程系统 - 班次与产能计划领域模型
// ==========================================
// 职责: 班次时间窗 + 按周生效的班次产能计划
// 红线: 计划按 effective_week_start (周一) 存多份，不做原地覆盖
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: i64 = 24 * 60;

// ==========================================
// ShiftDefinition - 班次定义
// ==========================================
// 时间窗: [start_time, end_time)，end <= start 表示跨零点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftDefinition {
    pub shift_id: String,
    pub shift_name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub sort_order: i32, // 配置顺序，平局时的优先级
    pub active: bool,
}

impl ShiftDefinition {
    /// 判断时刻是否落在班次时间窗内
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start_time < self.end_time {
            self.start_time <= time && time < self.end_time
        } else if self.start_time > self.end_time {
            time >= self.start_time || time < self.end_time
        } else {
            // start == end: 全天班
            true
        }
    }

    /// 距离本班次下一次开始的分钟数（0..1440）
    pub fn minutes_until_start(&self, time: NaiveTime) -> i64 {
        let now = minute_of_day(time);
        let start = minute_of_day(self.start_time);
        (start - now).rem_euclid(MINUTES_PER_DAY)
    }
}

fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

// ==========================================
// ShiftAllocation - 单班次分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAllocation {
    pub shift_id: String,
    pub load_percentage: u32,
    pub operator_count: u32,
}

// ==========================================
// ShiftCapacityPlan - 周产能计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCapacityPlan {
    pub effective_week_start: NaiveDate, // 必须是周一
    pub double_staffed_shift_id: String,
    pub allocations: Vec<ShiftAllocation>,
    pub created_at: NaiveDateTime,
}

impl ShiftCapacityPlan {
    /// 班次负载百分比（计划未覆盖的班次为 0）
    pub fn load_percentage(&self, shift_id: &str) -> u32 {
        self.allocations
            .iter()
            .find(|a| a.shift_id == shift_id)
            .map(|a| a.load_percentage)
            .unwrap_or(0)
    }

    /// 班次配置人数（计划未覆盖的班次为 0）
    pub fn operator_count(&self, shift_id: &str) -> u32 {
        self.allocations
            .iter()
            .find(|a| a.shift_id == shift_id)
            .map(|a| a.operator_count)
            .unwrap_or(0)
    }

    pub fn total_percentage(&self) -> u64 {
        self.allocations
            .iter()
            .map(|a| u64::from(a.load_percentage))
            .sum()
    }

    /// 计划所在周的最后一天（周日）
    pub fn effective_week_end(&self) -> NaiveDate {
        self.effective_week_start + Duration::days(6)
    }
}

/// 取日期所在周的周一
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: (u32, u32), end: (u32, u32)) -> ShiftDefinition {
        ShiftDefinition {
            shift_id: "S".to_string(),
            shift_name: "S".to_string(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            sort_order: 0,
            active: true,
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_day_shift_window_is_half_open() {
        let day = shift((6, 0), (14, 0));
        assert!(day.contains(t(6, 0)));
        assert!(day.contains(t(13, 59)));
        assert!(!day.contains(t(14, 0)));
    }

    #[test]
    fn test_overnight_shift_window() {
        let night = shift((22, 0), (6, 0));
        assert!(night.contains(t(23, 30)));
        assert!(night.contains(t(2, 0)));
        assert!(!night.contains(t(6, 0)));
        assert!(!night.contains(t(12, 0)));
    }

    #[test]
    fn test_minutes_until_start_wraps() {
        let day = shift((6, 0), (14, 0));
        assert_eq!(day.minutes_until_start(t(5, 30)), 30);
        assert_eq!(day.minutes_until_start(t(7, 0)), 23 * 60);
    }

    #[test]
    fn test_week_start_of() {
        // 2025-01-08 是周三
        let wed = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        assert_eq!(week_start_of(wed), NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        let mon = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(week_start_of(mon), mon);
    }
}
