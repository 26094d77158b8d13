// ==========================================
// 设备维保排程系统 - 班次负载累计器
// ==========================================
// 职责: 累计每个计划周期（周）内各班次已消耗的复杂度点数，
//       并维护班次内的轮询派工游标
// 作用域: 单次调用内有效（一次生成 / 一次扫描），不跨调用共享
// ==========================================

use crate::repository::instance_repo::ShiftLoadRow;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

type PeriodShiftKey = (NaiveDate, String);

#[derive(Debug, Default)]
pub struct WorkloadTracker {
    consumed: HashMap<PeriodShiftKey, u32>,
    cursors: HashMap<PeriodShiftKey, usize>,
    seeded_periods: HashSet<NaiveDate>,
}

impl WorkloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 周期是否已用存储中的历史负载初始化
    pub fn is_seeded(&self, period: NaiveDate) -> bool {
        self.seeded_periods.contains(&period)
    }

    /// 用已持久化的负载初始化周期（同一周期只初始化一次）
    ///
    /// 说明: 轮询游标从该班次已派工数量继续，避免每次调用都从名单第一人开始
    pub fn seed(&mut self, period: NaiveDate, rows: &[ShiftLoadRow]) {
        if !self.seeded_periods.insert(period) {
            return;
        }
        for row in rows {
            let key = (period, row.shift_id.clone());
            *self.consumed.entry(key.clone()).or_insert(0) += row.consumed_points;
            *self.cursors.entry(key).or_insert(0) += row.assigned_count as usize;
        }
    }

    /// 班次在周期内已消耗的点数
    pub fn consumed(&self, period: NaiveDate, shift_id: &str) -> u32 {
        self.consumed
            .get(&(period, shift_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// 累加点数，返回累加后的值
    pub fn add(&mut self, period: NaiveDate, shift_id: &str, points: u32) -> u32 {
        let entry = self
            .consumed
            .entry((period, shift_id.to_string()))
            .or_insert(0);
        *entry += points;
        *entry
    }

    /// 周期内所有班次的点数合计
    pub fn period_total(&self, period: NaiveDate) -> u32 {
        self.consumed
            .iter()
            .filter(|((p, _), _)| *p == period)
            .map(|(_, v)| *v)
            .sum()
    }

    /// 取下一个轮询位置（0..slots），并推进游标
    ///
    /// slots 必须 > 0
    pub fn next_slot(&mut self, period: NaiveDate, shift_id: &str, slots: usize) -> usize {
        let cursor = self
            .cursors
            .entry((period, shift_id.to_string()))
            .or_insert(0);
        let slot = *cursor % slots;
        *cursor += 1;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn test_add_accumulates_per_period_and_shift() {
        let mut tracker = WorkloadTracker::new();
        assert_eq!(tracker.add(week(), "DAY", 1), 1);
        assert_eq!(tracker.add(week(), "DAY", 2), 3);
        assert_eq!(tracker.add(week(), "NIGHT", 3), 3);

        let next_week = week() + chrono::Duration::days(7);
        assert_eq!(tracker.consumed(next_week, "DAY"), 0);
        assert_eq!(tracker.period_total(week()), 6);
    }

    #[test]
    fn test_seed_only_once() {
        let mut tracker = WorkloadTracker::new();
        let rows = vec![ShiftLoadRow {
            shift_id: "DAY".to_string(),
            consumed_points: 5,
            assigned_count: 3,
        }];
        tracker.seed(week(), &rows);
        tracker.seed(week(), &rows);

        assert!(tracker.is_seeded(week()));
        assert_eq!(tracker.consumed(week(), "DAY"), 5);
        // 已派工 3 次，2 人名单下一位是第 2 人（下标 1）
        assert_eq!(tracker.next_slot(week(), "DAY", 2), 1);
    }

    #[test]
    fn test_round_robin_wraps() {
        let mut tracker = WorkloadTracker::new();
        let slots: Vec<usize> = (0..5).map(|_| tracker.next_slot(week(), "DAY", 2)).collect();
        assert_eq!(slots, vec![0, 1, 0, 1, 0]);
    }
}
