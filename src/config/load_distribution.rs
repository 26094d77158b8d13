use crate::domain::types::ValidationFailure;
use serde::{Deserialize, Serialize};

/// 双人班负载分配表（持久化对象）
///
/// 存储位置：config_kv（scope_id='global'，key='shift/load_distribution'）
///
/// 说明：
/// - 双人班固定占 double_staffed_share%，其余班次按配置顺序依次取 remaining_shares
/// - 剩余份额的拆分口径尚待业务确认（历史数据里同时出现过 30/10 与 30/30），
///   因此作为数据配置而不是写死在代码里
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadDistributionTable {
    /// 双人班负载百分比
    pub double_staffed_share: u32,

    /// 双人班人数
    pub double_staffed_operators: u32,

    /// 其余班次人数
    pub single_operators: u32,

    /// 其余班次负载百分比（按班次配置顺序）
    pub remaining_shares: Vec<u32>,
}

impl Default for LoadDistributionTable {
    fn default() -> Self {
        Self {
            double_staffed_share: 60,
            double_staffed_operators: 2,
            single_operators: 1,
            remaining_shares: vec![30, 10],
        }
    }
}

impl LoadDistributionTable {
    /// 百分比合计（u64 累加）
    pub fn total_share(&self) -> u64 {
        u64::from(self.double_staffed_share)
            + self.remaining_shares.iter().map(|&s| u64::from(s)).sum::<u64>()
    }

    /// 校验合计必须为 100
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        let total = self.total_share();
        if total != 100 {
            return Err(ValidationFailure::CapacityPercentagesMustSum100 { actual: total });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_sums_to_100() {
        let table = LoadDistributionTable::default();
        assert_eq!(table.total_share(), 100);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_60_30_30_is_rejected() {
        let table = LoadDistributionTable {
            remaining_shares: vec![30, 30],
            ..LoadDistributionTable::default()
        };
        assert_eq!(
            table.validate(),
            Err(ValidationFailure::CapacityPercentagesMustSum100 { actual: 120 })
        );
    }

    #[test]
    fn test_oversized_shares_do_not_wrap_to_100() {
        let table = LoadDistributionTable {
            double_staffed_share: u32::MAX,
            remaining_shares: vec![101, 0],
            ..LoadDistributionTable::default()
        };
        let expected = u64::from(u32::MAX) + 101;
        assert_eq!(table.total_share(), expected);
        assert_eq!(
            table.validate(),
            Err(ValidationFailure::CapacityPercentagesMustSum100 { actual: expected })
        );
    }
}
