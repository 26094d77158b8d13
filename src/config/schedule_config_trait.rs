// ==========================================
// 设备维保排程系统 - 排程配置读取接口
// ==========================================
// 职责: 引擎只依赖该接口，不直接依赖 config_kv 存储
// ==========================================

use crate::config::load_distribution::LoadDistributionTable;
use crate::repository::error::RepositoryResult;

/// 排程配置读取接口
pub trait ScheduleConfigReader: Send + Sync {
    /// 模板创建时默认生成的周数
    fn get_default_weeks_ahead(&self) -> RepositoryResult<u32>;

    /// 生成操作允许的最大周数
    fn get_max_weeks_ahead(&self) -> RepositoryResult<u32>;

    /// 双人班负载分配表
    fn get_load_distribution(&self) -> RepositoryResult<LoadDistributionTable>;
}
