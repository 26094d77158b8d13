// ==========================================
// 设备维保排程系统 - 配置层
// ==========================================
// 职责: 系统配置管理（生成窗口、班次负载分配表）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod load_distribution;
pub mod schedule_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use load_distribution::LoadDistributionTable;
pub use schedule_config_trait::ScheduleConfigReader;
