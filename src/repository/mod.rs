// ==========================================
// 设备维保排程系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod equipment_repo;
pub mod error;
pub mod instance_repo;
pub mod roster_repo;
pub mod shift_repo;
pub mod template_repo;

// 重导出核心仓储
pub use equipment_repo::EquipmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use instance_repo::{MaintenanceInstanceRepository, ShiftLoadRow};
pub use roster_repo::OperatorRosterRepository;
pub use shift_repo::ShiftRepository;
pub use template_repo::RecurrenceTemplateRepository;
