// ==========================================
// 设备维保排程系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、边界校验
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod instance;
pub mod shift;
pub mod template;
pub mod types;

// 重导出核心类型
pub use instance::{InstanceDraft, MaintenanceInstance, ScheduleListingEntry};
pub use shift::{week_start_of, ShiftAllocation, ShiftCapacityPlan, ShiftDefinition};
pub use template::{Cadence, Horizon, RecurrenceTemplate};
pub use types::{Complexity, InstanceStatus, Urgency, ValidationFailure};
