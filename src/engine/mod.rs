// ==========================================
// 设备维保排程系统 - 引擎层
// ==========================================
// 职责: 周期展开、班次产能、自动派工、模板生命周期编排
// 红线: Engine 不拼 SQL，所有数据访问经由 repository
// ==========================================

pub mod assignment;
pub mod error;
pub mod lifecycle;
pub mod recurrence;
pub mod repositories;
pub mod shift_capacity;
pub mod workload;

// 重导出核心引擎
pub use assignment::{Assignment, AssignmentEngine};
pub use error::{EngineError, EngineResult, UnassignedReason};
pub use lifecycle::{
    AssignmentOutcome, GeneratedInstance, GenerationSummary, SweepSummary, TemplateFailure,
    TemplateLifecycleController,
};
pub use recurrence::RecurrenceExpander;
pub use repositories::MaintenanceRepositories;
pub use shift_capacity::ShiftCapacityConfig;
pub use workload::WorkloadTracker;
