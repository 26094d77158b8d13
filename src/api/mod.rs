// ==========================================
// 设备维保排程系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供定时任务与上层调用
// ==========================================

pub mod error;
pub mod maintenance_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use maintenance_api::{GenerateInstancesResponse, MaintenanceApi, TemplateRequest};
