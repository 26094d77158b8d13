// ==========================================
// 设备维保排程系统 - 引擎层错误类型
// ==========================================
// 分类:
// - Validation: 周期定义非法 / 百分比合计不为 100 / 非周一配置
// - NotFound: 模板不存在或已停用
// - Conflict: (template_id, 日期) 工单已存在，展开流程内吞掉
// - AssignmentUnavailable: 目标班次无可派工人员，工单保留为未派工
// ==========================================

use crate::domain::types::ValidationFailure;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 未派工原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnassignedReason {
    /// 目标班次没有配置任何操作员
    NoOperatorsForShift { shift_id: String },
    /// 没有任何启用班次
    NoActiveShifts,
}

impl fmt::Display for UnassignedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnassignedReason::NoOperatorsForShift { shift_id } => {
                write!(f, "NO_OPERATORS_FOR_SHIFT: shift_id={}", shift_id)
            }
            UnassignedReason::NoActiveShifts => write!(f, "NO_ACTIVE_SHIFTS"),
        }
    }
}

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("校验失败: {0}")]
    Validation(ValidationFailure),

    #[error("资源未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("工单已存在: template_id={template_id}, date={scheduled_date}")]
    Conflict {
        template_id: String,
        scheduled_date: NaiveDate,
    },

    #[error("无法自动派工: {0}")]
    AssignmentUnavailable(UnassignedReason),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InvalidRecord { reason, .. } => EngineError::Validation(reason),
            RepositoryError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Repository(other),
        }
    }
}

impl From<ValidationFailure> for EngineError {
    fn from(reason: ValidationFailure) -> Self {
        EngineError::Validation(reason)
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
