// ==========================================
// 设备维保排程系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: UNIQUE 冲突单独成类，供展开流程识别"已生成"
// ==========================================

use crate::domain::types::ValidationFailure;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("存储记录非法 ({entity} id={id}): {reason}")]
    InvalidRecord {
        entity: String,
        id: String,
        reason: ValidationFailure,
    },

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

// ==========================================
// 行解析辅助
// ==========================================
// 存储格式统一在 crate::db 中定义

pub(crate) fn parse_date_field(field: &str, raw: &str) -> RepositoryResult<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw, crate::db::DATE_FORMAT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("日期格式错误 '{}': {}", raw, e),
        }
    })
}

pub(crate) fn parse_time_field(field: &str, raw: &str) -> RepositoryResult<chrono::NaiveTime> {
    chrono::NaiveTime::parse_from_str(raw, crate::db::TIME_FORMAT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("时间格式错误 '{}': {}", raw, e),
        }
    })
}

pub(crate) fn parse_datetime_field(
    field: &str,
    raw: &str,
) -> RepositoryResult<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(raw, crate::db::DATETIME_FORMAT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("时间戳格式错误 '{}': {}", raw, e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_failure_is_classified() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        assert!(matches!(
            RepositoryError::from(err),
            RepositoryError::UniqueConstraintViolation(_)
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_date_field("d", "2025-01-06").is_ok());
        assert!(parse_date_field("d", "06/01/2025").is_err());
        assert!(parse_time_field("t", "06:00:00").is_ok());
        assert!(parse_datetime_field("ts", "2025-01-06 08:00:00").is_ok());
    }
}
