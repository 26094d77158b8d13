// ==========================================
// 设备维保排程系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (scope_id + key → value)
// ==========================================

use crate::config::load_distribution::LoadDistributionTable;
use crate::config::schedule_config_trait::ScheduleConfigReader;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;

        Ok(())
    }

    /// 保存双人班负载分配表（写入前校验合计 = 100）
    pub fn set_load_distribution(&self, table: &LoadDistributionTable) -> RepositoryResult<()> {
        table.validate().map_err(|reason| RepositoryError::InvalidRecord {
            entity: "config_kv".to_string(),
            id: config_keys::LOAD_DISTRIBUTION.to_string(),
            reason,
        })?;

        let raw = serde_json::to_string(table).map_err(|e| RepositoryError::FieldValueError {
            field: config_keys::LOAD_DISTRIBUTION.to_string(),
            message: e.to_string(),
        })?;

        self.set_global_config_value(config_keys::LOAD_DISTRIBUTION, &raw)
    }

    fn get_u32_or_default(&self, key: &str, fallback: u32) -> RepositoryResult<u32> {
        let value = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(fallback),
        };

        Ok(value.trim().parse::<u32>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, fallback, "配置格式错误，使用默认值");
            fallback
        }))
    }
}

// ==========================================
// ScheduleConfigReader Trait 实现
// ==========================================
impl ScheduleConfigReader for ConfigManager {
    fn get_default_weeks_ahead(&self) -> RepositoryResult<u32> {
        self.get_u32_or_default(config_keys::DEFAULT_WEEKS_AHEAD, 4)
    }

    fn get_max_weeks_ahead(&self) -> RepositoryResult<u32> {
        self.get_u32_or_default(config_keys::MAX_WEEKS_AHEAD, 52)
    }

    /// 双人班负载分配表
    ///
    /// 说明：配置不存在时使用默认表 (60 / 30 / 10)；
    ///       配置存在但无法解析时返回错误，不静默回退
    fn get_load_distribution(&self) -> RepositoryResult<LoadDistributionTable> {
        let raw = match self.get_global_config_value(config_keys::LOAD_DISTRIBUTION)? {
            Some(v) => v,
            None => return Ok(LoadDistributionTable::default()),
        };

        serde_json::from_str(&raw).map_err(|e| RepositoryError::FieldValueError {
            field: config_keys::LOAD_DISTRIBUTION.to_string(),
            message: format!("负载分配表格式错误: {}", e),
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 生成窗口
    pub const DEFAULT_WEEKS_AHEAD: &str = "maintenance/default_weeks_ahead";
    pub const MAX_WEEKS_AHEAD: &str = "maintenance/max_weeks_ahead";

    // 班次负载分配 (JSON)
    pub const LOAD_DISTRIBUTION: &str = "shift/load_distribution";
}
