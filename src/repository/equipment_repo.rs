// ==========================================
// 设备维保排程系统 - 设备查询仓储（只读）
// ==========================================
// 说明: 设备档案由外部系统维护；本仓储只提供 id → 展示名称
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct EquipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EquipmentRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 设备展示名称: "编码 名称"
    pub fn find_label(&self, equipment_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let label = conn
            .query_row(
                "SELECT equipment_code, equipment_name FROM equipment WHERE equipment_id = ?1",
                params![equipment_id],
                |row| {
                    let code: String = row.get(0)?;
                    let name: String = row.get(1)?;
                    Ok(format!("{} {}", code, name))
                },
            )
            .optional()?;

        Ok(label)
    }
}
