// ==========================================
// 设备维保排程系统 - 班次人员名单仓储
// ==========================================
// 职责: 每个班次可派工的操作员有序名单 (shift_operator)
// 说明: 人员档案本身由外部系统维护，这里只存 operator_id 与顺序
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct OperatorRosterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OperatorRosterRepository {
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

    /// 整体替换班次名单（顺序即轮询顺序）
    pub fn set_roster(&self, shift_id: &str, operator_ids: &[String]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute("DELETE FROM shift_operator WHERE shift_id = ?1", params![shift_id])?;
        for (seq, operator_id) in operator_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO shift_operator (shift_id, operator_id, seq) VALUES (?1, ?2, ?3)",
                params![shift_id, operator_id, seq as i64],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 查询班次名单（按轮询顺序）
    pub fn list_operators(&self, shift_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT operator_id FROM shift_operator WHERE shift_id = ?1 ORDER BY seq, operator_id",
        )?;

        let ids = stmt
            .query_map(params![shift_id], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<String>>>()?;

        Ok(ids)
    }
}
