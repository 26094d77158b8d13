// ==========================================
// 设备维保排程系统 - 班次与周产能计划仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 周计划按 effective_week_start 存储为计划集合，
//       同一周重复配置时整周替换（计划头 + 分配明细在同一事务内）
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
use crate::domain::shift::{ShiftAllocation, ShiftCapacityPlan, ShiftDefinition};
use crate::repository::error::{
    parse_date_field, parse_datetime_field, parse_time_field, RepositoryError, RepositoryResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// ShiftRepository - 班次仓储
// ==========================================

/// 班次仓储
/// 职责: shift_definition / shift_capacity_plan / shift_capacity_allocation
pub struct ShiftRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShiftRepository {
    /// 创建新的班次仓储实例（独立连接，自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 班次定义 =====

    /// 插入或更新班次定义
    pub fn upsert_shift(&self, shift: &ShiftDefinition) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO shift_definition (shift_id, shift_name, start_time, end_time, sort_order, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(shift_id) DO UPDATE SET
                shift_name = excluded.shift_name,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                sort_order = excluded.sort_order,
                is_active = excluded.is_active
            "#,
            params![
                shift.shift_id,
                shift.shift_name,
                shift.start_time.format(TIME_FORMAT).to_string(),
                shift.end_time.format(TIME_FORMAT).to_string(),
                shift.sort_order,
                shift.active as i32,
            ],
        )?;

        Ok(())
    }

    /// 查询启用班次（按配置顺序）
    pub fn list_active_shifts(&self) -> RepositoryResult<Vec<ShiftDefinition>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT shift_id, shift_name, start_time, end_time, sort_order, is_active
            FROM shift_definition
            WHERE is_active = 1
            ORDER BY sort_order, shift_id
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i32>(4)?,
                    row.get::<_, i32>(5)? != 0,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(shift_id, shift_name, start, end, sort_order, active)| {
                Ok(ShiftDefinition {
                    shift_id,
                    shift_name,
                    start_time: parse_time_field("start_time", &start)?,
                    end_time: parse_time_field("end_time", &end)?,
                    sort_order,
                    active,
                })
            })
            .collect()
    }

    // ===== 周产能计划 =====

    /// 保存周计划（同一周已存在时整体替换）
    pub fn save_plan(&self, plan: &ShiftCapacityPlan) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let week = plan.effective_week_start.format(DATE_FORMAT).to_string();

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "DELETE FROM shift_capacity_plan WHERE effective_week_start = ?1",
            params![week],
        )?;

        tx.execute(
            r#"
            INSERT INTO shift_capacity_plan (effective_week_start, double_staffed_shift_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                week,
                plan.double_staffed_shift_id,
                plan.created_at.format(DATETIME_FORMAT).to_string(),
            ],
        )?;

        for (seq, allocation) in plan.allocations.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO shift_capacity_allocation
                    (effective_week_start, shift_id, load_percentage, operator_count, seq)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    week,
                    allocation.shift_id,
                    allocation.load_percentage,
                    allocation.operator_count,
                    seq as i64,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(())
    }

    /// 按生效周查询计划
    pub fn find_plan_by_week(
        &self,
        week_start: NaiveDate,
    ) -> RepositoryResult<Option<ShiftCapacityPlan>> {
        let conn = self.get_conn()?;
        Self::load_plan(&conn, &week_start.format(DATE_FORMAT).to_string())
    }

    /// 查询日期所适用的计划（effective_week_start <= date 中最新的一份）
    pub fn find_plan_for_date(&self, date: NaiveDate) -> RepositoryResult<Option<ShiftCapacityPlan>> {
        let conn = self.get_conn()?;

        let week: Option<String> = conn
            .query_row(
                r#"
                SELECT effective_week_start FROM shift_capacity_plan
                WHERE effective_week_start <= ?1
                ORDER BY effective_week_start DESC
                LIMIT 1
                "#,
                params![date.format(DATE_FORMAT).to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match week {
            Some(week) => Self::load_plan(&conn, &week),
            None => Ok(None),
        }
    }

    fn load_plan(conn: &Connection, week: &str) -> RepositoryResult<Option<ShiftCapacityPlan>> {
        let header = conn
            .query_row(
                r#"
                SELECT effective_week_start, double_staffed_shift_id, created_at
                FROM shift_capacity_plan WHERE effective_week_start = ?1
                "#,
                params![week],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let (week_start, double_staffed_shift_id, created_at) = match header {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT shift_id, load_percentage, operator_count
            FROM shift_capacity_allocation
            WHERE effective_week_start = ?1
            ORDER BY seq
            "#,
        )?;

        let allocations = stmt
            .query_map(params![week], |row| {
                Ok(ShiftAllocation {
                    shift_id: row.get(0)?,
                    load_percentage: row.get(1)?,
                    operator_count: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<ShiftAllocation>>>()?;

        Ok(Some(ShiftCapacityPlan {
            effective_week_start: parse_date_field("effective_week_start", &week_start)?,
            double_staffed_shift_id,
            allocations,
            created_at: parse_datetime_field("created_at", &created_at)?,
        }))
    }
}
