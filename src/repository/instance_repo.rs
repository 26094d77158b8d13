// ==========================================
// 设备维保排程系统 - 维保工单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 唯一约束: (template_id, scheduled_date)，冲突以 UniqueConstraintViolation 返回
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
use crate::domain::instance::MaintenanceInstance;
use crate::domain::types::{InstanceStatus, Urgency};
use crate::repository::error::{
    parse_date_field, parse_datetime_field, parse_time_field, RepositoryError, RepositoryResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const INSTANCE_COLUMNS: &str = r#"
    instance_id, template_id, scheduled_date, scheduled_time,
    equipment_id, maintenance_type, complexity_points, urgency, status,
    assigned_operator_id, assigned_shift_id, created_at
"#;

/// 班次负载汇总行（按周期统计）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftLoadRow {
    pub shift_id: String,
    pub consumed_points: u32,
    pub assigned_count: u32,
}

struct InstanceRow {
    instance_id: String,
    template_id: Option<String>,
    scheduled_date: String,
    scheduled_time: Option<String>,
    equipment_id: String,
    maintenance_type: String,
    complexity_points: u32,
    urgency: String,
    status: String,
    assigned_operator_id: Option<String>,
    assigned_shift_id: Option<String>,
    created_at: String,
}

impl InstanceRow {
    fn from_row(row: &rusqlite::Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            instance_id: row.get(0)?,
            template_id: row.get(1)?,
            scheduled_date: row.get(2)?,
            scheduled_time: row.get(3)?,
            equipment_id: row.get(4)?,
            maintenance_type: row.get(5)?,
            complexity_points: row.get(6)?,
            urgency: row.get(7)?,
            status: row.get(8)?,
            assigned_operator_id: row.get(9)?,
            assigned_shift_id: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<MaintenanceInstance> {
        let urgency =
            Urgency::from_db_str(&self.urgency).ok_or_else(|| RepositoryError::FieldValueError {
                field: "urgency".to_string(),
                message: format!("未知紧急程度: {}", self.urgency),
            })?;
        let status = InstanceStatus::from_db_str(&self.status).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "status".to_string(),
                message: format!("未知工单状态: {}", self.status),
            }
        })?;
        let scheduled_time = self
            .scheduled_time
            .as_deref()
            .map(|raw| parse_time_field("scheduled_time", raw))
            .transpose()?;

        Ok(MaintenanceInstance {
            scheduled_date: parse_date_field("scheduled_date", &self.scheduled_date)?,
            created_at: parse_datetime_field("created_at", &self.created_at)?,
            instance_id: self.instance_id,
            template_id: self.template_id,
            scheduled_time,
            equipment_id: self.equipment_id,
            maintenance_type: self.maintenance_type,
            complexity_points: self.complexity_points,
            urgency,
            status,
            assigned_operator_id: self.assigned_operator_id,
            assigned_shift_id: self.assigned_shift_id,
        })
    }
}

// ==========================================
// MaintenanceInstanceRepository - 维保工单仓储
// ==========================================

/// 维保工单仓储
/// 职责: 管理 maintenance_instance 表的读写
pub struct MaintenanceInstanceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaintenanceInstanceRepository {
    /// 创建新的工单仓储实例（独立连接，自动建表）
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

    /// 检查模板在指定日期是否已有工单
    pub fn exists(&self, template_id: &str, scheduled_date: NaiveDate) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let found = conn
            .query_row(
                r#"
                SELECT 1 FROM maintenance_instance
                WHERE template_id = ?1 AND scheduled_date = ?2
                LIMIT 1
                "#,
                params![template_id, scheduled_date.format(DATE_FORMAT).to_string()],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        Ok(found)
    }

    /// 插入工单
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 同一模板同一日期已存在
    pub fn insert(&self, instance: &MaintenanceInstance) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            &format!(
                "INSERT INTO maintenance_instance ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                INSTANCE_COLUMNS
            ),
            params![
                instance.instance_id,
                instance.template_id,
                instance.scheduled_date.format(DATE_FORMAT).to_string(),
                instance
                    .scheduled_time
                    .map(|t| t.format(TIME_FORMAT).to_string()),
                instance.equipment_id,
                instance.maintenance_type,
                instance.complexity_points,
                instance.urgency.to_db_str(),
                instance.status.to_db_str(),
                instance.assigned_operator_id,
                instance.assigned_shift_id,
                instance.created_at.format(DATETIME_FORMAT).to_string(),
            ],
        )?;

        Ok(())
    }

    /// 回写派工结果
    pub fn update_assignment(
        &self,
        instance_id: &str,
        operator_id: Option<&str>,
        shift_id: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"
            UPDATE maintenance_instance
            SET assigned_operator_id = ?2, assigned_shift_id = ?3
            WHERE instance_id = ?1
            "#,
            params![instance_id, operator_id, shift_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "maintenance_instance".to_string(),
                id: instance_id.to_string(),
            });
        }

        Ok(())
    }

    /// 模板最近一次已物化的日期
    pub fn latest_scheduled_date(&self, template_id: &str) -> RepositoryResult<Option<NaiveDate>> {
        let conn = self.get_conn()?;

        let raw: Option<String> = conn.query_row(
            "SELECT MAX(scheduled_date) FROM maintenance_instance WHERE template_id = ?1",
            params![template_id],
            |row| row.get(0),
        )?;

        raw.as_deref()
            .map(|d| parse_date_field("scheduled_date", d))
            .transpose()
    }

    /// 按班次汇总日期区间内的负载（不含已取消工单）
    ///
    /// # 参数
    /// - start_date / end_date: 闭区间
    pub fn load_by_shift(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<ShiftLoadRow>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT
                assigned_shift_id,
                COALESCE(SUM(complexity_points), 0),
                SUM(CASE WHEN assigned_operator_id IS NOT NULL THEN 1 ELSE 0 END)
            FROM maintenance_instance
            WHERE scheduled_date BETWEEN ?1 AND ?2
              AND assigned_shift_id IS NOT NULL
              AND status <> 'CANCELLED'
            GROUP BY assigned_shift_id
            ORDER BY assigned_shift_id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                |row| {
                    Ok(ShiftLoadRow {
                        shift_id: row.get(0)?,
                        consumed_points: row.get(1)?,
                        assigned_count: row.get(2)?,
                    })
                },
            )?
            .collect::<SqliteResult<Vec<ShiftLoadRow>>>()?;

        Ok(rows)
    }

    /// 查询模板下全部工单（按日期升序）
    pub fn list_by_template(&self, template_id: &str) -> RepositoryResult<Vec<MaintenanceInstance>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM maintenance_instance WHERE template_id = ?1 ORDER BY scheduled_date",
            INSTANCE_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![template_id], InstanceRow::from_row)?
            .collect::<SqliteResult<Vec<InstanceRow>>>()?;

        rows.into_iter().map(InstanceRow::into_domain).collect()
    }

    /// 查询日期区间内的工单（闭区间，按日期升序）
    pub fn list_in_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Vec<MaintenanceInstance>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM maintenance_instance \
             WHERE scheduled_date BETWEEN ?1 AND ?2 \
             ORDER BY scheduled_date, scheduled_time, instance_id",
            INSTANCE_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                InstanceRow::from_row,
            )?
            .collect::<SqliteResult<Vec<InstanceRow>>>()?;

        rows.into_iter().map(InstanceRow::into_domain).collect()
    }

    /// 按 ID 查询工单
    pub fn find_by_id(&self, instance_id: &str) -> RepositoryResult<Option<MaintenanceInstance>> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM maintenance_instance WHERE instance_id = ?1",
                    INSTANCE_COLUMNS
                ),
                params![instance_id],
                InstanceRow::from_row,
            )
            .optional()?;

        row.map(InstanceRow::into_domain).transpose()
    }
}
