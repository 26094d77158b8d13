// ==========================================
// 设备维保排程系统 - 周期模板数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 周期定义以结构化列存储 (kind / interval / weekdays)，
//       读取时在边界还原并校验，非法记录以 InvalidRecord 返回
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
use crate::domain::template::{Cadence, Horizon, RecurrenceTemplate};
use crate::domain::types::{Complexity, ValidationFailure};
use crate::repository::error::{
    parse_date_field, parse_datetime_field, parse_time_field, RepositoryError, RepositoryResult,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const TEMPLATE_COLUMNS: &str = r#"
    template_id, equipment_id, maintenance_type, description, priority,
    complexity, estimated_hours, estimated_cost,
    cadence_kind, cadence_interval, cadence_weekdays,
    start_date, horizon_end_date, time_of_day,
    is_active, created_at, updated_at
"#;

/// 未解析的模板行
struct TemplateRow {
    template_id: String,
    equipment_id: String,
    maintenance_type: String,
    description: Option<String>,
    priority: i32,
    complexity: String,
    estimated_hours: f64,
    estimated_cost: f64,
    cadence_kind: String,
    cadence_interval: i64,
    cadence_weekdays: Option<String>,
    start_date: String,
    horizon_end_date: Option<String>,
    time_of_day: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    fn from_row(row: &rusqlite::Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            template_id: row.get(0)?,
            equipment_id: row.get(1)?,
            maintenance_type: row.get(2)?,
            description: row.get(3)?,
            priority: row.get(4)?,
            complexity: row.get(5)?,
            estimated_hours: row.get(6)?,
            estimated_cost: row.get(7)?,
            cadence_kind: row.get(8)?,
            cadence_interval: row.get(9)?,
            cadence_weekdays: row.get(10)?,
            start_date: row.get(11)?,
            horizon_end_date: row.get(12)?,
            time_of_day: row.get(13)?,
            is_active: row.get::<_, i32>(14)? != 0,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<RecurrenceTemplate> {
        let invalid = |reason: ValidationFailure| RepositoryError::InvalidRecord {
            entity: "maintenance_template".to_string(),
            id: self.template_id.clone(),
            reason,
        };

        let cadence = Cadence::from_db_parts(
            &self.cadence_kind,
            self.cadence_interval,
            self.cadence_weekdays.as_deref(),
        )
        .map_err(invalid)?;

        let complexity = Complexity::from_db_str(&self.complexity).ok_or_else(|| {
            invalid(ValidationFailure::InvalidField {
                field: "complexity".to_string(),
                detail: format!("未知复杂度: {}", self.complexity),
            })
        })?;

        let horizon_end = self
            .horizon_end_date
            .as_deref()
            .map(|raw| parse_date_field("horizon_end_date", raw))
            .transpose()?;

        let time_of_day = self
            .time_of_day
            .as_deref()
            .map(|raw| parse_time_field("time_of_day", raw))
            .transpose()?;

        Ok(RecurrenceTemplate {
            start_date: parse_date_field("start_date", &self.start_date)?,
            created_at: parse_datetime_field("created_at", &self.created_at)?,
            updated_at: parse_datetime_field("updated_at", &self.updated_at)?,
            template_id: self.template_id,
            equipment_id: self.equipment_id,
            maintenance_type: self.maintenance_type,
            description: self.description,
            priority: self.priority,
            complexity,
            estimated_hours: self.estimated_hours,
            estimated_cost: self.estimated_cost,
            cadence,
            horizon: Horizon::from_end_date(horizon_end),
            time_of_day,
            active: self.is_active,
        })
    }
}

// ==========================================
// RecurrenceTemplateRepository - 周期模板仓储
// ==========================================

/// 周期模板仓储
/// 职责: 管理 maintenance_template 表的 CRUD 操作
pub struct RecurrenceTemplateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RecurrenceTemplateRepository {
    /// 创建新的模板仓储实例（独立连接，自动建表）
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

    /// 插入模板
    pub fn insert(&self, template: &RecurrenceTemplate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            &format!(
                "INSERT INTO maintenance_template ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                TEMPLATE_COLUMNS
            ),
            params![
                template.template_id,
                template.equipment_id,
                template.maintenance_type,
                template.description,
                template.priority,
                template.complexity.to_db_str(),
                template.estimated_hours,
                template.estimated_cost,
                template.cadence.kind_str(),
                template.cadence.interval(),
                template.cadence.weekdays_db_str(),
                template.start_date.format(DATE_FORMAT).to_string(),
                template
                    .horizon
                    .end_date()
                    .map(|d| d.format(DATE_FORMAT).to_string()),
                template
                    .time_of_day
                    .map(|t| t.format(TIME_FORMAT).to_string()),
                template.active as i32,
                template.created_at.format(DATETIME_FORMAT).to_string(),
                template.updated_at.format(DATETIME_FORMAT).to_string(),
            ],
        )?;

        Ok(())
    }

    /// 更新模板（周期、期限、维保内容、启用状态）
    ///
    /// # 返回
    /// - Err(NotFound): 模板不存在
    pub fn update(&self, template: &RecurrenceTemplate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"
            UPDATE maintenance_template SET
                equipment_id = ?2, maintenance_type = ?3, description = ?4, priority = ?5,
                complexity = ?6, estimated_hours = ?7, estimated_cost = ?8,
                cadence_kind = ?9, cadence_interval = ?10, cadence_weekdays = ?11,
                start_date = ?12, horizon_end_date = ?13, time_of_day = ?14,
                is_active = ?15, updated_at = ?16
            WHERE template_id = ?1
            "#,
            params![
                template.template_id,
                template.equipment_id,
                template.maintenance_type,
                template.description,
                template.priority,
                template.complexity.to_db_str(),
                template.estimated_hours,
                template.estimated_cost,
                template.cadence.kind_str(),
                template.cadence.interval(),
                template.cadence.weekdays_db_str(),
                template.start_date.format(DATE_FORMAT).to_string(),
                template
                    .horizon
                    .end_date()
                    .map(|d| d.format(DATE_FORMAT).to_string()),
                template
                    .time_of_day
                    .map(|t| t.format(TIME_FORMAT).to_string()),
                template.active as i32,
                template.updated_at.format(DATETIME_FORMAT).to_string(),
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "maintenance_template".to_string(),
                id: template.template_id.clone(),
            });
        }

        Ok(())
    }

    /// 按 ID 查询模板
    ///
    /// # 返回
    /// - Ok(Some): 找到且记录合法
    /// - Ok(None): 未找到
    /// - Err(InvalidRecord): 存储的周期定义非法
    pub fn find_by_id(&self, template_id: &str) -> RepositoryResult<Option<RecurrenceTemplate>> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM maintenance_template WHERE template_id = ?1",
                    TEMPLATE_COLUMNS
                ),
                params![template_id],
                TemplateRow::from_row,
            )
            .optional()?;

        row.map(TemplateRow::into_domain).transpose()
    }

    /// 列出所有启用模板的 ID（按创建顺序）
    ///
    /// 说明: 只取 ID，逐个加载，使单个非法记录不影响其他模板
    pub fn list_active_ids(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT template_id
            FROM maintenance_template
            WHERE is_active = 1
            ORDER BY created_at, template_id
            "#,
        )?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<String>>>()?;

        Ok(ids)
    }

    /// 设置启用状态
    pub fn set_active(
        &self,
        template_id: &str,
        active: bool,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE maintenance_template SET is_active = ?2, updated_at = ?3 WHERE template_id = ?1",
            params![
                template_id,
                active as i32,
                updated_at.format(DATETIME_FORMAT).to_string()
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "maintenance_template".to_string(),
                id: template_id.to_string(),
            });
        }

        Ok(())
    }
}
