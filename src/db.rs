// ==========================================
// 设备维保排程系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 幂等建表，唯一约束 (template_id, scheduled_date) 由数据库保证
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 日期/时间存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表
///
/// 说明：
/// - maintenance_instance 上的部分唯一索引是并发场景下防重复的最终保障，
///   竞争失败的写入方会得到 UNIQUE 冲突而不是产生重复工单
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
          version INTEGER PRIMARY KEY,
          applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
          scope_id TEXT NOT NULL,
          key TEXT NOT NULL,
          value TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS equipment (
          equipment_id TEXT PRIMARY KEY,
          equipment_code TEXT NOT NULL,
          equipment_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shift_definition (
          shift_id TEXT PRIMARY KEY,
          shift_name TEXT NOT NULL,
          start_time TEXT NOT NULL,
          end_time TEXT NOT NULL,
          sort_order INTEGER NOT NULL DEFAULT 0,
          is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS shift_operator (
          shift_id TEXT NOT NULL REFERENCES shift_definition(shift_id) ON DELETE CASCADE,
          operator_id TEXT NOT NULL,
          seq INTEGER NOT NULL DEFAULT 0,
          PRIMARY KEY (shift_id, operator_id)
        );

        CREATE TABLE IF NOT EXISTS shift_capacity_plan (
          effective_week_start TEXT PRIMARY KEY,
          double_staffed_shift_id TEXT NOT NULL REFERENCES shift_definition(shift_id),
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shift_capacity_allocation (
          effective_week_start TEXT NOT NULL
            REFERENCES shift_capacity_plan(effective_week_start) ON DELETE CASCADE,
          shift_id TEXT NOT NULL REFERENCES shift_definition(shift_id),
          load_percentage INTEGER NOT NULL,
          operator_count INTEGER NOT NULL,
          seq INTEGER NOT NULL DEFAULT 0,
          PRIMARY KEY (effective_week_start, shift_id)
        );

        CREATE TABLE IF NOT EXISTS maintenance_template (
          template_id TEXT PRIMARY KEY,
          equipment_id TEXT NOT NULL,
          maintenance_type TEXT NOT NULL,
          description TEXT,
          priority INTEGER NOT NULL DEFAULT 0,
          complexity TEXT NOT NULL,
          estimated_hours REAL NOT NULL DEFAULT 0,
          estimated_cost REAL NOT NULL DEFAULT 0,
          cadence_kind TEXT NOT NULL,
          cadence_interval INTEGER NOT NULL DEFAULT 1,
          cadence_weekdays TEXT,
          start_date TEXT NOT NULL,
          horizon_end_date TEXT,
          time_of_day TEXT,
          is_active INTEGER NOT NULL DEFAULT 1,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS maintenance_instance (
          instance_id TEXT PRIMARY KEY,
          template_id TEXT REFERENCES maintenance_template(template_id) ON DELETE CASCADE,
          scheduled_date TEXT NOT NULL,
          scheduled_time TEXT,
          equipment_id TEXT NOT NULL,
          maintenance_type TEXT NOT NULL,
          complexity_points INTEGER NOT NULL,
          urgency TEXT NOT NULL DEFAULT 'NORMAL',
          status TEXT NOT NULL DEFAULT 'SCHEDULED',
          assigned_operator_id TEXT,
          assigned_shift_id TEXT,
          created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS uq_instance_template_date
          ON maintenance_instance(template_id, scheduled_date)
          WHERE template_id IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_instance_date_shift
          ON maintenance_instance(scheduled_date, assigned_shift_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
