// ==========================================
// 设备维保排程系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有仓储与配置共享同一个数据库连接
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::MaintenanceApi;
use crate::config::{ConfigManager, ScheduleConfigReader};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::{MaintenanceRepositories, TemplateLifecycleController};

/// 应用状态
///
/// 包含 API 实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 维保排程API
    pub maintenance_api: Arc<MaintenanceApi>,

    /// 配置管理器（生成窗口、负载分配表）
    pub config_manager: Arc<ConfigManager>,

    /// 仓储集合（班次、名单等基础数据维护）
    pub repos: MaintenanceRepositories,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并幂等建表
    /// 2. 初始化所有Repository与ConfigManager
    /// 3. 创建引擎与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let repos = MaintenanceRepositories::from_connection(conn.clone());
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let config_reader: Arc<dyn ScheduleConfigReader> = config_manager.clone();
        let controller = Arc::new(TemplateLifecycleController::new(
            repos.clone(),
            config_reader,
        ));
        let maintenance_api = Arc::new(MaintenanceApi::new(controller));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            maintenance_api,
            config_manager,
            repos,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: MAINT_DB_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("MAINT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./maintenance_scheduler.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("maintenance-scheduler-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("maintenance-scheduler");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("maintenance_scheduler.db");
    }

    path.to_string_lossy().to_string()
}
