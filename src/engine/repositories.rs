// ==========================================
// 设备维保排程系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合排程引擎所需的所有 Repository
// 目标: 减少 TemplateLifecycleController 的构造函数参数数量
// ==========================================

use std::sync::Arc;

use crate::repository::{
    EquipmentRepository, MaintenanceInstanceRepository, OperatorRosterRepository,
    RecurrenceTemplateRepository, ShiftRepository,
};

/// 维保排程仓储集合
///
/// # 包含的仓储
/// - `template_repo`: 周期模板
/// - `instance_repo`: 维保工单
/// - `shift_repo`: 班次与周计划
/// - `roster_repo`: 班次人员名单
/// - `equipment_repo`: 设备展示信息（只读）
#[derive(Clone)]
pub struct MaintenanceRepositories {
    pub template_repo: Arc<RecurrenceTemplateRepository>,
    pub instance_repo: Arc<MaintenanceInstanceRepository>,
    pub shift_repo: Arc<ShiftRepository>,
    pub roster_repo: Arc<OperatorRosterRepository>,
    pub equipment_repo: Arc<EquipmentRepository>,
}

impl MaintenanceRepositories {
    /// 创建新的仓储集合
    pub fn new(
        template_repo: Arc<RecurrenceTemplateRepository>,
        instance_repo: Arc<MaintenanceInstanceRepository>,
        shift_repo: Arc<ShiftRepository>,
        roster_repo: Arc<OperatorRosterRepository>,
        equipment_repo: Arc<EquipmentRepository>,
    ) -> Self {
        Self {
            template_repo,
            instance_repo,
            shift_repo,
            roster_repo,
            equipment_repo,
        }
    }

    /// 基于同一个共享连接创建全部仓储
    pub fn from_connection(conn: Arc<std::sync::Mutex<rusqlite::Connection>>) -> Self {
        Self::new(
            Arc::new(RecurrenceTemplateRepository::from_connection(conn.clone())),
            Arc::new(MaintenanceInstanceRepository::from_connection(conn.clone())),
            Arc::new(ShiftRepository::from_connection(conn.clone())),
            Arc::new(OperatorRosterRepository::from_connection(conn.clone())),
            Arc::new(EquipmentRepository::from_connection(conn)),
        )
    }
}

// 注: 作为简单的聚合结构体，其正确性由 tests/ 下的集成测试覆盖。
