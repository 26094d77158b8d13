// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 生成窗口与负载分配表的读取、默认值、覆写
// ==========================================


use maintenance_scheduler::config::{
    config_keys, ConfigManager, LoadDistributionTable, ScheduleConfigReader,
};
use maintenance_scheduler::domain::ValidationFailure;
use maintenance_scheduler::repository::RepositoryError;
use test_helpers::create_test_db;

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_defaults_when_unset() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(config_manager.get_default_weeks_ahead().unwrap(), 4);
    assert_eq!(config_manager.get_max_weeks_ahead().unwrap(), 52);
    assert_eq!(
        config_manager.get_load_distribution().unwrap(),
        LoadDistributionTable::default()
    );
}

#[test]
fn test_override_weeks_ahead() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::DEFAULT_WEEKS_AHEAD, "8")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::MAX_WEEKS_AHEAD, "26")
        .unwrap();

    assert_eq!(config_manager.get_default_weeks_ahead().unwrap(), 8);
    assert_eq!(config_manager.get_max_weeks_ahead().unwrap(), 26);

    // 覆写为同一键时 UPSERT
    config_manager
        .set_global_config_value(config_keys::DEFAULT_WEEKS_AHEAD, "6")
        .unwrap();
    assert_eq!(config_manager.get_default_weeks_ahead().unwrap(), 6);
}

#[test]
fn test_malformed_weeks_ahead_falls_back_to_default() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::DEFAULT_WEEKS_AHEAD, "four")
        .unwrap();
    assert_eq!(config_manager.get_default_weeks_ahead().unwrap(), 4);
}

#[test]
fn test_load_distribution_round_trip() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let table = LoadDistributionTable {
        double_staffed_share: 50,
        double_staffed_operators: 3,
        single_operators: 1,
        remaining_shares: vec![30, 20],
    };
    config_manager.set_load_distribution(&table).unwrap();

    assert_eq!(config_manager.get_load_distribution().unwrap(), table);
}

#[test]
fn test_load_distribution_rejects_bad_sum() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let table = LoadDistributionTable {
        remaining_shares: vec![30, 30],
        ..LoadDistributionTable::default()
    };
    let result = config_manager.set_load_distribution(&table);

    assert!(matches!(
        result,
        Err(RepositoryError::InvalidRecord {
            reason: ValidationFailure::CapacityPercentagesMustSum100 { actual: 120 },
            ..
        })
    ));
    assert!(config_manager
        .get_global_config_value(config_keys::LOAD_DISTRIBUTION)
        .unwrap()
        .is_none());
}

#[test]
fn test_unparsable_load_distribution_is_error() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::LOAD_DISTRIBUTION, "60/30/10")
        .unwrap();

    assert!(matches!(
        config_manager.get_load_distribution(),
        Err(RepositoryError::FieldValueError { .. })
    ));
}

#[test]
fn test_load_distribution_rejects_oversized_shares() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    // u32 累加会回绕成 100，必须按真实合计拒绝
    let table = LoadDistributionTable {
        double_staffed_share: u32::MAX,
        remaining_shares: vec![101, 0],
        ..LoadDistributionTable::default()
    };
    let result = config_manager.set_load_distribution(&table);

    match result {
        Err(RepositoryError::InvalidRecord {
            reason: ValidationFailure::CapacityPercentagesMustSum100 { actual },
            ..
        }) => assert_eq!(actual, u64::from(u32::MAX) + 101),
        other => panic!("Expected CapacityPercentagesMustSum100, got {:?}", other),
    }
    assert!(config_manager
        .get_global_config_value(config_keys::LOAD_DISTRIBUTION)
        .unwrap()
        .is_none());
}
