// ==========================================
// Repository 集成测试
// ==========================================
// 测试目标: 唯一约束冲突、非法周期记录、班次顺序、名单顺序、设备展示名
// ==========================================


use maintenance_scheduler::domain::{Horizon, MaintenanceInstance, ValidationFailure};
use maintenance_scheduler::repository::RepositoryError;
use test_helpers::{at, d, insert_equipment, insert_raw_invalid_template, ops, template, weekly, TestEnv};

#[test]
fn test_duplicate_template_date_is_unique_violation() {
    let env = TestEnv::new();
    let tpl = template("TPL-1", weekly(&[1]), d(2025, 1, 6), Horizon::Unbounded);
    env.repos.template_repo.insert(&tpl).unwrap();

    let now = at(d(2025, 1, 6), 8, 0);
    let first = MaintenanceInstance::from_template(&tpl, d(2025, 1, 6), now);
    let second = MaintenanceInstance::from_template(&tpl, d(2025, 1, 6), now);

    env.repos.instance_repo.insert(&first).unwrap();
    let result = env.repos.instance_repo.insert(&second);

    assert!(matches!(
        result,
        Err(RepositoryError::UniqueConstraintViolation(_))
    ));
    assert!(env.repos.instance_repo.exists("TPL-1", d(2025, 1, 6)).unwrap());
    assert!(!env.repos.instance_repo.exists("TPL-1", d(2025, 1, 13)).unwrap());
}

#[test]
fn test_one_off_instances_do_not_collide() {
    let env = TestEnv::new();
    let draft = maintenance_scheduler::domain::InstanceDraft {
        complexity: maintenance_scheduler::domain::Complexity::Low,
        urgency: maintenance_scheduler::domain::Urgency::Normal,
        scheduled_date: d(2025, 1, 6),
        scheduled_time: None,
        equipment_id: Some("EQ-001".to_string()),
        maintenance_type: None,
    };
    let now = at(d(2025, 1, 6), 8, 0);

    env.repos
        .instance_repo
        .insert(&MaintenanceInstance::one_off(&draft, now))
        .unwrap();
    env.repos
        .instance_repo
        .insert(&MaintenanceInstance::one_off(&draft, now))
        .unwrap();

    assert_eq!(env.count_instances(), 2);
}

#[test]
fn test_latest_scheduled_date() {
    let env = TestEnv::new();
    let tpl = template("TPL-L", weekly(&[1]), d(2025, 1, 6), Horizon::Unbounded);
    env.repos.template_repo.insert(&tpl).unwrap();
    assert_eq!(
        env.repos.instance_repo.latest_scheduled_date("TPL-L").unwrap(),
        None
    );

    let now = at(d(2025, 1, 6), 8, 0);
    for date in [d(2025, 1, 13), d(2025, 1, 6)] {
        env.repos
            .instance_repo
            .insert(&MaintenanceInstance::from_template(&tpl, date, now))
            .unwrap();
    }
    assert_eq!(
        env.repos.instance_repo.latest_scheduled_date("TPL-L").unwrap(),
        Some(d(2025, 1, 13))
    );
}

#[test]
fn test_invalid_stored_cadence_is_invalid_record() {
    let env = TestEnv::new();
    {
        let conn = env.conn.lock().unwrap();
        insert_raw_invalid_template(&conn, "TPL-BROKEN", "2025-01-06 00:00:00");
    }

    match env.repos.template_repo.find_by_id("TPL-BROKEN") {
        Err(RepositoryError::InvalidRecord { id, reason, .. }) => {
            assert_eq!(id, "TPL-BROKEN");
            assert!(matches!(reason, ValidationFailure::InvalidCadence { .. }));
        }
        other => panic!("Expected InvalidRecord, got {:?}", other.map(|_| ())),
    }

    // 列表只取 ID，不受非法记录影响
    assert_eq!(
        env.repos.template_repo.list_active_ids().unwrap(),
        vec!["TPL-BROKEN".to_string()]
    );
}

#[test]
fn test_template_round_trip_and_set_active() {
    let env = TestEnv::new();
    let mut tpl = template(
        "TPL-R",
        weekly(&[0, 6]),
        d(2025, 1, 4),
        Horizon::Bounded {
            end_date: d(2025, 6, 30),
        },
    );
    tpl.time_of_day = Some(test_helpers::t(7, 45));
    env.repos.template_repo.insert(&tpl).unwrap();

    let loaded = env.repos.template_repo.find_by_id("TPL-R").unwrap().unwrap();
    assert_eq!(loaded.cadence, tpl.cadence);
    assert_eq!(loaded.horizon, tpl.horizon);
    assert_eq!(loaded.time_of_day, tpl.time_of_day);
    assert_eq!(loaded.complexity, tpl.complexity);

    env.repos
        .template_repo
        .set_active("TPL-R", false, at(d(2025, 1, 5), 8, 0))
        .unwrap();
    assert!(env.repos.template_repo.list_active_ids().unwrap().is_empty());

    let missing = env
        .repos
        .template_repo
        .set_active("NO-SUCH", false, at(d(2025, 1, 5), 8, 0));
    assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));
}

#[test]
fn test_shifts_and_roster_keep_configured_order() {
    let env = TestEnv::new().with_three_shifts();

    let ids: Vec<_> = env
        .repos
        .shift_repo
        .list_active_shifts()
        .unwrap()
        .into_iter()
        .map(|s| s.shift_id)
        .collect();
    assert_eq!(ids, vec!["MORNING", "AFTERNOON", "NIGHT"]);

    env.repos
        .roster_repo
        .set_roster("MORNING", &ops(&["OP-Z", "OP-A", "OP-M"]))
        .unwrap();
    assert_eq!(
        env.repos.roster_repo.list_operators("MORNING").unwrap(),
        ops(&["OP-Z", "OP-A", "OP-M"])
    );
}

#[test]
fn test_equipment_label() {
    let env = TestEnv::new();
    {
        let conn = env.conn.lock().unwrap();
        insert_equipment(&conn, "EQ-001", "P-101", "冷却水泵");
    }

    assert_eq!(
        env.repos.equipment_repo.find_label("EQ-001").unwrap(),
        Some("P-101 冷却水泵".to_string())
    );
    assert_eq!(env.repos.equipment_repo.find_label("EQ-404").unwrap(), None);
}
