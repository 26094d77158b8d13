// ==========================================
// ShiftCapacityConfig 集成测试
// ==========================================
// 测试目标: 周一生效约束、百分比合计、按周覆盖、分配表配置
// ==========================================


use maintenance_scheduler::config::LoadDistributionTable;
use maintenance_scheduler::domain::ValidationFailure;
use maintenance_scheduler::engine::EngineError;
use test_helpers::{at, d, TestEnv};

#[test]
fn test_tuesday_effective_date_is_rejected_and_not_persisted() {
    let env = TestEnv::new().with_three_shifts();

    let result = env.controller.capacity().set_weekly_plan(
        "AFTERNOON",
        d(2025, 1, 7),
        at(d(2025, 1, 3), 9, 0),
    );

    match result {
        Err(EngineError::Validation(ValidationFailure::MustConfigureOnMonday {
            effective_date,
        })) => assert_eq!(effective_date, "2025-01-07"),
        other => panic!("Expected MustConfigureOnMonday, got {:?}", other),
    }
    assert_eq!(env.count_plans(), 0);
    assert!(env
        .repos
        .shift_repo
        .find_plan_for_date(d(2025, 1, 8))
        .unwrap()
        .is_none());
}

#[test]
fn test_accepted_plan_sums_to_100_and_round_trips() {
    let env = TestEnv::new().with_three_shifts();

    let plan = env
        .controller
        .capacity()
        .set_weekly_plan("MORNING", d(2025, 1, 6), at(d(2025, 1, 3), 9, 0))
        .unwrap();

    assert_eq!(plan.total_percentage(), 100);
    assert_eq!(plan.load_percentage("MORNING"), 60);
    assert_eq!(plan.operator_count("MORNING"), 2);
    assert_eq!(plan.load_percentage("AFTERNOON"), 30);
    assert_eq!(plan.load_percentage("NIGHT"), 10);
    assert_eq!(plan.effective_week_end(), d(2025, 1, 12));

    let stored = env
        .repos
        .shift_repo
        .find_plan_by_week(d(2025, 1, 6))
        .unwrap()
        .unwrap();
    assert_eq!(stored.double_staffed_shift_id, "MORNING");
    assert_eq!(stored.total_percentage(), 100);
    assert_eq!(stored.allocations.len(), 3);
}

#[test]
fn test_reconfiguring_same_week_replaces_plan() {
    let env = TestEnv::new().with_three_shifts();
    let capacity = env.controller.capacity();

    capacity
        .set_weekly_plan("MORNING", d(2025, 1, 6), at(d(2025, 1, 3), 9, 0))
        .unwrap();
    capacity
        .set_weekly_plan("NIGHT", d(2025, 1, 6), at(d(2025, 1, 4), 9, 0))
        .unwrap();

    assert_eq!(env.count_plans(), 1);
    let plan = capacity.plan_for_date(d(2025, 1, 9)).unwrap().unwrap();
    assert_eq!(plan.double_staffed_shift_id, "NIGHT");
    assert_eq!(plan.load_percentage("MORNING"), 30);
    assert_eq!(plan.load_percentage("AFTERNOON"), 10);
}

#[test]
fn test_unknown_shift_is_not_found() {
    let env = TestEnv::new().with_three_shifts();
    let result = env.controller.capacity().set_weekly_plan(
        "SWING",
        d(2025, 1, 6),
        at(d(2025, 1, 3), 9, 0),
    );
    assert!(matches!(result, Err(EngineError::NotFound { .. })));
    assert_eq!(env.count_plans(), 0);
}

#[test]
fn test_stored_table_not_summing_to_100_is_rejected() {
    let env = TestEnv::new().with_three_shifts();
    env.config
        .set_global_config_value(
            "shift/load_distribution",
            r#"{"double_staffed_share":60,"double_staffed_operators":2,"single_operators":1,"remaining_shares":[30,30]}"#,
        )
        .unwrap();

    let result = env.controller.capacity().set_weekly_plan(
        "AFTERNOON",
        d(2025, 1, 6),
        at(d(2025, 1, 3), 9, 0),
    );

    assert!(matches!(
        result,
        Err(EngineError::Validation(
            ValidationFailure::CapacityPercentagesMustSum100 { actual: 120 }
        ))
    ));
    assert_eq!(env.count_plans(), 0);
}

#[test]
fn test_custom_distribution_table_is_used() {
    let env = TestEnv::new().with_three_shifts();
    env.config
        .set_load_distribution(&LoadDistributionTable {
            double_staffed_share: 50,
            double_staffed_operators: 2,
            single_operators: 1,
            remaining_shares: vec![25, 25],
        })
        .unwrap();

    let plan = env
        .controller
        .capacity()
        .set_weekly_plan("NIGHT", d(2025, 1, 6), at(d(2025, 1, 3), 9, 0))
        .unwrap();

    assert_eq!(plan.load_percentage("NIGHT"), 50);
    assert_eq!(plan.load_percentage("MORNING"), 25);
    assert_eq!(plan.load_percentage("AFTERNOON"), 25);
}

#[test]
fn test_table_share_count_must_match_shifts() {
    let env = TestEnv::new().with_three_shifts();
    env.config
        .set_load_distribution(&LoadDistributionTable {
            double_staffed_share: 60,
            double_staffed_operators: 2,
            single_operators: 1,
            remaining_shares: vec![40],
        })
        .unwrap();

    let result = env.controller.capacity().set_weekly_plan(
        "NIGHT",
        d(2025, 1, 6),
        at(d(2025, 1, 3), 9, 0),
    );
    assert!(matches!(
        result,
        Err(EngineError::Validation(ValidationFailure::InvalidField { .. }))
    ));
}

#[test]
fn test_stored_table_with_oversized_share_is_rejected() {
    let env = TestEnv::new().with_three_shifts();
    env.config
        .set_global_config_value(
            "shift/load_distribution",
            r#"{"double_staffed_share":4294967295,"double_staffed_operators":2,"single_operators":1,"remaining_shares":[101,0]}"#,
        )
        .unwrap();

    let result = env.controller.capacity().set_weekly_plan(
        "MORNING",
        d(2025, 1, 6),
        at(d(2025, 1, 3), 9, 0),
    );

    match result {
        Err(EngineError::Validation(ValidationFailure::CapacityPercentagesMustSum100 {
            actual,
        })) => assert_eq!(actual, 4_294_967_295 + 101),
        other => panic!("Expected CapacityPercentagesMustSum100, got {:?}", other),
    }
    assert_eq!(env.count_plans(), 0);
}
