//! RuleVersioningService 集成测试
//!
//! 使用真实 PostgreSQL 验证版本号分配（含并发）、条件/动作的
//! 原子批量写入、发布转换与生效指针切换。版本号分配依赖
//! (rule_id, version) 唯一约束 + 有限重试，无法通过纯 mock 覆盖。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test --test versioning_service_test -- --ignored
//! ```

use std::sync::Arc;

use automation_management::{
    ActionPayload, AuditRepository, AutomationError, ChangeType, ConditionPayload,
    CreateRulePayload, CreateVersionPayload, RequestContext, Rule, RuleDefinitionService,
    RuleVersioningService, VersionStatus,
};
use rule_engine::{AggregationRegistry, ConditionLogic, ConditionScope, OperatorRegistry};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup() -> PgPool {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("数据库连接失败");
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("迁移执行失败");
    pool
}

fn versioning_service(pool: &PgPool) -> RuleVersioningService {
    RuleVersioningService::new(
        pool.clone(),
        Arc::new(OperatorRegistry::with_defaults()),
        Arc::new(AggregationRegistry::with_defaults()),
        3,
    )
}

async fn create_rule(pool: &PgPool, ctx: &RequestContext) -> Rule {
    RuleDefinitionService::new(pool.clone())
        .create_rule(
            ctx,
            CreateRulePayload {
                name: "High churn risk".to_string(),
                description: None,
                enabled: None,
            },
        )
        .await
        .unwrap()
}

fn fresh_ctx() -> RequestContext {
    RequestContext::new(format!("agency-{}", Uuid::new_v4())).with_actor("user-1")
}

fn empty_payload() -> CreateVersionPayload {
    CreateVersionPayload {
        condition_logic: ConditionLogic::All,
        threshold_config: None,
        lifecycle_config: None,
        anomaly_config: None,
        conditions: vec![],
        actions: vec![],
    }
}

fn signal_condition(order: Option<i32>, field: &str, operator: &str) -> ConditionPayload {
    ConditionPayload {
        order,
        field_path: field.to_string(),
        operator: operator.to_string(),
        comparison_value: json!(50),
        scope: ConditionScope::Signal,
        window: None,
    }
}

// ==================== 版本号分配 ====================

#[tokio::test]
#[ignore]
async fn test_sequential_versions_are_contiguous() {
    let pool = setup().await;
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    for _ in 0..5 {
        service
            .create_version(rule.id, &ctx, empty_payload())
            .await
            .unwrap();
    }

    let versions = service.list_versions(rule.id, &ctx).await.unwrap();
    let numbers: Vec<i32> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert!(versions.iter().all(|v| v.status == VersionStatus::Draft));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_versions_have_no_gaps_or_duplicates() {
    let pool = setup().await;
    // 重试预算随并发度配置：8 个并发分配者最坏情况下需要 7 次重试
    let service = Arc::new(RuleVersioningService::new(
        pool.clone(),
        Arc::new(OperatorRegistry::with_defaults()),
        Arc::new(AggregationRegistry::with_defaults()),
        8,
    ));
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            service.create_version(rule.id, &ctx, empty_payload()).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().expect("并发创建版本失败");
    }

    let versions = service.list_versions(rule.id, &ctx).await.unwrap();
    let mut numbers: Vec<i32> = versions.iter().map(|v| v.version).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=8).collect::<Vec<i32>>(), "版本号必须无空洞无重复");
}

// ==================== 条目写入 ====================

#[tokio::test]
#[ignore]
async fn test_omitted_order_uses_array_position() {
    let pool = setup().await;
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    let payload = CreateVersionPayload {
        conditions: vec![
            signal_condition(None, "sessions", "lt"),
            signal_condition(None, "plan", "eq"),
            signal_condition(None, "seats", "gte"),
        ],
        actions: vec![
            ActionPayload {
                order: None,
                action_type: "create_insight".to_string(),
                action_config: None,
            },
            ActionPayload {
                order: None,
                action_type: "send_notification".to_string(),
                action_config: Some(json!({"channel": "email"})),
            },
        ],
        ..empty_payload()
    };

    let version = service.create_version(rule.id, &ctx, payload).await.unwrap();

    let conditions = service.list_conditions(version.id, &ctx).await.unwrap();
    let orders: Vec<i32> = conditions.iter().map(|c| c.sort_order).collect();
    assert_eq!(orders, vec![0, 1, 2], "省略的 order 取数组下标");
    assert_eq!(conditions[0].field_path, "sessions");
    assert_eq!(conditions[2].field_path, "seats");

    let actions = service.list_actions(version.id, &ctx).await.unwrap();
    let orders: Vec<i32> = actions.iter().map(|a| a.sort_order).collect();
    assert_eq!(orders, vec![0, 1]);
    assert_eq!(actions[1].action_config, json!({"channel": "email"}));
}

#[tokio::test]
#[ignore]
async fn test_invalid_item_aborts_whole_call() {
    let pool = setup().await;
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    let payload = CreateVersionPayload {
        conditions: vec![
            signal_condition(None, "sessions", "lt"),
            signal_condition(None, "plan", "no_such_operator"),
        ],
        ..empty_payload()
    };

    let err = service.create_version(rule.id, &ctx, payload).await.unwrap_err();
    match err {
        AutomationError::ItemValidation(items) => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].index, 1);
            assert_eq!(items[0].field, "operator");
        }
        other => panic!("期望 ItemValidation，实际: {:?}", other),
    }

    // 原子失败：没有留下缺少条目的半成品版本
    let versions = service.list_versions(rule.id, &ctx).await.unwrap();
    assert!(versions.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_create_version_cross_tenant_denied() {
    let pool = setup().await;
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    let err = service
        .create_version(rule.id, &fresh_ctx(), empty_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, AutomationError::AccessDenied));
}

// ==================== 发布 ====================

#[tokio::test]
#[ignore]
async fn test_publish_moves_default_pointer() {
    let pool = setup().await;
    let definitions = RuleDefinitionService::new(pool.clone());
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    let v1 = service.create_version(rule.id, &ctx, empty_payload()).await.unwrap();
    let published = service.publish_version(v1.id, &ctx).await.unwrap();
    assert_eq!(published.status, VersionStatus::Published);

    let rule_after = definitions.get_rule(rule.id, &ctx).await.unwrap();
    assert_eq!(rule_after.default_version_id, Some(v1.id));

    // 第二个版本发布后指针切换，v1 保持 published
    let v2 = service.create_version(rule.id, &ctx, empty_payload()).await.unwrap();
    service.publish_version(v2.id, &ctx).await.unwrap();

    let rule_after = definitions.get_rule(rule.id, &ctx).await.unwrap();
    assert_eq!(rule_after.default_version_id, Some(v2.id));

    let versions = service.list_versions(rule.id, &ctx).await.unwrap();
    assert!(
        versions.iter().all(|v| v.status == VersionStatus::Published),
        "发布不可逆，历史版本保持 published"
    );

    // 每次发布恰好落一条 published 审计
    let audits = AuditRepository::new(pool).list_by_rule(rule.id).await.unwrap();
    let published_count = audits
        .iter()
        .filter(|a| a.change_type == ChangeType::Published)
        .count();
    assert_eq!(published_count, 2);
    assert_eq!(audits[0].rule_version_id, Some(v2.id));
}

#[tokio::test]
#[ignore]
async fn test_republish_current_default_is_conflict() {
    let pool = setup().await;
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    let v1 = service.create_version(rule.id, &ctx, empty_payload()).await.unwrap();
    service.publish_version(v1.id, &ctx).await.unwrap();

    let err = service.publish_version(v1.id, &ctx).await.unwrap_err();
    assert!(matches!(err, AutomationError::AlreadyDefault(_)));
}

#[tokio::test]
#[ignore]
async fn test_published_history_version_can_become_default_again() {
    let pool = setup().await;
    let definitions = RuleDefinitionService::new(pool.clone());
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;

    let v1 = service.create_version(rule.id, &ctx, empty_payload()).await.unwrap();
    service.publish_version(v1.id, &ctx).await.unwrap();
    let v2 = service.create_version(rule.id, &ctx, empty_payload()).await.unwrap();
    service.publish_version(v2.id, &ctx).await.unwrap();

    // 回切到已发布的历史版本：状态不变，指针移动
    service.publish_version(v1.id, &ctx).await.unwrap();
    let rule_after = definitions.get_rule(rule.id, &ctx).await.unwrap();
    assert_eq!(rule_after.default_version_id, Some(v1.id));
}

#[tokio::test]
#[ignore]
async fn test_publish_authorizes_through_owning_rule() {
    let pool = setup().await;
    let service = versioning_service(&pool);
    let ctx = fresh_ctx();
    let rule = create_rule(&pool, &ctx).await;
    let v1 = service.create_version(rule.id, &ctx, empty_payload()).await.unwrap();

    // versionId 本身不可信：经所属规则校验租户
    let err = service.publish_version(v1.id, &fresh_ctx()).await.unwrap_err();
    assert!(matches!(err, AutomationError::AccessDenied));

    let err = service
        .list_conditions(v1.id, &fresh_ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, AutomationError::AccessDenied));

    let err = service
        .publish_version(i64::MAX, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AutomationError::VersionNotFound(_)));
}
