//! 领域模型定义

mod audit;
mod context;
mod enums;
mod evaluation;
mod rule;
mod signal;
mod version;

pub use audit::{AuditEntry, RuleAudit};
pub use context::RequestContext;
pub use enums::{ChangeType, VersionStatus};
pub use evaluation::{NewRuleEvaluation, RuleEvaluation};
pub use rule::Rule;
pub use signal::SignalRecord;
pub use version::{
    AnomalyConfig, LifecycleConfig, NewRuleAction, NewRuleCondition, RuleAction, RuleCondition,
    RuleConditionRow, RuleVersion, RuleVersionRow, ThresholdConfig, parse_condition_logic,
    parse_condition_scope,
};
