//! 自动化规则引擎
//!
//! 提供可复用的规则评估能力，支持：
//! - 四种条件取值作用域（signal / context / history / aggregated）
//! - 操作符与聚合函数注册表（按名路由，可扩展）
//! - 有序条件评估与 all / any 组合
//! - 匹配后按顺序尽力而为地派发动作
//!
//! 引擎不含持久化；历史回溯与动作执行通过 trait 注入。

pub mod aggregation;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod models;
pub mod operators;
pub mod resolver;

pub use aggregation::AggregationRegistry;
pub use dispatch::{ActionDispatchRegistry, ActionHandler, ActionRequest};
pub use error::{EngineError, Result};
pub use executor::RuleExecutor;
pub use models::{
    ActionOutcome, ActionSpec, ActionStatus, ConditionLogic, ConditionOutcome, ConditionScope,
    ConditionSpec, EvaluationInput, EvaluationOutcome, Signal, ValueSelect, WindowConfig,
};
pub use operators::OperatorRegistry;
pub use resolver::{OperandResolver, ResolvedOperand, SignalHistory};
