//! 业务服务层

pub mod definition_service;
pub mod dto;
pub mod evaluation_service;
pub mod versioning_service;

pub use definition_service::RuleDefinitionService;
pub use evaluation_service::EvaluationService;
pub use versioning_service::{DEFAULT_EVALUATION_LIMIT, RuleVersioningService};
