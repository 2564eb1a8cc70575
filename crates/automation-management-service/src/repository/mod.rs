//! 数据库仓储层
//!
//! 纯 CRUD，不含业务逻辑。事务方法由服务层在变更事务内调用。

mod audit_repo;
mod evaluation_repo;
mod rule_repo;
mod signal_repo;
pub mod traits;
mod version_repo;

pub use audit_repo::AuditRepository;
pub use evaluation_repo::EvaluationRepository;
pub use rule_repo::RuleRepository;
pub use signal_repo::SignalRepository;
pub use traits::{
    AuditRepositoryTrait, EvaluationRepositoryTrait, RuleRepositoryTrait, SignalRepositoryTrait,
    VersionRepositoryTrait,
};
pub use version_repo::VersionRepository;
