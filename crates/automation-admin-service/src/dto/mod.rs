//! 请求/响应 DTO

mod request;
mod response;

pub use request::{
    CreateRuleRequest, EvaluateSignalRequest, EvaluationListQuery, SignalRequest, TestRuleRequest,
    UpdateRuleRequest,
};
pub use response::{
    ActionDto, ApiResponse, AuditDto, ConditionDto, EvaluationDto, RuleDto, TestOutcomeDto,
    VersionDto,
};
