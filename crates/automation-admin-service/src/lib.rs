//! 自动化规则管理后台服务
//!
//! 面向运营端的 REST API：规则定义 CRUD、版本管理与发布、
//! 审计/评估记录查询、规则干跑测试。
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型与 HTTP 状态码映射
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 请求上下文注入
//! - `actions`: 内置动作处理器（开发/联调用）
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod actions;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// 重新导出核心类型
pub use dto::{
    ApiResponse, AuditDto, ConditionDto, CreateRuleRequest, EvaluationDto, RuleDto,
    TestRuleRequest, UpdateRuleRequest, VersionDto,
};
pub use error::{AdminError, Result};
pub use state::AppState;
