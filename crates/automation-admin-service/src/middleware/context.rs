//! 请求上下文中间件
//!
//! 从上游认证/授权层设置的请求头中提取调用方身份，注入为
//! RequestContext 扩展供所有 handler 使用。认证本身不在本服务
//! 范围内：这里只消费 x-agency-id / x-actor-id / x-super-admin。

use automation_management::RequestContext;
use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// 提取请求头字符串值
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// 从请求头构建调用方上下文
pub fn context_from_headers(headers: &HeaderMap) -> RequestContext {
    let is_super_admin = header_value(headers, "x-super-admin")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    RequestContext {
        agency_id: header_value(headers, "x-agency-id"),
        actor_id: header_value(headers, "x-actor-id"),
        is_super_admin,
    }
}

/// 上下文注入中间件
///
/// 不做拒绝：缺失租户等约束由服务层按操作语义返回
/// AgencyRequired / AccessDenied。
pub async fn context_middleware(mut request: Request, next: Next) -> Response {
    let ctx = context_from_headers(request.headers());
    request.extensions_mut().insert(ctx);
    next.run(request).await
}
