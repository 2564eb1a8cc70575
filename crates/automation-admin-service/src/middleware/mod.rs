//! 中间件

mod context;

pub use context::{context_from_headers, context_middleware};
