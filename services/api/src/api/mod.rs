//! API 层：统一响应包裹、错误与请求/响应类型。

pub(crate) mod error;
pub(crate) mod response;
pub(crate) mod types;
