//! 鉴权模块：bearer 身份提取、角色/API key 守卫与认证接口处理。

pub(crate) mod extract;
pub(crate) mod guard;
pub(crate) mod handlers;
