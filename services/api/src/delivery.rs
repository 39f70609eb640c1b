//! 重置链接投递接缝。邮件发送通道不在本服务内，由宿主注入实现。

use tracing::warn;

/// 重置链接投递。
pub(crate) trait ResetDelivery: Send + Sync {
    /// 把重置链接交给收件人；失败时返回错误，接口层会返回 500。
    fn deliver(&self, to_email: &str, to_name: &str, reset_url: &str) -> anyhow::Result<()>;
}

/// 未接入邮件通道时的默认实现：只记录收件人，不记录链接。
pub(crate) struct UnconfiguredDelivery;

impl ResetDelivery for UnconfiguredDelivery {
    fn deliver(&self, to_email: &str, _to_name: &str, _reset_url: &str) -> anyhow::Result<()> {
        warn!(to = to_email, "password reset requested but no mail transport is configured");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::ResetDelivery;

    /// 测试用投递：记录 `(email, url)`。
    #[derive(Default)]
    pub(crate) struct CapturingDelivery {
        pub(crate) sent: Mutex<Vec<(String, String)>>,
    }

    impl ResetDelivery for CapturingDelivery {
        fn deliver(&self, to_email: &str, _to_name: &str, reset_url: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .map_err(|_| anyhow::anyhow!("capture lock poisoned"))?
                .push((to_email.to_string(), reset_url.to_string()));
            Ok(())
        }
    }
}
