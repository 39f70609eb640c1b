//! 服务共享状态：签名器、用户目录、KDF 线程池与投递接缝。

use std::sync::Arc;

use mailer_auth::{Claims, TokenCodec};
use tracing::info;

use crate::{
    api::error::ApiError,
    config::{Config, SeedUser},
    delivery::ResetDelivery,
    kdf::KdfPool,
    users::{DirectoryError, NewUser, UserDirectory, UserRecord},
};

/// 服务共享状态。
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) codec: Arc<TokenCodec>,
    pub(crate) users: Arc<UserDirectory>,
    pub(crate) kdf: KdfPool,
    /// 变更类请求的 API key（未配置则不校验）。
    pub(crate) api_key: Option<Arc<str>>,
    /// 重置链接前缀（已去除末尾 `/`）。
    pub(crate) reset_url_base: Option<Arc<str>>,
    pub(crate) reset_delivery: Arc<dyn ResetDelivery>,
}

impl AppState {
    pub(crate) fn new(config: &Config, reset_delivery: Arc<dyn ResetDelivery>) -> Self {
        Self {
            codec: Arc::new(TokenCodec::new(config.token.clone())),
            users: Arc::new(UserDirectory::default()),
            kdf: KdfPool::new(config.kdf_max_parallel),
            api_key: config.api_key.as_deref().map(Arc::from),
            reset_url_base: config.reset_url_base.as_deref().map(Arc::from),
            reset_delivery,
        }
    }

    /// 为用户签发 bearer token（默认有效期）。
    pub(crate) fn issue_token(&self, user: &UserRecord) -> String {
        let claims = Claims::identity(
            &user.id.to_string(),
            &user.email,
            user.role.as_str(),
            &user.name,
        );
        self.codec.sign(&claims, None)
    }

    /// 创建种子账号；邮箱已存在时跳过。
    pub(crate) async fn seed_user(&self, seed: &SeedUser) -> Result<(), ApiError> {
        if self.users.email_taken(&seed.email).await {
            info!(email = %seed.email, "seed user already exists");
            return Ok(());
        }
        let credential = self.kdf.derive(seed.password.clone()).await?;
        match self
            .users
            .insert(NewUser {
                name: seed.name.clone(),
                email: seed.email.clone(),
                credential,
                role: seed.role,
            })
            .await
        {
            Ok(user) => {
                info!(email = %user.email, role = %user.role, "seed user created");
                Ok(())
            }
            Err(DirectoryError::EmailTaken) => {
                info!(email = %seed.email, "seed user already exists");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use mailer_auth::{SigningSecret, TokenConfig, Ttl};

    use super::AppState;
    use crate::{config::Config, delivery::ResetDelivery};

    pub(crate) const TEST_SECRET: &str = "test-secret";

    pub(crate) fn test_config(api_key: Option<&str>) -> Config {
        Config {
            addr: "127.0.0.1:0".to_string(),
            token: TokenConfig::new(
                SigningSecret::new(TEST_SECRET).expect("non-empty secret"),
                Ttl::default(),
            ),
            api_key: api_key.map(str::to_string),
            reset_url_base: None,
            kdf_max_parallel: 2,
            seed_user: None,
        }
    }

    pub(crate) fn test_state(api_key: Option<&str>, delivery: Arc<dyn ResetDelivery>) -> AppState {
        AppState::new(&test_config(api_key), delivery)
    }
}
