//! 用户目录：内存存储的用户记录、角色与对外安全视图。
//!
//! 持久化存储不在本服务范围内，这里以 `RwLock<HashMap>` 充当用户表，
//! 邮箱按小写唯一。

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use mailer_auth::Credential;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 用户角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub(crate) const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Staff];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        }
    }

    /// 角色取值说明，用于校验错误提示。
    pub(crate) fn choices() -> String {
        Self::ALL
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == raw)
            .ok_or_else(|| format!("role must be one of: {}", Self::choices()))
    }
}

/// 归一化邮箱：去空白并转小写。
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 内部用户记录（含凭证与重置票据摘要，不得直接序列化给客户端）。
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) credential: Credential,
    pub(crate) role: Role,
    pub(crate) reset_digest: Option<String>,
    pub(crate) reset_expires_at: Option<i64>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub(crate) fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// 对外安全视图。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserView {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: Role,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// 新建用户入参。
pub(crate) struct NewUser {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) credential: Credential,
    pub(crate) role: Role,
}

/// 用户目录写入错误。
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DirectoryError {
    EmailTaken,
}

/// 内存用户目录。
#[derive(Default)]
pub(crate) struct UserDirectory {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl UserDirectory {
    /// 新建用户；邮箱（忽略大小写）已存在时拒绝。
    pub(crate) async fn insert(&self, new_user: NewUser) -> Result<UserRecord, DirectoryError> {
        let email = normalize_email(&new_user.email);
        let mut guard = self.users.write().await;
        if guard.values().any(|user| user.email == email) {
            return Err(DirectoryError::EmailTaken);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: new_user.name.trim().to_string(),
            email,
            credential: new_user.credential,
            role: new_user.role,
            reset_digest: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    pub(crate) async fn email_taken(&self, email: &str) -> bool {
        self.find_by_email(email).await.is_some()
    }

    pub(crate) async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let email = normalize_email(email);
        let guard = self.users.read().await;
        guard.values().find(|user| user.email == email).cloned()
    }

    /// 记录重置票据摘要与过期时间，覆盖旧票据。
    pub(crate) async fn set_reset(&self, id: Uuid, digest: String, expires_at: i64) -> bool {
        let mut guard = self.users.write().await;
        let Some(user) = guard.get_mut(&id) else {
            return false;
        };
        user.reset_digest = Some(digest);
        user.reset_expires_at = Some(expires_at);
        user.updated_at = Utc::now();
        true
    }

    /// 按摘要查找未过期的重置票据持有者。
    pub(crate) async fn find_by_reset_digest(&self, digest: &str, now: i64) -> Option<UserRecord> {
        let guard = self.users.read().await;
        guard
            .values()
            .find(|user| reset_is_live(user, digest, now))
            .cloned()
    }

    /// 完成重置：票据仍有效时整体替换凭证并清空票据。
    pub(crate) async fn complete_reset(
        &self,
        id: Uuid,
        digest: &str,
        credential: Credential,
        now: i64,
    ) -> bool {
        let mut guard = self.users.write().await;
        let Some(user) = guard.get_mut(&id) else {
            return false;
        };
        if !reset_is_live(user, digest, now) {
            return false;
        }
        user.credential = credential;
        user.reset_digest = None;
        user.reset_expires_at = None;
        user.updated_at = Utc::now();
        true
    }

    /// 全部用户安全视图，按创建时间倒序。
    pub(crate) async fn list(&self) -> Vec<UserView> {
        let guard = self.users.read().await;
        let mut views: Vec<UserView> = guard.values().map(UserRecord::view).collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views
    }
}

fn reset_is_live(user: &UserRecord, digest: &str, now: i64) -> bool {
    user.reset_digest.as_deref() == Some(digest)
        && user.reset_expires_at.is_some_and(|exp| exp > now)
}
