//! 口令派生线程池：scrypt 调用放到阻塞线程执行，并用信号量限制并发。

use std::sync::Arc;

use mailer_auth::{Credential, PasswordVerdict, verify_password};
use tokio::sync::Semaphore;
use tracing::error;

use crate::api::error::ApiError;

/// 未配置时的并发上限回退值。
const FALLBACK_MAX_PARALLEL: usize = 2;
/// 未知账号登录时用于陪跑的凭证，格式合法以保证完整执行一次 scrypt。
const DECOY_CREDENTIAL: &str = "abc123abc123abc123abc123abc123ab:\
    02f11d4b83aca6bb0e3b392f7a9671e1444126cad4772fad017ba235082f899c\
    f5191f78a59ac63bc936f4dd4de2a16bba0ee5cf42e03954e964b46ba58502bd";

/// 有界 KDF 执行器。
#[derive(Clone)]
pub(crate) struct KdfPool {
    permits: Arc<Semaphore>,
}

impl KdfPool {
    pub(crate) fn new(max_parallel: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    /// 按宿主机可用并行度构造。
    pub(crate) fn host_default_parallelism() -> usize {
        std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(FALLBACK_MAX_PARALLEL)
    }

    /// 派生新凭证。
    pub(crate) async fn derive(&self, password: String) -> Result<Credential, ApiError> {
        self.run(move || Credential::derive(&password))
            .await?
            .map_err(|err| {
                error!("derive credential failed: {err}");
                ApiError::internal("Failed to process password.")
            })
    }

    /// 校验口令与存储凭证。
    pub(crate) async fn verify(
        &self,
        password: String,
        stored: Credential,
    ) -> Result<PasswordVerdict, ApiError> {
        self.run(move || verify_password(&password, stored.as_str()))
            .await
    }

    /// 对固定凭证做一次校验并丢弃结果，使未知账号与口令错误耗时一致。
    pub(crate) async fn verify_decoy(&self, password: String) -> Result<(), ApiError> {
        self.run(move || {
            let _ = verify_password(&password, DECOY_CREDENTIAL);
        })
        .await
    }

    async fn run<T, F>(&self, job: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let permit = self.permits.clone().acquire_owned().await.map_err(|err| {
            error!("kdf pool closed: {err}");
            ApiError::internal("Failed to process password.")
        })?;
        // 许可随阻塞任务一起释放；调用方被取消时任务仍占用名额。
        let task = move || {
            let _permit = permit;
            job()
        };
        tokio::task::spawn_blocking(task).await.map_err(|err| {
            error!("kdf task failed: {err}");
            ApiError::internal("Failed to process password.")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, time::Duration};

    use mailer_auth::verify_password;
    use tokio::sync::oneshot;

    use super::{DECOY_CREDENTIAL, KdfPool};

    #[tokio::test]
    async fn derive_then_verify_off_the_runtime() {
        let pool = KdfPool::new(1);
        let credential = pool.derive("admin123".to_string()).await.unwrap();

        assert!(
            pool.verify("admin123".to_string(), credential.clone())
                .await
                .unwrap()
                .is_match()
        );
        assert!(
            !pool
                .verify("admin124".to_string(), credential)
                .await
                .unwrap()
                .is_match()
        );
    }

    #[tokio::test]
    async fn cancelled_caller_keeps_permit_until_job_finishes() {
        let pool = KdfPool::new(1);
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let caller = tokio::spawn({
            let pool = pool.clone();
            async move {
                pool.run(move || {
                    let _ = started_tx.send(());
                    let _ = release_rx.recv();
                })
                .await
            }
        });
        started_rx.await.unwrap();
        caller.abort();
        let _ = caller.await;

        assert_eq!(pool.permits.available_permits(), 0);
        let blocked = tokio::time::timeout(Duration::from_millis(100), pool.run(|| 1)).await;
        assert!(blocked.is_err(), "second job must wait for the first");

        release_tx.send(()).unwrap();
        let value = tokio::time::timeout(Duration::from_secs(5), pool.run(|| 7))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(pool.permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn decoy_runs_a_full_derivation() {
        // 凭证能被真实口令匹配，说明校验不会在格式检查处提前返回。
        assert!(verify_password("admin123", DECOY_CREDENTIAL).is_match());
        KdfPool::new(1)
            .verify_decoy("anything".to_string())
            .await
            .unwrap();
    }

    #[test]
    fn parallelism_is_never_zero() {
        assert!(KdfPool::host_default_parallelism() >= 1);
    }
}
