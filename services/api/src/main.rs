//! mailer-api 二进制入口：解析 CLI、初始化日志与配置后启动服务。

mod api;
mod app;
mod auth;
mod cli;
mod config;
mod delivery;
mod kdf;
mod logging;
mod state;
mod users;

#[tokio::main]
/// 启动认证服务。
async fn main() -> anyhow::Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<String>>();
    match cli::dispatch(&args)? {
        cli::CliDispatch::Run => {}
        cli::CliDispatch::Exit => return Ok(()),
    }

    let _log_runtime = logging::init("mailer-api")?;
    let config = config::Config::from_env()?;
    app::run(config).await
}
