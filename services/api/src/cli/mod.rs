//! mailer-api CLI 分发：`run`、`hash-password`、`doctor`、`version`。

use std::io::BufRead;

use anyhow::{Context, anyhow, bail};
use mailer_auth::Credential;
use serde_json::json;

use crate::config::Config;

/// CLI 分发结果。
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CliDispatch {
    /// 继续进入 HTTP 服务主循环。
    Run,
    /// 命令已处理完成，主程序应退出。
    Exit,
}

/// 解析后的子命令。
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run,
    Help,
    Version,
    /// `None` 时从 stdin 读取口令，避免明文出现在进程参数里。
    HashPassword(Option<String>),
    Doctor(DoctorFormat),
}

/// `doctor` 输出格式。
#[derive(Debug, PartialEq, Eq)]
enum DoctorFormat {
    Text,
    Json,
}

/// 解析并执行 CLI。
pub(crate) fn dispatch(args: &[String]) -> anyhow::Result<CliDispatch> {
    match parse(args)? {
        Command::Run => Ok(CliDispatch::Run),
        Command::Help => {
            print_root_help();
            Ok(CliDispatch::Exit)
        }
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(CliDispatch::Exit)
        }
        Command::HashPassword(password) => {
            let password = match password {
                Some(password) => password,
                None => read_password(std::io::stdin().lock())?,
            };
            let credential = Credential::derive(&password)?;
            println!("{credential}");
            Ok(CliDispatch::Exit)
        }
        Command::Doctor(format) => {
            if !run_doctor(format) {
                std::process::exit(1);
            }
            Ok(CliDispatch::Exit)
        }
    }
}

fn parse(args: &[String]) -> anyhow::Result<Command> {
    let Some(cmd) = args.first().map(|arg| arg.trim()) else {
        return Ok(Command::Run);
    };
    match cmd {
        "" | "run" => Ok(Command::Run),
        "-h" | "--help" | "help" => Ok(Command::Help),
        "version" | "--version" => Ok(Command::Version),
        "hash-password" => match &args[1..] {
            [] => Ok(Command::HashPassword(None)),
            [password] if !password.is_empty() => {
                Ok(Command::HashPassword(Some(password.clone())))
            }
            _ => Err(anyhow!("usage: mailer-api hash-password [<password>]")),
        },
        "doctor" => parse_doctor_format(&args[1..]).map(Command::Doctor),
        other => Err(anyhow!(
            "unknown command: {other}; run `mailer-api --help` for usage"
        )),
    }
}

/// 从输入读取首行作为口令（去掉行尾换行）。
fn read_password(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password.to_string())
}

/// 解析 doctor 的 `--format` 参数。
fn parse_doctor_format(args: &[String]) -> anyhow::Result<DoctorFormat> {
    match args {
        [] => Ok(DoctorFormat::Text),
        [flag, value] if flag == "--format" => match value.as_str() {
            "text" => Ok(DoctorFormat::Text),
            "json" => Ok(DoctorFormat::Json),
            other => Err(anyhow!("unsupported doctor format: {other}")),
        },
        _ => Err(anyhow!("usage: mailer-api doctor [--format text|json]")),
    }
}

/// 校验环境配置并打印摘要；返回配置是否可用。
fn run_doctor(format: DoctorFormat) -> bool {
    let report = match Config::from_env() {
        Ok(cfg) => json!({
            "configOk": true,
            "addr": cfg.addr,
            "tokenTtlSec": cfg.token.default_ttl.as_secs(),
            "apiKeyGuard": cfg.api_key.is_some(),
            "resetUrlBase": cfg.reset_url_base,
            "kdfMaxParallel": cfg.kdf_max_parallel,
            "seedUser": cfg.seed_user.map(|seed| seed.email),
        }),
        Err(err) => json!({
            "configOk": false,
            "error": format!("{err:#}"),
        }),
    };
    let ok = report["configOk"].as_bool().unwrap_or(false);

    match format {
        DoctorFormat::Text => {
            if let Some(fields) = report.as_object() {
                for (key, value) in fields {
                    println!("{key}: {value}");
                }
            }
        }
        DoctorFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }
    ok
}

/// 打印 root help。
fn print_root_help() {
    println!("mailer-api usage:");
    println!("  mailer-api run");
    println!("  mailer-api hash-password [<password>]   (reads stdin when omitted)");
    println!("  mailer-api doctor [--format text|json]");
    println!("  mailer-api version");
}
