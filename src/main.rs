//! # Kuma 搜索 UI 测试入口
//!
//! 连接已启动的 Chrome（`--remote-debugging-port`），对 Kuma 部署运行搜索用例，并把 JSON 报告输出到标准输出。
//!
//! ## 流程
//! - 读取配置（`KUMA_CONFIG` 指向的 TOML 文件，或 `KUMA_*` 环境变量）
//! - 检查 CDP 端点，创建会话供给方和状态文档供给方
//! - 按标记表达式筛选并运行用例，失败用例按 `flaky` 标记重跑
//! - 任一用例失败时以非零状态码退出
//!
//! ## 环境变量
//! - `KUMA_CONFIG`: TOML 配置文件路径（可选）
//! - `KUMA_BASE_URL`: 被测部署地址（默认: http://localhost:8000）
//! - `KUMA_CDP_ENDPOINT`: CDP 端点（默认: ws://localhost:9222）
//! - `KUMA_MARKERS`: 标记表达式，例如 `smoke and not flaky`
//! - `RUST_LOG`: 日志过滤（优先于配置中的 `log_level`）

use anyhow::Context;
use kuma_pages::{
    cdp::{CdpBrowser, CdpBrowserImpl},
    config::Config,
    driver::CdpSessionProvider,
    runner::SuiteRunner,
    status::HttpStatusProvider,
    suite,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<Config> {
    match std::env::var("KUMA_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path)),
        Err(_) => Config::from_env().context("reading KUMA_* environment"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("kuma-search-suite v{}", kuma_pages::VERSION);
    info!(
        "Target {} (locale {}), browser {}",
        config.base_url, config.locale, config.cdp_endpoint
    );

    let browser = Arc::new(CdpBrowserImpl::new(config.cdp_endpoint.clone()));
    let version = browser
        .get_version()
        .await
        .context("querying the browser's /json/version")?;
    info!("Connected to {} (protocol {})", version.product, version.protocol_version);

    let sessions = Arc::new(CdpSessionProvider::new(
        browser,
        (config.viewport_width, config.viewport_height),
        config.wait_timeout_ms,
    ));
    let status = Arc::new(HttpStatusProvider::new(
        &config.base_url,
        &config.status_path,
        config.http_timeout(),
    )?);

    let runner = SuiteRunner::new(config, sessions.clone(), status)?;

    let report = tokio::select! {
        report = runner.run(suite::all()) => report?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; {} session(s) left open", sessions.open_count().await);
            std::process::exit(130);
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success() {
        error!("{} scenario(s) failed", report.failed);
        std::process::exit(1);
    }
    Ok(())
}
