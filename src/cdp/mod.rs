//! # Chrome DevTools Protocol (CDP) 层
//!
//! 通过 Chrome DevTools Protocol 与已启动的 Chrome/Chromium 通信，为 CDP 驱动提供底层能力。
//!
//! ## 主要功能
//! - **WebSocket 连接管理**: 建立和维护与页面目标的 CDP WebSocket 连接
//! - **协议通信**: 发送 CDP 命令并按 ID 分发响应
//! - **导航控制**: 页面导航与 `document.readyState` 轮询
//! - **脚本执行**: 在页面上下文中执行 JavaScript
//! - **截图功能**: PNG 截图（用于失败用例的现场保存）
//! - **目标管理**: 通过 `/json/*` HTTP 接口创建和关闭页面目标
//!
//! ## 模块结构
//! - `traits`: CDP 操作的核心 trait 定义
//! - `types`: CDP 协议相关的数据类型
//! - `connection`: WebSocket 连接实现
//! - `client`: CDP 客户端实现
//! - `browser`: 浏览器级别的操作
//! - `mock`: 用于测试的 Mock 实现
//!
//! ## 使用示例
//! ```rust,no_run
//! use kuma_pages::cdp::{CdpBrowser, CdpBrowserImpl, CdpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let browser = CdpBrowserImpl::new("ws://localhost:9222");
//! let target = browser.create_target("about:blank").await?;
//! let client = browser.create_client(&target.ws_url).await?;
//!
//! let result = client.navigate("http://localhost:8000/en-US/", 30_000).await?;
//! println!("Loaded {}: {}", result.url, result.is_loaded);
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod connection;
pub mod client;
pub mod browser;
pub mod mock;

pub use traits::{
    BrowserVersion, CdpBrowser, CdpClient, CdpConnection, CdpError, CdpResponse, EvaluationResult,
    NavigationResult, TargetInfo,
};

// Re-export implementation structs
pub use connection::CdpWebSocketConnection;
pub use client::CdpClientImpl;
pub use browser::CdpBrowserImpl;

// Re-export mock for development/testing
pub use mock::{MockCdpBrowser, MockCdpConnection};
