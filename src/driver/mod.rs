//! # 浏览器驱动层
//!
//! 页面对象与浏览器之间的能力接口。页面对象只依赖这里的 trait，不关心背后是真实浏览器还是内存文档。
//!
//! ## 主要功能
//! - **元素定位**: CSS / id / name / XPath 定位器
//! - **元素操作**: 读取文本、属性、尺寸，点击、输入、提交表单
//! - **失效检测**: 文档被替换后，旧的元素句柄一律报告 `StaleElement`
//! - **会话供给**: 每个用例尝试获得一个独立会话，结束后由供给方回收
//!
//! ## 模块结构
//! - `traits`: `Driver` / `Element` / `SessionProvider` trait 定义
//! - `locator`: 定位器
//! - `script`: CDP 驱动使用的 JavaScript 生成
//! - `cdp`: 基于 CDP 层的驱动实现
//! - `mock`: 基于内存文档的驱动实现（用于测试）

pub mod traits;
pub mod locator;
pub mod script;
pub mod cdp;
pub mod mock;

pub use traits::{Driver, Element, Rect, SessionProvider};
pub use locator::Locator;
pub use cdp::{CdpDriver, CdpElement, CdpSessionProvider};
pub use mock::{Behavior, MockDriver, MockNode, MockRequest, MockSessionProvider, MockSite};
