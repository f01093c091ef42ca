//! # 页面对象层
//!
//! 把 Kuma 页面的定位器和交互封装为页面对象，测试用例只调用页面对象的动作和查询，再对返回值做断言。
//!
//! ## 核心概念
//! - **PageBase / Page**: 会话句柄 + 基础地址 + 语言 + 等待策略；`open()` 导航并等待就绪定位器
//! - **Region**: 以某个根元素为范围的局部区域，只做范围内查找，不做导航
//! - **HomePage / ArticlePage / SearchPage**: 具体页面
//! - **Header / ColumnContainer**: 页头区域（所有页面共享）和搜索页的分栏区域
//!
//! ## 使用示例
//! ```rust,no_run
//! use kuma_pages::driver::Driver;
//! use kuma_pages::pages::{HomePage, Page, PageBase};
//! use std::sync::Arc;
//!
//! # async fn example(driver: Arc<dyn Driver>) -> kuma_pages::Result<()> {
//! let home = HomePage::new(PageBase::new(driver, "http://localhost:8000")).open().await?;
//! let search = home.search_for_term("css").await?;
//! assert_eq!(search.search_result_items_length().await?, 10);
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod region;
pub mod header;
pub mod column_container;
pub mod home;
pub mod article;
pub mod search;

#[cfg(test)]
mod tests;

pub use base::{Page, PageBase, DEFAULT_LOCALE};
pub use region::Region;
pub use header::Header;
pub use column_container::{ColumnContainer, DESKTOP_BREAKPOINT};
pub use home::HomePage;
pub use article::{ArticlePage, DEFAULT_ARTICLE_SLUG};
pub use search::{parse_documents_found, LinkList, SearchPage};
