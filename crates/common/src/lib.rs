//! Common utilities and shared types for the appraisal service.
//!
//! This crate provides foundational components used across all workspace crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Pagination**: Clamped page requests via [`PageRequest`] and [`Page`]
//!
//! # Example
//!
//! ```no_run
//! use appraisal_common::{Config, AppResult, PageRequest};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let page = PageRequest::clamped(Some(2), Some(500), 10, config.appraisal.max_page_size);
//!     println!("Fetching page {} of size {}", page.page, page.limit);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pagination;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use pagination::{Page, PageRequest};
