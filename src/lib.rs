//! flagtip library
//!
//! The location pipeline (cache, scheduler, resolver bridge), the page model
//! with its scanner and watcher, the hover controller, and the terminal host
//! built on top of them.

pub mod app;
pub mod bridge;
pub mod cache;
pub mod cli;
pub mod config;
pub mod feed;
pub mod flags;
pub mod hover;
pub mod locator;
pub mod page;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod ui;
