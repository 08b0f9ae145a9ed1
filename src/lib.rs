pub mod app;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod fs_util;
pub mod gdc;
pub mod merge;
pub mod output;
pub mod predicate;
pub mod sets;
pub mod store;
pub mod table;
