pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod output;
pub mod remote;
pub mod sync;
