//! Library crate for ringd: ring plumbing, buffer pool, connection table,
//! HTTP head parser, response formatting, and the server event loop.
//!
//! The **binary** (`main.rs`) is the only entrypoint that actually calls
//! into `ring`/`server` against a live kernel. Both modules still live in
//! the library and are exercised by `#[ignore]`d tests that require
//! `io_uring` support; everything else (`http`, `buffer_pool`,
//! `index_queue`, `connection`, `io_request`, `response`, `config`) is
//! fully testable without it.

pub mod buffer_pool;
pub mod config;
pub mod connection;
pub mod constants;
pub mod http;
pub mod index_queue;
pub mod io_request;
pub mod metrics;
pub mod response;
pub mod ring;
pub mod server;
