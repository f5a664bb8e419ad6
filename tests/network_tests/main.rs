//! HTTP layer tests

#[path = "../common/mod.rs"]
mod common;

mod handler_tests;
