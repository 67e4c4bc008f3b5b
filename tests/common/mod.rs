#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;
mod helpers;

pub use fakes::{FakeConnector, FakeFirewall, FakeRuntime};
pub use helpers::{init_test_tracing, wait_until};
