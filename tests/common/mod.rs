//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_auth;
pub mod mock_platform;

pub use fixtures::*;
pub use mock_auth::{MockCredentialStore, MockKeyExchange, MockPrompter};
pub use mock_platform::MockPlatformService;
