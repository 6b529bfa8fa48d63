pub mod actions;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use actions::{create_space, register, send, send_with_cookies, RegisteredUser, TestResponse};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
