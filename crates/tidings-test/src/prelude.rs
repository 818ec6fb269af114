//! Prelude module - commonly used test utilities.
//!
//! Use `use tidings_test::prelude::*;` to import all essential helpers.

pub use crate::fixtures::{Lifecycle, LifecycleName, lifecycle};
pub use crate::logging::{LogCapture, init_test_logging};
pub use crate::mocks::{CallLog, FailingListener};
