pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{assert_not_received, assert_received, participant_ids};
#[allow(unused_imports)]
pub use mocks::MockChannel;
#[allow(unused_imports)]
pub use setup::{TestConnection, TestSetup};
