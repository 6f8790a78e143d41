// ============================================================================
// Harness Module
// ============================================================================
//
// - runner/ - single validation pass (publish, verify cache, bulk publish)
// - feed/   - continuous order generation
//
// ============================================================================

mod feed;
mod runner;

pub use feed::{shutdown_on, FeedSettings, OrderFeed};
pub use runner::{HarnessRunner, RunSettings};
