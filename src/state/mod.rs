//! Per-section crawl state
//!
//! Every leaf moves through `Pending → Fetching → Extracting → Done`, or drops
//! to `Failed` from any active state. There are no retries: both end states
//! are terminal.

mod section_state;

pub use section_state::SectionState;
