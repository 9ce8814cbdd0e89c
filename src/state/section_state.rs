/// Section state definitions for tracking a leaf through the scheduler
use crate::CrawlError;
use std::fmt;

/// Represents the current state of a section in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionState {
    // ===== Active States =====
    /// Section is on the worklist, not yet claimed
    Pending,

    /// A worker is loading the section page
    Fetching,

    /// The page is loaded and the extraction strategy is running
    Extracting,

    // ===== Terminal States =====
    /// A record was written, with text or the content-missing sentinel
    Done,

    /// The page could not be loaded or processed
    Failed,
}

impl SectionState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if this is an active state (section may still be processed)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: SectionState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Extracting)
                | (Self::Extracting, Self::Done)
                | (Self::Pending | Self::Fetching | Self::Extracting, Self::Failed)
        )
    }

    /// Moves to `next`, rejecting transitions the state machine forbids
    pub fn transition(self, next: SectionState) -> Result<SectionState, CrawlError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CrawlError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
