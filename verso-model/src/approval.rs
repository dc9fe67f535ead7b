//! Content approval workflow.
//!
//! | from      | to                   |
//! |-----------|----------------------|
//! | draft     | review, archived     |
//! | review    | approved, rejected   |
//! | approved  | published, rejected  |
//! | published | archived             |
//! | rejected  | draft, archived      |
//! | archived  | (terminal)           |

use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow state of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Draft,
    Review,
    Approved,
    Published,
    Archived,
    Rejected,
}

impl ApprovalState {
    /// Every state, in workflow order.
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Review,
        Self::Approved,
        Self::Published,
        Self::Archived,
        Self::Rejected,
    ];

    /// States reachable from `self` in one step.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Review, Self::Archived],
            Self::Review => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Published, Self::Rejected],
            Self::Published => &[Self::Archived],
            Self::Rejected => &[Self::Draft, Self::Archived],
            Self::Archived => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validates a move to `next`, returning the new state.
    pub fn transition(self, next: Self) -> ModelResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ModelError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Archived)
    }

    /// Whether new versions may be committed in this state.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Review | Self::Rejected)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Archived => "archived",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == lowered)
            .ok_or_else(|| ModelError::UnknownState(s.to_string()))
    }
}
