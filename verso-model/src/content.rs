use crate::ApprovalState;
use serde::{Deserialize, Serialize};
use verso_types::{ContentId, VersionId};

/// An editable content item and its mutable pointers.
///
/// `head_version_id` and `approval_state` are the only mutable state in the
/// system; stores guard both with compare-and-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_id: ContentId,
    /// Selects the merge rule set.
    pub content_type: String,
    pub head_version_id: Option<VersionId>,
    pub approval_state: ApprovalState,
}

impl ContentItem {
    /// A new item: draft, no versions yet.
    #[must_use]
    pub fn new(content_id: ContentId, content_type: impl Into<String>) -> Self {
        Self {
            content_id,
            content_type: content_type.into(),
            head_version_id: None,
            approval_state: ApprovalState::Draft,
        }
    }
}
