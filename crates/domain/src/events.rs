use crate::models::{Comment, CommentId, RatingStats, ReactionCounts, ReportId};
use serde::{Deserialize, Serialize};

/// Something changed on one report. Every variant carries its report id so
/// subscribers are addressed per report, never globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ReportEvent {
    CommentCreated {
        report_id: ReportId,
        comment: Comment,
    },
    CommentUpdated {
        report_id: ReportId,
        comment: Comment,
    },
    CommentDeleted {
        report_id: ReportId,
        comment_id: CommentId,
    },
    ReactionsChanged {
        report_id: ReportId,
        counts: ReactionCounts,
        total: u64,
    },
    RatingsChanged {
        report_id: ReportId,
        stats: RatingStats,
    },
}

impl ReportEvent {
    pub fn report_id(&self) -> &ReportId {
        match self {
            ReportEvent::CommentCreated { report_id, .. }
            | ReportEvent::CommentUpdated { report_id, .. }
            | ReportEvent::CommentDeleted { report_id, .. }
            | ReportEvent::ReactionsChanged { report_id, .. }
            | ReportEvent::RatingsChanged { report_id, .. } => report_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportEvent::CommentCreated { .. } => "comment_created",
            ReportEvent::CommentUpdated { .. } => "comment_updated",
            ReportEvent::CommentDeleted { .. } => "comment_deleted",
            ReportEvent::ReactionsChanged { .. } => "reactions_changed",
            ReportEvent::RatingsChanged { .. } => "ratings_changed",
        }
    }

    pub fn is_comment_event(&self) -> bool {
        matches!(
            self,
            ReportEvent::CommentCreated { .. }
                | ReportEvent::CommentUpdated { .. }
                | ReportEvent::CommentDeleted { .. }
        )
    }
}
