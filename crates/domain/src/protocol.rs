//! Lenient decoding of store payloads (`name` for `text`, numeric ids, ...).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::models::{
    author_or_anonymous, ActorId, Comment, CommentId, ReactionCounts, ReactionDetail, ReactionKind,
    ReactionSummary, ReportId,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComment {
    #[serde(alias = "_id")]
    id: Option<RawId>,
    #[serde(alias = "reportId")]
    report_id: Option<RawId>,
    #[serde(alias = "parentId")]
    parent_id: Option<RawId>,
    #[serde(alias = "authorName", alias = "userName")]
    author_name: Option<String>,
    #[serde(alias = "name", alias = "content")]
    text: Option<String>,
    #[serde(alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
    #[serde(alias = "updatedAt")]
    updated_at: Option<DateTime<Utc>>,
}

impl RawComment {
    fn into_comment(self, fallback_report: Option<&ReportId>) -> Option<Comment> {
        let id = self.id.map(RawId::into_string).filter(|s| !s.is_empty())?;
        let report_id = match self.report_id {
            Some(r) => ReportId::new_unchecked(r.into_string()),
            None => fallback_report?.clone(),
        };
        Some(Comment {
            id: CommentId::new_unchecked(id),
            report_id,
            parent_id: self
                .parent_id
                .map(RawId::into_string)
                .filter(|s| !s.is_empty())
                .map(CommentId::new_unchecked),
            author_name: author_or_anonymous(self.author_name.as_deref()),
            text: self.text.map(|t| t.trim().to_string()).unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
            updated_at: self.updated_at,
        })
    }
}

/// Decodes one comment record. `report` fills in a missing report id.
pub fn decode_comment(value: &Value, report: Option<&ReportId>) -> Option<Comment> {
    let raw = RawComment::deserialize(value).ok()?;
    raw.into_comment(report)
}

/// Decodes a comment listing. Anything but an array reads as no comments;
/// malformed entries are skipped.
pub fn decode_comments(value: &Value, report: Option<&ReportId>) -> Vec<Comment> {
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            warn!("Comment listing is not an array, treating as empty");
        }
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let decoded = decode_comment(item, report);
            if decoded.is_none() {
                warn!("Skipping malformed comment record: {}", item);
            }
            decoded
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSummary {
    #[serde(alias = "distribution")]
    counts: Option<serde_json::Map<String, Value>>,
    #[serde(alias = "likeCount", alias = "count")]
    total: Option<u64>,
    #[serde(alias = "userReaction", alias = "reaction")]
    user_reaction: Option<String>,
}

/// Decodes a reaction aggregate. Unknown kinds and non-numeric counts are
/// ignored; the total is recomputed from the counts whenever they're present.
pub fn decode_summary(value: &Value) -> Option<ReactionSummary> {
    let raw = RawSummary::deserialize(value).ok()?;
    let user_reaction = raw
        .user_reaction
        .and_then(|k| k.parse::<ReactionKind>().ok());
    match raw.counts {
        Some(map) => {
            let counts: ReactionCounts = map
                .iter()
                .filter_map(|(k, v)| Some((k.parse::<ReactionKind>().ok()?, v.as_u64()?)))
                .collect();
            Some(ReactionSummary::from_counts(counts, user_reaction))
        }
        None => Some(ReactionSummary {
            counts: ReactionCounts::new(),
            total: raw.total.unwrap_or(0),
            user_reaction,
        }),
    }
}

/// Decodes `{ kind: [actorId | { id }] }` listings.
pub fn decode_detail(value: &Value) -> ReactionDetail {
    let mut out = ReactionDetail::new();
    let Some(map) = value.as_object() else {
        return out;
    };
    for (kind, actors) in map {
        let Ok(kind) = kind.parse::<ReactionKind>() else {
            continue;
        };
        let actors = actors
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|a| match a {
                        Value::String(s) => Some(s.clone()),
                        Value::Object(o) => o
                            .get("id")
                            .or_else(|| o.get("sessionId"))
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        _ => None,
                    })
                    .map(ActorId::new_unchecked)
                    .collect()
            })
            .unwrap_or_default();
        out.insert(kind, actors);
    }
    out
}
