use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ValidationError;

pub const ANONYMOUS: &str = "Anonymous";

const TENTATIVE_PREFIX: &str = "local:";
const MAX_ID_LEN: usize = 128;

fn check_id(kind: &'static str, s: &str) -> Result<(), ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::InvalidId {
            kind,
            reason: "must not be empty",
        });
    }
    if s.len() > MAX_ID_LEN {
        return Err(ValidationError::InvalidId {
            kind,
            reason: "is too long (max 128 chars)",
        });
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(ValidationError::InvalidId {
            kind,
            reason: "contains invalid characters",
        });
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
                let s = s.into();
                check_id($kind, &s)?;
                Ok(Self(s))
            }

            pub fn new_unchecked(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// The disaster report that comments, reactions and ratings attach to.
    ReportId,
    "report id"
);
string_id!(CommentId, "comment id");
string_id!(
    /// A reacting entity: a durable session id or a signed-in user id.
    ActorId,
    "actor id"
);

static TENTATIVE_COUNTER: AtomicU64 = AtomicU64::new(0);

impl CommentId {
    /// Placeholder until the store confirms. Store ids never start with `local:`.
    pub fn tentative() -> Self {
        let n = TENTATIVE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}{}-{}",
            TENTATIVE_PREFIX,
            Utc::now().timestamp_millis(),
            n
        ))
    }

    pub fn is_tentative(&self) -> bool {
        self.0.starts_with(TENTATIVE_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub report_id: ReportId,
    pub parent_id: Option<CommentId>,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub report_id: ReportId,
    pub parent_id: Option<CommentId>,
    pub author_name: String,
    pub text: String,
}

impl NewComment {
    pub fn new(
        report_id: ReportId,
        text: &str,
        parent_id: Option<CommentId>,
        author_name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            report_id,
            parent_id,
            author_name: author_or_anonymous(author_name),
            text: comment_text(text)?,
        })
    }
}

pub fn comment_text(text: &str) -> Result<String, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(text.to_string())
}

pub fn author_or_anonymous(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => ANONYMOUS.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Care,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 7] = [
        ReactionKind::Like,
        ReactionKind::Love,
        ReactionKind::Care,
        ReactionKind::Haha,
        ReactionKind::Wow,
        ReactionKind::Sad,
        ReactionKind::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Care => "care",
            ReactionKind::Haha => "haha",
            ReactionKind::Wow => "wow",
            ReactionKind::Sad => "sad",
            ReactionKind::Angry => "angry",
        }
    }

    /// Toggle semantics: asking for the kind already held, or for nothing,
    /// clears the reaction; any other kind replaces it.
    pub fn resolve(current: Option<ReactionKind>, requested: Option<ReactionKind>) -> Option<ReactionKind> {
        if requested == current {
            None
        } else {
            requested
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownReaction(s.to_string()))
    }
}

pub type ReactionCounts = BTreeMap<ReactionKind, u64>;

/// Per-kind counts for one report, plus the calling actor's own reaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub counts: ReactionCounts,
    pub total: u64,
    pub user_reaction: Option<ReactionKind>,
}

impl ReactionSummary {
    pub fn from_counts(counts: ReactionCounts, user_reaction: Option<ReactionKind>) -> Self {
        let mut summary = Self {
            counts,
            total: 0,
            user_reaction,
        };
        summary.recount();
        summary
    }

    pub fn count(&self, kind: ReactionKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    fn recount(&mut self) {
        self.counts.retain(|_, n| *n > 0);
        self.total = self.counts.values().sum();
    }

    /// The provisional state after this actor toggles `requested`.
    pub fn toggled(&self, requested: Option<ReactionKind>) -> Self {
        let previous = self.user_reaction;
        let next = ReactionKind::resolve(previous, requested);
        let mut out = self.clone();
        if let Some(prev) = previous {
            if let Some(n) = out.counts.get_mut(&prev) {
                *n = n.saturating_sub(1);
            }
        }
        if let Some(kind) = next {
            *out.counts.entry(kind).or_insert(0) += 1;
        }
        out.user_reaction = next;
        out.recount();
        out
    }
}

pub type ReactionDetail = BTreeMap<ReactionKind, Vec<ActorId>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RatingValue(u8);

impl RatingValue {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(v: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&v) {
            Ok(Self(v))
        } else {
            Err(ValidationError::RatingOutOfRange(v))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RatingValue {
    type Error = ValidationError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<RatingValue> for u8 {
    fn from(v: RatingValue) -> Self {
        v.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub average: f64,
    pub total: u64,
    pub user_rating: Option<RatingValue>,
    pub distribution: BTreeMap<u8, u64>,
}

impl RatingStats {
    pub fn from_distribution(distribution: BTreeMap<u8, u64>, user_rating: Option<RatingValue>) -> Self {
        let total: u64 = distribution.values().sum();
        let weighted: u64 = distribution.iter().map(|(v, n)| u64::from(*v) * n).sum();
        let average = if total == 0 {
            0.0
        } else {
            weighted as f64 / total as f64
        };
        let mut full: BTreeMap<u8, u64> = (RatingValue::MIN..=RatingValue::MAX).map(|v| (v, 0)).collect();
        full.extend(distribution);
        Self {
            average,
            total,
            user_rating,
            distribution: full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(pairs: &[(ReactionKind, u64)], mine: Option<ReactionKind>) -> ReactionSummary {
        ReactionSummary::from_counts(pairs.iter().copied().collect(), mine)
    }

    #[test]
    fn ids_reject_garbage() {
        assert!(ReportId::new("flood-2024.07").is_ok());
        assert!(ReportId::new("").is_err());
        assert!(ReportId::new("a/b").is_err());
        assert!(CommentId::new("x".repeat(129)).is_err());
    }

    #[test]
    fn tentative_ids_are_marked_and_distinct() {
        let a = CommentId::tentative();
        let b = CommentId::tentative();
        assert!(a.is_tentative());
        assert_ne!(a, b);
        assert!(!CommentId::new_unchecked("9f2c01").is_tentative());
    }

    #[test]
    fn new_comment_trims_and_fills_author() {
        let report = ReportId::new_unchecked("r1");
        let c = NewComment::new(report.clone(), "  hi there \n", None, Some("   ")).unwrap();
        assert_eq!(c.text, "hi there");
        assert_eq!(c.author_name, ANONYMOUS);

        let err = NewComment::new(report, "   ", None, None).unwrap_err();
        assert_eq!(err, ValidationError::EmptyText);
    }

    #[test]
    fn switching_reaction_moves_the_count() {
        let before = summary(&[(ReactionKind::Like, 1)], Some(ReactionKind::Like));
        let after = before.toggled(Some(ReactionKind::Love));
        assert_eq!(after.count(ReactionKind::Like), 0);
        assert_eq!(after.count(ReactionKind::Love), 1);
        assert_eq!(after.total, 1);
        assert_eq!(after.user_reaction, Some(ReactionKind::Love));
    }

    #[test]
    fn same_kind_twice_clears() {
        let start = summary(&[(ReactionKind::Like, 3)], None);
        let once = start.toggled(Some(ReactionKind::Like));
        assert_eq!(once.count(ReactionKind::Like), 4);
        let twice = once.toggled(Some(ReactionKind::Like));
        assert_eq!(twice.user_reaction, None);
        assert_eq!(twice.count(ReactionKind::Like), 3);
        assert_eq!(twice.total, 3);
    }

    #[test]
    fn decrement_floors_at_zero() {
        // Stale local counts can claim a reaction that the counts don't show.
        let odd = summary(&[], Some(ReactionKind::Sad));
        let cleared = odd.toggled(None);
        assert_eq!(cleared.count(ReactionKind::Sad), 0);
        assert_eq!(cleared.total, 0);
        assert_eq!(cleared.user_reaction, None);
    }

    #[test]
    fn reaction_kind_parses_case_insensitively() {
        assert_eq!("LOVE".parse::<ReactionKind>().unwrap(), ReactionKind::Love);
        assert!("meh".parse::<ReactionKind>().is_err());
    }

    #[test]
    fn rating_stats_average() {
        let stats = RatingStats::from_distribution([(5, 2), (2, 1)].into_iter().collect(), None);
        assert_eq!(stats.total, 3);
        assert!((stats.average - 4.0).abs() < f64::EPSILON);
        assert_eq!(stats.distribution.len(), 5);
        assert!(RatingValue::new(0).is_err());
        assert!(RatingValue::new(6).is_err());
    }
}
