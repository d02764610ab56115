//! Completion, progress and inter-pass gating rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::record::{Record, Variant};

/// When an interactive submission marks a record completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionRule {
    /// A submission with at least as many entries as configured items
    /// completes the record.
    #[default]
    PayloadSize,
    /// Only an explicit fix completes a record.
    ExplicitFix,
}

impl CompletionRule {
    /// Completion flag for a submission carrying `submitted_items` entries.
    #[must_use]
    pub fn completes_on_submit(self, submitted_items: usize, configured_items: usize) -> bool {
        match self {
            Self::PayloadSize => meets_item_count(submitted_items, configured_items),
            Self::ExplicitFix => false,
        }
    }
}

/// Error returned when parsing an unknown [`CompletionRule`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown completion rule {0:?}; expected \"payload-size\" or \"explicit-fix\"")]
pub struct ParseCompletionRuleError(String);

impl FromStr for CompletionRule {
    type Err = ParseCompletionRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payload-size" | "payload_size" => Ok(Self::PayloadSize),
            "explicit-fix" | "explicit_fix" => Ok(Self::ExplicitFix),
            _ => Err(ParseCompletionRuleError(s.to_owned())),
        }
    }
}

/// The size-only completion test. Keys are not compared with the item list.
#[must_use]
pub fn meets_item_count(submitted_items: usize, configured_items: usize) -> bool {
    submitted_items >= configured_items
}

/// Completed cases out of the configured total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}

/// Progress of one user across the configured passes.
///
/// # Examples
/// ```
/// use casedesk::domain::{Progress, ProgressSummary};
///
/// let single = ProgressSummary::SinglePass(Progress { done: 3, total: 10 });
/// assert_eq!(single.to_string(), "3/10");
///
/// let both = ProgressSummary::TwoPass {
///     without_aid: Progress { done: 3, total: 10 },
///     with_aid: Progress { done: 1, total: 10 },
/// };
/// assert_eq!(both.to_string(), "3/10, 1/10");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSummary {
    SinglePass(Progress),
    TwoPass {
        without_aid: Progress,
        with_aid: Progress,
    },
}

impl ProgressSummary {
    /// Whether every configured pass is finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match self {
            Self::SinglePass(progress) => progress.is_finished(),
            Self::TwoPass {
                without_aid,
                with_aid,
            } => without_aid.is_finished() && with_aid.is_finished(),
        }
    }
}

impl fmt::Display for ProgressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePass(progress) => progress.fmt(f),
            Self::TwoPass {
                without_aid,
                with_aid,
            } => write!(f, "{without_aid}, {with_aid}"),
        }
    }
}

/// Why the with-aid pass of a case is not yet available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateDenial {
    #[error("the without-aid pass of this case has not been started")]
    NotStarted,
    #[error("the without-aid pass of this case is not completed")]
    NotCompleted,
    #[error("the with-aid pass opens {remaining_secs} seconds from now")]
    TooSoon { remaining_secs: i64 },
}

impl GateDenial {
    /// Stable identifier used in error details.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::NotCompleted => "not_completed",
            Self::TooSoon { .. } => "too_soon",
        }
    }
}

/// Timing gate between the two annotation passes.
///
/// The gate opens once the without-aid record is completed and
/// `now - last_update >= min_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassGate {
    min_interval: Duration,
}

impl PassGate {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Check access to the with-aid pass given the without-aid record.
    pub fn check(
        &self,
        without_aid: Option<&Record>,
        now: DateTime<Utc>,
    ) -> Result<(), GateDenial> {
        let record = without_aid.ok_or(GateDenial::NotStarted)?;
        debug_assert_eq!(record.key.variant, Variant::WithoutAid);
        if !record.completed {
            return Err(GateDenial::NotCompleted);
        }
        let waited = now - record.last_update;
        if waited >= self.min_interval {
            Ok(())
        } else {
            Err(GateDenial::TooSoon {
                remaining_secs: (self.min_interval - waited).num_seconds().max(1),
            })
        }
    }
}
