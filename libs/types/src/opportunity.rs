//! Opportunity lifecycle types
//!
//! An opportunity is created by a sponsor in the `Pending` state and
//! transitions approval state exactly once (admin-only). Core fields are
//! immutable after approval except through `apply_edit`, which bumps the
//! version and only resets approval when explicitly flagged.

use crate::ids::{OpportunityId, UserId};
use crate::profile::EducationLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Kind of postable educational offering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    Scholarship,
    LearningResource,
    Event,
    Mentorship,
    Funding,
}

/// Approval state, transitions out of `Pending` exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    /// Check if state is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalState::Approved | ApprovalState::Rejected)
    }
}

/// Invalid approval state transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid approval transition from {from:?} to {to:?}")]
pub struct ApprovalTransitionError {
    pub from: ApprovalState,
    pub to: ApprovalState,
}

/// A postable educational offering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub opportunity_id: OpportunityId,
    pub title: String,
    pub description: String,
    pub organization: String,
    pub url: Option<String>,
    pub opportunity_type: OpportunityType,
    /// Categorization tags, normalized lowercase
    pub tags: BTreeSet<String>,
    /// Admitted education levels; empty means any
    pub required_levels: BTreeSet<EducationLevel>,
    pub field_of_study: Option<String>,
    pub location: Option<String>,
    pub language: String,
    pub posted_at: i64,         // Unix nanos
    pub deadline: Option<i64>,  // Unix nanos
    pub approval: ApprovalState,
    pub created_by: UserId,
    pub version: u64,
}

/// Mutable fields for a creator/admin edit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpportunityEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub required_levels: Option<BTreeSet<EducationLevel>>,
    pub field_of_study: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub deadline: Option<Option<i64>>,
}

impl Opportunity {
    /// Create a new pending opportunity
    pub fn new(
        opportunity_type: OpportunityType,
        title: impl Into<String>,
        organization: impl Into<String>,
        created_by: UserId,
        posted_at: i64,
    ) -> Self {
        Self {
            opportunity_id: OpportunityId::new(),
            title: title.into(),
            description: String::new(),
            organization: organization.into(),
            url: None,
            opportunity_type,
            tags: BTreeSet::new(),
            required_levels: BTreeSet::new(),
            field_of_study: None,
            location: None,
            language: "en".to_string(),
            posted_at,
            deadline: None,
            approval: ApprovalState::Pending,
            created_by,
            version: 0,
        }
    }

    /// Whether the opportunity is still open at `now`
    ///
    /// A deadline strictly in the past closes the opportunity; no
    /// deadline means always open.
    pub fn is_open(&self, now: i64) -> bool {
        match self.deadline {
            Some(deadline) => deadline >= now,
            None => true,
        }
    }

    /// Whether a profile's education level is admitted
    ///
    /// An empty required set admits every level, including none.
    pub fn admits_level(&self, level: Option<EducationLevel>) -> bool {
        if self.required_levels.is_empty() {
            return true;
        }
        level.map_or(false, |l| self.required_levels.contains(&l))
    }

    /// Field of study normalized for comparison
    pub fn normalized_field(&self) -> Option<String> {
        self.field_of_study
            .as_deref()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
    }

    /// Approve a pending opportunity (admin-only, enforced by caller)
    pub fn approve(&mut self) -> Result<(), ApprovalTransitionError> {
        self.transition(ApprovalState::Approved)
    }

    /// Reject a pending opportunity (admin-only, enforced by caller)
    pub fn reject(&mut self) -> Result<(), ApprovalTransitionError> {
        self.transition(ApprovalState::Rejected)
    }

    fn transition(&mut self, to: ApprovalState) -> Result<(), ApprovalTransitionError> {
        if self.approval.is_terminal() {
            return Err(ApprovalTransitionError {
                from: self.approval,
                to,
            });
        }
        self.approval = to;
        Ok(())
    }

    /// Apply a creator/admin edit
    ///
    /// Bumps the version. Approval is only reset to `Pending` when
    /// `reset_approval` is flagged by the caller.
    pub fn apply_edit(&mut self, edit: OpportunityEdit, reset_approval: bool) {
        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(url) = edit.url {
            self.url = Some(url);
        }
        if let Some(tags) = edit.tags {
            self.tags = tags;
        }
        if let Some(levels) = edit.required_levels {
            self.required_levels = levels;
        }
        if let Some(field) = edit.field_of_study {
            self.field_of_study = field;
        }
        if let Some(location) = edit.location {
            self.location = location;
        }
        if let Some(deadline) = edit.deadline {
            self.deadline = deadline;
        }
        self.version += 1;
        if reset_approval {
            self.approval = ApprovalState::Pending;
        }
    }
}
