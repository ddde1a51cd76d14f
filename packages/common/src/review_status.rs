use serde::{Deserialize, Serialize};
use std::fmt;

/// Moderation state of a picture.
///
/// Serialized as its integer code (`0`, `1`, `2`) both on the wire and in the
/// database. When the `sea-orm` feature is enabled, this enum can be used
/// directly as an entity column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "i32", db_type = "Integer")
)]
#[serde(try_from = "i32", into = "i32")]
pub enum ReviewStatus {
    /// Waiting for an administrator.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 0))]
    Pending,
    /// Visible to the public.
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 1))]
    Approved,
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 2))]
    Rejected,
}

/// Why a review submission cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReviewTransitionError {
    /// The picture already holds the submitted status.
    #[error("duplicate review: picture is already {0}")]
    Duplicate(ReviewStatus),
    /// Reviews may only approve or reject.
    #[error("review status must be approved or rejected")]
    InvalidTarget,
}

impl ReviewStatus {
    pub const ALL: &'static [ReviewStatus] = &[Self::Pending, Self::Approved, Self::Rejected];

    pub fn code(self) -> i32 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Validate an administrator moving a picture from `self` to `target`.
    ///
    /// `Pending` is never a review target; approved and rejected pictures may
    /// be flipped directly. Re-submitting the current status is an error, not
    /// a no-op.
    pub fn review_to(self, target: ReviewStatus) -> Result<ReviewStatus, ReviewTransitionError> {
        if target == Self::Pending {
            return Err(ReviewTransitionError::InvalidTarget);
        }
        if target == self {
            return Err(ReviewTransitionError::Duplicate(self));
        }
        Ok(target)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when converting an unknown integer code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidReviewStatus(pub i32);

impl fmt::Display for InvalidReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid review status {}; expected 0 (pending), 1 (approved) or 2 (rejected)",
            self.0
        )
    }
}

impl std::error::Error for InvalidReviewStatus {}

impl TryFrom<i32> for ReviewStatus {
    type Error = InvalidReviewStatus;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Approved),
            2 => Ok(Self::Rejected),
            other => Err(InvalidReviewStatus(other)),
        }
    }
}

impl From<ReviewStatus> for i32 {
    fn from(status: ReviewStatus) -> Self {
        status.code()
    }
}
