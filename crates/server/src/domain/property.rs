use async_graphql::Enum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::text::truncate_chars;

/// Generates `as_str`/`TryFrom<&str>` for enums persisted as text columns.
macro_rules! stored_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ();

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Flagged,
    Rejected,
}

stored_enum!(ApprovalStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Flagged => "FLAGGED",
    Rejected => "REJECTED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum PublicationStatus {
    Draft,
    Published,
}

stored_enum!(PublicationStatus {
    Draft => "DRAFT",
    Published => "PUBLISHED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum PropertyType {
    Apartment,
    House,
    Villa,
    Plot,
    Commercial,
}

stored_enum!(PropertyType {
    Apartment => "APARTMENT",
    House => "HOUSE",
    Villa => "VILLA",
    Plot => "PLOT",
    Commercial => "COMMERCIAL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum ListingType {
    Sale,
    Rent,
}

stored_enum!(ListingType {
    Sale => "SALE",
    Rent => "RENT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum UserType {
    Buyer,
    Seller,
    Agent,
}

stored_enum!(UserType {
    Buyer => "BUYER",
    Seller => "SELLER",
    Agent => "AGENT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum InquiryStatus {
    New,
    Contacted,
    Closed,
}

stored_enum!(InquiryStatus {
    New => "NEW",
    Contacted => "CONTACTED",
    Closed => "CLOSED",
});

/// Admin decisions that move a listing between approval states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum ApprovalAction {
    Approve,
    Reject,
    Flag,
    Reopen,
}

stored_enum!(ApprovalAction {
    Approve => "approve",
    Reject => "reject",
    Flag => "flag",
    Reopen => "reopen",
});

impl ApprovalAction {
    pub fn target(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
            Self::Flag => ApprovalStatus::Flagged,
            Self::Reopen => ApprovalStatus::Pending,
        }
    }

    pub fn requires_reason(&self) -> bool {
        matches!(self, Self::Reject)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("property is already {}", .0.as_str())]
    AlreadyInState(ApprovalStatus),
    #[error("cannot {} a property that is {}", .action.as_str(), .from.as_str())]
    NotAllowed {
        from: ApprovalStatus,
        action: ApprovalAction,
    },
}

/// Resolves the status an action leads to from `current`.
///
/// Allowed moves:
/// - `approve`: PENDING, FLAGGED or REJECTED to APPROVED
/// - `reject`: PENDING or FLAGGED to REJECTED
/// - `flag`: PENDING or APPROVED to FLAGGED
/// - `reopen`: any other state back to PENDING
pub fn next_status(
    current: ApprovalStatus,
    action: ApprovalAction,
) -> Result<ApprovalStatus, TransitionError> {
    use ApprovalStatus::*;

    let target = action.target();
    if current == target {
        return Err(TransitionError::AlreadyInState(current));
    }

    let allowed = match action {
        ApprovalAction::Approve => matches!(current, Pending | Flagged | Rejected),
        ApprovalAction::Reject => matches!(current, Pending | Flagged),
        ApprovalAction::Flag => matches!(current, Pending | Approved),
        ApprovalAction::Reopen => true,
    };

    if allowed {
        Ok(target)
    } else {
        Err(TransitionError::NotAllowed {
            from: current,
            action,
        })
    }
}

pub const SEO_TITLE_MAX: usize = 60;
pub const SEO_DESCRIPTION_MAX: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeoDefaults {
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: String,
}

/// Metadata derived from the listing itself when no SEO row is stored.
pub fn default_seo(
    title: &str,
    description: Option<&str>,
    property_type: &str,
    listing_type: &str,
    city: &str,
) -> SeoDefaults {
    let kind = property_type.to_ascii_lowercase();
    let purpose = match ListingType::try_from(listing_type) {
        Ok(ListingType::Rent) => "rent",
        _ => "sale",
    };
    let fallback = format!("{} for {purpose} in {city}.", capitalize(&kind));
    let body = description
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(&fallback);

    SeoDefaults {
        meta_title: truncate_chars(&format!("{title} | {city}"), SEO_TITLE_MAX),
        meta_description: truncate_chars(body, SEO_DESCRIPTION_MAX),
        meta_keywords: [kind.as_str(), purpose, &city.to_lowercase(), "real estate"].join(", "),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ApprovalAction, ApprovalStatus, SEO_DESCRIPTION_MAX, SEO_TITLE_MAX, TransitionError,
        default_seo, next_status,
    };

    #[test]
    fn stored_strings_round_trip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Flagged,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::try_from(status.as_str()), Ok(status));
        }
        assert!(ApprovalStatus::try_from("approved").is_err());
    }

    #[test]
    fn pending_can_move_to_every_decision() {
        assert_eq!(
            next_status(ApprovalStatus::Pending, ApprovalAction::Approve),
            Ok(ApprovalStatus::Approved)
        );
        assert_eq!(
            next_status(ApprovalStatus::Pending, ApprovalAction::Reject),
            Ok(ApprovalStatus::Rejected)
        );
        assert_eq!(
            next_status(ApprovalStatus::Pending, ApprovalAction::Flag),
            Ok(ApprovalStatus::Flagged)
        );
    }

    #[test]
    fn approved_and_flagged_swap_both_ways() {
        assert_eq!(
            next_status(ApprovalStatus::Approved, ApprovalAction::Flag),
            Ok(ApprovalStatus::Flagged)
        );
        assert_eq!(
            next_status(ApprovalStatus::Flagged, ApprovalAction::Approve),
            Ok(ApprovalStatus::Approved)
        );
    }

    #[test]
    fn every_decided_state_can_be_reopened() {
        for status in [
            ApprovalStatus::Approved,
            ApprovalStatus::Flagged,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(
                next_status(status, ApprovalAction::Reopen),
                Ok(ApprovalStatus::Pending)
            );
        }
    }

    #[test]
    fn repeating_the_current_state_conflicts() {
        assert_eq!(
            next_status(ApprovalStatus::Approved, ApprovalAction::Approve),
            Err(TransitionError::AlreadyInState(ApprovalStatus::Approved))
        );
        assert_eq!(
            next_status(ApprovalStatus::Pending, ApprovalAction::Reopen),
            Err(TransitionError::AlreadyInState(ApprovalStatus::Pending))
        );
    }

    #[test]
    fn approved_listing_cannot_be_rejected_directly() {
        let err = next_status(ApprovalStatus::Approved, ApprovalAction::Reject)
            .expect_err("transition should be refused");
        assert_eq!(err.to_string(), "cannot reject a property that is APPROVED");
    }

    #[test]
    fn default_seo_stays_within_limits() {
        let long_title = "Sea facing four bedroom penthouse with private pool and garden";
        let long_description = "x".repeat(400);
        let seo = default_seo(long_title, Some(&long_description), "APARTMENT", "SALE", "Mumbai");

        assert!(seo.meta_title.chars().count() <= SEO_TITLE_MAX);
        assert!(seo.meta_description.chars().count() <= SEO_DESCRIPTION_MAX);
        assert_eq!(seo.meta_keywords, "apartment, sale, mumbai, real estate");
    }

    #[test]
    fn default_seo_falls_back_to_generated_description() {
        let seo = default_seo("Garden Villa", None, "VILLA", "RENT", "Pune");

        assert_eq!(seo.meta_title, "Garden Villa | Pune");
        assert_eq!(seo.meta_description, "Villa for rent in Pune.");
    }
}
