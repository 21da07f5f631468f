//! Purchase quota guard: at most [`MAX_TICKETS_PER_USER`] tickets per user and
//! event, summed over all of the user's tickets for that event.

use serde::Serialize;

use super::TicketingError;
use crate::models::{TicketId, UserId};
use crate::store::{EventUnit, StoreResult};

pub const MAX_TICKETS_PER_USER: i32 = 4;

pub fn admit(current: i32, requested: i32) -> Result<(), TicketingError> {
    if requested > MAX_TICKETS_PER_USER {
        return Err(TicketingError::PerPurchaseLimitExceeded {
            limit: MAX_TICKETS_PER_USER,
        });
    }
    let would_be_total = current.saturating_add(requested);
    if would_be_total > MAX_TICKETS_PER_USER {
        return Err(TicketingError::AccumulatedLimitExceeded {
            current,
            would_be_total,
        });
    }
    Ok(())
}

pub async fn current_count(
    unit: &mut dyn EventUnit,
    user: UserId,
    exclude: Option<TicketId>,
) -> StoreResult<i32> {
    unit.user_quantity(user, exclude).await
}

pub async fn check_quota(
    unit: &mut dyn EventUnit,
    user: UserId,
    requested: i32,
    exclude: Option<TicketId>,
) -> Result<(), TicketingError> {
    let current = current_count(unit, user, exclude).await?;
    admit(current, requested)
}

/// Advisory answer for "could I buy `proposed` more?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitCheck {
    pub current_count: i32,
    /// What the user would hold after buying `proposed` more.
    pub total: i32,
    pub remaining: i32,
    pub ok: bool,
}

impl LimitCheck {
    pub fn preview(current_count: i32, proposed: i32) -> Self {
        let total = current_count.saturating_add(proposed);
        Self {
            current_count,
            total,
            remaining: (MAX_TICKETS_PER_USER - current_count).max(0),
            ok: admit(current_count, proposed).is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_purchase_over_limit_is_rejected_outright() {
        assert!(matches!(
            admit(0, 5),
            Err(TicketingError::PerPurchaseLimitExceeded { limit: 4 })
        ));
    }

    #[test]
    fn test_accumulated_limit_reports_current_and_total() {
        assert!(matches!(
            admit(3, 2),
            Err(TicketingError::AccumulatedLimitExceeded {
                current: 3,
                would_be_total: 5
            })
        ));
        assert!(admit(3, 1).is_ok());
    }

    #[test]
    fn test_preview_matches_limit_endpoint_shape() {
        assert_eq!(
            LimitCheck::preview(2, 2),
            LimitCheck {
                current_count: 2,
                total: 4,
                remaining: 2,
                ok: true
            }
        );
        assert_eq!(
            LimitCheck::preview(2, 3),
            LimitCheck {
                current_count: 2,
                total: 5,
                remaining: 2,
                ok: false
            }
        );
    }

    #[test]
    fn test_preview_of_huge_quantity_saturates_instead_of_overflowing() {
        let check = LimitCheck::preview(1, i32::MAX);
        assert_eq!(check.total, i32::MAX);
        assert_eq!(check.remaining, 3);
        assert!(!check.ok);
        assert!(matches!(
            admit(i32::MAX, 1),
            Err(TicketingError::AccumulatedLimitExceeded {
                would_be_total: i32::MAX,
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn admitted_purchases_never_exceed_the_quota(current in 0..=4i32, requested in 1..=10i32) {
            if admit(current, requested).is_ok() {
                prop_assert!(current + requested <= MAX_TICKETS_PER_USER);
            }
        }
    }
}
