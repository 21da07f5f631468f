use thiserror::Error;

use crate::store::StoreError;

/// Malformed caller input. Recoverable by asking again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(i32),

    #[error("unknown ticket type {0:?}")]
    UnknownTicketType(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("venue capacity must be positive, got {0}")]
    NonPositiveCapacity(i32),

    #[error("events must be scheduled for tomorrow or later")]
    ScheduleNotInFuture,

    #[error("score must be between 1 and 5, got {0}")]
    ScoreOutOfRange(i32),
}

/// Every way a ticketing operation can be refused.
///
/// A rejected operation never leaves a partial write behind.
#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("the event already took place")]
    EventAlreadyOccurred,

    #[error("organizers cannot buy tickets for their own events")]
    OrganizerCannotPurchase,

    #[error("not enough seats left: {available} available")]
    CapacityExceeded { available: i32 },

    #[error("a single purchase is limited to {limit} tickets")]
    PerPurchaseLimitExceeded { limit: i32 },

    #[error("ticket limit exceeded: {current} held, {would_be_total} requested in total")]
    AccumulatedLimitExceeded { current: i32, would_be_total: i32 },

    #[error("venue capacity {capacity} is below the {sold} seats already sold")]
    VenueTooSmall { capacity: i32, sold: i32 },

    #[error("venue is still referenced by events")]
    VenueInUse,

    #[error("an identical notification already exists for this event")]
    DuplicateNotification,

    #[error("a refund for this ticket is already pending")]
    RefundAlreadyRequested,

    #[error("refund request was already decided")]
    RefundAlreadyDecided,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("internal error")]
    Internal(#[source] StoreError),
}

impl From<StoreError> for TicketingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VenueInUse(_) => TicketingError::VenueInUse,
            StoreError::MissingVenue(_) => TicketingError::NotFound("venue"),
            other => TicketingError::Internal(other),
        }
    }
}
