use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use crate::ticketing::{InputError, TicketingError};
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error(transparent)]
    Ticketing(#[from] TicketingError),
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError::Ticketing(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Ticketing(err) => match err {
                TicketingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                TicketingError::OrganizerCannotPurchase | TicketingError::Forbidden(_) => {
                    StatusCode::FORBIDDEN
                }
                TicketingError::NotFound(_) => StatusCode::NOT_FOUND,
                TicketingError::EventAlreadyOccurred
                | TicketingError::CapacityExceeded { .. }
                | TicketingError::PerPurchaseLimitExceeded { .. }
                | TicketingError::AccumulatedLimitExceeded { .. }
                | TicketingError::VenueTooSmall { .. }
                | TicketingError::VenueInUse
                | TicketingError::DuplicateNotification
                | TicketingError::RefundAlreadyRequested
                | TicketingError::RefundAlreadyDecided => StatusCode::CONFLICT,
                TicketingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Ticketing(err) => match err {
                TicketingError::InvalidInput(_) => "INVALID_INPUT",
                TicketingError::EventAlreadyOccurred => "EVENT_ALREADY_OCCURRED",
                TicketingError::OrganizerCannotPurchase => "ORGANIZER_CANNOT_PURCHASE",
                TicketingError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
                TicketingError::PerPurchaseLimitExceeded { .. } => "PER_PURCHASE_LIMIT_EXCEEDED",
                TicketingError::AccumulatedLimitExceeded { .. } => "ACCUMULATED_LIMIT_EXCEEDED",
                TicketingError::VenueTooSmall { .. } => "VENUE_TOO_SMALL",
                TicketingError::VenueInUse => "VENUE_IN_USE",
                TicketingError::DuplicateNotification => "DUPLICATE_NOTIFICATION",
                TicketingError::RefundAlreadyRequested => "REFUND_ALREADY_REQUESTED",
                TicketingError::RefundAlreadyDecided => "REFUND_ALREADY_DECIDED",
                TicketingError::NotFound(_) => "NOT_FOUND",
                TicketingError::Forbidden(_) => "FORBIDDEN",
                TicketingError::Internal(_) => "INTERNAL_SERVER_ERROR",
            },
        }
    }

    /// Structured fields the client can use to suggest a valid retry.
    fn details(&self) -> Option<Value> {
        let AppError::Ticketing(err) = self else {
            return None;
        };
        match err {
            TicketingError::CapacityExceeded { available } => Some(json!({ "available": available })),
            TicketingError::PerPurchaseLimitExceeded { limit } => Some(json!({ "limit": limit })),
            TicketingError::AccumulatedLimitExceeded {
                current,
                would_be_total,
            } => Some(json!({ "current": current, "would_be_total": would_be_total })),
            TicketingError::VenueTooSmall { capacity, sold } => {
                Some(json!({ "capacity": capacity, "sold": sold }))
            }
            _ => None,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) | AppError::AuthError(msg) => msg.clone(),
            AppError::Ticketing(TicketingError::CapacityExceeded { available: 0 }) => {
                "This event is sold out".to_string()
            }
            AppError::Ticketing(TicketingError::CapacityExceeded { available }) => {
                format!("Only {available} seats are left for this event")
            }
            AppError::Ticketing(TicketingError::AccumulatedLimitExceeded { current, .. }) => {
                format!(
                    "You already hold {current} tickets for this event; you can buy at most {} more",
                    (crate::ticketing::MAX_TICKETS_PER_USER - current).max(0)
                )
            }
            AppError::Ticketing(TicketingError::Internal(_)) => {
                "An internal error occurred".to_string()
            }
            AppError::Ticketing(err) => err.to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::Ticketing(TicketingError::Internal(source)) => {
                error!(error = ?source, "Ticketing store failure");
            }
            other => {
                debug!(code = other.code(), error = %other, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        error_response(
            self.code(),
            self.public_message(),
            self.details(),
            self.status_code(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_errors_carry_available_seats() {
        let err = AppError::from(TicketingError::CapacityExceeded { available: 2 });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CAPACITY_EXCEEDED");
        assert_eq!(err.details(), Some(json!({ "available": 2 })));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AppError::from(TicketingError::Internal(
            crate::store::StoreError::Poisoned,
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "An internal error occurred");
        assert_eq!(err.details(), None);
    }

    #[test]
    fn test_missing_venue_is_not_found() {
        let err = AppError::from(TicketingError::from(
            crate::store::StoreError::MissingVenue(crate::models::VenueId::new()),
        ));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_input_errors_are_bad_requests() {
        let err = AppError::from(InputError::NonPositiveQuantity(0));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
