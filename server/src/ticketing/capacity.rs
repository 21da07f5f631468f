//! Capacity ledger: seats left for an event against its venue capacity.

use super::TicketingError;
use crate::models::TicketId;
use crate::store::{EventUnit, StoreResult};

/// Seats still free. Negative only if a venue was shrunk under existing sales,
/// which reschedules refuse to do.
pub fn remaining(capacity: i32, sold: i32) -> i32 {
    capacity - sold
}

/// Admits `quantity` seats when they fit; filling the venue exactly is allowed.
pub fn admit(available: i32, quantity: i32) -> Result<(), TicketingError> {
    if quantity > available {
        return Err(TicketingError::CapacityExceeded {
            available: available.max(0),
        });
    }
    Ok(())
}

/// Seats left for the locked event, ignoring `exclude` (the ticket being edited).
pub async fn available_seats(
    unit: &mut dyn EventUnit,
    exclude: Option<TicketId>,
) -> StoreResult<i32> {
    let sold = unit.sold_quantity(exclude).await?;
    Ok(remaining(unit.capacity(), sold))
}

/// Checks that `quantity` more seats fit. Writes nothing.
pub async fn reserve(
    unit: &mut dyn EventUnit,
    quantity: i32,
    exclude: Option<TicketId>,
) -> Result<(), TicketingError> {
    let available = available_seats(unit, exclude).await?;
    admit(available, quantity)
}
