//! Booking status transitions.
//!
//! A booking is created PENDING by the renter. The item owner confirms,
//! cancels, or completes it; the renter may only cancel while it is still
//! pending. Everything else is rejected before touching the store.

use super::EngineError;
use crate::db::BookingStatus;

/// Who is performing a transition, relative to the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner,
    Renter,
}

/// Validate a requested status transition for the given actor.
pub fn check_transition(
    current: BookingStatus,
    target: BookingStatus,
    actor: Actor,
) -> Result<(), EngineError> {
    use BookingStatus::*;

    match target {
        Pending => Err(EngineError::validation(
            "A booking cannot be moved back to PENDING",
        )),
        Confirmed => match (actor, current) {
            (Actor::Renter, _) => Err(EngineError::forbidden(
                "Only the item owner can confirm a booking",
            )),
            (Actor::Owner, Pending) => Ok(()),
            (Actor::Owner, _) => Err(EngineError::conflict(format!(
                "Cannot confirm a {} booking",
                current
            ))),
        },
        Cancelled => match (actor, current) {
            (_, Cancelled) | (_, Completed) => Err(EngineError::conflict(format!(
                "Cannot cancel a {} booking",
                current
            ))),
            (Actor::Owner, _) => Ok(()),
            (Actor::Renter, Pending) => Ok(()),
            (Actor::Renter, _) => Err(EngineError::conflict(
                "Renters can only cancel a booking while it is pending",
            )),
        },
        Completed => match (actor, current) {
            (Actor::Renter, _) => Err(EngineError::forbidden(
                "Only the item owner can complete a booking",
            )),
            (Actor::Owner, Confirmed) => Ok(()),
            (Actor::Owner, _) => Err(EngineError::conflict(format!(
                "Cannot complete a {} booking",
                current
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn test_owner_transitions() {
        assert!(check_transition(Pending, Confirmed, Actor::Owner).is_ok());
        assert!(check_transition(Pending, Cancelled, Actor::Owner).is_ok());
        assert!(check_transition(Confirmed, Cancelled, Actor::Owner).is_ok());
        assert!(check_transition(Confirmed, Completed, Actor::Owner).is_ok());

        assert!(check_transition(Cancelled, Confirmed, Actor::Owner).is_err());
        assert!(check_transition(Completed, Cancelled, Actor::Owner).is_err());
        assert!(check_transition(Pending, Completed, Actor::Owner).is_err());
    }

    #[test]
    fn test_renter_transitions() {
        assert!(check_transition(Pending, Cancelled, Actor::Renter).is_ok());

        assert!(matches!(
            check_transition(Pending, Confirmed, Actor::Renter),
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            check_transition(Confirmed, Cancelled, Actor::Renter),
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            check_transition(Confirmed, Completed, Actor::Renter),
            Err(EngineError::Forbidden(_))
        ));
    }

    #[test]
    fn test_no_status_returns_to_pending() {
        for current in [Pending, Confirmed, Cancelled, Completed] {
            for actor in [Actor::Owner, Actor::Renter] {
                assert!(check_transition(current, Pending, actor).is_err());
            }
        }
    }
}
