//! Ticket state machine. Transition checks and the solved-fields
//! bookkeeping live here so the handlers stay thin and the invariant
//! (`status == solved` iff `solved_by`/`solved_at` set) has one owner.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::shared::enums::TicketStatus;

/// A ticket may be assigned only while still pending.
pub fn can_assign(status: TicketStatus) -> bool {
    status == TicketStatus::Pending
}

/// Resolution is allowed from pending or in_progress.
pub fn can_resolve(status: TicketStatus) -> bool {
    matches!(status, TicketStatus::Pending | TicketStatus::InProgress)
}

/// Reopen only applies to solved tickets; anywhere else it is a no-op.
pub fn reopen_applies(status: TicketStatus) -> bool {
    status == TicketStatus::Solved
}

/// Resolver bookkeeping for a status change. Entering `solved` stamps
/// the resolver; leaving it clears the fields; an already-solved
/// ticket staying solved keeps its original resolver.
pub fn solved_fields(
    prev_status: TicketStatus,
    prev_solved_by: Option<Uuid>,
    prev_solved_at: Option<DateTime<Utc>>,
    next_status: TicketStatus,
    actor: Uuid,
    now: DateTime<Utc>,
) -> (Option<Uuid>, Option<DateTime<Utc>>) {
    match (prev_status, next_status) {
        (TicketStatus::Solved, TicketStatus::Solved) => (prev_solved_by, prev_solved_at),
        (_, TicketStatus::Solved) => (Some(actor), Some(now)),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_requires_pending() {
        assert!(can_assign(TicketStatus::Pending));
        assert!(!can_assign(TicketStatus::InProgress));
        assert!(!can_assign(TicketStatus::Solved));
    }

    #[test]
    fn resolution_requires_open_ticket() {
        assert!(can_resolve(TicketStatus::Pending));
        assert!(can_resolve(TicketStatus::InProgress));
        assert!(!can_resolve(TicketStatus::Solved));
    }

    #[test]
    fn reopen_only_applies_to_solved() {
        assert!(reopen_applies(TicketStatus::Solved));
        assert!(!reopen_applies(TicketStatus::Pending));
        assert!(!reopen_applies(TicketStatus::InProgress));
    }

    #[test]
    fn entering_solved_stamps_the_resolver() {
        let tech = Uuid::new_v4();
        let now = Utc::now();
        let (by, at) = solved_fields(
            TicketStatus::InProgress,
            None,
            None,
            TicketStatus::Solved,
            tech,
            now,
        );
        assert_eq!(by, Some(tech));
        assert_eq!(at, Some(now));
    }

    #[test]
    fn leaving_solved_clears_the_resolver() {
        let tech = Uuid::new_v4();
        let solved_at = Utc::now();
        let (by, at) = solved_fields(
            TicketStatus::Solved,
            Some(tech),
            Some(solved_at),
            TicketStatus::Pending,
            Uuid::new_v4(),
            Utc::now(),
        );
        assert_eq!(by, None);
        assert_eq!(at, None);
    }

    #[test]
    fn staying_solved_keeps_the_original_resolver() {
        let original = Uuid::new_v4();
        let solved_at = Utc::now();
        let (by, at) = solved_fields(
            TicketStatus::Solved,
            Some(original),
            Some(solved_at),
            TicketStatus::Solved,
            Uuid::new_v4(),
            Utc::now(),
        );
        assert_eq!(by, Some(original));
        assert_eq!(at, Some(solved_at));
    }

    #[test]
    fn non_solved_transitions_carry_no_resolver() {
        let (by, at) = solved_fields(
            TicketStatus::Pending,
            None,
            None,
            TicketStatus::InProgress,
            Uuid::new_v4(),
            Utc::now(),
        );
        assert_eq!(by, None);
        assert_eq!(at, None);
    }
}
