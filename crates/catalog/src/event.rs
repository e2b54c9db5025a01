//! Sales events: time-boxed catalog configurations.
//!
//! The shop only sells what the currently active event offers. Windows are
//! inclusive on both ends at day granularity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vitrine_core::{DomainError, DomainResult, Entity, EventId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Event {
    pub fn new(id: EventId, start_date: NaiveDate, end_date: NaiveDate) -> DomainResult<Self> {
        if end_date < start_date {
            return Err(DomainError::validation(format!(
                "event {id} ends ({end_date}) before it starts ({start_date})"
            )));
        }
        Ok(Self {
            id,
            start_date,
            end_date,
        })
    }

    /// `start_date <= today <= end_date`.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.start_date <= today && today <= self.end_date
    }
}

impl Entity for Event {
    type Id = EventId;

    fn id(&self) -> EventId {
        self.id
    }
}

/// Outcome of picking the active event among candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEvent {
    pub event: Event,
    /// Other events whose window also contains the day. Non-empty means the
    /// event calendar overlaps.
    pub overlapping: Vec<EventId>,
}

/// Pick the event whose window contains `today`.
///
/// When several windows overlap the most recently started one wins (ties broken
/// by the higher id). Candidates not containing `today` are ignored, so callers
/// may pass an unfiltered list.
pub fn resolve_active_event<'a, I>(candidates: I, today: NaiveDate) -> Option<ActiveEvent>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut active: Vec<&Event> = candidates
        .into_iter()
        .filter(|e| e.is_active_on(today))
        .collect();

    active.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));

    let (first, rest) = active.split_first()?;
    Some(ActiveEvent {
        event: (*first).clone(),
        overlapping: rest.iter().map(|e| e.id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january() -> Event {
        Event::new(EventId::new(1), day(2024, 1, 1), day(2024, 1, 31)).unwrap()
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let e = january();
        assert!(e.is_active_on(day(2024, 1, 1)));
        assert!(e.is_active_on(day(2024, 1, 31)));
        assert!(!e.is_active_on(day(2023, 12, 31)));
        assert!(!e.is_active_on(day(2024, 2, 1)));
    }

    #[test]
    fn rejects_inverted_window() {
        let err = Event::new(EventId::new(1), day(2024, 2, 1), day(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn no_candidate_means_no_active_event() {
        let events = vec![january()];
        assert!(resolve_active_event(&events, day(2024, 3, 1)).is_none());
        assert!(resolve_active_event(&[], day(2024, 1, 10)).is_none());
    }

    #[test]
    fn overlapping_events_resolve_to_latest_start() {
        let winter = january();
        let flash = Event::new(EventId::new(2), day(2024, 1, 15), day(2024, 1, 20)).unwrap();
        let events = vec![winter.clone(), flash.clone()];

        let active = resolve_active_event(&events, day(2024, 1, 16)).unwrap();
        assert_eq!(active.event, flash);
        assert_eq!(active.overlapping, vec![winter.id]);

        let active = resolve_active_event(&events, day(2024, 1, 25)).unwrap();
        assert_eq!(active.event, winter);
        assert!(active.overlapping.is_empty());
    }
}
