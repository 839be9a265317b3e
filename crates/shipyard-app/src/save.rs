//! Per-resource save serialization
//!
//! At most one save per resource is in flight. A ticket records what was
//! submitted and the draft generation at submission time so the completion
//! can tell whether the user kept editing meanwhile.

use std::collections::HashMap;
use std::time::Instant;

use shipyard_core::prelude::*;
use shipyard_core::{PartialConfig, ResourceId};

/// A submitted save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub resource_id: ResourceId,
    /// Process-wide submission sequence number
    pub seq: u64,
    /// Draft generation when the delta was computed
    pub generation: u64,
    pub partial: PartialConfig,
    pub forced: bool,
}

impl SaveTicket {
    pub fn fields(&self) -> Vec<&'static str> {
        self.partial.changed_fields()
    }
}

#[derive(Debug)]
struct InFlight {
    seq: u64,
    started: Instant,
}

/// Tracks in-flight saves
#[derive(Debug, Default)]
pub struct SaveTracker {
    in_flight: HashMap<ResourceId, InFlight>,
    next_seq: u64,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_saving(&self, id: &ResourceId) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Reserve the save slot for `id`; fails with `SaveInFlight` when taken
    pub fn begin(
        &mut self,
        id: &ResourceId,
        generation: u64,
        partial: PartialConfig,
        forced: bool,
    ) -> Result<SaveTicket> {
        if self.in_flight.contains_key(id) {
            return Err(Error::SaveInFlight { id: id.to_string() });
        }
        self.next_seq += 1;
        let seq = self.next_seq;
        self.in_flight.insert(
            id.clone(),
            InFlight {
                seq,
                started: Instant::now(),
            },
        );
        Ok(SaveTicket {
            resource_id: id.clone(),
            seq,
            generation,
            partial,
            forced,
        })
    }

    /// Release the slot held by `ticket`. Returns false for a ticket that
    /// does not own the slot.
    pub fn finish(&mut self, ticket: &SaveTicket) -> bool {
        match self.in_flight.get(&ticket.resource_id) {
            Some(slot) if slot.seq == ticket.seq => {
                debug!(
                    "save {} #{} finished after {:?}",
                    ticket.resource_id,
                    ticket.seq,
                    slot.started.elapsed()
                );
                self.in_flight.remove(&ticket.resource_id);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_core::{DeploymentPartial, ServerPartial};

    fn empty() -> PartialConfig {
        PartialConfig::Deployment(DeploymentPartial::default())
    }

    #[test]
    fn test_second_save_is_rejected() {
        let mut tracker = SaveTracker::new();
        let id = ResourceId::from("dep-1");
        let ticket = tracker.begin(&id, 1, empty(), false).unwrap();
        assert!(tracker.is_saving(&id));

        let err = tracker.begin(&id, 2, empty(), false).unwrap_err();
        assert!(matches!(err, Error::SaveInFlight { .. }));

        assert!(tracker.finish(&ticket));
        assert!(!tracker.is_saving(&id));
        assert!(tracker.begin(&id, 2, empty(), false).is_ok());
    }

    #[test]
    fn test_saves_for_different_resources_are_independent() {
        let mut tracker = SaveTracker::new();
        tracker.begin(&"dep-1".into(), 0, empty(), false).unwrap();
        tracker
            .begin(
                &"srv-1".into(),
                0,
                PartialConfig::Server(ServerPartial::default()),
                false,
            )
            .unwrap();
        assert_eq!(tracker.in_flight_count(), 2);
    }

    #[test]
    fn test_stale_ticket_does_not_release() {
        let mut tracker = SaveTracker::new();
        let id = ResourceId::from("dep-1");
        let first = tracker.begin(&id, 0, empty(), false).unwrap();
        assert!(tracker.finish(&first));
        let _second = tracker.begin(&id, 1, empty(), false).unwrap();

        assert!(!tracker.finish(&first));
        assert!(tracker.is_saving(&id));
    }
}
