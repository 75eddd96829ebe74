use super::core::Scope;
use super::participant::Participant;

use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;

/// A registry mapping a raw descriptor to exactly one participant.
///
/// The raw descriptor is the key — not the participant object — so a
/// descriptor maps to at most one participant per set at a time.
/// Re-adding the same descriptor replaces the prior mapping; callers
/// that care about the old entry must [`delete`](DispatchSet::delete)
/// it first.
///
/// The set is generic over the participant trait object so the
/// reactor can hold a `DispatchSet<dyn Source>` for its input set and
/// `DispatchSet<dyn Sink>` for output and error.
pub struct DispatchSet<P: Participant + ?Sized> {
    entries: HashMap<RawFd, Box<P>>,
}

impl<P: Participant + ?Sized> DispatchSet<P> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Inserts a participant, keyed on its own descriptor.
    pub fn add(&mut self, participant: Box<P>) {
        self.entries.insert(participant.fd(), participant);
    }

    /// Removes and returns the participant keyed on `fd`, if any.
    pub fn delete(&mut self, fd: RawFd) -> Option<Box<P>> {
        self.entries.remove(&fd)
    }

    /// Whether a participant is registered for `fd`.
    pub fn contains(&self, fd: RawFd) -> bool {
        self.entries.contains_key(&fd)
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no participants.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors whose participants currently want readiness.
    ///
    /// Recomputed on every call: eligibility is a live predicate of
    /// each participant (a queued writer that drained its buffer last
    /// cycle no longer wants writability this cycle).
    pub fn needs_processing(&self) -> Vec<RawFd> {
        self.entries
            .iter()
            .filter(|(_, participant)| participant.needs_processing())
            .map(|(&fd, _)| fd)
            .collect()
    }

    /// Delivers readiness to the participants keyed on `ready`.
    ///
    /// Descriptors without a current entry are skipped: the
    /// participant may have been deleted between the readiness query
    /// and the dispatch. Closed entries are pruned afterwards whether
    /// or not they were just processed.
    pub(crate) fn process(&mut self, ready: &[RawFd], scope: &mut Scope<'_>) -> io::Result<()> {
        for fd in ready {
            if let Some(participant) = self.entries.get_mut(fd) {
                participant.process(scope)?;
            }
        }

        self.cleanup_closed();
        Ok(())
    }

    /// Removes every entry whose descriptor reports closed.
    pub fn cleanup_closed(&mut self) {
        self.entries.retain(|_, participant| !participant.is_closed());
    }
}

impl<P: Participant + ?Sized> Default for DispatchSet<P> {
    fn default() -> Self {
        Self::new()
    }
}
