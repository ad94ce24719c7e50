use crate::schedule::Schedule;
use indexmap::IndexMap;
use std::sync::Arc;

/// Provider-assigned channel identifier
pub type ChannelId = u32;

/// Channels keyed by id, in the order the provider listed them
pub type ChannelMap = IndexMap<ChannelId, Channel>;

/// A radio channel and the schedule currently held for it.
///
/// Channels are values: a refreshed schedule produces a new `Channel` with
/// the same id and name, and the old one is left untouched for anyone still
/// holding a snapshot.
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    name: String,
    schedule: Arc<Schedule>,
}

impl Channel {
    /// Create a channel with the given schedule
    pub fn new(id: ChannelId, name: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            id,
            name: name.into(),
            schedule: Arc::new(schedule),
        }
    }

    /// Create a channel with an empty schedule
    pub fn unscheduled(id: ChannelId, name: impl Into<String>) -> Self {
        Self::new(id, name, Schedule::new())
    }

    /// Same channel carrying a different schedule
    #[must_use]
    pub fn with_schedule(&self, schedule: Schedule) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            schedule: Arc::new(schedule),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to this channel's schedule
    #[must_use]
    pub fn schedule(&self) -> Arc<Schedule> {
        Arc::clone(&self.schedule)
    }

    /// Check if the channel has no scheduled programs
    #[must_use]
    pub fn has_empty_schedule(&self) -> bool {
        self.schedule.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Program;
    use crate::time::local_now;

    #[test]
    fn test_with_schedule_keeps_identity_and_leaves_original_alone() {
        let now = local_now();
        let original = Channel::unscheduled(132, "P1");
        let schedule = Schedule::from_programs([Program::new(1, "Eko", "", now, now, None)]);
        let updated = original.with_schedule(schedule);

        assert_eq!(updated.id(), 132);
        assert_eq!(updated.name(), "P1");
        assert!(!updated.has_empty_schedule());
        assert!(original.has_empty_schedule());
    }

    #[test]
    fn test_clones_share_schedule() {
        let channel = Channel::unscheduled(200, "P4 Jämtland");
        let clone = channel.clone();
        assert!(Arc::ptr_eq(&channel.schedule(), &clone.schedule()));
    }
}
