use crate::time::local_now;
use chrono::{NaiveDateTime, TimeDelta};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// How far back a program may have started and still be accepted.
pub const WINDOW_PAST_HOURS: i64 = 12;

/// How far ahead a program may start and still be accepted.
pub const WINDOW_FUTURE_HOURS: i64 = 6;

/// Icon value used when the provider has no image for an episode.
pub const NO_ICON: &str = "none";

/// One broadcast episode on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Program {
    /// Provider-assigned episode id
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Naive local start time
    pub start_time: NaiveDateTime,
    /// Naive local end time
    pub end_time: NaiveDateTime,
    /// Image URL, or [`NO_ICON`]
    pub icon: String,
}

impl Program {
    #[must_use]
    pub fn new(
        id: i64,
        title: impl Into<String>,
        description: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        icon: Option<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            start_time,
            end_time,
            icon: icon.unwrap_or_else(|| NO_ICON.to_string()),
        }
    }

    /// Check if the program is on air at `instant` (start inclusive, end exclusive)
    #[must_use]
    pub fn is_airing_at(&self, instant: NaiveDateTime) -> bool {
        self.start_time <= instant && instant < self.end_time
    }

    /// Check if the program has an icon URL
    #[must_use]
    pub fn has_icon(&self) -> bool {
        self.icon != NO_ICON
    }
}

/// Programs believed current for one channel, in provider order.
///
/// Entries are filtered against the acceptance window when added and are
/// never re-checked afterwards. The only way to drop stale entries is to
/// replace the whole schedule with a fresh one.
#[derive(Debug, Default)]
pub struct Schedule {
    programs: Mutex<Vec<Program>>,
}

impl Schedule {
    /// Create an empty schedule
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schedule by adding each program in order.
    ///
    /// Programs outside the window are dropped exactly as with [`Schedule::add`].
    pub fn from_programs(programs: impl IntoIterator<Item = Program>) -> Self {
        let schedule = Self::new();
        let now = local_now();
        for program in programs {
            schedule.add_at(program, now);
        }
        schedule
    }

    /// Add a program if it starts within the window around the current time.
    ///
    /// Out-of-window programs are discarded silently.
    pub fn add(&self, program: Program) {
        self.add_at(program, local_now());
    }

    /// Add a program if it starts within the window around `now`.
    ///
    /// Returns whether the program was accepted.
    pub fn add_at(&self, program: Program, now: NaiveDateTime) -> bool {
        if !is_within_window(program.start_time, now) {
            debug!(
                "Dropping program {} ({}) starting at {} outside the schedule window",
                program.id, program.title, program.start_time
            );
            return false;
        }

        self.lock().push(program);
        true
    }

    /// Snapshot of the programs in insertion order
    #[must_use]
    pub fn programs(&self) -> Vec<Program> {
        self.lock().clone()
    }

    /// Check if the schedule holds no programs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of programs in the schedule
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// First program (in provider order) on air at `instant`
    #[must_use]
    pub fn airing_at(&self, instant: NaiveDateTime) -> Option<Program> {
        self.lock()
            .iter()
            .find(|program| program.is_airing_at(instant))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Program>> {
        self.programs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_within_window(start_time: NaiveDateTime, now: NaiveDateTime) -> bool {
    let earliest = now - TimeDelta::hours(WINDOW_PAST_HOURS);
    let latest = now + TimeDelta::hours(WINDOW_FUTURE_HOURS);
    start_time >= earliest && start_time <= latest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_starting_at(id: i64, start_time: NaiveDateTime) -> Program {
        Program::new(id, "test", "test", start_time, start_time, None)
    }

    #[test]
    fn test_program_started_more_than_12_hours_ago_is_rejected() {
        let program = program_starting_at(1, local_now() - TimeDelta::hours(13));
        let schedule = Schedule::new();
        schedule.add(program.clone());
        assert!(!schedule.programs().contains(&program));
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_program_starting_more_than_6_hours_ahead_is_rejected() {
        let program = program_starting_at(1, local_now() + TimeDelta::hours(7));
        let schedule = Schedule::new();
        schedule.add(program.clone());
        assert!(!schedule.programs().contains(&program));
    }

    #[test]
    fn test_program_starting_now_is_accepted() {
        let program = program_starting_at(1, local_now());
        let schedule = Schedule::new();
        schedule.add(program.clone());
        assert!(schedule.programs().contains(&program));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = local_now();
        let schedule = Schedule::new();
        assert!(schedule.add_at(program_starting_at(1, now - TimeDelta::hours(12)), now));
        assert!(schedule.add_at(program_starting_at(2, now + TimeDelta::hours(6)), now));
        assert!(!schedule.add_at(
            program_starting_at(3, now + TimeDelta::hours(6) + TimeDelta::seconds(1)),
            now
        ));
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let now = local_now();
        let later = program_starting_at(1, now + TimeDelta::hours(2));
        let earlier = program_starting_at(2, now - TimeDelta::hours(2));
        let schedule = Schedule::from_programs([later.clone(), earlier.clone()]);
        assert_eq!(schedule.programs(), vec![later, earlier]);
    }

    #[test]
    fn test_programs_returns_detached_copy() {
        let schedule = Schedule::from_programs([program_starting_at(1, local_now())]);
        let mut copy = schedule.programs();
        copy.clear();
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn test_stored_programs_are_not_revalidated() {
        let now = local_now();
        let schedule = Schedule::new();
        schedule.add_at(program_starting_at(1, now), now);
        // Much later, the entry would no longer pass the window, but it stays
        let _ = schedule.add_at(program_starting_at(2, now), now + TimeDelta::days(2));
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.programs()[0].id, 1);
    }

    #[test]
    fn test_airing_at_finds_current_program() {
        let now = local_now();
        let finished = Program::new(
            1,
            "Morning",
            "",
            now - TimeDelta::hours(2),
            now - TimeDelta::hours(1),
            None,
        );
        let current = Program::new(
            2,
            "Noon",
            "",
            now - TimeDelta::minutes(30),
            now + TimeDelta::minutes(30),
            None,
        );
        let schedule = Schedule::from_programs([finished, current.clone()]);
        assert_eq!(schedule.airing_at(now), Some(current));
        assert_eq!(schedule.airing_at(now + TimeDelta::hours(1)), None);
    }

    #[test]
    fn test_missing_icon_uses_sentinel() {
        let now = local_now();
        let program = Program::new(1, "t", "d", now, now, None);
        assert_eq!(program.icon, NO_ICON);
        assert!(!program.has_icon());

        let program = Program::new(1, "t", "d", now, now, Some("https://example.com/a.jpg".into()));
        assert!(program.has_icon());
    }
}
