use std::collections::{BTreeSet, VecDeque};

use chrono::{Days, NaiveDate};

use crate::model::ids::StageSlot;

/// Retention limit of the rolling session log.
pub const MAX_SESSIONS: usize = 7;

/// Distinct stages visited on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    date: NaiveDate,
    stages: BTreeSet<StageSlot>,
}

impl Session {
    #[must_use]
    pub fn new(date: NaiveDate, stage: StageSlot) -> Self {
        Self {
            date,
            stages: BTreeSet::from([stage]),
        }
    }

    /// A session with no recorded stages, as written by the registration seed.
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            stages: BTreeSet::new(),
        }
    }

    /// Rehydrate a session from persisted stage indices. Duplicates collapse.
    #[must_use]
    pub fn from_persisted(date: NaiveDate, stages: impl IntoIterator<Item = StageSlot>) -> Self {
        Self {
            date,
            stages: stages.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn stages(&self) -> impl Iterator<Item = StageSlot> + '_ {
        self.stages.iter().copied()
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn contains(&self, stage: StageSlot) -> bool {
        self.stages.contains(&stage)
    }

    /// Returns `true` if the stage was not present yet.
    pub fn insert(&mut self, stage: StageSlot) -> bool {
        self.stages.insert(stage)
    }
}

/// Rolling log of sessions in append order, oldest first.
///
/// Holds at most one session per date. Appending past [`MAX_SESSIONS`] evicts
/// from the front, i.e. by append order rather than by date value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionLog {
    sessions: VecDeque<Session>,
}

impl SessionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding a single session for `today` with one stage.
    #[must_use]
    pub fn starting_with(today: NaiveDate, stage: StageSlot) -> Self {
        Self {
            sessions: VecDeque::from([Session::new(today, stage)]),
        }
    }

    /// Seven empty sessions covering the trailing week, oldest first.
    #[must_use]
    pub fn seeded_week(today: NaiveDate) -> Self {
        let sessions = (0..MAX_SESSIONS as u64)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
            .map(Session::empty)
            .collect();
        Self { sessions }
    }

    /// Build a log from persisted sessions, preserving their order.
    ///
    /// A date that appears more than once is merged into its first occurrence.
    #[must_use]
    pub fn from_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let mut log = Self::new();
        for session in sessions {
            match log.position_of(session.date) {
                Some(index) => log.sessions[index].stages.extend(session.stages),
                None => log.sessions.push_back(session),
            }
        }
        log
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn session_on(&self, date: NaiveDate) -> Option<&Session> {
        self.sessions.iter().find(|session| session.date == date)
    }

    /// Distinct stages recorded for `date`, 0 when no session exists.
    #[must_use]
    pub fn stage_count_on(&self, date: NaiveDate) -> usize {
        self.session_on(date).map_or(0, Session::stage_count)
    }

    /// Record a visit to `stage` on `today`.
    ///
    /// Re-recording a stage already present for `today` changes nothing.
    pub fn record_visit(&mut self, stage: StageSlot, today: NaiveDate) {
        if let Some(index) = self.position_of(today) {
            self.sessions[index].insert(stage);
            return;
        }

        self.sessions.push_back(Session::new(today, stage));
        while self.sessions.len() > MAX_SESSIONS {
            self.sessions.pop_front();
        }
    }

    fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.sessions.iter().position(|session| session.date == date)
    }
}
