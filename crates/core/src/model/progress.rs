use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::ids::StageSlot;

/// Width of the bitstring written at registration: rotation guide + 7 stages.
pub const INITIAL_SLOTS: usize = 8;

const COMPLETED_FLAG: char = '1';
const PENDING_FLAG: char = '0';

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress bitstring is empty")]
    Empty,

    #[error("invalid progress flag {found:?} at slot {slot}")]
    InvalidFlag { slot: usize, found: char },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Completion state of a single slot. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageStatus {
    Pending,
    Completed,
}

impl StageStatus {
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, StageStatus::Completed)
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Per-user completion vector, one flag per stage slot.
///
/// The vector only grows. Marking a slot past the end pads the gap with
/// pending flags, and a completed flag is never cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProgress {
    flags: Vec<bool>,
}

impl StageProgress {
    /// All-pending progress of the registration width.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            flags: vec![false; INITIAL_SLOTS],
        }
    }

    /// Number of slots currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Returns `true` if the slot is stored and completed. Slots past the end are pending.
    #[must_use]
    pub fn is_completed(&self, slot: StageSlot) -> bool {
        self.flags.get(slot.index()).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn status(&self, slot: StageSlot) -> StageStatus {
        if self.is_completed(slot) {
            StageStatus::Completed
        } else {
            StageStatus::Pending
        }
    }

    /// Mark a slot as completed, growing the vector if needed.
    ///
    /// Returns `true` if the slot changed from pending to completed. The vector
    /// grows to `slot + 1` entries, so callers bound `slot` to the catalog.
    pub fn mark_completed(&mut self, slot: StageSlot) -> bool {
        let index = slot.index();
        if index >= self.flags.len() {
            self.flags.resize(index + 1, false);
        }
        let was_completed = self.flags[index];
        self.flags[index] = true;
        !was_completed
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.flags.iter().filter(|done| **done).count()
    }

    /// Iterate `(slot, status)` pairs in slot order.
    pub fn slots(&self) -> impl Iterator<Item = (StageSlot, StageStatus)> + '_ {
        self.flags.iter().enumerate().map(|(index, done)| {
            let slot = StageSlot::new(u32::try_from(index).unwrap_or(u32::MAX));
            let status = if *done {
                StageStatus::Completed
            } else {
                StageStatus::Pending
            };
            (slot, status)
        })
    }

    /// Render the storage form: one `'0'`/`'1'` character per slot.
    #[must_use]
    pub fn encode(&self) -> String {
        self.flags
            .iter()
            .map(|done| if *done { COMPLETED_FLAG } else { PENDING_FLAG })
            .collect()
    }

    /// Decode a stored field. An absent or empty field is the registration default.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidFlag` if the text contains anything but `0`/`1`.
    pub fn decode(raw: Option<&str>) -> Result<Self, ProgressError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::initial()),
            Some(text) => text.parse(),
        }
    }

    /// Decode a stored field, falling back to the registration default when it is unreadable.
    #[must_use]
    pub fn decode_or_default(raw: Option<&str>) -> Self {
        Self::decode(raw).unwrap_or_default()
    }
}

impl Default for StageProgress {
    fn default() -> Self {
        Self::initial()
    }
}

impl FromStr for StageProgress {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ProgressError::Empty);
        }
        let flags = s
            .chars()
            .enumerate()
            .map(|(slot, flag)| match flag {
                COMPLETED_FLAG => Ok(true),
                PENDING_FLAG => Ok(false),
                found => Err(ProgressError::InvalidFlag { slot, found }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { flags })
    }
}

impl fmt::Display for StageProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> StageProgress {
        raw.parse().unwrap()
    }

    #[test]
    fn initial_progress_is_eight_pending_slots() {
        let progress = StageProgress::initial();
        assert_eq!(progress.encode(), "00000000");
        assert_eq!(progress.completed_count(), 0);
    }

    #[test]
    fn marking_inside_range_flips_only_that_slot() {
        let mut progress = parse("00000000");
        assert!(progress.mark_completed(StageSlot::new(3)));
        assert_eq!(progress.encode(), "00010000");
    }

    #[test]
    fn marking_past_the_end_pads_with_pending() {
        let mut progress = parse("00000000");
        progress.mark_completed(StageSlot::new(9));
        assert_eq!(progress.encode(), "0000000001");
        assert_eq!(progress.len(), 10);
    }

    #[test]
    fn marking_twice_is_a_no_op() {
        let mut progress = parse("01000000");
        assert!(!progress.mark_completed(StageSlot::new(1)));
        assert_eq!(progress.encode(), "01000000");
    }

    #[test]
    fn completed_slots_survive_any_marking_sequence() {
        let mut progress = parse("10100000");
        for slot in [5, 0, 12, 2, 7, 12] {
            progress.mark_completed(StageSlot::new(slot));
            assert!(progress.is_completed(StageSlot::new(0)));
            assert!(progress.is_completed(StageSlot::new(2)));
        }
        assert_eq!(progress.len(), 13);
    }

    #[test]
    fn out_of_range_slot_is_pending() {
        let progress = parse("11");
        assert!(!progress.is_completed(StageSlot::new(2)));
        assert_eq!(progress.status(StageSlot::new(40)), StageStatus::Pending);
    }

    #[test]
    fn absent_or_empty_field_decodes_to_default() {
        assert_eq!(StageProgress::decode(None).unwrap(), StageProgress::initial());
        assert_eq!(StageProgress::decode(Some("")).unwrap(), StageProgress::initial());
    }

    #[test]
    fn invalid_flag_is_rejected_by_strict_decode() {
        let err = StageProgress::decode(Some("01x0")).unwrap_err();
        assert_eq!(err, ProgressError::InvalidFlag { slot: 2, found: 'x' });
        assert_eq!(
            StageProgress::decode_or_default(Some("01x0")),
            StageProgress::initial()
        );
    }

    #[test]
    fn slots_report_status_in_order() {
        let progress = parse("101");
        let statuses: Vec<_> = progress.slots().map(|(_, status)| status).collect();
        assert_eq!(
            statuses,
            vec![
                StageStatus::Completed,
                StageStatus::Pending,
                StageStatus::Completed
            ]
        );
    }
}
