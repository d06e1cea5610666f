use crate::model::ids::StageSlot;

/// Number of numbered stages after the rotation guide.
pub const STAGE_COUNT: u32 = 7;

/// One entry of the tutorial catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    slot: StageSlot,
    title: &'static str,
    content_id: &'static str,
}

impl CatalogEntry {
    const fn new(slot: u32, title: &'static str, content_id: &'static str) -> Self {
        Self {
            slot: StageSlot::new(slot),
            title,
            content_id,
        }
    }

    #[must_use]
    pub fn slot(&self) -> StageSlot {
        self.slot
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        self.title
    }

    /// Identifier of the remote content document for this entry.
    #[must_use]
    pub fn content_id(&self) -> &'static str {
        self.content_id
    }

    #[must_use]
    pub fn is_rotation_guide(&self) -> bool {
        self.slot.is_rotation_guide()
    }
}

const CATALOG: [CatalogEntry; STAGE_COUNT as usize + 1] = [
    CatalogEntry::new(0, "Rotation notation", "rotation_guide"),
    CatalogEntry::new(1, "Stage 1", "stage1"),
    CatalogEntry::new(2, "Stage 2", "stage2"),
    CatalogEntry::new(3, "Stage 3", "stage3"),
    CatalogEntry::new(4, "Stage 4", "stage4"),
    CatalogEntry::new(5, "Stage 5", "stage5"),
    CatalogEntry::new(6, "Stage 6", "stage6"),
    CatalogEntry::new(7, "Stage 7", "stage7"),
];

/// All catalog entries in slot order.
#[must_use]
pub fn catalog() -> &'static [CatalogEntry] {
    &CATALOG
}

#[must_use]
pub fn entry(slot: StageSlot) -> Option<&'static CatalogEntry> {
    CATALOG.get(slot.index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::INITIAL_SLOTS;

    #[test]
    fn catalog_matches_initial_progress_width() {
        assert_eq!(catalog().len(), INITIAL_SLOTS);
        assert!(catalog()[0].is_rotation_guide());
    }

    #[test]
    fn entries_are_indexed_by_slot() {
        for (index, item) in catalog().iter().enumerate() {
            assert_eq!(item.slot().index(), index);
        }
        assert_eq!(entry(StageSlot::new(4)).map(CatalogEntry::content_id), Some("stage4"));
        assert!(entry(StageSlot::new(8)).is_none());
    }
}
