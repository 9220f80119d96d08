//! Fixed-capacity cargo holds

use serde::{Deserialize, Serialize};

/// Goods a boat can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CargoKind {
    /// Spent one unit at a time on repairs
    Timber,
    Coal,
}

impl CargoKind {
    pub const ALL: [CargoKind; 2] = [CargoKind::Timber, CargoKind::Coal];
}

/// Material consumed by the REPAIR command
pub const REPAIR_MATERIAL: CargoKind = CargoKind::Timber;

/// One occupied slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoSlot {
    pub kind: CargoKind,
    pub amount: u32,
}

/// Slots of equal size; each holds a single kind of cargo or nothing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CargoHold {
    slots: Vec<Option<CargoSlot>>,
    slot_size: u32,
}

impl CargoHold {
    pub fn new(slot_count: usize, slot_size: u32) -> Self {
        Self {
            slots: vec![None; slot_count],
            slot_size,
        }
    }

    pub fn slots(&self) -> &[Option<CargoSlot>] {
        &self.slots
    }

    /// Load `amount` units, filling slots left to right. Returns what did not
    /// fit (that part is lost).
    pub fn give(&mut self, kind: CargoKind, amount: u32) -> u32 {
        let mut left = amount;
        for slot in self.slots.iter_mut() {
            if left == 0 {
                break;
            }
            match slot {
                None => {
                    let given = left.min(self.slot_size);
                    if given > 0 {
                        *slot = Some(CargoSlot { kind, amount: given });
                        left -= given;
                    }
                }
                Some(held) if held.kind == kind => {
                    let given = left.min(self.slot_size.saturating_sub(held.amount));
                    held.amount += given;
                    left -= given;
                }
                // Occupied by a different kind
                Some(_) => {}
            }
        }
        left
    }

    /// Unload `amount` units, right-most slots first. Returns how many could
    /// not be removed. Emptied slots become free.
    pub fn remove(&mut self, kind: CargoKind, amount: u32) -> u32 {
        let mut left = amount;
        for slot in self.slots.iter_mut().rev() {
            if left == 0 {
                break;
            }
            if let Some(held) = slot {
                if held.kind != kind {
                    continue;
                }
                let taken = held.amount.min(left);
                held.amount -= taken;
                left -= taken;
                if held.amount == 0 {
                    *slot = None;
                }
            }
        }
        left
    }

    /// Units of `kind` on board
    pub fn count(&self, kind: CargoKind) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.kind == kind)
            .map(|s| s.amount)
            .sum()
    }

    /// Units of any kind on board
    pub fn total(&self) -> u32 {
        self.slots.iter().flatten().map(|s| s.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_give_fills_left_to_right() {
        let mut hold = CargoHold::new(3, 32);
        assert_eq!(hold.give(CargoKind::Timber, 40), 0);
        assert_eq!(
            hold.slots()[0],
            Some(CargoSlot {
                kind: CargoKind::Timber,
                amount: 32
            })
        );
        assert_eq!(hold.slots()[1].map(|s| s.amount), Some(8));
        assert_eq!(hold.slots()[2], None);
    }

    #[test]
    fn test_give_tops_up_same_kind_and_skips_others() {
        let mut hold = CargoHold::new(2, 10);
        hold.give(CargoKind::Coal, 4);
        hold.give(CargoKind::Timber, 3);
        assert_eq!(hold.give(CargoKind::Coal, 10), 4);
        assert_eq!(hold.count(CargoKind::Coal), 10);
        assert_eq!(hold.count(CargoKind::Timber), 3);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut hold = CargoHold::new(1, 5);
        assert_eq!(hold.give(CargoKind::Timber, 9), 4);
        assert_eq!(hold.total(), 5);
    }

    #[test]
    fn test_remove_from_right_and_free_slots() {
        let mut hold = CargoHold::new(3, 4);
        hold.give(CargoKind::Timber, 10);
        assert_eq!(hold.remove(CargoKind::Timber, 3), 0);
        // Right-most slot held 2, it empties first
        assert_eq!(hold.slots()[2], None);
        assert_eq!(hold.slots()[1].map(|s| s.amount), Some(3));
        assert_eq!(hold.count(CargoKind::Timber), 7);
    }

    #[test]
    fn test_remove_more_than_held() {
        let mut hold = CargoHold::new(2, 4);
        hold.give(CargoKind::Coal, 2);
        assert_eq!(hold.remove(CargoKind::Coal, 5), 3);
        assert_eq!(hold.remove(CargoKind::Timber, 1), 1);
        assert_eq!(hold.total(), 0);
    }
}
