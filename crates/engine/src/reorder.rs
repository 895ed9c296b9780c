//! Re-deriving the current index after structural queue edits.
//!
//! Both helpers keep the index pointing at the same logical slot. Removing
//! the current slot itself is handled by the engine, since it also has to
//! stop playback.

/// `removed` must not be the current index.
pub(crate) fn index_after_remove(current: Option<usize>, removed: usize) -> Option<usize> {
    match current {
        Some(cur) if removed < cur => Some(cur - 1),
        other => other,
    }
}

/// Index of the current slot after moving `from` to `to` (drag-and-drop reorder).
pub(crate) fn index_after_move(current: Option<usize>, from: usize, to: usize) -> Option<usize> {
    let cur = current?;
    Some(if from == cur {
        to
    } else if from < cur && cur <= to {
        cur - 1
    } else if to <= cur && cur < from {
        cur + 1
    } else {
        cur
    })
}

#[cfg(test)]
mod tests {
    use super::{index_after_move, index_after_remove};

    fn moved(len: usize, from: usize, to: usize) -> Vec<usize> {
        let mut items: Vec<usize> = (0..len).collect();
        let item = items.remove(from);
        items.insert(to, item);
        items
    }

    #[test]
    fn move_keeps_pointing_at_the_same_slot() {
        for len in 1..=5 {
            for from in 0..len {
                for to in 0..len {
                    let after = moved(len, from, to);
                    for cur in 0..len {
                        let idx = index_after_move(Some(cur), from, to).unwrap();
                        assert_eq!(after[idx], cur, "len={len} from={from} to={to} cur={cur}");
                    }
                    assert_eq!(index_after_move(None, from, to), None);
                }
            }
        }
    }

    #[test]
    fn remove_shifts_only_later_slots() {
        assert_eq!(index_after_remove(Some(3), 1), Some(2));
        assert_eq!(index_after_remove(Some(1), 3), Some(1));
        assert_eq!(index_after_remove(None, 0), None);
    }
}
