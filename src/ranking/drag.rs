//! Drag coordinator.
//!
//! Turns a finished drag gesture (or its keyboard equivalent) into exactly
//! one array-move on the order buffer. Moves compose: each one acts on the
//! buffer's current order, never on the fetched page.

use super::buffer::OrderBuffer;
use super::item::ItemId;

/// Keyboard nudge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Why a gesture left the buffer unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ignored {
    /// Ranking mode is not armed.
    NotArmed,

    /// Item dropped on itself.
    SameItem,

    /// An id is not on the current page.
    UnknownItem(ItemId),

    /// Nudge past the first or last slot.
    AtEdge,
}

/// Outcome of a single gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEffect {
    /// The buffer was reordered.
    Moved { id: ItemId, from: usize, to: usize },

    /// Nothing changed.
    Ignored(Ignored),
}

impl DragEffect {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Move `active` to the slot currently held by `over`.
pub fn on_drag_end(buffer: &mut OrderBuffer, active: &ItemId, over: &ItemId) -> DragEffect {
    if active == over {
        return DragEffect::Ignored(Ignored::SameItem);
    }
    let Some(from) = buffer.position(active) else {
        return DragEffect::Ignored(Ignored::UnknownItem(active.clone()));
    };
    let Some(to) = buffer.position(over) else {
        return DragEffect::Ignored(Ignored::UnknownItem(over.clone()));
    };

    buffer.move_item(from, to);
    DragEffect::Moved {
        id: active.clone(),
        from,
        to,
    }
}

/// Move `id` one slot up or down.
pub fn nudge(buffer: &mut OrderBuffer, id: &ItemId, direction: Direction) -> DragEffect {
    let Some(from) = buffer.position(id) else {
        return DragEffect::Ignored(Ignored::UnknownItem(id.clone()));
    };
    let to = match direction {
        Direction::Up if from > 0 => from - 1,
        Direction::Down if from + 1 < buffer.len() => from + 1,
        _ => return DragEffect::Ignored(Ignored::AtEdge),
    };

    buffer.move_item(from, to);
    DragEffect::Moved {
        id: id.clone(),
        from,
        to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::item::{Item, Page};

    fn buffer(ids: &[&str]) -> OrderBuffer {
        let items = ids
            .iter()
            .enumerate()
            .map(|(i, id)| Item::new(*id, i as i64))
            .collect();
        OrderBuffer::from_page(&Page::new(1, 50, 1, items).unwrap())
    }

    fn order(buffer: &OrderBuffer) -> Vec<&str> {
        buffer.current().iter().map(ItemId::as_str).collect()
    }

    #[test]
    fn test_drag_moves_to_over_slot() {
        let mut buf = buffer(&["A", "B", "C", "D", "E", "F"]);
        let effect = on_drag_end(&mut buf, &"E".into(), &"B".into());
        assert_eq!(
            effect,
            DragEffect::Moved {
                id: "E".into(),
                from: 4,
                to: 1
            }
        );
        assert_eq!(order(&buf), vec!["A", "E", "B", "C", "D", "F"]);
    }

    #[test]
    fn test_drop_on_self_is_ignored() {
        let mut buf = buffer(&["A", "B"]);
        let effect = on_drag_end(&mut buf, &"A".into(), &"A".into());
        assert_eq!(effect, DragEffect::Ignored(Ignored::SameItem));
        assert_eq!(order(&buf), vec!["A", "B"]);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut buf = buffer(&["A", "B"]);
        let effect = on_drag_end(&mut buf, &"Z".into(), &"A".into());
        assert_eq!(effect, DragEffect::Ignored(Ignored::UnknownItem("Z".into())));
        let effect = on_drag_end(&mut buf, &"A".into(), &"Z".into());
        assert_eq!(effect, DragEffect::Ignored(Ignored::UnknownItem("Z".into())));
    }

    #[test]
    fn test_moves_compose_on_current_order() {
        let mut buf = buffer(&["A", "B", "C", "D"]);
        on_drag_end(&mut buf, &"D".into(), &"A".into());
        assert_eq!(order(&buf), vec!["D", "A", "B", "C"]);
        on_drag_end(&mut buf, &"A".into(), &"C".into());
        assert_eq!(order(&buf), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn test_nudge() {
        let mut buf = buffer(&["A", "B", "C"]);
        assert!(nudge(&mut buf, &"B".into(), Direction::Up).is_moved());
        assert_eq!(order(&buf), vec!["B", "A", "C"]);
        assert!(nudge(&mut buf, &"B".into(), Direction::Down).is_moved());
        assert_eq!(order(&buf), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_nudge_at_edges() {
        let mut buf = buffer(&["A", "B"]);
        assert_eq!(
            nudge(&mut buf, &"A".into(), Direction::Up),
            DragEffect::Ignored(Ignored::AtEdge)
        );
        assert_eq!(
            nudge(&mut buf, &"B".into(), Direction::Down),
            DragEffect::Ignored(Ignored::AtEdge)
        );
    }
}
