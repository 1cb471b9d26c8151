use std::{cmp::Ordering, collections::BinaryHeap};

use bomberland_core::Position;

/// Min-priority queue of board cells.
///
/// Equal priorities pop the smaller `x` first and then the earlier push, so
/// searches stay deterministic without comparing floats for equality.
#[derive(Debug, Default)]
pub(crate) struct Frontier {
    heap: BinaryHeap<Entry>,
    pushed: u64,
}

impl Frontier {
    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.pushed = 0;
    }

    pub(crate) fn push(&mut self, priority: f64, position: Position) {
        self.heap.push(Entry {
            priority,
            sequence: self.pushed,
            position,
        });
        self.pushed += 1;
    }

    pub(crate) fn pop(&mut self) -> Option<Position> {
        self.heap.pop().map(|entry| entry.position)
    }
}

#[derive(Debug)]
struct Entry {
    priority: f64,
    sequence: u64,
    position: Position,
}

impl Entry {
    fn rank(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.position.x().cmp(&other.position.x()))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap.
        other.rank(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_cheapest_then_leftmost_then_oldest() {
        let mut frontier = Frontier::default();
        frontier.push(2.0, Position::new(0, 0));
        frontier.push(1.0, Position::new(3, 1));
        frontier.push(1.0, Position::new(1, 4));
        frontier.push(1.0, Position::new(1, 2));

        assert_eq!(frontier.pop(), Some(Position::new(1, 4)));
        assert_eq!(frontier.pop(), Some(Position::new(1, 2)));
        assert_eq!(frontier.pop(), Some(Position::new(3, 1)));
        assert_eq!(frontier.pop(), Some(Position::new(0, 0)));
        assert_eq!(frontier.pop(), None);
    }
}
