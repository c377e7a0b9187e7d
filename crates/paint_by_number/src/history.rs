use tracing::debug;

use crate::types::NumberMarker;

/// Default number of marker snapshots kept for undo
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// Linear undo/redo over marker snapshots.
///
/// Recording a snapshot after an undo discards the redo branch. When the
/// capacity is exceeded the oldest snapshot is dropped.
#[derive(Debug, Clone)]
pub struct MarkerHistory {
    snapshots: Vec<Vec<NumberMarker>>,
    index: usize,
    capacity: usize,
}

impl Default for MarkerHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MarkerHistory {
    /// Starts with a single empty snapshot, so the first change can be undone.
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: vec![Vec::new()],
            index: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> &[NumberMarker] {
        &self.snapshots[self.index]
    }

    /// Number of stored snapshots, never less than one.
    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    pub fn record(&mut self, markers: Vec<NumberMarker>) {
        if self.snapshots[self.index] == markers {
            return;
        }
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(markers);
        if self.snapshots.len() > self.capacity {
            self.snapshots.remove(0);
        }
        self.index = self.snapshots.len() - 1;
        debug!(depth = self.snapshots.len(), "Marker snapshot recorded");
    }

    pub fn undo(&mut self) -> Option<&[NumberMarker]> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(&self.snapshots[self.index])
    }

    pub fn redo(&mut self) -> Option<&[NumberMarker]> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(&self.snapshots[self.index])
    }

    /// Forget everything, e.g. when the image is replaced.
    pub fn reset(&mut self) {
        self.snapshots = vec![Vec::new()];
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn snapshot(numbers: &[u32]) -> Vec<NumberMarker> {
        numbers
            .iter()
            .map(|&n| NumberMarker::manual(n, Point::new(n as f64, n as f64)))
            .collect()
    }

    #[test]
    fn test_undo_redo_walks_snapshots() {
        let mut history = MarkerHistory::default();
        assert!(!history.can_undo());

        history.record(snapshot(&[1]));
        history.record(snapshot(&[1, 2]));

        assert_eq!(history.undo(), Some(snapshot(&[1]).as_slice()));
        assert_eq!(history.undo(), Some(&[][..]));
        assert_eq!(history.undo(), None);

        assert_eq!(history.redo(), Some(snapshot(&[1]).as_slice()));
        assert_eq!(history.redo(), Some(snapshot(&[1, 2]).as_slice()));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_record_after_undo_drops_redo_branch() {
        let mut history = MarkerHistory::default();
        history.record(snapshot(&[1]));
        history.record(snapshot(&[1, 2]));
        history.undo();

        history.record(snapshot(&[1, 3]));
        assert!(!history.can_redo());
        assert_eq!(history.current(), snapshot(&[1, 3]).as_slice());
        assert_eq!(history.depth(), 3);
    }

    #[test]
    fn test_capacity_and_duplicates() {
        let mut history = MarkerHistory::new(2);
        history.record(snapshot(&[1]));
        history.record(snapshot(&[1]));
        history.record(snapshot(&[1, 2]));

        assert_eq!(history.depth(), 2);
        assert_eq!(history.undo(), Some(snapshot(&[1]).as_slice()));
        assert!(!history.can_undo());

        history.reset();
        assert_eq!(history.depth(), 1);
        assert!(history.current().is_empty());
    }
}
