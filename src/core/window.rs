//! Fixed-capacity circular window of readings.
//!
//! Storage is allocated once at construction and zero-initialized. A write
//! cursor advances modulo the capacity; the first time it wraps back to zero
//! every slot has been written and the window is considered filled.

/// A circular buffer of `f64` readings with one-way fill tracking.
#[derive(Debug, Clone)]
pub struct ReadingWindow {
    /// Backing storage, always exactly `capacity` slots
    slots: Box<[f64]>,
    /// Index of the next slot to write
    cursor: usize,
    /// Set the first time the cursor wraps; never cleared
    filled: bool,
    /// Total number of values ever pushed
    pushed: u64,
}

impl ReadingWindow {
    /// Create an empty window holding `capacity` readings.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            slots: vec![0.0; capacity].into_boxed_slice(),
            cursor: 0,
            filled: false,
            pushed: 0,
        }
    }

    /// Write a value at the cursor and advance it.
    ///
    /// Returns `true` when this write wrapped the cursor back to zero.
    pub fn push(&mut self, value: f64) -> bool {
        self.slots[self.cursor] = value;
        self.pushed += 1;
        self.cursor += 1;

        if self.cursor == self.slots.len() {
            self.cursor = 0;
            self.filled = true;
            return true;
        }
        false
    }

    /// Whether every slot has been written at least once.
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots holding written values.
    pub fn len(&self) -> usize {
        if self.filled {
            self.slots.len()
        } else {
            self.cursor
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the next write.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total number of values pushed over the window's lifetime.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// The raw storage in slot order, including zero-initialized slots.
    pub fn as_slice(&self) -> &[f64] {
        &self.slots
    }

    /// The most recently written value.
    pub fn last(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let idx = (self.cursor + self.slots.len() - 1) % self.slots.len();
        Some(self.slots[idx])
    }

    /// Iterate over written values from oldest to newest.
    pub fn iter_chronological(&self) -> impl Iterator<Item = f64> + '_ {
        let (older, newer) = if self.filled {
            (&self.slots[self.cursor..], &self.slots[..self.cursor])
        } else {
            (&self.slots[..self.cursor], &self.slots[..0])
        };
        older.iter().chain(newer.iter()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_creation() {
        let window = ReadingWindow::new(4);
        assert_eq!(window.capacity(), 4);
        assert!(window.is_empty());
        assert!(!window.is_filled());
        assert_eq!(window.as_slice(), &[0.0; 4]);
        assert_eq!(window.last(), None);
    }

    #[test]
    fn test_wrap_happens_on_capacity_th_push() {
        let mut window = ReadingWindow::new(3);
        assert!(!window.push(1.0));
        assert!(!window.push(2.0));
        assert!(!window.is_filled());
        assert!(window.push(3.0));
        assert!(window.is_filled());
        assert_eq!(window.cursor(), 0);

        // Later wraps report true again but the fill state is unchanged.
        assert!(!window.push(4.0));
        assert!(!window.push(5.0));
        assert!(window.push(6.0));
        assert!(window.is_filled());
    }

    #[test]
    fn test_overwrite_keeps_latest_values() {
        let mut window = ReadingWindow::new(3);
        for v in 1..=5 {
            window.push(v as f64);
        }
        let ordered: Vec<f64> = window.iter_chronological().collect();
        assert_eq!(ordered, vec![3.0, 4.0, 5.0]);
        assert_eq!(window.last(), Some(5.0));
        assert_eq!(window.len(), 3);
        assert_eq!(window.pushed(), 5);
    }

    #[test]
    fn test_chronological_before_fill() {
        let mut window = ReadingWindow::new(5);
        window.push(7.0);
        window.push(8.0);
        let ordered: Vec<f64> = window.iter_chronological().collect();
        assert_eq!(ordered, vec![7.0, 8.0]);
        assert_eq!(window.len(), 2);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        let _ = ReadingWindow::new(0);
    }
}
