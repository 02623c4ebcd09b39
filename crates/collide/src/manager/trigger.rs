//! Symmetric tag-pair trigger matrix
//!
//! Controls which tag pairs are narrow-phase tested each pass. The matrix
//! grows whenever a new tag is introduced, preserving configured entries and
//! defaulting new ones; it only shrinks on a full reset.

/// Growable symmetric boolean matrix over tag indices
#[derive(Debug, Clone)]
pub struct TriggerMatrix {
    size: usize,
    default: bool,
    flags: Vec<bool>,
}

impl TriggerMatrix {
    /// Creates an empty matrix whose new entries default to `default`
    pub fn new(default: bool) -> Self {
        Self {
            size: 0,
            default,
            flags: Vec::new(),
        }
    }

    /// Grow the matrix to cover `size` tags, keeping existing entries
    pub fn grow_to(&mut self, size: usize) {
        if size <= self.size {
            return;
        }
        let mut flags = vec![self.default; size * size];
        for i in 0..self.size {
            for j in 0..self.size {
                flags[i * size + j] = self.flags[i * self.size + j];
            }
        }
        self.size = size;
        self.flags = flags;
    }

    /// Whether the pair (i, j) is enabled; out-of-range indices are disabled
    pub fn get(&self, i: usize, j: usize) -> bool {
        if i < self.size && j < self.size {
            self.flags[i * self.size + j]
        } else {
            false
        }
    }

    /// Set both (i, j) and (j, i), keeping the matrix symmetric
    pub fn set(&mut self, i: usize, j: usize, enabled: bool) {
        if i < self.size && j < self.size {
            self.flags[i * self.size + j] = enabled;
            self.flags[j * self.size + i] = enabled;
        }
    }

    /// Reset to an empty matrix
    pub fn clear(&mut self) {
        self.size = 0;
        self.flags.clear();
    }
}
