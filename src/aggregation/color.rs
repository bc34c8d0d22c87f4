//! Stable series colors
//!
//! Group keys receive palette colors in first-seen order, wrapping around
//! once the palette is exhausted.

use std::collections::HashMap;

/// Fixed chart palette
pub const PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

/// Assigns palette colors to group keys
#[derive(Debug, Default, Clone)]
pub struct SeriesColorAssigner {
    assigned: HashMap<String, usize>,
}

impl SeriesColorAssigner {
    /// Create an assigner with no keys seen yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Color for `key`, assigning the next palette slot on first sight
    pub fn color_for(&mut self, key: &str) -> &'static str {
        let next = self.assigned.len();
        let slot = *self.assigned.entry(key.to_string()).or_insert(next);
        PALETTE[slot % PALETTE.len()]
    }

    /// Number of distinct keys seen
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Whether no key has been seen
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

/// Colors for an ordered sequence of keys; duplicates reuse their first color
pub fn assign_colors<'a, I>(keys: I) -> Vec<(String, &'static str)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut assigner = SeriesColorAssigner::new();
    let mut result = Vec::new();
    for key in keys {
        let before = assigner.len();
        let color = assigner.color_for(key);
        if assigner.len() > before {
            result.push((key.to_string(), color));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut assigner = SeriesColorAssigner::new();
        assert_eq!(assigner.color_for("host-b"), PALETTE[0]);
        assert_eq!(assigner.color_for("host-a"), PALETTE[1]);
        assert_eq!(assigner.color_for("host-b"), PALETTE[0]);
        assert_eq!(assigner.len(), 2);
    }

    #[test]
    fn test_palette_wraps() {
        let keys: Vec<String> = (0..PALETTE.len() + 2).map(|i| format!("k{}", i)).collect();
        let colors = assign_colors(keys.iter().map(String::as_str));
        assert_eq!(colors.len(), PALETTE.len() + 2);
        assert_eq!(colors[PALETTE.len()].1, PALETTE[0]);
        assert_eq!(colors[PALETTE.len() + 1].1, PALETTE[1]);
    }

    #[test]
    fn test_deterministic_and_deduplicated() {
        let first = assign_colors(["x", "y", "x", "z"]);
        let second = assign_colors(["x", "y", "x", "z"]);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[2], ("z".to_string(), PALETTE[2]));
    }
}
