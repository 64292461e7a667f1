//! Sorted spatial index over diagnostics and code actions (§4.6). Keyed by
//! `Position`, compared lexicographically by `(line, character)` exactly as
//! LSP range comparisons do, backed by a `BTreeMap` so range queries and
//! key updates (re-bucketing after a shift) stay logarithmic.

use std::collections::BTreeMap;

use lsp_types::Position;

fn key(pos: Position) -> (u32, u32) {
    (pos.line, pos.character)
}

pub struct PositionDict<T> {
    map: BTreeMap<(u32, u32), Vec<T>>,
}

impl<T> Default for PositionDict<T> {
    fn default() -> Self {
        PositionDict { map: BTreeMap::new() }
    }
}

impl<T: Clone + PartialEq> PositionDict<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pos: Position, value: T) {
        self.map.entry(key(pos)).or_default().push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    /// Remove every item whose key falls in `[lo, hi]`, `(lo, hi)`, or a mix,
    /// per the two inclusivity flags.
    pub fn remove_between(&mut self, lo: Position, hi: Position, inclusive_lo: bool, inclusive_hi: bool) {
        let lo_key = key(lo);
        let hi_key = key(hi);
        self.map.retain(|&k, _| {
            let ge_lo = if inclusive_lo { k >= lo_key } else { k > lo_key };
            let le_hi = if inclusive_hi { k <= hi_key } else { k < hi_key };
            !(ge_lo && le_hi)
        });
    }

    /// Remove every item whose key is at or past `pos`.
    pub fn remove_from(&mut self, pos: Position, inclusive: bool) {
        let at = key(pos);
        self.map.retain(|&k, _| if inclusive { k < at } else { k <= at });
    }

    /// Values whose key falls within `[min, max]` (or `(min, max)` when not
    /// `inclusive`), in key order.
    pub fn irange_values(&self, min: Position, max: Position, inclusive: bool) -> Vec<&T> {
        let min_key = key(min);
        let max_key = key(max);
        if min_key > max_key {
            return Vec::new();
        }
        self.map
            .range(min_key..=max_key)
            .filter(|(&k, _)| inclusive || (k != min_key && k != max_key))
            .flat_map(|(_, values)| values.iter())
            .collect()
    }

    /// Re-bucket a single value from `old` to `new`, e.g. after shifting a
    /// diagnostic's position in response to an edit.
    pub fn update(&mut self, old: Position, new: Position, value: &T) {
        let old_key = key(old);
        if let Some(bucket) = self.map.get_mut(&old_key) {
            if let Some(idx) = bucket.iter().position(|v| v == value) {
                bucket.remove(idx);
            }
            if bucket.is_empty() {
                self.map.remove(&old_key);
            }
        }
        self.add(new, value.clone());
    }

    /// Every `(position, value)` pair in key order, draining the dict —
    /// used by the analyser base to shift every stored item and re-insert
    /// it at its new position.
    pub fn drain_all(&mut self) -> Vec<(Position, T)> {
        let mut result = Vec::with_capacity(self.len());
        for ((line, character), values) in std::mem::take(&mut self.map) {
            for value in values {
                result.push((Position { line, character }, value));
            }
        }
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        self.map
            .iter()
            .flat_map(|(&(line, character), values)| values.iter().map(move |v| (Position { line, character }, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn remove_between_respects_inclusivity() {
        let mut dict = PositionDict::new();
        dict.add(pos(0, 0), "a");
        dict.add(pos(0, 5), "b");
        dict.add(pos(0, 10), "c");
        dict.remove_between(pos(0, 0), pos(0, 5), true, false);
        let remaining: Vec<_> = dict.iter().map(|(_, v)| *v).collect();
        assert_eq!(remaining, vec!["b", "c"]);
    }

    #[test]
    fn remove_from_drops_everything_at_or_past_position() {
        let mut dict = PositionDict::new();
        dict.add(pos(1, 0), "a");
        dict.add(pos(2, 0), "b");
        dict.remove_from(pos(2, 0), true);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn irange_values_returns_in_key_order() {
        let mut dict = PositionDict::new();
        dict.add(pos(3, 0), "c");
        dict.add(pos(1, 0), "a");
        dict.add(pos(2, 0), "b");
        let values = dict.irange_values(pos(1, 0), pos(3, 0), true);
        assert_eq!(values, vec![&"a", &"b", &"c"]);
    }

    #[test]
    fn update_rebuckets_a_value() {
        let mut dict = PositionDict::new();
        dict.add(pos(0, 0), "item");
        dict.update(pos(0, 0), pos(4, 0), &"item");
        assert!(dict.irange_values(pos(0, 0), pos(0, 0), true).is_empty());
        assert_eq!(dict.irange_values(pos(4, 0), pos(4, 0), true), vec![&"item"]);
    }

    #[test]
    fn drain_all_empties_the_dict() {
        let mut dict = PositionDict::new();
        dict.add(pos(0, 0), 1);
        dict.add(pos(1, 0), 2);
        let all = dict.drain_all();
        assert_eq!(all.len(), 2);
        assert!(dict.is_empty());
    }
}
