//! Columnar interval storage mapping cleaned-source offsets to source
//! positions. Append-mostly: the cleaner builds a list in cleaned-offset
//! order and the incremental updater splices pieces of it.

use lsp_types::{Position, Range};

/// A half-open byte span `[start, start+length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub length: usize,
}

impl Interval {
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// One row of the mapping: a cleaned-offset span paired with the source
/// position range it came from, and the cleaned text itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPositionInterval {
    pub offset_interval: Interval,
    pub position_range: Range,
    pub value: String,
}

/// Sorted, columnar list of [`OffsetPositionInterval`]s. Offsets are
/// strictly increasing and contiguous; position ranges are sorted
/// lexicographically by `start`. Lookups are O(log n) via binary search.
#[derive(Debug, Clone, Default)]
pub struct OffsetPositionIntervalList {
    offset_start: Vec<usize>,
    offset_end: Vec<usize>,
    position_start_line: Vec<u32>,
    position_start_character: Vec<u32>,
    position_end_line: Vec<u32>,
    position_end_character: Vec<u32>,
    value: Vec<String>,
}

impl OffsetPositionIntervalList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.offset_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offset_start.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.value
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_interval_values(
        &mut self,
        offset_start: usize,
        offset_end: usize,
        position_start_line: u32,
        position_start_character: u32,
        position_end_line: u32,
        position_end_character: u32,
        value: String,
    ) {
        self.offset_start.push(offset_start);
        self.offset_end.push(offset_end);
        self.position_start_line.push(position_start_line);
        self.position_start_character.push(position_start_character);
        self.position_end_line.push(position_end_line);
        self.position_end_character.push(position_end_character);
        self.value.push(value);
    }

    pub fn add_interval(&mut self, interval: OffsetPositionInterval) {
        self.add_interval_values(
            interval.offset_interval.start,
            interval.offset_interval.end(),
            interval.position_range.start.line,
            interval.position_range.start.character,
            interval.position_range.end.line,
            interval.position_range.end.character,
            interval.value,
        );
    }

    pub fn get_interval(&self, idx: usize) -> Option<OffsetPositionInterval> {
        if idx >= self.len() {
            return None;
        }
        Some(OffsetPositionInterval {
            offset_interval: Interval {
                start: self.offset_start[idx],
                length: self.offset_end[idx] - self.offset_start[idx],
            },
            position_range: Range {
                start: Position {
                    line: self.position_start_line[idx],
                    character: self.position_start_character[idx],
                },
                end: Position {
                    line: self.position_end_line[idx],
                    character: self.position_end_character[idx],
                },
            },
            value: self.value[idx].clone(),
        })
    }

    /// Re-sort all columns by `offset_start`. Used after incremental
    /// splicing appends new intervals out of order.
    pub fn sort(&mut self) {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.sort_by_key(|&i| self.offset_start[i]);

        let take = |src: &Vec<usize>, idx: &[usize]| -> Vec<usize> {
            idx.iter().map(|&i| src[i]).collect()
        };
        let take_u32 = |src: &Vec<u32>, idx: &[usize]| -> Vec<u32> {
            idx.iter().map(|&i| src[i]).collect()
        };

        self.offset_start = take(&self.offset_start, &indices);
        self.offset_end = take(&self.offset_end, &indices);
        self.position_start_line = take_u32(&self.position_start_line, &indices);
        self.position_start_character = take_u32(&self.position_start_character, &indices);
        self.position_end_line = take_u32(&self.position_end_line, &indices);
        self.position_end_character = take_u32(&self.position_end_character, &indices);
        self.value = indices.iter().map(|&i| self.value[i].clone()).collect();
    }

    /// Binary search on `offset_end`, then verify `offset_start <= offset <= offset_end`.
    pub fn get_idx_at_offset(&self, offset: usize) -> Option<usize> {
        let idx = self.offset_end.partition_point(|&end| end < offset);
        if idx < self.len() && self.offset_start[idx] <= offset && offset <= self.offset_end[idx] {
            Some(idx)
        } else {
            None
        }
    }

    pub fn get_interval_at_offset(&self, offset: usize) -> Option<OffsetPositionInterval> {
        self.get_idx_at_offset(offset).and_then(|idx| self.get_interval(idx))
    }

    /// Binary search on `position_end_line`, then on `position_end_character`
    /// within the run of intervals ending on that line. `strict=false`
    /// returns the index of the next (or last) interval when there is no
    /// exact containing interval.
    pub fn get_idx_at_position(&self, position: Position, strict: bool) -> Option<usize> {
        let length = self.len();
        if length == 0 {
            return None;
        }

        let mut idx = self.position_end_line.partition_point(|&line| line < position.line);

        if idx == length {
            return if strict { None } else { Some(length - 1) };
        }
        if position.line < self.position_start_line[idx] {
            return if strict { None } else { Some(idx) };
        }
        if position.line > self.position_end_line[idx] {
            return if strict { None } else { Some(length - 1) };
        }

        // Narrow within the run of intervals sharing this end-line, by end-character.
        let line = self.position_end_line[idx];
        let mut run_end = idx;
        while run_end < length && self.position_end_line[run_end] == line {
            run_end += 1;
        }
        let offset_within_run = self.position_end_character[idx..run_end]
            .partition_point(|&ch| ch < position.character);
        idx += offset_within_run;

        if idx == length {
            return if strict { None } else { Some(length - 1) };
        }

        if self.position_start_character[idx] <= position.character
            && position.character <= self.position_end_character[idx]
        {
            Some(idx)
        } else if position.character < self.position_start_character[idx] {
            if strict { None } else { Some(idx) }
        } else if strict {
            None
        } else {
            Some((idx + 1).min(length - 1))
        }
    }

    pub fn get_interval_at_position(
        &self,
        position: Position,
        strict: bool,
    ) -> Option<OffsetPositionInterval> {
        self.get_idx_at_position(position, strict)
            .and_then(|idx| self.get_interval(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(list: &mut OffsetPositionIntervalList, start: usize, len: usize, line: u32, ch: u32, text: &str) {
        list.add_interval_values(start, start + len, line, ch, line, ch + len as u32, text.to_string());
    }

    fn sample_list() -> OffsetPositionIntervalList {
        let mut list = OffsetPositionIntervalList::new();
        push(&mut list, 0, 3, 0, 0, "foo");
        push(&mut list, 3, 1, 0, 3, " ");
        push(&mut list, 4, 3, 0, 4, "bar");
        list
    }

    #[test]
    fn lookup_by_offset_exact() {
        let list = sample_list();
        let iv = list.get_interval_at_offset(5).unwrap();
        assert_eq!(iv.value, "bar");
    }

    #[test]
    fn lookup_by_offset_out_of_range() {
        let list = sample_list();
        assert!(list.get_interval_at_offset(100).is_none());
    }

    #[test]
    fn lookup_by_position_strict() {
        let list = sample_list();
        let iv = list
            .get_interval_at_position(Position { line: 0, character: 4 }, true)
            .unwrap();
        assert_eq!(iv.value, "bar");
    }

    #[test]
    fn lookup_by_position_nonstrict_fallback() {
        let list = sample_list();
        let idx = list
            .get_idx_at_position(Position { line: 5, character: 0 }, false)
            .unwrap();
        assert_eq!(idx, list.len() - 1);
    }

    #[test]
    fn lookup_by_position_strict_miss_returns_none() {
        let list = sample_list();
        assert!(
            list.get_idx_at_position(Position { line: 5, character: 0 }, true)
                .is_none()
        );
    }

    #[test]
    fn sort_reorders_all_columns_consistently() {
        let mut list = OffsetPositionIntervalList::new();
        push(&mut list, 4, 3, 0, 4, "bar");
        push(&mut list, 0, 3, 0, 0, "foo");
        list.sort();
        assert_eq!(list.get_interval(0).unwrap().value, "foo");
        assert_eq!(list.get_interval(1).unwrap().value, "bar");
    }

    #[test]
    fn empty_list_lookups_return_none() {
        let list = OffsetPositionIntervalList::new();
        assert!(list.get_interval_at_offset(0).is_none());
        assert!(list.get_idx_at_position(Position { line: 0, character: 0 }, false).is_none());
    }
}
