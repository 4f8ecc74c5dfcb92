// Tue Jan 20 2026 - Alex

use crate::structure::{Segment, SegmentTag};
use std::fmt;

/// Offset-indexed tiling of a fixed-size byte range.
///
/// `segments` always covers `[0, size)` exactly: widths sum to `size`, with
/// no gaps and no overlaps. New evidence that disagrees with the current
/// tiling splits the offending segment into single bytes and retries, so a
/// coarse guess is only ever provisional.
#[derive(Debug, Clone)]
pub struct Layout {
    name: String,
    size: usize,
    segments: Vec<Segment>,
    accessed: Vec<bool>,
    stride: Option<usize>,
    rendered: Option<String>,
}

impl Layout {
    /// Creates an all-filler layout: `size` unmarked single-byte segments.
    pub fn new(name: String, size: usize) -> Self {
        Self {
            name,
            size,
            segments: vec![Segment::byte(); size],
            accessed: vec![false; size],
            stride: None,
            rendered: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn accessed(&self) -> &[bool] {
        &self.accessed
    }

    pub fn is_accessed(&self, offset: usize) -> bool {
        self.accessed.get(offset).copied().unwrap_or(false)
    }

    pub fn is_array(&self) -> bool {
        self.stride.is_some()
    }

    pub fn stride(&self) -> Option<usize> {
        self.stride
    }

    /// Sum of segment widths. Equal to `size` whenever the tiling holds.
    pub fn total_width(&self) -> usize {
        self.segments.iter().map(|s| s.width).sum()
    }

    /// Segments paired with their starting offset.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &Segment)> + '_ {
        self.segments.iter().scan(0usize, |offset, segment| {
            let start = *offset;
            *offset += segment.width;
            Some((start, segment))
        })
    }

    pub fn check_tiling(&self) -> bool {
        self.accessed.len() == self.size
            && self.segments.iter().all(|s| s.width > 0)
            && self.total_width() == self.size
    }

    /// Records a field of `segment.width` bytes starting exactly at `offset`.
    pub fn insert(&mut self, offset: usize, segment: Segment) {
        assert!(segment.width > 0, "zero-width segment inserted into {}", self.name);
        assert!(
            offset + segment.width <= self.size,
            "segment {} at {:#x} exceeds {} ({} bytes)",
            segment, offset, self.name, self.size
        );

        // Every retry breaks a segment wider than one byte, so the number of
        // segments grows each round and can never exceed `size`.
        for _ in 0..=self.size {
            let (idx, start) = self.locate(offset);
            if start != offset {
                log::debug!("{}: insert at {:#x} misaligned, breaking index {}", self.name, offset, idx - 1);
                self.break_member(idx - 1);
                continue;
            }

            let mut covered = 0;
            let mut end = idx;
            while covered < segment.width {
                covered += self.segments[end].width;
                end += 1;
            }
            if covered != segment.width {
                log::debug!(
                    "{}: {} at {:#x} overshoots by {} bytes, breaking index {}",
                    self.name, segment, offset, covered - segment.width, end - 1
                );
                self.break_member(end - 1);
                continue;
            }

            log::trace!("{}: placing {} at {:#x} over {} segments", self.name, segment, offset, end - idx);
            self.segments.splice(idx..end, std::iter::once(segment));
            self.mark(offset, offset + segment.width);
            debug_assert!(self.check_tiling());
            return;
        }

        unreachable!("{}: insert at {:#x} did not converge", self.name, offset);
    }

    /// Fetches the segment starting at `offset`, breaking any segment that
    /// straddles it. The returned segment's bytes are marked accessed.
    pub fn get(&mut self, offset: usize) -> Segment {
        assert!(offset < self.size, "read at {:#x} outside {} ({} bytes)", offset, self.name, self.size);

        for _ in 0..=self.size {
            let (idx, start) = self.locate(offset);
            if start != offset {
                log::debug!(
                    "{}: read at {:#x} lands inside {}, breaking index {}",
                    self.name, offset, self.segments[idx - 1], idx - 1
                );
                self.break_member(idx - 1);
                continue;
            }

            let segment = self.segments[idx];
            self.mark(offset, offset + segment.width);
            return segment;
        }

        unreachable!("{}: read at {:#x} did not converge", self.name, offset);
    }

    /// Tag of the segment starting exactly at `offset`, without splitting.
    pub fn get2(&self, offset: usize) -> Option<SegmentTag> {
        if offset >= self.size {
            return None;
        }
        let (idx, start) = self.locate(offset);
        if start != offset {
            return None;
        }
        Some(self.segments[idx].tag)
    }

    /// Replaces the segment at `idx` with single-byte raw segments.
    pub fn break_member(&mut self, idx: usize) {
        let segment = self.segments[idx];
        assert!(
            !segment.tag.is_nested(),
            "{}: nested segment at index {} cannot be broken",
            self.name, idx
        );
        log::trace!("{}: breaking {} at index {}", self.name, segment, idx);
        self.segments.splice(idx..=idx, std::iter::repeat(Segment::byte()).take(segment.width));
    }

    /// Grows the layout with unmarked single bytes until `size >= new_size`.
    pub fn extend(&mut self, new_size: usize) {
        if new_size <= self.size {
            return;
        }
        log::debug!("{}: extending from {} to {} bytes", self.name, self.size, new_size);
        let added = new_size - self.size;
        self.segments.extend(std::iter::repeat(Segment::byte()).take(added));
        self.accessed.resize(new_size, false);
        self.size = new_size;
    }

    pub fn mark(&mut self, start: usize, end: usize) {
        for flag in &mut self.accessed[start..end] {
            *flag = true;
        }
    }

    /// Switches to array mode; the first segment's width becomes the stride.
    pub fn make_array(&mut self) {
        assert!(self.stride.is_none(), "{} is already an array", self.name);
        let first = self.segments.first().unwrap_or_else(|| panic!("{} has no segments", self.name));
        log::debug!("{}: converting to array with stride {}", self.name, first.width);
        self.stride = Some(first.width);
    }

    /// Folds every run of unmarked raw segments into one opaque blob.
    pub fn consolidate(&mut self) {
        let mut merged = Vec::with_capacity(self.segments.len());
        let mut run = 0;

        for (offset, segment) in self.entries() {
            if segment.is_raw() && !self.accessed[offset] {
                run += segment.width;
                continue;
            }
            if run != 0 {
                merged.push(Segment::opaque(run));
                run = 0;
            }
            merged.push(*segment);
        }
        if run != 0 {
            merged.push(Segment::opaque(run));
        }

        if merged.len() != self.segments.len() {
            log::debug!("{}: consolidated {} segments into {}", self.name, self.segments.len(), merged.len());
        }
        self.segments = merged;
        debug_assert!(self.check_tiling());
    }

    /// Merges segments from `idx` up to, but excluding, the first segment
    /// tagged `until` into a single opaque blob.
    pub fn merge_until(&mut self, idx: usize, until: SegmentTag) {
        let end = self.segments[idx..]
            .iter()
            .position(|s| s.tag == until)
            .map_or(self.segments.len(), |pos| idx + pos);
        let width: usize = self.segments[idx..end].iter().map(|s| s.width).sum();
        if width == 0 {
            return;
        }
        log::debug!("{}: merging indices {}..{} into {} bytes", self.name, idx, end, width);
        self.segments.splice(idx..end, std::iter::once(Segment::opaque(width)));
        debug_assert!(self.check_tiling());
    }

    pub(crate) fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    pub(crate) fn set_rendered(&mut self, text: String) {
        self.rendered = Some(text);
    }

    /// Drops the memoized declaration text.
    pub fn invalidate(&mut self) {
        self.rendered = None;
    }

    /// Index of the first segment whose start is `>= offset`, together with
    /// that start.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut start = 0;
        let mut idx = 0;
        while start < offset {
            start += self.segments[idx].width;
            idx += 1;
        }
        (idx, start)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.name)?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", segment)?;
        }
        write!(f, "]")
    }
}
