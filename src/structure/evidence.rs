// Tue Jan 20 2026 - Alex

use crate::config::Config;
use crate::structure::{Layout, LayoutArena, LayoutId, Segment, SegmentTag, StructureError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One observed access into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub offset: usize,
    #[serde(flatten)]
    pub kind: AccessKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessKind {
    /// Field of known width.
    Raw { width: usize },
    /// Read of unknown width.
    Read,
    /// Pointer to a string of `length` bytes.
    String { length: usize },
    /// Pointer to a sub-record.
    Record { record: RecordEvidence },
    /// Pointer to a run of `stride`-byte elements.
    Array { stride: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEvidence {
    pub size: usize,
    #[serde(default)]
    pub accesses: Vec<Access>,
}

impl RecordEvidence {
    pub fn new(size: usize) -> Self {
        Self { size, accesses: Vec::new() }
    }

    pub fn with_access(mut self, offset: usize, kind: AccessKind) -> Self {
        self.accesses.push(Access { offset, kind });
        self
    }
}

/// Input document of the command line tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceDocument {
    pub config: Option<Config>,
    pub records: Vec<RecordEvidence>,
    pub arguments: Vec<RecordEvidence>,
    pub call: Option<String>,
}

impl EvidenceDocument {
    pub fn load(path: &Path) -> Result<Self, StructureError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Replays evidence into an arena, validating it so the layout asserts are
/// never reached from external input.
pub struct EvidenceBuilder<'a> {
    arena: &'a mut LayoutArena,
    config: &'a Config,
}

impl<'a> EvidenceBuilder<'a> {
    pub fn new(arena: &'a mut LayoutArena, config: &'a Config) -> Self {
        Self { arena, config }
    }

    pub fn build(&mut self, record: &RecordEvidence) -> Result<LayoutId, StructureError> {
        self.end_of(0, record.size)?;
        let id = self.arena.create(record.size);
        self.apply_all(id, &record.accesses)?;
        Ok(id)
    }

    pub fn build_arguments(&mut self, arguments: &[RecordEvidence]) -> Result<Vec<LayoutId>, StructureError> {
        arguments.iter().map(|record| self.build(record)).collect()
    }

    pub fn apply_all(&mut self, id: LayoutId, accesses: &[Access]) -> Result<(), StructureError> {
        for access in accesses {
            self.apply(id, access)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, id: LayoutId, access: &Access) -> Result<(), StructureError> {
        let offset = access.offset;
        let pointer_width = self.config.pointer_width_bytes;

        match &access.kind {
            AccessKind::Raw { width } => {
                if *width == 0 {
                    return Err(StructureError::ZeroWidth(offset));
                }
                self.place(id, offset, Segment::raw(*width))
            }
            AccessKind::Read => {
                let end = self.end_of(offset, 1)?;
                let layout = self.arena.get_mut(id);
                layout.extend(end);
                if overlaps_nested(layout, offset, end) && !starts_nested(layout, offset) {
                    return Err(invalid(offset, "read inside a nested layout pointer"));
                }
                layout.get(offset);
                Ok(())
            }
            AccessKind::String { length } => self.place(id, offset, Segment::string(*length, pointer_width)),
            AccessKind::Record { record } => {
                let end = self.end_of(offset, pointer_width)?;
                self.end_of(0, record.size)?;
                self.arena.get_mut(id).extend(end);
                if let Some(SegmentTag::Nested(child)) = self.arena.get(id).get2(offset) {
                    if !self.arena.get(child).is_array() {
                        log::debug!("reusing {} at {:#x}", self.arena.get(child).name(), offset);
                        self.arena.get_mut(child).extend(record.size);
                        self.arena.get_mut(id).get(offset);
                        return self.apply_all(child, &record.accesses);
                    }
                }
                self.check_free(id, offset, pointer_width)?;
                let child = self.build(record)?;
                self.arena.get_mut(id).insert(offset, Segment::nested(child, pointer_width));
                Ok(())
            }
            AccessKind::Array { stride } => {
                if *stride == 0 {
                    return Err(StructureError::ZeroWidth(offset));
                }
                let end = self.end_of(offset, pointer_width)?;
                self.end_of(0, *stride)?;
                self.arena.get_mut(id).extend(end);
                if let Some(SegmentTag::Nested(child)) = self.arena.get(id).get2(offset) {
                    if self.arena.get(child).stride() == Some(*stride) {
                        self.arena.get_mut(id).get(offset);
                        return Ok(());
                    }
                }
                self.check_free(id, offset, pointer_width)?;
                let child = self.arena.create(*stride);
                let element = self.arena.get_mut(child);
                element.insert(0, Segment::raw(*stride));
                element.make_array();
                self.arena.get_mut(id).insert(offset, Segment::nested(child, pointer_width));
                Ok(())
            }
        }
    }

    fn place(&mut self, id: LayoutId, offset: usize, segment: Segment) -> Result<(), StructureError> {
        let end = self.end_of(offset, segment.width)?;
        self.arena.get_mut(id).extend(end);
        self.check_free(id, offset, segment.width)?;
        self.arena.get_mut(id).insert(offset, segment);
        Ok(())
    }

    /// End of `[offset, offset + width)`, if it stays within the configured
    /// maximum extent.
    fn end_of(&self, offset: usize, width: usize) -> Result<usize, StructureError> {
        let max = self.config.max_extent;
        match offset.checked_add(width) {
            Some(end) if end <= max => Ok(end),
            _ => Err(invalid(offset, &format!("extent beyond the {} byte limit", max))),
        }
    }

    fn check_free(&self, id: LayoutId, offset: usize, width: usize) -> Result<(), StructureError> {
        if overlaps_nested(self.arena.get(id), offset, offset + width) {
            return Err(invalid(offset, "field overlaps a nested layout pointer"));
        }
        Ok(())
    }
}

fn overlaps_nested(layout: &Layout, start: usize, end: usize) -> bool {
    layout
        .entries()
        .any(|(offset, segment)| segment.tag.is_nested() && offset < end && start < offset + segment.width)
}

fn starts_nested(layout: &Layout, offset: usize) -> bool {
    matches!(layout.get2(offset), Some(SegmentTag::Nested(_)))
}

fn invalid(offset: usize, reason: &str) -> StructureError {
    StructureError::InvalidEvidence {
        offset,
        reason: reason.to_string(),
    }
}
