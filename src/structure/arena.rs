// Tue Jan 20 2026 - Alex

use crate::structure::{Layout, StructureError};
use std::fmt;

/// Identity of a layout inside a [`LayoutArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayoutId(usize);

impl LayoutId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns every layout of one discovery session and hands out their names.
///
/// Nested layouts are referenced by [`LayoutId`] from exactly one parent
/// segment, so the arena always describes a forest of trees.
pub struct LayoutArena {
    layouts: Vec<Layout>,
    prefix: String,
}

impl LayoutArena {
    pub fn new() -> Self {
        Self::with_prefix("S")
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            layouts: Vec::new(),
            prefix: prefix.to_string(),
        }
    }

    /// Creates an empty layout of `size` bytes named `<prefix><n>`.
    pub fn create(&mut self, size: usize) -> LayoutId {
        let id = LayoutId(self.layouts.len());
        let name = format!("{}{}", self.prefix, id.0);
        log::trace!("creating layout {} ({} bytes)", name, size);
        self.layouts.push(Layout::new(name, size));
        id
    }

    pub fn get(&self, id: LayoutId) -> &Layout {
        &self.layouts[id.0]
    }

    pub fn get_mut(&mut self, id: LayoutId) -> &mut Layout {
        &mut self.layouts[id.0]
    }

    pub fn try_get(&self, id: LayoutId) -> Result<&Layout, StructureError> {
        self.layouts.get(id.0).ok_or(StructureError::UnknownLayout(id.0))
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Layouts referenced directly by `id`, in segment order.
    pub fn nested_children(&self, id: LayoutId) -> Vec<LayoutId> {
        self.get(id)
            .segments()
            .iter()
            .filter_map(|s| s.tag.nested())
            .collect()
    }

    /// Checks the tiling of `id` and of every layout below it.
    pub fn check_tree(&self, id: LayoutId) -> bool {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !self.get(current).check_tiling() {
                return false;
            }
            pending.extend(self.nested_children(current));
        }
        true
    }
}

impl Default for LayoutArena {
    fn default() -> Self {
        Self::new()
    }
}
