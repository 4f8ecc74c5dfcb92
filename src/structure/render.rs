// Tue Jan 20 2026 - Alex

use crate::config::Config;
use crate::structure::{LayoutArena, LayoutId, SegmentTag};

/// C name of the fixed-width unsigned integer holding `width` bytes.
pub fn integer_type(width: usize) -> Option<&'static str> {
    match width {
        1 => Some("uint8_t"),
        2 => Some("uint16_t"),
        4 => Some("uint32_t"),
        8 => Some("uint64_t"),
        _ => None,
    }
}

/// Declaration of a plain field: an integer when one fits, bytes otherwise.
pub fn field_declaration(width: usize, name: &str) -> String {
    match integer_type(width) {
        Some(ty) => format!("{} {};", ty, name),
        None => format!("char {}[{}];", name, width),
    }
}

/// Pointer type used for an array-mode layout of the given stride.
pub fn array_pointer_type(stride: usize) -> String {
    match integer_type(stride) {
        Some(ty) => format!("{}*", ty),
        None => "char*".to_string(),
    }
}

/// Renders layouts as C structure declarations.
pub struct DeclarationRenderer<'a> {
    config: &'a Config,
}

impl<'a> DeclarationRenderer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Declaration of `id`, preceded by the declarations of the records it
    /// points to. Consolidates the layout first; the text is memoized until
    /// [`crate::structure::Layout::invalidate`] is called.
    pub fn render(&self, arena: &mut LayoutArena, id: LayoutId) -> String {
        self.declare(arena, id, false)
    }

    /// A record referenced from a parent is always given a body so the
    /// parent's field type is complete, even when it has a single segment.
    fn declare(&self, arena: &mut LayoutArena, id: LayoutId, referenced: bool) -> String {
        if let Some(text) = arena.get(id).rendered() {
            return text.to_string();
        }

        arena.get_mut(id).consolidate();
        let layout = arena.get(id);
        let trivial = layout.segments().len() == 1;
        if layout.size() == 0 || (trivial && !referenced) {
            return String::new();
        }

        let name = layout.name().to_string();
        let entries: Vec<_> = layout
            .entries()
            .map(|(offset, segment)| (*segment, layout.is_accessed(offset)))
            .collect();

        let mut prelude = String::new();
        let mut body = format!("struct {} {{\n", name);

        for (index, (segment, accessed)) in entries.into_iter().enumerate() {
            let field = self.config.field_name(index);
            let line = match segment.tag {
                SegmentTag::Nested(child) if arena.get(child).is_array() => {
                    let stride = arena.get(child).stride().unwrap_or(1);
                    format!("{} {};", array_pointer_type(stride), field)
                }
                SegmentTag::Nested(child) => {
                    let nested = self.declare(arena, child, true);
                    if !nested.is_empty() {
                        prelude.push_str(&nested);
                        prelude.push_str("\n\n");
                    }
                    format!("struct {}* {};", arena.get(child).name(), field)
                }
                SegmentTag::StringPointer { .. } => format!("char* {};", field),
                SegmentTag::Opaque if segment.width == 1 => format!("char {};", field),
                SegmentTag::Opaque => format!("char {}[{}];", field, segment.width),
                SegmentTag::Raw => field_declaration(segment.width, &field),
            };

            body.push_str("    ");
            body.push_str(&line);
            if !accessed {
                body.push_str(" // not accessed");
            }
            body.push('\n');
        }
        body.push_str("};");

        let text = prelude + &body;
        if !trivial {
            arena.get_mut(id).set_rendered(text.clone());
        }
        text
    }
}
