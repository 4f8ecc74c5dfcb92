// Tue Jan 20 2026 - Alex

pub mod arena;
pub mod error;
pub mod evidence;
pub mod layout;
pub mod registry;
pub mod render;
pub mod segment;

pub use arena::{LayoutArena, LayoutId};
pub use error::StructureError;
pub use evidence::{Access, AccessKind, EvidenceBuilder, EvidenceDocument, RecordEvidence};
pub use layout::Layout;
pub use registry::{FieldSpec, Registrar, TypeDatabase, TypeDef, TypeRegistry};
pub use render::DeclarationRenderer;
pub use segment::{Segment, SegmentTag};
