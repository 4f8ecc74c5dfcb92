// Tue Jan 20 2026 - Alex

use crate::config::Config;
use crate::structure::{LayoutArena, LayoutId, SegmentTag};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

const NOT_ACCESSED: &str = "NOT ACCESSED";

/// A field handed to [`TypeRegistry::define_struct`].
#[derive(Debug, Clone)]
pub struct FieldSpec<H> {
    pub offset: usize,
    pub name: String,
    pub ty: H,
    pub width: usize,
    pub comment: Option<String>,
}

/// Host type database that finalized layouts are materialized into.
pub trait TypeRegistry {
    type Handle: Copy;

    /// Built-in integer of `width` bytes, if the host has one.
    fn integer(&mut self, width: usize) -> Option<Self::Handle>;

    fn pointer(&mut self, target: Self::Handle, pointer_width: usize) -> Self::Handle;

    fn byte_array(&mut self, length: usize) -> Self::Handle;

    /// Defines `name`, replacing any earlier definition with the same name.
    fn define_struct(&mut self, name: &str, size: usize, fields: &[FieldSpec<Self::Handle>]) -> Self::Handle;
}

/// Side table of registration handles, keyed by layout.
///
/// Each layout is registered at most once; later requests return the cached
/// pointer-to-struct handle.
pub struct Registrar<H> {
    handles: HashMap<LayoutId, H>,
}

impl<H: Copy> Registrar<H> {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    pub fn handle(&self, id: LayoutId) -> Option<H> {
        self.handles.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn reset(&mut self) {
        self.handles.clear();
    }

    pub fn register<R>(&mut self, arena: &LayoutArena, id: LayoutId, registry: &mut R, config: &Config) -> H
    where
        R: TypeRegistry<Handle = H>,
    {
        if let Some(handle) = self.handles.get(&id) {
            return *handle;
        }

        let pointer_width = config.pointer_width_bytes;
        let layout = arena.get(id);
        let mut fields = Vec::with_capacity(layout.segments().len());

        for (index, (offset, segment)) in layout.entries().enumerate() {
            let ty = match segment.tag {
                SegmentTag::Nested(child) if arena.get(child).is_array() => {
                    let byte = byte_type(registry);
                    registry.pointer(byte, pointer_width)
                }
                SegmentTag::Nested(child) => self.register(arena, child, registry, config),
                SegmentTag::StringPointer { .. } => {
                    let byte = byte_type(registry);
                    registry.pointer(byte, pointer_width)
                }
                SegmentTag::Raw => match registry.integer(segment.width) {
                    Some(handle) => handle,
                    None => registry.byte_array(segment.width),
                },
                SegmentTag::Opaque => registry.byte_array(segment.width),
            };

            fields.push(FieldSpec {
                offset,
                name: config.field_name(index),
                ty,
                width: segment.width,
                comment: (!layout.is_accessed(offset)).then(|| NOT_ACCESSED.to_string()),
            });
        }

        let record = registry.define_struct(layout.name(), layout.size(), &fields);
        log::info!("registered {} with {} fields", layout.name(), fields.len());
        let handle = registry.pointer(record, pointer_width);
        self.handles.insert(id, handle);
        handle
    }
}

impl<H: Copy> Default for Registrar<H> {
    fn default() -> Self {
        Self::new()
    }
}

fn byte_type<R: TypeRegistry>(registry: &mut R) -> R::Handle {
    match registry.integer(1) {
        Some(handle) => handle,
        None => registry.byte_array(1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub offset: usize,
    pub name: String,
    pub type_name: String,
    pub width: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDef {
    Integer { name: String, width: usize },
    Pointer { name: String, target: String, width: usize },
    Array { name: String, element: String, length: usize },
    Struct { name: String, size: usize, fields: Vec<FieldDef> },
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            Self::Integer { name, .. }
            | Self::Pointer { name, .. }
            | Self::Array { name, .. }
            | Self::Struct { name, .. } => name,
        }
    }
}

/// In-memory [`TypeRegistry`], keyed by C type name in definition order.
pub struct TypeDatabase {
    types: IndexMap<String, TypeDef>,
}

impl TypeDatabase {
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    pub fn get(&self, handle: TypeHandle) -> Option<&TypeDef> {
        self.types.get_index(handle.0).map(|(_, def)| def)
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let defs: Vec<&TypeDef> = self.types.values().collect();
        serde_json::to_string_pretty(&defs)
    }

    fn name_of(&self, handle: TypeHandle) -> String {
        self.get(handle).map(|def| def.name().to_string()).unwrap_or_default()
    }

    fn intern(&mut self, def: TypeDef) -> TypeHandle {
        let (index, _) = self.types.insert_full(def.name().to_string(), def);
        TypeHandle(index)
    }
}

impl Default for TypeDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry for TypeDatabase {
    type Handle = TypeHandle;

    fn integer(&mut self, width: usize) -> Option<TypeHandle> {
        let name = crate::structure::render::integer_type(width)?;
        Some(self.intern(TypeDef::Integer { name: name.to_string(), width }))
    }

    fn pointer(&mut self, target: TypeHandle, pointer_width: usize) -> TypeHandle {
        let target = self.name_of(target);
        self.intern(TypeDef::Pointer {
            name: format!("{}*", target),
            target,
            width: pointer_width,
        })
    }

    fn byte_array(&mut self, length: usize) -> TypeHandle {
        self.intern(TypeDef::Array {
            name: format!("char[{}]", length),
            element: "char".to_string(),
            length,
        })
    }

    fn define_struct(&mut self, name: &str, size: usize, fields: &[FieldSpec<TypeHandle>]) -> TypeHandle {
        let fields = fields
            .iter()
            .map(|field| FieldDef {
                offset: field.offset,
                name: field.name.clone(),
                type_name: self.name_of(field.ty),
                width: field.width,
                comment: field.comment.clone(),
            })
            .collect();
        self.intern(TypeDef::Struct {
            name: format!("struct {}", name),
            size,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Segment;

    fn sample(arena: &mut LayoutArena) -> LayoutId {
        let root = arena.create(24);
        let child = arena.create(4);
        arena.get_mut(child).insert(0, Segment::raw(4));
        arena.get_mut(root).insert(0, Segment::raw(4));
        arena.get_mut(root).insert(4, Segment::raw(3));
        arena.get_mut(root).insert(8, Segment::string(5, 8));
        arena.get_mut(root).insert(16, Segment::nested(child, 8));
        root
    }

    #[test]
    fn test_register_builds_struct() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let root = sample(&mut arena);
        let mut db = TypeDatabase::new();
        let mut registrar = Registrar::new();

        let handle = registrar.register(&arena, root, &mut db, &config);
        assert_eq!(db.get(handle).unwrap().name(), "struct S0*");

        match db.lookup("struct S0").unwrap() {
            TypeDef::Struct { size, fields, .. } => {
                assert_eq!(*size, 24);
                let types: Vec<&str> = fields.iter().map(|f| f.type_name.as_str()).collect();
                assert_eq!(types, vec!["uint32_t", "char[3]", "uint8_t", "uint8_t*", "struct S1*"]);
                assert_eq!(fields[3].comment, None);
                assert_eq!(fields[2].comment.as_deref(), Some(NOT_ACCESSED));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(db.lookup("struct S1").is_some());
    }

    #[test]
    fn test_register_is_cached() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let root = sample(&mut arena);
        let mut db = TypeDatabase::new();
        let mut registrar = Registrar::new();

        let first = registrar.register(&arena, root, &mut db, &config);
        let count = db.len();
        let second = registrar.register(&arena, root, &mut db, &config);
        assert_eq!(first, second);
        assert_eq!(db.len(), count);
        assert_eq!(registrar.len(), 2);
    }

    #[test]
    fn test_reregistration_replaces_definition() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let root = sample(&mut arena);
        let mut db = TypeDatabase::new();
        let mut registrar = Registrar::new();
        registrar.register(&arena, root, &mut db, &config);

        arena.get_mut(root).insert(4, Segment::raw(4));
        registrar.reset();
        registrar.register(&arena, root, &mut db, &config);

        let structs = db.types().filter(|t| t.name() == "struct S0").count();
        assert_eq!(structs, 1);
        match db.lookup("struct S0").unwrap() {
            TypeDef::Struct { fields, .. } => assert_eq!(fields[1].type_name, "uint32_t"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_to_json() {
        let config = Config::default().with_pointer_width(4);
        let mut arena = LayoutArena::new();
        let id = arena.create(4);
        arena.get_mut(id).insert(0, Segment::raw(2));
        let mut db = TypeDatabase::new();
        Registrar::new().register(&arena, id, &mut db, &config);

        let json: serde_json::Value = serde_json::from_str(&db.to_json().unwrap()).unwrap();
        let last = json.as_array().unwrap().last().unwrap();
        assert_eq!(last["kind"], "pointer");
        assert_eq!(last["width"], 4);
    }
}
