// Tue Jan 20 2026 - Alex

use crate::config::Config;
use crate::structure::render::{array_pointer_type, field_declaration, integer_type};
use crate::structure::{LayoutArena, LayoutId, SegmentTag};

/// A pair of C fragments: one reading and wiring up a record, one freeing
/// every buffer the first allocated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderCode {
    pub read: String,
    pub release: String,
}

impl ReaderCode {
    fn append(&mut self, other: ReaderCode) {
        self.read.push_str(&other.read);
        self.release.push_str(&other.release);
    }
}

/// Reader and release code for a call's arguments, plus the argument names
/// in call order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentReader {
    pub read: String,
    pub release: String,
    pub arguments: Vec<String>,
}

impl ArgumentReader {
    pub fn argument_list(&self) -> String {
        self.arguments.join(", ")
    }

    /// Substitutes `{{args}}` in a call template.
    pub fn splice(&self, template: &str) -> String {
        template.replace("{{args}}", &self.argument_list())
    }
}

/// Emits code reading layouts from the stream named in the config.
///
/// Field names follow segment indices, so layouts should be rendered (and
/// thereby consolidated) before code is generated for them. Identifiers are
/// numbered per generator and never repeat.
pub struct Generator<'a> {
    config: &'a Config,
    allocations: usize,
    arguments: usize,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            allocations: 0,
            arguments: 0,
        }
    }

    fn new_allocation(&mut self) -> String {
        let name = format!("allocation{}", self.allocations);
        self.allocations += 1;
        name
    }

    fn new_argument(&mut self) -> usize {
        let index = self.arguments;
        self.arguments += 1;
        index
    }

    /// Allocates a buffer for `id`, points `target` at it and fills it from
    /// the stream, recursing into nested records.
    pub fn read_record(&mut self, arena: &LayoutArena, id: LayoutId, target: &str) -> ReaderCode {
        let layout = arena.get(id);
        let stream = self.config.stream_name.clone();
        let mut code = ReaderCode::default();
        let allocation = self.new_allocation();

        if let Some(stride) = layout.stride() {
            let length = self.config.array_elements * stride;
            code.read.push_str(&format!("void* {} = malloc({});\n", allocation, length));
            code.read.push_str(&format!("{} = ({}){};\n", target, array_pointer_type(stride), allocation));
            code.read.push_str(&format!("fread((void*){}, 1, {}, {});\n", target, length, stream));
        } else {
            code.read.push_str(&format!("void* {} = malloc({});\n", allocation, layout.total_width()));
            code.read.push_str(&format!("{} = (struct {}*){};\n", target, layout.name(), allocation));

            for (index, segment) in layout.segments().iter().enumerate() {
                let field = format!("{}->{}", target, self.config.field_name(index));
                match segment.tag {
                    SegmentTag::Raw | SegmentTag::Opaque => {
                        code.read.push_str(&format!("fread((void*)&{}, 1, {}, {});\n", field, segment.width, stream));
                    }
                    SegmentTag::StringPointer { length } => {
                        let buffer = self.new_allocation();
                        code.read.push_str(&format!("void* {} = malloc({});\n", buffer, length + 1));
                        code.read.push_str(&format!("{} = (char*){};\n", field, buffer));
                        code.read.push_str(&format!("{}[{}] = 0;\n", field, length));
                        code.read.push_str(&format!("fread({}, 1, {}, {});\n", field, length, stream));
                        code.release.push_str(&format!("free({});\n", buffer));
                    }
                    SegmentTag::Nested(child) => {
                        let nested = self.read_record(arena, child, &field);
                        code.append(nested);
                    }
                }
            }
        }

        code.release.push_str(&format!("free({});\n", allocation));
        code
    }

    /// Declares and reads every argument of a call. A zero-sized layout is a
    /// plain scalar; a single-segment layout is a pointer to one value.
    pub fn generate_argument_reader(&mut self, arena: &LayoutArena, arguments: &[LayoutId]) -> ArgumentReader {
        let pointer_width = self.config.pointer_width_bytes;
        let stream = self.config.stream_name.clone();
        let mut reader = ArgumentReader::default();

        for &id in arguments {
            let index = self.new_argument();
            let name = format!("arg_{}", index);
            let layout = arena.get(id);

            if layout.size() == 0 {
                reader.read.push_str(&field_declaration(pointer_width, &name));
                reader.read.push('\n');
                reader.read.push_str(&format!("fread(&{}, 1, {}, {});\n", name, pointer_width, stream));
            } else if layout.segments().len() == 1 {
                let temp = format!("temp_arg_{}", index);
                match integer_type(pointer_width) {
                    Some(ty) => {
                        reader.read.push_str(&format!("{} {};\n", ty, temp));
                        reader.read.push_str(&format!("{}* {} = &{};\n", ty, name, temp));
                    }
                    None => {
                        reader.read.push_str(&format!("char {}[{}];\n", temp, pointer_width));
                        reader.read.push_str(&format!("char* {} = {};\n", name, temp));
                    }
                }
                reader.read.push_str(&format!("fread({}, 1, {}, {});\n", name, pointer_width, stream));
            } else if layout.is_array() {
                let length = self.config.array_elements;
                reader.read.push_str(&format!("char* {} = (char*)malloc({});\n", name, length + 1));
                reader.read.push_str(&format!("{}[{}] = 0;\n", name, length));
                reader.read.push_str(&format!("fread({}, 1, {}, {});\n", name, length, stream));
                reader.release.push_str(&format!("free({});\n", name));
            } else {
                reader.read.push_str(&format!("struct {}* {};\n", layout.name(), name));
                let code = self.read_record(arena, id, &name);
                reader.read.push_str(&code.read);
                reader.release.push_str(&code.release);
            }

            log::debug!("argument {} read as {}", name, layout);
            reader.arguments.push(name);
        }

        reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Segment;

    fn count(text: &str, needle: &str) -> usize {
        text.matches(needle).count()
    }

    fn tree(arena: &mut LayoutArena) -> LayoutId {
        let root = arena.create(24);
        let child = arena.create(12);
        let array = arena.create(4);
        arena.get_mut(array).insert(0, Segment::raw(4));
        arena.get_mut(array).make_array();
        arena.get_mut(child).insert(0, Segment::raw(4));
        arena.get_mut(child).insert(4, Segment::string(7, 8));
        arena.get_mut(root).insert(0, Segment::string(3, 8));
        arena.get_mut(root).insert(8, Segment::nested(child, 8));
        arena.get_mut(root).insert(16, Segment::nested(array, 8));
        root
    }

    #[test]
    fn test_read_flat_record() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let id = arena.create(6);
        arena.get_mut(id).insert(0, Segment::raw(2));
        arena.get_mut(id).insert(2, Segment::raw(4));

        let code = Generator::new(&config).read_record(&arena, id, "arg_0");
        assert_eq!(
            code.read,
            "void* allocation0 = malloc(6);\n\
             arg_0 = (struct S0*)allocation0;\n\
             fread((void*)&arg_0->entry_0, 1, 2, h);\n\
             fread((void*)&arg_0->entry_1, 1, 4, h);\n"
        );
        assert_eq!(code.release, "free(allocation0);\n");
    }

    #[test]
    fn test_string_pointer_field() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let id = arena.create(16);
        arena.get_mut(id).insert(0, Segment::raw(8));
        arena.get_mut(id).insert(8, Segment::string(5, 8));

        let code = Generator::new(&config).read_record(&arena, id, "p");
        assert!(code.read.contains("void* allocation1 = malloc(6);\n"));
        assert!(code.read.contains("p->entry_1 = (char*)allocation1;\n"));
        assert!(code.read.contains("p->entry_1[5] = 0;\n"));
        assert!(code.read.contains("fread(p->entry_1, 1, 5, h);\n"));
        assert_eq!(code.release, "free(allocation1);\nfree(allocation0);\n");
    }

    #[test]
    fn test_allocations_balance_releases() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let root = tree(&mut arena);

        let code = Generator::new(&config).read_record(&arena, root, "arg_0");
        assert_eq!(count(&code.read, "malloc("), 5);
        assert_eq!(count(&code.read, "malloc("), count(&code.release, "free("));

        for line in code.release.lines() {
            let buffer = line.trim_start_matches("free(").trim_end_matches(");");
            let declared = code.read.find(&format!("void* {} =", buffer));
            assert!(declared.is_some(), "{} released but never allocated", buffer);
        }
        assert!(code.release.ends_with("free(allocation0);\n"));
    }

    #[test]
    fn test_nested_array_read() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let root = tree(&mut arena);
        let code = Generator::new(&config).read_record(&arena, root, "r");
        assert!(code.read.contains("r->entry_2 = (uint32_t*)allocation4;\n"));
        assert!(code.read.contains("fread((void*)r->entry_2, 1, 32, h);\n"));
        assert!(code.read.contains("r->entry_1->entry_1[7] = 0;\n"));
    }

    #[test]
    fn test_scalar_argument() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let scalar = arena.create(0);

        let reader = Generator::new(&config).generate_argument_reader(&arena, &[scalar]);
        assert_eq!(reader.read, "uint64_t arg_0;\nfread(&arg_0, 1, 8, h);\n");
        assert_eq!(reader.release, "");
        assert_eq!(reader.arguments, vec!["arg_0".to_string()]);
    }

    #[test]
    fn test_primitive_pointer_argument() {
        let config = Config::default().with_pointer_width(4);
        let mut arena = LayoutArena::new();
        let id = arena.create(4);
        arena.get_mut(id).insert(0, Segment::raw(4));

        let reader = Generator::new(&config).generate_argument_reader(&arena, &[id]);
        assert_eq!(
            reader.read,
            "uint32_t temp_arg_0;\nuint32_t* arg_0 = &temp_arg_0;\nfread(arg_0, 1, 4, h);\n"
        );
        assert!(reader.release.is_empty());
    }

    #[test]
    fn test_array_and_record_arguments() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let array = arena.create(4);
        arena.get_mut(array).insert(0, Segment::raw(2));
        arena.get_mut(array).make_array();
        let record = tree(&mut arena);

        let reader = Generator::new(&config).generate_argument_reader(&arena, &[array, record]);
        assert!(reader.read.starts_with("char* arg_0 = (char*)malloc(9);\narg_0[8] = 0;\nfread(arg_0, 1, 8, h);\n"));
        assert!(reader.read.contains("struct S1* arg_1;\n"));
        assert!(reader.release.starts_with("free(arg_0);\n"));
        assert_eq!(count(&reader.read, "malloc("), count(&reader.release, "free("));
        assert_eq!(reader.splice("target({{args}})"), "target(arg_0, arg_1)");
    }

    #[test]
    fn test_array_argument_length_ignores_stride() {
        let config = Config::default().with_array_elements(16);
        let mut arena = LayoutArena::new();
        let array = arena.create(8);
        arena.get_mut(array).insert(0, Segment::raw(4));
        arena.get_mut(array).make_array();

        let reader = Generator::new(&config).generate_argument_reader(&arena, &[array]);
        assert_eq!(
            reader.read,
            "char* arg_0 = (char*)malloc(17);\narg_0[16] = 0;\nfread(arg_0, 1, 16, h);\n"
        );
        assert_eq!(reader.release, "free(arg_0);\n");
    }

    #[test]
    fn test_primitive_pointer_without_integer_type() {
        let config = Config::default().with_pointer_width(6);
        let mut arena = LayoutArena::new();
        let id = arena.create(6);
        arena.get_mut(id).insert(0, Segment::raw(6));

        let reader = Generator::new(&config).generate_argument_reader(&arena, &[id]);
        assert_eq!(
            reader.read,
            "char temp_arg_0[6];\nchar* arg_0 = temp_arg_0;\nfread(arg_0, 1, 6, h);\n"
        );
    }

    #[test]
    fn test_identifiers_never_repeat() {
        let config = Config::default();
        let mut arena = LayoutArena::new();
        let id = arena.create(16);
        arena.get_mut(id).insert(0, Segment::raw(8));
        arena.get_mut(id).insert(8, Segment::string(2, 8));

        let mut generator = Generator::new(&config);
        let first = generator.generate_argument_reader(&arena, &[id]);
        let second = generator.generate_argument_reader(&arena, &[id]);
        assert_eq!(first.arguments, vec!["arg_0".to_string()]);
        assert_eq!(second.arguments, vec!["arg_1".to_string()]);
        assert!(second.read.contains("allocation2"));
        assert!(!second.read.contains("allocation0 "));
    }
}
