// Tue Jan 20 2026 - Alex

use crate::codegen::{ArgumentReader, Generator};
use crate::config::Config;
use crate::structure::render::DeclarationRenderer;
use crate::structure::{LayoutArena, LayoutId};
use std::collections::HashMap;

const DEFAULT_PROGRAM: &str = "#include <stdint.h>
#include <stdio.h>
#include <stdlib.h>

{{declarations}}
int main(int argc, char** argv) {
    if (argc < 2) {
        return 1;
    }
    FILE* {{stream}} = fopen(argv[1], \"rb\");
    if (!{{stream}}) {
        return 1;
    }

{{read}}
    {{call}};

{{release}}
    fclose({{stream}});
    return 0;
}
";

/// Wraps generated reader code into a complete C program that reads one
/// record set from the file named by `argv[1]` and calls the target.
pub struct ProgramTemplate {
    template: String,
    call: String,
    variables: HashMap<String, String>,
}

impl ProgramTemplate {
    pub fn new(call: &str) -> Self {
        Self {
            template: DEFAULT_PROGRAM.to_string(),
            call: call.to_string(),
            variables: HashMap::new(),
        }
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.template = template.to_string();
        self
    }

    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    /// Renders declarations for `arguments`, generates their reader and fills
    /// in the template.
    pub fn build(&mut self, arena: &mut LayoutArena, arguments: &[LayoutId], config: &Config) -> String {
        let renderer = DeclarationRenderer::new(config);
        let mut declarations = String::new();
        for &id in arguments {
            let text = renderer.render(arena, id);
            if !text.is_empty() {
                declarations.push_str(&text);
                declarations.push_str("\n\n");
            }
        }

        let reader = Generator::new(config).generate_argument_reader(arena, arguments);
        self.fill(&declarations, &reader, config)
    }

    pub fn fill(&mut self, declarations: &str, reader: &ArgumentReader, config: &Config) -> String {
        self.set_variable("declarations", declarations);
        self.set_variable("stream", &config.stream_name);
        self.set_variable("read", &indent(&reader.read));
        self.set_variable("release", &indent(&reader.release));
        self.set_variable("call", &reader.splice(&self.call));
        self.render()
    }

    fn render(&self) -> String {
        let mut result = self.template.clone();
        for (name, value) in &self.variables {
            result = result.replace(&format!("{{{{{}}}}}", name), value);
        }
        result
    }
}

fn indent(code: &str) -> String {
    code.lines()
        .map(|line| format!("    {}\n", line))
        .collect()
}
