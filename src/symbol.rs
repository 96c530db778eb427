use std::fmt::{Display, Formatter};
use tree_sitter::{Node, Tree};

use crate::{
    language::{parsable_language::ParsableLanguage, Languages},
    symbol_kind::SymbolKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Definition extracted from a source file.
///
/// ## Properties:
/// * `name` (`String`): Declared name of the definition,
/// * `line` (`usize`): Line number where the definition is named,
/// * `file` (`String`): Path of the file declaring the definition,
/// * `kind` (`symbol_kind::SymbolKind`): Kind of definition (eg. class).
pub struct Symbol {
    /// Declared name of the definition.
    pub name: String,
    /// Line number where the definition is named.
    pub line: usize,
    /// Path of the file declaring the definition.
    pub file: String,
    /// Kind of definition (eg. class).
    pub kind: SymbolKind,
}

impl Display for Symbol {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} {} ({}:{})",
            self.kind, self.name, self.file, self.line,
        )
    }
}

fn walk_tree(
    node: Node,
    file: &str,
    source: &str,
    symbols: &mut Vec<Symbol>,
    language: &Languages,
) {
    if let Some((name_node, kind)) = language.get_name_node_of_symbol(&node) {
        let name = name_node
            .utf8_text(source.as_bytes())
            .unwrap_or("<unknown>")
            .to_string();
        symbols.push(Symbol {
            name,
            line: name_node.start_position().row + 1,
            file: file.to_string(),
            kind: *kind,
        });
    }
    if language.opens_scope(&node) {
        return;
    }
    for child in node.named_children(&mut node.walk()) {
        walk_tree(child, file, source, symbols, language);
    }
}

/// Gets the definitions of a parsed file that can be imported by other files.
/// Methods, inner functions and nested classes are left out, but definitions inside
/// module level `if`, `try` or `with` blocks are kept.
///
/// ## Parameters:
/// * `tree` (`&tree_sitter::Tree`): File parsed with tree_sitter,
/// * `file` (`&str`): Path of the file,
/// * `source` (`&str`): Content of the file,
/// * `language` (`language::Languages`): Language of the current file.
///
/// ## Returns:
/// * (`Vec<Symbol>`): Module level definitions, in source order.
pub fn extract_symbols(tree: &Tree, file: &str, source: &str, language: &Languages) -> Vec<Symbol> {
    let cursor = tree.walk();
    let mut symbols = Vec::new();
    walk_tree(cursor.node(), file, source, &mut symbols, language);
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::get_language_for_file;

    fn symbols_of(source: &str) -> Vec<Symbol> {
        let language = get_language_for_file("pkg/foo.py");
        let tree = language.parse(source).unwrap();
        extract_symbols(&tree, "pkg/foo.py", source, &language)
    }

    fn names(symbols: &[Symbol]) -> Vec<&str> {
        symbols.iter().map(|symbol| symbol.name.as_str()).collect()
    }

    #[test]
    fn collects_function_definitions() {
        let symbols = symbols_of(
            r#"
def my_first_func():
    pass

def my_second_func():
    pass
"#,
        );
        assert_eq!(names(&symbols), vec!["my_first_func", "my_second_func"]);
        assert!(symbols
            .iter()
            .all(|symbol| symbol.kind == SymbolKind::Function));
        assert_eq!(symbols[0].line, 2);
        assert_eq!(symbols[0].file, "pkg/foo.py");
    }

    #[test]
    fn collects_class_definitions_but_not_methods() {
        let symbols = symbols_of(
            r#"
class Bar:
    pass

class Baz:
    def __init__(self, a: int, b: int):
        self.a = a
        self.b = b

    class Inner:
        pass
"#,
        );
        assert_eq!(names(&symbols), vec!["Bar", "Baz"]);
        assert!(symbols.iter().all(|symbol| symbol.kind == SymbolKind::Class));
    }

    #[test]
    fn skips_closures_and_keeps_decorated_and_conditional_definitions() {
        let symbols = symbols_of(
            r#"
import functools

def outer():
    def inner():
        pass
    return inner

@functools.lru_cache()
def cached():
    pass

try:
    from fast import speedup
except ImportError:
    def speedup():
        pass

if True:
    class Conditional:
        pass

handler = lambda event: event
"#,
        );
        assert_eq!(
            names(&symbols),
            vec!["outer", "cached", "speedup", "Conditional"]
        );
    }

    #[test]
    fn symbols_display_their_kind_and_location() {
        let symbols = symbols_of("def helper():\n    pass\n\n\nclass Model:\n    pass\n");
        assert_eq!(symbols[0].to_string(), "function helper (pkg/foo.py:1)");
        assert_eq!(symbols[1].to_string(), "class Model (pkg/foo.py:5)");
    }

    #[test]
    fn extraction_is_a_function_of_content() {
        let source = "class A:\n    pass\n\ndef b():\n    pass\n";
        assert_eq!(symbols_of(source), symbols_of(source));
    }
}
