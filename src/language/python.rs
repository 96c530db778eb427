use crate::symbol_kind::SymbolKind;

use super::parsable_language::ParsableLanguage;
use anyhow::{anyhow, bail, Result};
use tree_sitter::{Node, Parser, Tree};
use tree_sitter_python::LANGUAGE as python_language;

#[derive(Debug)]
pub struct PythonLanguage {}

impl ParsableLanguage for PythonLanguage {
    fn parse(&self, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser.set_language(&python_language.into())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("Parse failed"))?;
        let root = tree.root_node();
        if root.has_error() {
            let position = first_error(root)
                .map(|node| node.start_position())
                .unwrap_or_else(|| root.start_position());
            bail!(
                "invalid syntax at line {}, column {}",
                position.row + 1,
                position.column + 1
            );
        }
        Ok(tree)
    }

    fn get_name_node_of_symbol<'a>(
        &self,
        node: &Node<'a>,
    ) -> Option<(Node<'a>, &'static SymbolKind)> {
        let kind = match node.kind() {
            "function_definition" => &SymbolKind::Function,
            "class_definition" => &SymbolKind::Class,
            _ => return None,
        };
        node.child_by_field_name("name")
            .map(|name_node| (name_node, kind))
    }

    fn opens_scope(&self, node: &Node) -> bool {
        matches!(node.kind(), "function_definition" | "class_definition")
    }

    fn module_from_path(&self, file_path: &str) -> Vec<String> {
        let without_extension = file_path.strip_suffix(".py").unwrap_or(file_path);
        let mut segments: Vec<String> = without_extension
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .map(|segment| segment.to_string())
            .collect();
        if segments.last().map(String::as_str) == Some("__init__") {
            segments.pop();
        }
        segments
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_path_drops_extension_and_package_marker() {
        let language = PythonLanguage {};
        assert_eq!(
            language.module_from_path("pkg/core/util.py"),
            vec!["pkg", "core", "util"]
        );
        assert_eq!(
            language.module_from_path("pkg/core/__init__.py"),
            vec!["pkg", "core"]
        );
        assert_eq!(language.module_from_path("./pkg/a.py"), vec!["pkg", "a"]);
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let language = PythonLanguage {};
        let error = language.parse("def broken(:\n    pass\n").unwrap_err();
        assert!(error.to_string().contains("invalid syntax"));
    }

    #[test]
    fn async_functions_are_function_definitions() {
        let language = PythonLanguage {};
        let source = "async def fetch():\n    pass\n";
        let tree = language.parse(source).unwrap();
        let root = tree.root_node();
        let definition = root.named_child(0).unwrap();
        let (name, kind) = language.get_name_node_of_symbol(&definition).unwrap();
        assert_eq!(name.utf8_text(source.as_bytes()).unwrap(), "fetch");
        assert_eq!(*kind, SymbolKind::Function);
    }
}
