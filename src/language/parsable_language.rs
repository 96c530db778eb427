use anyhow::Result;
use tree_sitter::{Node, Tree};

use crate::symbol_kind::SymbolKind;

/// Trait for a supported language.
pub trait ParsableLanguage {
    /// Parse a file as a `tree_sitter::Tree`.
    ///
    /// ## Parameters:
    /// * `source` (`&str`): Content of the file.
    ///
    /// ## Returns:
    /// * (`Result<tree_sitter::Tree>`): Given file parsed by tree-sitter. Fails if the file is
    ///   not syntactically valid.
    fn parse(&self, source: &str) -> Result<Tree>;

    /// Returns the node holding the name of a definition, with the kind of the definition.
    ///
    /// ## Parameters:
    /// * `node` (`&tree_sitter::Node`): Node to inspect.
    ///
    /// ## Returns:
    /// * (`Option<(tree_sitter::Node, &symbol_kind::SymbolKind)>`): None if the node does not
    ///   define a function or a class.
    fn get_name_node_of_symbol<'a>(&self, node: &Node<'a>)
        -> Option<(Node<'a>, &'static SymbolKind)>;

    /// Returns true iff the body of the node is a scope of its own, whose definitions can not
    /// be imported from outside.
    fn opens_scope(&self, node: &Node) -> bool;

    /// Module path of a file, as the list of its segments.
    ///
    /// ## Parameters:
    /// * `file_path` (`&str`): Forward slash separated path of the file.
    ///
    /// ## Returns:
    /// * (`Vec<String>`): Segments of the module the file defines.
    fn module_from_path(&self, file_path: &str) -> Vec<String>;
}
