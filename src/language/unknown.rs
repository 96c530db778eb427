use anyhow::{bail, Result};
use tree_sitter::{Node, Tree};

use crate::symbol_kind::SymbolKind;

use super::parsable_language::ParsableLanguage;

#[derive(Debug)]
pub struct UnknownLanguage {}

impl ParsableLanguage for UnknownLanguage {
    fn parse(&self, _source: &str) -> Result<Tree> {
        bail!("Unknown language")
    }

    fn get_name_node_of_symbol<'a>(
        &self,
        _node: &Node<'a>,
    ) -> Option<(Node<'a>, &'static SymbolKind)> {
        None
    }

    fn opens_scope(&self, _node: &Node) -> bool {
        false
    }

    fn module_from_path(&self, _file_path: &str) -> Vec<String> {
        Vec::new()
    }
}
