use anyhow::Result;
use python::PythonLanguage;
use tree_sitter::{Node, Tree};
use unknown::UnknownLanguage;

use crate::symbol_kind::SymbolKind;

pub mod parsable_language;
mod python;
mod unknown;

use parsable_language::ParsableLanguage;

#[derive(Debug)]
pub enum Languages {
    Python(PythonLanguage),
    Unknown(UnknownLanguage),
}

impl ParsableLanguage for Languages {
    fn parse(&self, source: &str) -> Result<Tree> {
        match &self {
            Languages::Python(language) => language.parse(source),
            Languages::Unknown(language) => language.parse(source),
        }
    }

    fn get_name_node_of_symbol<'a>(
        &self,
        node: &Node<'a>,
    ) -> Option<(Node<'a>, &'static SymbolKind)> {
        match &self {
            Languages::Python(language) => language.get_name_node_of_symbol(node),
            Languages::Unknown(language) => language.get_name_node_of_symbol(node),
        }
    }

    fn opens_scope(&self, node: &Node) -> bool {
        match &self {
            Languages::Python(language) => language.opens_scope(node),
            Languages::Unknown(language) => language.opens_scope(node),
        }
    }

    fn module_from_path(&self, file_path: &str) -> Vec<String> {
        match &self {
            Languages::Python(language) => language.module_from_path(file_path),
            Languages::Unknown(language) => language.module_from_path(file_path),
        }
    }
}

pub fn get_language_for_file(name: &str) -> Languages {
    match name.rsplit_once('.') {
        Some((_, "py")) => Languages::Python(PythonLanguage {}),
        _ => Languages::Unknown(UnknownLanguage {}),
    }
}
