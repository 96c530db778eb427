use std::fmt::{Display, Formatter};

/// Kind of a definition that can be the target of an import.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SymbolKind {
    Function,
    Class,
}

impl Display for SymbolKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Function => write!(formatter, "function"),
            SymbolKind::Class => write!(formatter, "class"),
        }
    }
}
