use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::{
    fs::Workspace,
    language::{get_language_for_file, parsable_language::ParsableLanguage},
    symbol::extract_symbols,
};

/// Map associating the name of a module level definition to the files defining it.
/// A name defined in several files (namespace collision) maps to all of them.
pub type DefinitionMap = BTreeMap<String, BTreeSet<String>>;

/// Merges `other` into `target`, uniting the sets of the keys present in both.
///
/// ## Parameters:
/// * `target` (`&mut BTreeMap<K, BTreeSet<V>>`): Map updated in place,
/// * `other` (`&BTreeMap<K, BTreeSet<V>>`): Map whose entries are added, left untouched.
pub fn merge_into<K, V>(target: &mut BTreeMap<K, BTreeSet<V>>, other: &BTreeMap<K, BTreeSet<V>>)
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    for (key, values) in other {
        match target.get_mut(key) {
            Some(existing) => existing.extend(values.iter().cloned()),
            None => {
                target.insert(key.clone(), values.clone());
            }
        }
    }
}

/// Definitions of a single file, from its content.
///
/// ## Parameters:
/// * `file` (`&str`): Path of the file, used as value of the map and to pick the language,
/// * `source` (`&str`): Content of the file.
///
/// ## Returns:
/// * (`Result<DefinitionMap>`): Every module level function and class name, mapped to `file`.
///   Fails if the file can not be parsed.
pub fn definitions_from_source(file: &str, source: &str) -> Result<DefinitionMap> {
    let language = get_language_for_file(file);
    let tree = language.parse(source)?;
    let mut definitions = DefinitionMap::new();
    for symbol in extract_symbols(&tree, file, source, &language) {
        debug!(%symbol, "found definition");
        definitions
            .entry(symbol.name)
            .or_default()
            .insert(symbol.file);
    }
    Ok(definitions)
}

pub fn parse_definitions_from_file(workspace: &Workspace, file: &str) -> Result<DefinitionMap> {
    let source = workspace.read_to_string(file)?;
    definitions_from_source(file, &source)
}

/// Definitions of a whole set of files.
/// Files that can not be read or parsed are reported and contribute nothing.
///
/// ## Parameters:
/// * `workspace` (`&Workspace`): Project the files belong to,
/// * `files` (`&[String]`): Paths of the files, relative to the project root.
///
/// ## Returns:
/// * (`DefinitionMap`): Union of the definitions of every file.
pub fn parse_definitions_from_codebase(workspace: &Workspace, files: &[String]) -> DefinitionMap {
    let mut definitions = DefinitionMap::new();
    for file in files {
        match parse_definitions_from_file(workspace, file) {
            Ok(file_definitions) => {
                debug!(file = %file, count = file_definitions.len(), "collected definitions");
                merge_into(&mut definitions, &file_definitions);
            }
            Err(error) => warn!(file = %file, "skipping definitions: {error:#}"),
        }
    }
    let collisions = definitions.values().filter(|files| files.len() > 1).count();
    info!(
        files = files.len(),
        names = definitions.len(),
        collisions,
        "built definition map"
    );
    definitions
}
