use anyhow::{bail, Result};
use std::collections::BTreeSet;
use tracing::debug;
use tree_sitter::Node;

use crate::{
    definition::DefinitionMap,
    fs::Workspace,
    language::{get_language_for_file, parsable_language::ParsableLanguage},
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// What an import statement brings into scope.
pub enum Imported {
    /// `import a.b`: the module itself.
    Module,
    /// `from a.b import name`: one definition of the module.
    Name(String),
    /// `from a.b import *`: every definition of the module.
    Wildcard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// One import of a python file.
///
/// ## Properties:
/// * `module` (`Vec<String>`): Absolute path of the imported module,
/// * `imported` (`Imported`): What is imported from the module.
pub struct Import {
    /// Absolute path of the imported module.
    pub module: Vec<String>,
    /// What is imported from the module.
    pub imported: Imported,
}

fn get_value_of_identifier(node: Node, source: &str) -> Result<String> {
    node.utf8_text(source.as_bytes())
        .map(|v| v.to_string())
        .or_else(|e| bail!(e))
}

//  dotted_name: $ => prec(1, sep1($.identifier, '.')),
fn process_dotted_name(node: Node, source: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    for child in node.named_children(&mut node.walk()) {
        segments.push(get_value_of_identifier(child, source)?);
    }
    Ok(segments)
}

//  aliased_import: $ => seq(
//    field('name', $.dotted_name),
//    'as',
//    field('alias', $.identifier),
//  ),
fn process_aliased_import(node: Node, source: &str) -> Result<Vec<String>> {
    let Some(name_node) = node.child_by_field_name("name") else {
        bail!("field name `name` not found for an aliased import")
    };
    process_dotted_name(name_node, source)
}

//  _import_list: $ => seq(
//    commaSep1(field('name', choice(
//      $.dotted_name,
//      $.aliased_import,
//    ))),
//    optional(','),
//  ),
fn process_import_list(node: Node, source: &str) -> Result<Vec<Vec<String>>> {
    let mut names = Vec::new();
    for name_node in node.children_by_field_name("name", &mut node.walk()) {
        let name = match name_node.kind() {
            "dotted_name" => process_dotted_name(name_node, source)?,
            "aliased_import" => process_aliased_import(name_node, source)?,
            _ => bail!("imported name has invalid kind {:?}", name_node.kind()),
        };
        names.push(name);
    }
    Ok(names)
}

//  relative_import: $ => seq(
//    $.import_prefix,
//    optional($.dotted_name),
//  ),
//
// Made absolute from the directory of the importing file. None if the file does not live in
// the package, or if the prefix climbs above it.
fn process_relative_import(
    node: Node,
    file: &str,
    source: &str,
    package: &str,
) -> Result<Option<Vec<String>>> {
    let mut level = 0;
    let mut relative = Vec::new();
    for child in node.named_children(&mut node.walk()) {
        match child.kind() {
            "import_prefix" => {
                level = get_value_of_identifier(child, source)?
                    .chars()
                    .filter(|c| *c == '.')
                    .count()
            }
            "dotted_name" => relative = process_dotted_name(child, source)?,
            _ => bail!("relative import has invalid child {:?}", child.kind()),
        }
    }
    let directory: Vec<&str> = match file.rsplit_once('/') {
        Some((directory, _)) => directory.split('/').collect(),
        None => Vec::new(),
    };
    let Some(start) = directory.iter().position(|segment| *segment == package) else {
        return Ok(None);
    };
    let mut module: Vec<String> = directory[start..].iter().map(|s| s.to_string()).collect();
    for _ in 1..level {
        if module.pop().is_none() {
            return Ok(None);
        }
    }
    if module.is_empty() {
        return Ok(None);
    }
    module.extend(relative);
    Ok(Some(module))
}

//  import_statement: $ => seq(
//    'import',
//    $._import_list,
//  ),
fn process_import_statement(node: Node, source: &str) -> Result<Vec<Import>> {
    Ok(process_import_list(node, source)?
        .into_iter()
        .map(|module| Import {
            module,
            imported: Imported::Module,
        })
        .collect())
}

//  import_from_statement: $ => seq(
//    'from',
//    field('module_name', choice(
//      $.relative_import,
//      $.dotted_name,
//    )),
//    'import',
//    choice(
//      $.wildcard_import,
//      $._import_list,
//      seq('(', $._import_list, ')'),
//    ),
//  ),
fn process_import_from_statement(
    node: Node,
    file: &str,
    source: &str,
    package: &str,
) -> Result<Vec<Import>> {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        bail!("field name `module_name` not found for an import from statement")
    };
    let module = match module_node.kind() {
        "dotted_name" => process_dotted_name(module_node, source)?,
        "relative_import" => match process_relative_import(module_node, file, source, package)? {
            Some(module) => module,
            None => return Ok(Vec::new()),
        },
        _ => bail!("module of an import from statement has invalid kind"),
    };
    let is_wildcard = node
        .named_children(&mut node.walk())
        .any(|child| child.kind() == "wildcard_import");
    if is_wildcard {
        return Ok(vec![Import {
            module,
            imported: Imported::Wildcard,
        }]);
    }
    Ok(process_import_list(node, source)?
        .into_iter()
        .filter_map(|mut name| name.pop())
        .map(|name| Import {
            module: module.clone(),
            imported: Imported::Name(name),
        })
        .collect())
}

/// Gets every import of a parsed file, including the ones nested in functions.
///
/// ## Parameters:
/// * `node` (`tree_sitter::Node`): Node to search, usually the root of the file,
/// * `file` (`&str`): Path of the file, needed to make relative imports absolute,
/// * `source` (`&str`): Content of the file,
/// * `package` (`&str`): Name of the package relative imports belong to,
/// * `imports` (`&mut Vec<Import>`): Found imports are appended there.
pub fn extract_imports(
    node: Node,
    file: &str,
    source: &str,
    package: &str,
    imports: &mut Vec<Import>,
) -> Result<()> {
    match node.kind() {
        "import_statement" => imports.extend(process_import_statement(node, source)?),
        "import_from_statement" => {
            imports.extend(process_import_from_statement(node, file, source, package)?)
        }
        _ => {
            for child in node.named_children(&mut node.walk()) {
                extract_imports(child, file, source, package, imports)?;
            }
        }
    }
    Ok(())
}

/// Length of the longest run of consecutive segments shared by a module path and the path of
/// a file.
///
/// ## Parameters:
/// * `module` (`&[String]`): Segments of the imported module,
/// * `candidate` (`&str`): Path of a file defining the imported name.
///
/// ## Returns:
/// * (`usize`): 0 if no segment is shared.
pub fn shared_segments(module: &[String], candidate: &str) -> usize {
    let candidate = get_language_for_file(candidate).module_from_path(candidate);
    let mut longest = 0;
    let mut previous = vec![0; candidate.len() + 1];
    for segment in module {
        let mut current = vec![0; candidate.len() + 1];
        for (index, other) in candidate.iter().enumerate() {
            if segment == other {
                current[index + 1] = previous[index] + 1;
                longest = longest.max(current[index + 1]);
            }
        }
        previous = current;
    }
    longest
}

fn resolve_name(name: &str, module: &[String], definitions: &DefinitionMap) -> BTreeSet<String> {
    let Some(candidates) = definitions.get(name) else {
        return BTreeSet::new();
    };
    if candidates.len() <= 1 {
        return candidates.clone();
    }
    let scored: Vec<(usize, &String)> = candidates
        .iter()
        .map(|candidate| (shared_segments(module, candidate), candidate))
        .collect();
    let best = scored.iter().map(|(score, _)| *score).max().unwrap_or(0);
    let kept: BTreeSet<String> = scored
        .into_iter()
        .filter(|(score, _)| *score == best)
        .map(|(_, candidate)| candidate.clone())
        .collect();
    debug!(symbol = name, module = %module.join("."), ?kept, "namespace collision");
    kept
}

/// Module path of a file as the package sees it, e.g. `src/pkg/util.py` gives `pkg.util`.
/// `None` if the file is not inside the package.
fn package_module(file: &str, package: &str) -> Option<Vec<String>> {
    let mut module = get_language_for_file(file).module_from_path(file);
    let start = module.iter().position(|segment| segment == package)?;
    module.drain(..start);
    Some(module)
}

fn resolve_module(module: &[String], package: &str, importable: &[String]) -> BTreeSet<String> {
    importable
        .iter()
        .filter(|file| package_module(file, package).as_deref() == Some(module))
        .cloned()
        .collect()
}

/// Files a python file depends on, through its imports of the package.
/// Imports of the standard library or of third party packages are ignored.
///
/// ## Parameters:
/// * `file` (`&str`): Path of the file,
/// * `source` (`&str`): Content of the file,
/// * `package` (`&str`): Name of the package whose imports are followed,
/// * `definitions` (`&DefinitionMap`): Definitions of every file that can be imported,
/// * `importable` (`&[String]`): Every file that can be imported as a module, including the
///   ones defining nothing.
///
/// ## Returns:
/// * (`Result<BTreeSet<String>>`): Files defining what the file imports, never the file itself.
///   Fails if the file can not be parsed.
pub fn resolve_imports(
    file: &str,
    source: &str,
    package: &str,
    definitions: &DefinitionMap,
    importable: &[String],
) -> Result<BTreeSet<String>> {
    let language = get_language_for_file(file);
    let tree = language.parse(source)?;
    let mut imports = Vec::new();
    extract_imports(tree.root_node(), file, source, package, &mut imports)?;

    let mut dependencies = BTreeSet::new();
    for import in imports
        .iter()
        .filter(|import| import.module.first().map(String::as_str) == Some(package))
    {
        match &import.imported {
            Imported::Name(name) => {
                dependencies.extend(resolve_name(name, &import.module, definitions))
            }
            Imported::Module | Imported::Wildcard => {
                dependencies.extend(resolve_module(&import.module, package, importable))
            }
        }
    }
    dependencies.remove(file);
    Ok(dependencies)
}

pub fn parse_imports_from_file(
    workspace: &Workspace,
    file: &str,
    package: &str,
    definitions: &DefinitionMap,
    importable: &[String],
) -> Result<BTreeSet<String>> {
    let source = workspace.read_to_string(file)?;
    resolve_imports(file, &source, package, definitions, importable)
}
