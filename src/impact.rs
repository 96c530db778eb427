use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::graph::DependencyGraph;

/// Depth used when none is configured.
pub const DEFAULT_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Options of the test selection.
///
/// ## Properties:
/// * `depth` (`usize`): Maximum number of reverse dependency hops from a changed file,
/// * `ignore_paths` (`Vec<String>`): Tests starting with any of these prefixes are dropped,
/// * `filter` (`Option<String>`): If set, only tests starting with this prefix are kept.
pub struct SelectionConfig {
    /// Maximum number of reverse dependency hops from a changed file.
    pub depth: usize,
    /// Tests starting with any of these prefixes are dropped.
    pub ignore_paths: Vec<String>,
    /// If set, only tests starting with this prefix are kept.
    pub filter: Option<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            ignore_paths: Vec::new(),
            filter: None,
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.replace('\\', "/");
    let mut prefix = prefix.as_str();
    while let Some(rest) = prefix.strip_prefix("./") {
        prefix = rest;
    }
    prefix.to_string()
}

fn reverse_edges<'a>(graphs: &[&'a DependencyGraph]) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
    let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for graph in graphs {
        for (file, dependencies) in graph.iter() {
            for dependency in dependencies {
                dependents
                    .entry(dependency.as_str())
                    .or_default()
                    .insert(file.as_str());
            }
        }
    }
    dependents
}

/// Determines which tests to run for the given changes.
///
/// Files depending on a changed source file are found by walking the dependency graphs
/// backwards, at most `config.depth` hops away. The tests among them are returned along with
/// the changed tests, once filtered.
///
/// ## Parameters:
/// * `changed_source_files` (`&[String]`): Source files that changed,
/// * `changed_test_files` (`&[String]`): Test files that changed, always selected,
/// * `source_graph` (`&DependencyGraph`): Dependencies between source files,
/// * `tests_graph` (`&DependencyGraph`): Dependencies of test files, its keys are every known test,
/// * `config` (`&SelectionConfig`): Depth and path filters.
///
/// ## Returns:
/// * (`Vec<String>`): Sorted tests to run, without duplicates. Empty when nothing changed.
pub fn determine_tests_to_run(
    changed_source_files: &[String],
    changed_test_files: &[String],
    source_graph: &DependencyGraph,
    tests_graph: &DependencyGraph,
    config: &SelectionConfig,
) -> Vec<String> {
    let dependents = reverse_edges(&[source_graph, tests_graph]);

    let mut affected: BTreeSet<&str> = changed_source_files
        .iter()
        .chain(changed_test_files)
        .map(String::as_str)
        .collect();
    let mut frontier: BTreeSet<&str> = changed_source_files.iter().map(String::as_str).collect();
    for hop in 1..=config.depth {
        let mut next = BTreeSet::new();
        for file in &frontier {
            for dependent in dependents.get(file).into_iter().flatten() {
                if affected.insert(*dependent) {
                    next.insert(*dependent);
                }
            }
        }
        debug!(hop, added = next.len(), "expanded frontier");
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    let changed_tests: BTreeSet<&str> = changed_test_files.iter().map(String::as_str).collect();
    let ignore_paths: Vec<String> = config
        .ignore_paths
        .iter()
        .map(|prefix| normalize_prefix(prefix))
        .collect();
    let filter = config.filter.as_deref().map(normalize_prefix);

    let tests: Vec<String> = affected
        .into_iter()
        .filter(|file| tests_graph.contains_key(*file) || changed_tests.contains(file))
        .filter(|file| !ignore_paths.iter().any(|prefix| file.starts_with(prefix.as_str())))
        .filter(|file| {
            filter
                .as_deref()
                .map(|prefix| file.starts_with(prefix))
                .unwrap_or(true)
        })
        .map(|file| file.to_string())
        .collect();
    info!(
        changed_source = changed_source_files.len(),
        changed_tests = changed_test_files.len(),
        selected = tests.len(),
        "selected tests"
    );
    tests
}
