use anyhow::{anyhow, Result};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};
use tracing::{debug, info, warn};

use crate::{
    definition::{merge_into, parse_definitions_from_codebase, DefinitionMap},
    fs::{retrieve_all_source_files, retrieve_all_test_files, Workspace},
    import::parse_imports_from_file,
};

/// Map associating a file to the files it directly depends on.
/// Every assembled file is a key, with an empty set when it has no internal import.
pub type DependencyGraph = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Serialize)]
/// Both dependency graphs of a project, as printed by `graph --json`.
pub struct DependencyGraphs<'a> {
    pub source: &'a DependencyGraph,
    pub tests: &'a DependencyGraph,
}

/// Builds the dependency graph of a set of files.
///
/// ## Parameters:
/// * `workspace` (`&Workspace`): Project the files belong to,
/// * `files` (`&[String]`): Files to put in the graph,
/// * `package` (`&str`): Name of the package whose imports are followed,
/// * `definitions` (`&DefinitionMap`): Definitions of every file the given ones may import,
///   including files that are not part of the graph,
/// * `importable` (`&[String]`): Every file the given ones may import as a module.
///
/// ## Returns:
/// * (`DependencyGraph`): One entry per file. Files that fail to parse have no dependency.
pub fn parse_imports_from_codebase(
    workspace: &Workspace,
    files: &[String],
    package: &str,
    definitions: &DefinitionMap,
    importable: &[String],
) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for file in files {
        let dependencies =
            match parse_imports_from_file(workspace, file, package, definitions, importable) {
                Ok(dependencies) => dependencies,
                Err(error) => {
                    warn!(file = %file, "skipping imports: {error:#}");
                    BTreeSet::new()
                }
            };
        debug!(file = %file, ?dependencies, "resolved imports");
        graph.insert(file.clone(), dependencies);
    }
    let edges: usize = graph.values().map(BTreeSet::len).sum();
    info!(files = graph.len(), edges, "built dependency graph");
    graph
}

/// Name of the package imports are followed for: the name of the source directory.
pub fn package_name(workspace: &Workspace, source: &Path) -> Result<String> {
    let directory = workspace.directory(source)?;
    directory
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| anyhow!("can not derive a package name from {source:?}"))
}

/// Builds the source and tests dependency graphs of a project.
/// Source files are resolved against source definitions only. Tests are resolved against
/// both source and test definitions since they mostly import source code.
///
/// ## Parameters:
/// * `workspace` (`&Workspace`): Project to analyze,
/// * `source` (`&std::path::Path`): Source directory, relative to the project root,
/// * `tests` (`Option<&std::path::Path>`): Tests directory, if the project has one.
///
/// ## Returns:
/// * (`Result<(DependencyGraph, DependencyGraph)>`): Source graph and tests graph. Fails if a
///   directory does not exist.
pub fn get_dependency_graphs(
    workspace: &Workspace,
    source: &Path,
    tests: Option<&Path>,
) -> Result<(DependencyGraph, DependencyGraph)> {
    let package = package_name(workspace, source)?;
    let source_files = retrieve_all_source_files(workspace, source)?;
    let test_files = retrieve_all_test_files(workspace, source, tests)?;
    info!(
        package = %package,
        source_files = source_files.len(),
        test_files = test_files.len(),
        "gathered files"
    );

    let source_definitions = parse_definitions_from_codebase(workspace, &source_files);
    let mut all_definitions = source_definitions.clone();
    merge_into(
        &mut all_definitions,
        &parse_definitions_from_codebase(workspace, &test_files),
    );

    let all_files: Vec<String> = source_files.iter().chain(&test_files).cloned().collect();

    let source_graph = parse_imports_from_codebase(
        workspace,
        &source_files,
        &package,
        &source_definitions,
        &source_files,
    );
    let tests_graph = parse_imports_from_codebase(
        workspace,
        &test_files,
        &package,
        &all_definitions,
        &all_files,
    );
    Ok((source_graph, tests_graph))
}

/// Formats dependency graphs for humans.
///
/// ## Parameters:
/// * `graphs` (`&[(&str, &DependencyGraph)]`): Title and content of each graph.
///
/// ## Returns:
/// * (`String`): Each title underlined, then every file with its dependencies below it.
pub fn prettify_graphs(graphs: &[(&str, &DependencyGraph)]) -> String {
    let mut sections = Vec::new();
    for (title, graph) in graphs {
        let mut lines = vec![title.to_string(), "=".repeat(title.len())];
        for (file, dependencies) in graph.iter() {
            lines.push(file.clone());
            lines.extend(dependencies.iter().map(|dependency| format!("  -> {dependency}")));
        }
        if graph.is_empty() {
            lines.push("(empty)".to_string());
        }
        sections.push(lines.join("\n"));
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fs::tests::project,
        impact::{determine_tests_to_run, SelectionConfig},
    };

    fn sample_project() -> (tempfile::TempDir, Workspace) {
        project(&[
            ("my_package/__init__.py", ""),
            (
                "my_package/core/my_class.py",
                "from my_package.util.file import my_first_func\n\nclass MyClass:\n    pass\n",
            ),
            (
                "my_package/core/util.py",
                "def my_second_func():\n    pass\n\ndef my_third_func():\n    pass\n",
            ),
            ("my_package/util/file.py", "import os\n\ndef my_first_func():\n    pass\n"),
            (
                "my_package/broken.py",
                "from my_package.core import MyClass\ndef oops(:\n",
            ),
            (
                "tests/conftest.py",
                "def fixture_helper():\n    pass\n",
            ),
            (
                "tests/test_foo.py",
                r#"
import copy
import datetime

from my_package.core.my_class import MyClass
from my_package.util.file import my_first_func
from tests.conftest import fixture_helper
"#,
            ),
            (
                "tests/test_bar.py",
                r#"
import pandas as pd

from my_package.core.my_class import MyClass
from my_package.core.util import my_second_func, my_third_func
"#,
            ),
        ])
    }

    fn set<const N: usize>(values: [&str; N]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn codebase_graph_has_one_entry_per_file() {
        let (_dir, workspace) = sample_project();
        let definitions = DefinitionMap::from([
            ("my_first_func".to_string(), set(["my_package/util/file.py"])),
            ("MyClass".to_string(), set(["my_package/core/my_class.py"])),
            ("my_second_func".to_string(), set(["my_package/core/util.py"])),
            ("my_third_func".to_string(), set(["my_package/core/util.py"])),
        ]);
        let graph = parse_imports_from_codebase(
            &workspace,
            &["tests/test_foo.py".to_string(), "tests/test_bar.py".to_string()],
            "my_package",
            &definitions,
            &[],
        );
        assert_eq!(graph.len(), 2);
        assert_eq!(
            graph["tests/test_foo.py"],
            set(["my_package/core/my_class.py", "my_package/util/file.py"])
        );
        assert_eq!(
            graph["tests/test_bar.py"],
            set(["my_package/core/my_class.py", "my_package/core/util.py"])
        );
    }

    #[test]
    fn builds_source_and_tests_graphs() {
        let (_dir, workspace) = sample_project();
        let (source_graph, tests_graph) =
            get_dependency_graphs(&workspace, Path::new("my_package"), Some(Path::new("tests")))
                .unwrap();

        assert_eq!(
            source_graph,
            DependencyGraph::from([
                ("my_package/__init__.py".to_string(), BTreeSet::new()),
                ("my_package/broken.py".to_string(), BTreeSet::new()),
                (
                    "my_package/core/my_class.py".to_string(),
                    set(["my_package/util/file.py"])
                ),
                ("my_package/core/util.py".to_string(), BTreeSet::new()),
                ("my_package/util/file.py".to_string(), BTreeSet::new()),
            ])
        );
        assert_eq!(
            tests_graph.keys().collect::<Vec<_>>(),
            vec!["tests/conftest.py", "tests/test_bar.py", "tests/test_foo.py"]
        );
        assert_eq!(
            tests_graph["tests/test_foo.py"],
            set(["my_package/core/my_class.py", "my_package/util/file.py"])
        );
    }

    #[test]
    fn module_imports_resolve_inside_a_nested_package() {
        let (_dir, workspace) = project(&[
            ("src/pkg/util.py", "def helper():\n    pass\n"),
            ("src/pkg/constants.py", "LIMIT = 3\n"),
            ("src/pkg/models/__init__.py", "class Model:\n    pass\n"),
            ("tests/test_util.py", "import pkg.util\n"),
            ("tests/test_models.py", "from pkg.models import *\n"),
            ("tests/test_constants.py", "import pkg.constants\n"),
        ]);
        let (_source_graph, tests_graph) =
            get_dependency_graphs(&workspace, Path::new("src/pkg"), Some(Path::new("tests")))
                .unwrap();

        assert_eq!(tests_graph["tests/test_util.py"], set(["src/pkg/util.py"]));
        assert_eq!(
            tests_graph["tests/test_models.py"],
            set(["src/pkg/models/__init__.py"])
        );
        assert_eq!(
            tests_graph["tests/test_constants.py"],
            set(["src/pkg/constants.py"])
        );
    }

    #[test]
    fn whole_selection_is_idempotent() {
        let (_dir, workspace) = sample_project();
        let changed = vec!["my_package/util/file.py".to_string()];
        let select = || {
            let (source_graph, tests_graph) = get_dependency_graphs(
                &workspace,
                Path::new("my_package"),
                Some(Path::new("tests")),
            )
            .unwrap();
            determine_tests_to_run(
                &changed,
                &[],
                &source_graph,
                &tests_graph,
                &SelectionConfig::default(),
            )
        };

        let first = select();
        assert_eq!(first, vec!["tests/test_bar.py", "tests/test_foo.py"]);
        assert_eq!(first, select());
    }

    #[test]
    fn missing_tests_directory_is_fatal() {
        let (_dir, workspace) = sample_project();
        assert!(
            get_dependency_graphs(&workspace, Path::new("my_package"), Some(Path::new("nope")))
                .is_err()
        );
    }

    #[test]
    fn package_is_named_after_the_source_directory() {
        let (_dir, workspace) = project(&[("src/my_package/a.py", "")]);
        assert_eq!(
            package_name(&workspace, Path::new("src/my_package")).unwrap(),
            "my_package"
        );
    }

    #[test]
    fn prettified_graphs_list_files_and_dependencies() {
        let source = DependencyGraph::from([
            ("pkg/a.py".to_string(), set(["pkg/b.py"])),
            ("pkg/b.py".to_string(), BTreeSet::new()),
        ]);
        let tests = DependencyGraph::new();
        assert_eq!(
            prettify_graphs(&[("Source", &source), ("Tests", &tests)]),
            "Source\n======\npkg/a.py\n  -> pkg/b.py\npkg/b.py\n\nTests\n=====\n(empty)"
        );
    }

    #[test]
    fn graphs_serialize_as_json_objects() {
        let source = DependencyGraph::from([("pkg/a.py".to_string(), set(["pkg/b.py"]))]);
        let tests = DependencyGraph::new();
        let json = serde_json::to_value(DependencyGraphs {
            source: &source,
            tests: &tests,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"source": {"pkg/a.py": ["pkg/b.py"]}, "tests": {}})
        );
    }
}
