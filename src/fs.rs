use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Stem of the pytest file holding shared fixtures.
const FIXTURE_CONFIG_STEM: &str = "conftest";
/// Prefix of the stem of every test module.
const TEST_PREFIX: &str = "test_";

#[derive(Debug, Clone)]
/// Project every file path is relative to.
///
/// ## Properties:
/// * `root` (`std::path::PathBuf`): Canonical path of the project root.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Opens the project rooted at the given directory.
    ///
    /// ## Parameters:
    /// * `root` (`&std::path::Path`): Path to the project, absolute or relative to the current
    ///   directory.
    ///
    /// ## Returns:
    /// * (`Result<Workspace>`): Fails if the directory does not exist.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("project root {root:?} is not a directory");
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("can not resolve project root {root:?}"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a directory given relative to the project root.
    ///
    /// ## Returns:
    /// * (`Result<std::path::PathBuf>`): Canonical path of the directory. Fails if it does not
    ///   exist or is not a directory.
    pub fn directory(&self, directory: &Path) -> Result<PathBuf> {
        let path = self.root.join(directory);
        if !path.is_dir() {
            bail!("directory {directory:?} does not exist in {:?}", self.root);
        }
        path.canonicalize()
            .with_context(|| format!("can not resolve directory {directory:?}"))
    }

    /// Path of a file relative to the project root, with forward slashes.
    /// Returns None for files outside of the project.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<&str> = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(segments.join("/"))
    }

    pub fn absolute(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn read_to_string(&self, file: &str) -> Result<String> {
        std::fs::read_to_string(self.absolute(file)).with_context(|| format!("can not read {file}"))
    }
}

/// Returns true iff the file is a test module or a fixture configuration file.
///
/// ## Parameters:
/// * `file` (`&str`): Path of the file.
///
/// ## Returns:
/// * (`bool`): true iff the stem is `conftest` or starts with `test_`.
pub fn is_test_file(file: &str) -> bool {
    let stem = Path::new(file)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    stem == FIXTURE_CONFIG_STEM || stem.starts_with(TEST_PREFIX)
}

fn is_existing_py_file(workspace: &Workspace, file: &str) -> bool {
    let path = workspace.absolute(file);
    path.is_file() && path.extension().map(|ext| ext == "py").unwrap_or(false)
}

/// Keeps the existing python files that are not tests, sorted and without duplicates.
pub fn filter_source_files(workspace: &Workspace, files: &[String]) -> Vec<String> {
    let mut source_files: Vec<String> = files
        .iter()
        .filter(|file| is_existing_py_file(workspace, file) && !is_test_file(file))
        .cloned()
        .collect();
    source_files.sort();
    source_files.dedup();
    source_files
}

/// Keeps the existing python files that are tests, sorted and without duplicates.
pub fn filter_test_files(workspace: &Workspace, files: &[String]) -> Vec<String> {
    let mut test_files: Vec<String> = files
        .iter()
        .filter(|file| is_existing_py_file(workspace, file) && is_test_file(file))
        .cloned()
        .collect();
    test_files.sort();
    test_files.dedup();
    test_files
}

fn retrieve_all_py_files(workspace: &Workspace, directory: &Path) -> Result<Vec<String>> {
    let directory = workspace.directory(directory)?;
    Ok(WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "py").unwrap_or(false))
        .filter_map(|entry| workspace.relative(entry.path()))
        .collect())
}

/// Gathers every source file of the project.
///
/// ## Parameters:
/// * `workspace` (`&Workspace`): Project to search,
/// * `source` (`&std::path::Path`): Source directory, relative to the project root.
///
/// ## Returns:
/// * (`Result<Vec<String>>`): Sorted python files of the source directory that are not tests.
pub fn retrieve_all_source_files(workspace: &Workspace, source: &Path) -> Result<Vec<String>> {
    let all_files = retrieve_all_py_files(workspace, source)?;
    Ok(filter_source_files(workspace, &all_files))
}

/// Gathers every test file of the project.
/// Tests may live alongside the source code, so the source directory is searched as well as
/// the optional tests directory.
///
/// ## Parameters:
/// * `workspace` (`&Workspace`): Project to search,
/// * `source` (`&std::path::Path`): Source directory, relative to the project root,
/// * `tests` (`Option<&std::path::Path>`): Tests directory, if the project has one.
///
/// ## Returns:
/// * (`Result<Vec<String>>`): Sorted test files found in both directories.
pub fn retrieve_all_test_files(
    workspace: &Workspace,
    source: &Path,
    tests: Option<&Path>,
) -> Result<Vec<String>> {
    let mut all_files = retrieve_all_py_files(workspace, source)?;
    if let Some(tests) = tests {
        all_files.extend(retrieve_all_py_files(workspace, tests)?);
    }
    Ok(filter_test_files(workspace, &all_files))
}
