use anyhow::{anyhow, Context, Result};
use git2::{DiffOptions, Repository, Tree};
use std::path::PathBuf;
use tracing::debug;

use crate::fs::{filter_source_files, filter_test_files, Workspace};

fn changed_paths(repo: &Repository, tree: &Tree) -> Result<Vec<PathBuf>> {
    let diff =
        repo.diff_tree_to_workdir_with_index(Some(tree), Some(&mut DiffOptions::new()))?;
    let mut paths = Vec::new();
    diff.foreach(
        &mut |delta, _progress| {
            if let Some(path) = delta.new_file().path() {
                paths.push(path.to_path_buf());
            }
            true
        },
        None,
        None,
        None,
    )?;
    Ok(paths)
}

/// Returns the python files that changed in the git repository containing the workspace.
///
/// Collects the staged and unstaged changes compared to `HEAD`, then, if a branch is given,
/// the changes of the working tree compared to that branch.
///
/// ## Parameters:
/// * `workspace` (`&Workspace`): Project whose changes are looked for,
/// * `branch` (`Option<&str>`): Branch, tag or commit to compare the working tree to.
///
/// ## Returns:
/// * (`anyhow::Result<(Vec<String>, Vec<String>)>`): Changed source files and changed test
///   files, relative to the workspace root. Only existing python files of the workspace are kept.
pub fn get_changed_files(
    workspace: &Workspace,
    branch: Option<&str>,
) -> Result<(Vec<String>, Vec<String>)> {
    let repo = Repository::discover(workspace.root())
        .with_context(|| format!("no git repository found at {:?}", workspace.root()))?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| anyhow!("repository {:?} has no working tree", repo.path()))?
        .canonicalize()?;

    let head = repo.head()?.peel_to_tree()?;
    let mut paths = changed_paths(&repo, &head)?;
    if let Some(branch) = branch {
        let tree = repo
            .revparse_single(branch)
            .and_then(|object| object.peel_to_tree())
            .with_context(|| format!("can not find branch {branch:?}"))?;
        for path in changed_paths(&repo, &tree)? {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    debug!(?paths, "changed paths");

    let files: Vec<String> = paths
        .iter()
        .filter_map(|path| workspace.relative(&workdir.join(path)))
        .collect();
    Ok((
        filter_source_files(workspace, &files),
        filter_test_files(workspace, &files),
    ))
}
