//! Output-path resolution for the CLI driver. The decoder core never
//! touches the filesystem; everything path-shaped lives here.

use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
}

pub fn resolve_runtime_paths(
    home_dir: &Path,
    cwd: &Path,
    out_dir_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let cwd = normalize_lexical(cwd);
    let out_dir = match out_dir_override {
        Some(path) => {
            let expanded = expand_tilde(path, home_dir);
            let resolved = if expanded.is_absolute() {
                expanded
            } else {
                cwd.join(expanded)
            };
            normalize_lexical(&resolved)
        }
        None => cwd.join("out"),
    };

    Ok(RuntimePaths { cwd, out_dir })
}

fn expand_tilde(path: &Path, home_dir: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            expanded
        }
        _ => path.to_path_buf(),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
