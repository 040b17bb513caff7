//! Directory processing order.
//!
//! Directories are visited in declaration order, refined by `depends_on`:
//! Kahn's algorithm over declaration indices, always releasing the earliest
//! declared ready directory first.

use std::collections::{BTreeSet, HashMap};

use camino::Utf8Path;

use super::CoordinatorError;
use crate::ast::Directory;

/// Indices into `directories` in processing order.
pub(crate) fn directory_order(directories: &[Directory]) -> Result<Vec<usize>, CoordinatorError> {
    let mut index_of: HashMap<&Utf8Path, usize> = HashMap::new();
    for (idx, dir) in directories.iter().enumerate() {
        if index_of.insert(dir.path.as_path(), idx).is_some() {
            return Err(CoordinatorError::DuplicateDirectory {
                path: dir.path.clone(),
            });
        }
    }

    let mut in_degree = vec![0usize; directories.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); directories.len()];
    for (idx, dir) in directories.iter().enumerate() {
        for dep in &dir.depends_on {
            let Some(&dep_idx) = index_of.get(dep.as_path()) else {
                return Err(CoordinatorError::UnknownDirectory {
                    directory: dir.path.clone(),
                    dependency: dep.clone(),
                });
            };
            if let Some(degree) = in_degree.get_mut(idx) {
                *degree += 1;
            }
            if let Some(list) = dependents.get_mut(dep_idx) {
                list.push(idx);
            }
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut order = Vec::with_capacity(directories.len());
    while let Some(idx) = ready.pop_first() {
        order.push(idx);
        for &next in dependents.get(idx).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(next);
                }
            }
        }
    }

    if order.len() != directories.len() {
        let cycle = directories
            .iter()
            .zip(&in_degree)
            .filter(|(_, degree)| **degree > 0)
            .map(|(dir, _)| dir.path.clone())
            .collect();
        return Err(CoordinatorError::DirectoryCycle { directories: cycle });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;

    fn dir(path: &str, depends_on: &[&str]) -> Directory {
        Directory {
            path: path.into(),
            sources: Vec::new(),
            commands: Vec::new(),
            rules: Vec::new(),
            targets: Vec::new(),
            utilities: Vec::new(),
            depends_on: depends_on.iter().map(|d| Utf8PathBuf::from(*d)).collect(),
        }
    }

    #[rstest]
    fn independent_directories_keep_declaration_order() {
        let dirs = [dir("a", &[]), dir("b", &[]), dir("c", &[])];
        assert_eq!(directory_order(&dirs).expect("order"), [0, 1, 2]);
    }

    #[rstest]
    fn dependencies_are_processed_first() {
        let dirs = [dir(".", &["java"]), dir("common", &[]), dir("java", &["common"])];
        assert_eq!(directory_order(&dirs).expect("order"), [1, 2, 0]);
    }

    #[rstest]
    fn cycles_are_reported() {
        let dirs = [dir("a", &["b"]), dir("b", &["a"]), dir("c", &[])];
        let err = directory_order(&dirs).expect_err("cycle");
        assert!(matches!(
            err,
            CoordinatorError::DirectoryCycle { ref directories } if directories.len() == 2
        ));
    }

    #[rstest]
    fn unknown_dependencies_are_reported() {
        let dirs = [dir("a", &["missing"])];
        let err = directory_order(&dirs).expect_err("unknown");
        assert!(matches!(err, CoordinatorError::UnknownDirectory { .. }));
    }
}
