use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// How host-tool output paths are resolved for reading and presented to
/// the browser.
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    working_dir: Option<PathBuf>,
    outdir: Option<PathBuf>,
}

impl PathPolicy {
    pub fn new(working_dir: Option<PathBuf>, outdir: Option<PathBuf>) -> Self {
        Self {
            working_dir,
            outdir,
        }
    }

    /// Join an output path onto the working directory (when set) and
    /// normalise it.
    pub fn resolve(&self, output: &str) -> PathBuf {
        match &self.working_dir {
            Some(dir) => dir.join(output).clean(),
            None => PathBuf::from(output).clean(),
        }
    }

    /// Path as reported in events: relative to the outdir when one is set.
    ///
    /// Relative paths on either side are anchored at the working directory,
    /// or the process's current directory when none is configured.
    pub fn present(&self, resolved: &Path) -> String {
        match &self.outdir {
            Some(outdir) => {
                let base = self.anchor(&self.resolve(&outdir.to_string_lossy()));
                let target = self.anchor(resolved);
                relative_path(&base, &target).to_string_lossy().into_owned()
            }
            None => resolved.to_string_lossy().into_owned(),
        }
    }

    fn anchor(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.clean();
        }
        let root = match &self.working_dir {
            Some(dir) => Some(dir.clone()),
            None => std::env::current_dir().ok(),
        };
        match root {
            Some(root) => root.join(path).clean(),
            None => path.clean(),
        }
    }
}

/// Path from `base` to `target`, both taken as already normalised.
///
/// Shared leading components are dropped and each remaining component of
/// `base` becomes `..`. An identical pair yields `.`.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();

    let shared = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in shared..base.len() {
        rel.push("..");
    }
    for component in &target[shared..] {
        rel.push(component.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        rel
    }
}
