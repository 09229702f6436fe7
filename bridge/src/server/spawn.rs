//! GUI subprocess launching.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::constants::{envs, launch};
use crate::errors::{BridgeError, BridgeResult};

/// Launch parameters for one GUI session.
#[derive(Debug, Clone)]
pub(crate) struct SpawnSpec {
    pub python_executable: PathBuf,
    pub gui_runtime: Option<PathBuf>,
    pub targets: Vec<String>,
    pub modal: bool,
}

/// Spawns the GUI subprocess with piped stdio.
pub(super) fn spawn_gui(spec: &SpawnSpec) -> BridgeResult<Child> {
    let mut cmd = Command::new(&spec.python_executable);
    cmd.arg("-u")
        .arg("-m")
        .arg(launch::GUI_MODULE)
        .arg(launch::AS_CHILD_FLAG);
    if !spec.targets.is_empty() {
        cmd.arg("--targets").args(&spec.targets);
    }
    if spec.modal {
        cmd.arg("--modal");
    }

    cmd.env(
        envs::PYTHONPATH,
        child_pythonpath(
            spec.gui_runtime.as_deref(),
            std::env::var_os(envs::PYTHONPATH),
        )?,
    );

    // The GUI inherits our log filter.
    if let Ok(rust_log) = std::env::var(envs::RUST_LOG) {
        cmd.env(envs::RUST_LOG, rust_log);
    }

    // Stdin stays piped: the GUI reads EOF on it as "host went away".
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    cmd.spawn().map_err(|e| {
        BridgeError::Subprocess(format!(
            "failed to spawn GUI interpreter at {}: {}",
            spec.python_executable.display(),
            e
        ))
    })
}

/// Builds the child's `PYTHONPATH`: the registered GUI runtime first,
/// then the inherited entries minus the conflicting Maya bundle.
fn child_pythonpath(
    gui_runtime: Option<&Path>,
    inherited: Option<OsString>,
) -> BridgeResult<OsString> {
    let inherited = inherited.unwrap_or_default();
    let mut entries: Vec<PathBuf> = Vec::new();
    if let Some(runtime) = gui_runtime {
        entries.push(runtime.to_path_buf());
    }
    entries.extend(std::env::split_paths(&inherited).filter(|entry| {
        !entry.as_os_str().is_empty()
            && !entry
                .to_string_lossy()
                .contains(launch::PYTHONPATH_CONFLICT)
    }));

    std::env::join_paths(entries)
        .map_err(|e| BridgeError::Config(format!("unusable PYTHONPATH entry: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn runtime_path_comes_first() {
        let joined = child_pythonpath(
            Some(Path::new("/opt/pyblish")),
            Some(OsString::from("/site/a:/site/b")),
        )
        .unwrap();
        assert_eq!(joined, OsString::from("/opt/pyblish:/site/a:/site/b"));
    }

    #[cfg(unix)]
    #[test]
    fn conflicting_entries_are_dropped() {
        let joined = child_pythonpath(
            None,
            Some(OsString::from(
                "/site/a:/maya/2018/googleapiclient/lib:/site/b",
            )),
        )
        .unwrap();
        assert_eq!(joined, OsString::from("/site/a:/site/b"));
    }

    #[test]
    fn empty_everything_is_fine() {
        let joined = child_pythonpath(None, None).unwrap();
        assert!(joined.is_empty());
    }
}
