//! Host application detection.
//!
//! Six DCC hosts are recognized. Detection is a fixed-order walk; the
//! first host that matches installs its adapter and the walk stops.

pub mod adapters;
pub mod env;

use std::fmt;

use crate::errors::BridgeResult;
use self::env::HostEnvironment;

/// Hosts the bridge knows how to embed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Maya,
    Houdini,
    Nuke,
    NukeAssist,
    Hiero,
    NukeStudio,
}

impl HostKind {
    /// Probe order. The first detected host wins and later entries are
    /// never probed.
    pub const PRIORITY: [HostKind; 6] = [
        HostKind::Maya,
        HostKind::Houdini,
        HostKind::Nuke,
        HostKind::NukeAssist,
        HostKind::Hiero,
        HostKind::NukeStudio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::Maya => "maya",
            HostKind::Houdini => "houdini",
            HostKind::Nuke => "nuke",
            HostKind::NukeAssist => "nukeassist",
            HostKind::Hiero => "hiero",
            HostKind::NukeStudio => "nukestudio",
        }
    }

    /// Context label this host writes over the default sentinel.
    pub(crate) fn context_label(&self) -> &'static str {
        match self {
            HostKind::Maya => "Maya",
            HostKind::Houdini => "Houdini",
            HostKind::Nuke => "Nuke",
            HostKind::NukeAssist => "NukeAssist",
            HostKind::Hiero => "Hiero",
            HostKind::NukeStudio => "NukeStudio",
        }
    }

    /// Window title this host writes over the default sentinel.
    pub(crate) fn window_title(&self) -> &'static str {
        match self {
            HostKind::Maya => "Pyblish (Maya)",
            HostKind::Houdini => "Pyblish (Houdini)",
            HostKind::Nuke => "Pyblish (Nuke)",
            HostKind::NukeAssist => "Pyblish (NukeAssist)",
            HostKind::Hiero => "Pyblish (Hiero)",
            HostKind::NukeStudio => "Pyblish (NukeStudio)",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing one host.
///
/// "Not this host" is an expected answer, not an error; genuine failures
/// while probing or installing propagate as `Err` and stop the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Detected,
    NotThisHost,
}

/// Launch flags distinguishing the Nuke family's sibling modes.
const NUKE_FAMILY_FLAGS: [&str; 3] = ["--hiero", "--studio", "--nukeassist"];

/// Probes whether `kind`'s host is the application embedding this
/// process.
pub fn detect(kind: HostKind, env: &dyn HostEnvironment) -> BridgeResult<Detection> {
    let args = env.launch_args();
    let has_flag = |flag: &str| args.iter().any(|arg| arg == flag);

    let found = match kind {
        HostKind::Maya => env.has_module("maya"),
        HostKind::Houdini => env.has_module("hdefereval"),
        // Plain Nuke must not carry any sibling-mode flag; the flagged
        // modes are separate entries below.
        HostKind::Nuke => {
            env.has_module("nuke") && !NUKE_FAMILY_FLAGS.iter().any(|flag| has_flag(flag))
        }
        HostKind::NukeAssist => env.has_module("nuke") && has_flag("--nukeassist"),
        HostKind::Hiero => {
            env.has_module("hiero") && env.has_module("nuke") && has_flag("--hiero")
        }
        HostKind::NukeStudio => env.has_module("nuke") && has_flag("--studio"),
    };

    if found {
        Ok(Detection::Detected)
    } else {
        Ok(Detection::NotThisHost)
    }
}
