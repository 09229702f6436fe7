//! Crate-wide constants.

/// Environment variables read by the bridge.
pub mod envs {
    /// Default modality of `show` when the caller does not pass one.
    pub const PYBLISH_QML_MODAL: &str = "PYBLISH_QML_MODAL";
    /// Log filter, forwarded to the GUI subprocess when set.
    pub const RUST_LOG: &str = "RUST_LOG";
    /// Module search path handed to the Python interpreter.
    pub const PYTHONPATH: &str = "PYTHONPATH";
}

/// Names on the pipeline callback registry. Fixed contract with the GUI.
pub mod callbacks {
    pub const INSTANCE_TOGGLED: &str = "instanceToggled";
    pub const PLUGIN_TOGGLED: &str = "pluginToggled";
    pub const GUI_SHOWN: &str = "pyblishQmlShown";
}

/// Default sentinels for presentation settings. Adapters only write over
/// these, never over a user customization.
pub mod defaults {
    pub const CONTEXT_LABEL: &str = "Context";
    pub const WINDOW_TITLE: &str = "Pyblish";
    pub const WINDOW_SIZE: (u32, u32) = (430, 600);
    pub const WINDOW_POSITION: (u32, u32) = (100, 100);
    pub const HIDDEN_SECTIONS: &[&str] = &["Comment"];
}

/// GUI subprocess launch contract.
pub mod launch {
    /// Module the interpreter runs as the GUI program.
    pub const GUI_MODULE: &str = "pyblish_qml";
    /// Tells the GUI it was launched by a host bridge rather than
    /// standalone.
    pub const AS_CHILD_FLAG: &str = "--aschild";
    /// `PYTHONPATH` entries containing this fragment are dropped from the
    /// child environment. Maya 2018 bundles a copy that shadows pip
    /// installs.
    pub const PYTHONPATH_CONFLICT: &str = "googleapiclient";
}

/// Intervals.
pub mod timing {
    use std::time::Duration;

    /// Overlay animation tick.
    pub const SPLASH_TICK: Duration = Duration::from_millis(330);
    /// Poll interval while waiting for the GUI subprocess to exit.
    pub const LISTEN_POLL: Duration = Duration::from_millis(50);
}
