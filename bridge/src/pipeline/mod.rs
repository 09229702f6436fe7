//! Contract with the publishing pipeline's callback registry.
//!
//! The registry itself lives outside this crate; the bridge registers a
//! pair of toggle handlers on install and a one-shot shown hook around
//! each GUI start. Handlers are matched for deregistration by pointer
//! identity, so the bridge keeps hold of every handler it registers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde_json::{Map, Value};

/// Handler invoked for pipeline events.
pub type CallbackFn = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

/// External pipeline callback registry.
pub trait CallbackRegistry: Send + Sync {
    fn register_callback(&self, name: &str, handler: CallbackFn);

    /// Removes a handler registered under `name`, matched by identity.
    /// Returns whether anything was removed.
    fn deregister_callback(&self, name: &str, handler: &CallbackFn) -> bool;

    /// Delivers `event` to every handler registered under its name.
    ///
    /// Implementations must snapshot the handler list before invoking, so
    /// a handler may deregister itself while being delivered.
    fn emit(&self, event: &PipelineEvent);
}

/// Events exchanged with the GUI over the callback registry.
#[derive(Clone)]
pub enum PipelineEvent {
    /// An instance checkbox was toggled in the GUI.
    InstanceToggled {
        instance: Arc<Instance>,
        new_value: bool,
        old_value: bool,
    },
    /// A plug-in checkbox was toggled in the GUI.
    PluginToggled {
        plugin: Arc<Plugin>,
        new_value: bool,
        old_value: bool,
    },
    /// The GUI window became visible.
    GuiShown,
}

impl PipelineEvent {
    /// The callback-registry name this event is delivered under.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::InstanceToggled { .. } => crate::constants::callbacks::INSTANCE_TOGGLED,
            PipelineEvent::PluginToggled { .. } => crate::constants::callbacks::PLUGIN_TOGGLED,
            PipelineEvent::GuiShown => crate::constants::callbacks::GUI_SHOWN,
        }
    }
}

impl fmt::Debug for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::InstanceToggled {
                instance,
                new_value,
                ..
            } => write!(f, "InstanceToggled({}, {})", instance.name(), new_value),
            PipelineEvent::PluginToggled {
                plugin, new_value, ..
            } => write!(f, "PluginToggled({}, {})", plugin.name(), new_value),
            PipelineEvent::GuiShown => write!(f, "GuiShown"),
        }
    }
}

/// An item produced by collection, carrying arbitrary pipeline data.
///
/// Whether the item takes part in publishing is the `publish` entry of its
/// data map, absent meaning yes.
pub struct Instance {
    name: String,
    data: RwLock<Map<String, Value>>,
}

impl Instance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(Map::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_publish(&self) -> bool {
        self.data
            .read()
            .get("publish")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn set_publish(&self, value: bool) {
        self.set_data("publish", Value::Bool(value));
    }

    pub fn data(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    pub fn set_data(&self, key: impl Into<String>, value: Value) {
        self.data.write().insert(key.into(), value);
    }
}

/// A processing plug-in with an activation toggle.
pub struct Plugin {
    name: String,
    active: AtomicBool,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, value: bool) {
        self.active.store(value, Ordering::SeqCst);
    }
}

/// Handler for `instanceToggled`: mirrors the GUI checkbox into the
/// instance's publish flag.
pub(crate) fn toggle_instance(event: &PipelineEvent) {
    if let PipelineEvent::InstanceToggled {
        instance,
        new_value,
        ..
    } = event
    {
        instance.set_publish(*new_value);
    }
}

/// Handler for `pluginToggled`: mirrors the GUI checkbox into the
/// plug-in's active flag.
pub(crate) fn toggle_plugin(event: &PipelineEvent) {
    if let PipelineEvent::PluginToggled {
        plugin, new_value, ..
    } = event
    {
        plugin.set_active(*new_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_publish_by_default() {
        let instance = Instance::new("shot01");
        assert!(instance.is_publish());
    }

    #[test]
    fn toggle_instance_sets_publish_flag() {
        let instance = Arc::new(Instance::new("shot01"));
        let event = PipelineEvent::InstanceToggled {
            instance: Arc::clone(&instance),
            new_value: false,
            old_value: true,
        };
        toggle_instance(&event);
        assert!(!instance.is_publish());
        assert_eq!(instance.data("publish"), Some(Value::Bool(false)));
    }

    #[test]
    fn toggle_plugin_sets_active_flag() {
        let plugin = Arc::new(Plugin::new("validate_names"));
        assert!(plugin.is_active());
        let event = PipelineEvent::PluginToggled {
            plugin: Arc::clone(&plugin),
            new_value: false,
            old_value: true,
        };
        toggle_plugin(&event);
        assert!(!plugin.is_active());
    }

    #[test]
    fn handlers_ignore_foreign_events() {
        let instance = Arc::new(Instance::new("shot01"));
        instance.set_publish(false);
        toggle_instance(&PipelineEvent::GuiShown);
        assert!(!instance.is_publish());
    }

    #[test]
    fn event_names_match_registry_contract() {
        assert_eq!(PipelineEvent::GuiShown.name(), "pyblishQmlShown");
    }
}
