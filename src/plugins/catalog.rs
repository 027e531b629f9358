//! Compiled-in plugin catalog.

use std::collections::HashMap;

use crate::plugins::head_block::HeadBlockPlugin;
use crate::plugins::jwt::JwtPlugin;
use crate::plugins::sample::SamplePlugin;
use crate::plugins::Plugin;

type Factory = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Maps configured plugin names to constructors.
pub struct PluginCatalog {
    factories: HashMap<String, Factory>,
}

impl PluginCatalog {
    /// A catalog with no plugins.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The plugins shipped with the gateway.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(SamplePlugin::NAME, || Box::new(SamplePlugin));
        catalog.insert(HeadBlockPlugin::NAME, || Box::new(HeadBlockPlugin::default()));
        catalog.insert(JwtPlugin::NAME, || Box::new(JwtPlugin::default()));
        catalog
    }

    /// Add or replace a plugin constructor.
    pub fn insert<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Build a fresh instance of the named plugin.
    pub fn create(&self, name: &str) -> Option<Box<dyn Plugin>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let catalog = PluginCatalog::builtin();
        for name in ["sample", "head_block", "jwt"] {
            assert!(catalog.contains(name), "missing {name}");
            assert_eq!(catalog.create(name).unwrap().name(), name);
        }
        assert!(catalog.create("nope").is_none());
    }

    #[test]
    fn test_insert_custom_factory() {
        let mut catalog = PluginCatalog::empty();
        catalog.insert("echo", || Box::new(SamplePlugin));
        assert!(catalog.contains("echo"));
        assert!(!catalog.contains("sample"));
    }
}
