//! Page component lookup.
//!
//! Pages are normally backed by their JSX entry module. A native component
//! can be registered under a page name to take its place.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::component::{Component, RenderError};
use crate::source::JsxComponent;

/// Registry of page components.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Overrides by page name (lowercase)
    overrides: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `component` for the page `page` instead of its entry module.
    pub fn register(&mut self, page: &str, component: Arc<dyn Component>) {
        self.overrides.insert(page.to_lowercase(), component);
    }

    pub fn contains(&self, page: &str) -> bool {
        self.overrides.contains_key(&page.to_lowercase())
    }

    /// Component for `page`: the registered override, else the module at `entry`.
    pub fn load(&self, page: &str, entry: &Path) -> Result<Arc<dyn Component>, RenderError> {
        if let Some(component) = self.overrides.get(&page.to_lowercase()) {
            return Ok(Arc::clone(component));
        }
        let component: Arc<dyn Component> = JsxComponent::load(entry)?;
        Ok(component)
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.overrides.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ComponentRegistry").field("overrides", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::RenderContext;
    use crate::markup::{Element, Node};
    use std::fs;
    use tempfile::tempdir;

    struct Static;

    impl Component for Static {
        fn name(&self) -> &str {
            "Static"
        }

        fn render(&self, _ctx: &RenderContext) -> Result<Node, RenderError> {
            Ok(Element::new("main").text("static").into())
        }
    }

    #[test]
    fn overrides_are_case_insensitive() {
        let mut registry = ComponentRegistry::new();
        registry.register("About", Arc::new(Static));

        let component = registry.load("about", Path::new("missing.jsx")).unwrap();

        assert!(registry.contains("ABOUT"));
        assert_eq!(component.name(), "Static");
    }

    #[test]
    fn falls_back_to_entry_module() {
        let temp = tempdir().unwrap();
        let entry = temp.path().join("Index.jsx");
        fs::write(
            &entry,
            "export default class Index {\n  render() {\n    return <p>home</p>;\n  }\n}\n",
        )
        .unwrap();

        let component = ComponentRegistry::new().load("index", &entry).unwrap();

        assert_eq!(component.name(), "Index");
    }

    #[test]
    fn missing_entry_is_an_io_error() {
        let temp = tempdir().unwrap();

        let err = ComponentRegistry::new()
            .load("index", &temp.path().join("Index.jsx"))
            .err()
            .unwrap();

        assert!(matches!(err, RenderError::Io { .. }));
    }
}
