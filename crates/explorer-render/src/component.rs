//! Component trait and rendering contexts.

use std::path::PathBuf;

use explorer_js::{ResolveError, SyntaxError};

use crate::markup::Node;
use crate::value::Props;

/// Everything a component may use while rendering on the server.
///
/// Deliberately carries no browser capabilities.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub props: Props,
    pub children: Vec<Node>,
}

impl RenderContext {
    pub fn new(props: Props) -> Self {
        Self {
            props,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }
}

/// Browser-only operations available to client lifecycle hooks.
pub trait BrowserApi {
    fn alert(&mut self, message: &str);
}

/// Capabilities handed to a component once it is mounted in a browser.
pub struct ClientContext<'a> {
    browser: &'a mut dyn BrowserApi,
}

impl<'a> ClientContext<'a> {
    pub fn new(browser: &'a mut dyn BrowserApi) -> Self {
        Self { browser }
    }

    pub fn alert(&mut self, message: &str) {
        self.browser.alert(message);
    }
}

/// A renderable UI component.
pub trait Component: Send + Sync {
    /// Component name (e.g. "About")
    fn name(&self) -> &str;

    /// Declared page title, if any.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Render to a markup tree. Must not have side effects.
    fn render(&self, ctx: &RenderContext) -> Result<Node, RenderError>;

    /// Client lifecycle hook run after mounting. Never called by [`render_to_string`].
    fn did_mount(&self, _client: &mut ClientContext<'_>) {}
}

/// Render a component to an HTML string for a static document.
pub fn render_to_string(component: &dyn Component, props: Props) -> Result<String, RenderError> {
    let node = component.render(&RenderContext::new(props))?;
    Ok(node.to_html())
}

/// Run a component's client lifecycle hooks against a browser.
pub fn mount(component: &dyn Component, browser: &mut dyn BrowserApi) {
    let mut client = ClientContext::new(browser);
    component.did_mount(&mut client);
}

/// Errors that can occur while loading or rendering a component.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No default-exported component in {}", .0.display())]
    NoComponent(PathBuf),

    #[error("Component {component} has no render output")]
    MissingRender { component: String },

    #[error("Unsupported expression in {component}: {{{expression}}}")]
    UnsupportedExpression { component: String, expression: String },

    #[error("Unknown component <{name}> used in {component}")]
    UnknownComponent { component: String, name: String },

    #[error("Import cycle through {}", .0.display())]
    ImportCycle(PathBuf),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
