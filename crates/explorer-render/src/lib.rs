//! Server-side rendering for Project Explorer pages.
//!
//! Components render to a [`Node`] tree through a [`RenderContext`] that
//! carries props and children only. Browser capabilities live on a separate
//! [`ClientContext`], which the server renderer never constructs, so client
//! lifecycle hooks cannot run while a document is being produced.

pub mod component;
pub mod markup;
pub mod registry;
pub mod source;
pub mod value;

pub use component::{mount, render_to_string, BrowserApi, ClientContext, Component, RenderContext, RenderError};
pub use markup::{escape_attribute, escape_text, is_void_element, Element, Node};
pub use registry::ComponentRegistry;
pub use source::{JsxComponent, LifecycleHook};
pub use value::{Props, Value};
