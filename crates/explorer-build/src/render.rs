//! Page documents: component rendering inside the HTML template.

use std::path::{Path, PathBuf};

use minijinja::{context, Environment, Value};

use explorer_render::{render_to_string, Component, Props};

use crate::error::TemplateError;
use crate::output::write_output;
use crate::pages::Page;

const TEMPLATE_NAME: &str = "page.html";

/// Interpolation points every template must use.
const SLOTS: [&str; 2] = ["title", "body"];

/// The site's HTML template.
#[derive(Debug)]
pub struct PageTemplate {
    env: Environment<'static>,
}

impl PageTemplate {
    /// Load and validate the template at `path`.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::Missing(path.to_path_buf())
            } else {
                TemplateError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_source(path, source)
    }

    /// Compile `source`; `path` is used in error messages.
    pub fn from_source(path: &Path, source: String) -> Result<Self, TemplateError> {
        let malformed = |source| TemplateError::Malformed {
            path: path.to_path_buf(),
            source,
        };

        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_NAME, source).map_err(malformed)?;

        let variables = env.get_template(TEMPLATE_NAME).map_err(malformed)?.undeclared_variables(false);
        if let Some(slot) = SLOTS.into_iter().find(|slot| !variables.contains(*slot)) {
            return Err(TemplateError::MissingSlot {
                path: path.to_path_buf(),
                slot,
            });
        }

        Ok(Self { env })
    }

    /// Fill the template. `body` is inserted as markup; `title` is escaped.
    pub fn render(&self, page: &str, title: &str, body: &str) -> Result<String, TemplateError> {
        let fill = |source| TemplateError::Fill {
            page: page.to_string(),
            source,
        };
        self.env
            .get_template(TEMPLATE_NAME)
            .map_err(fill)?
            .render(context! {
                title => title,
                body => Value::from_safe_string(body.to_string()),
            })
            .map_err(fill)
    }
}

/// `"{base} | {title}"`, or `"{base} "` when the component declares no title.
pub fn page_title(base: &str, title: Option<&str>) -> String {
    match title {
        Some(title) if !title.is_empty() => format!("{base} | {title}"),
        _ => format!("{base} "),
    }
}

/// A page's finished HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub page: String,
    pub title: String,

    /// Server-rendered component markup
    pub body: String,

    pub html: String,
    pub path: PathBuf,
}

/// Renders page components into the template and writes `index.html`.
#[derive(Debug)]
pub struct PageRenderer {
    template: PageTemplate,
    base_title: String,
}

impl PageRenderer {
    pub fn new(template: PageTemplate, base_title: impl Into<String>) -> Self {
        Self {
            template,
            base_title: base_title.into(),
        }
    }

    /// Render `component` on the server. Client lifecycle hooks never run.
    pub fn render(&self, page: &Page, component: &dyn Component) -> Result<RenderedDocument, TemplateError> {
        let body = render_to_string(component, Props::new()).map_err(|source| TemplateError::Render {
            page: page.name.clone(),
            source,
        })?;
        let title = page_title(&self.base_title, component.title());
        let html = self.template.render(&page.name, &title, &body)?;

        let path = page.document_path();
        write_output(&path, html.as_bytes()).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Rendered '{}' as \"{}\"", page.name, title);

        Ok(RenderedDocument {
            page: page.name.clone(),
            title,
            body,
            html,
            path,
        })
    }
}
