//! JSX to `createElement` lowering.
//!
//! Lowering works on the oxc AST: every outermost JSX element or fragment is
//! replaced by factory calls and the text around it is copied unchanged.

use oxc_ast::ast::{
    Expression, JSXAttributeItem, JSXAttributeValue, JSXChild, JSXElement, JSXExpression, JSXFragment, Program,
};
use oxc_ast_visit::Visit;
use oxc_allocator::Allocator;
use oxc_span::{GetSpan, Span};

use crate::jsx::{attribute_name, clean_jsx_text, decode_entities, is_intrinsic};
use crate::module::ModuleError;
use crate::parse::{parse, MODULE_SOURCE};

/// Options for JSX lowering (classic runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerOptions {
    /// Element factory, e.g. `React.createElement`
    pub factory: String,

    /// Fragment component, e.g. `React.Fragment`
    pub fragment: String,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            factory: "React.createElement".to_string(),
            fragment: "React.Fragment".to_string(),
        }
    }
}

/// Replace every JSX element in `source` with factory calls.
///
/// Source without JSX is returned unchanged.
pub fn lower_jsx(source: &str, options: &LowerOptions) -> Result<String, ModuleError> {
    let allocator = Allocator::default();
    let program = parse(&allocator, source, MODULE_SOURCE)?;
    let edits = JsxLowering::new(source, options).program(&program)?;
    Ok(splice(source, 0, edits))
}

/// Replace `start..end` of the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Span, replacement: String) -> Self {
        Self {
            start: span.start as usize,
            end: span.end as usize,
            replacement,
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            replacement: text.into(),
        }
    }
}

/// Apply `edits` to `text`, which starts at `offset` in the original source.
///
/// Edit positions are absolute. Inserts sort ahead of replacements at the same
/// position; an edit overlapping an earlier one only replaces what is left.
pub(crate) fn splice(text: &str, offset: usize, mut edits: Vec<Edit>) -> String {
    if edits.is_empty() {
        return text.to_string();
    }

    edits.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut out = String::with_capacity(text.len() + text.len() / 2);
    let mut cursor = offset;
    for edit in edits {
        let start = edit.start.max(cursor);
        out.push_str(&text[cursor - offset..start - offset]);
        out.push_str(&edit.replacement);
        cursor = edit.end.max(start);
    }
    out.push_str(&text[cursor - offset..]);
    out
}

/// Turns JSX nodes into factory call source.
pub(crate) struct JsxLowering<'s> {
    source: &'s str,
    options: &'s LowerOptions,
}

impl<'s> JsxLowering<'s> {
    pub fn new(source: &'s str, options: &'s LowerOptions) -> Self {
        Self { source, options }
    }

    /// Edits replacing every outermost JSX node in `program`.
    pub fn program(&self, program: &Program<'_>) -> Result<Vec<Edit>, ModuleError> {
        let mut finder = JsxFinder::new(self);
        finder.visit_program(program);
        finder.finish()
    }

    /// Source of `expression` with any JSX inside it lowered.
    fn expression(&self, expression: &Expression<'_>) -> Result<String, ModuleError> {
        let mut finder = JsxFinder::new(self);
        finder.visit_expression(expression);
        let edits = finder.finish()?;

        let span = expression.span();
        let text = span.source_text(self.source);
        Ok(splice(text, span.start as usize, edits))
    }

    fn element(&self, element: &JSXElement<'_>) -> Result<String, ModuleError> {
        let opening = &element.opening_element;
        let name = opening.name.to_string();
        let tag = if is_intrinsic(&name) { js_string(&name) } else { name };

        let mut args = vec![tag, self.attributes(&opening.attributes)?];
        args.extend(self.children(&element.children)?);
        Ok(format!("{}({})", self.options.factory, args.join(", ")))
    }

    fn fragment(&self, fragment: &JSXFragment<'_>) -> Result<String, ModuleError> {
        let mut args = vec![self.options.fragment.clone(), "null".to_string()];
        args.extend(self.children(&fragment.children)?);
        Ok(format!("{}({})", self.options.factory, args.join(", ")))
    }

    fn children(&self, children: &[JSXChild<'_>]) -> Result<Vec<String>, ModuleError> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match child {
                JSXChild::Text(text) => {
                    let cleaned = decode_entities(&clean_jsx_text(text.value.as_str()));
                    if !cleaned.is_empty() {
                        out.push(js_string(&cleaned));
                    }
                }
                JSXChild::Element(element) => out.push(self.element(element)?),
                JSXChild::Fragment(fragment) => out.push(self.fragment(fragment)?),
                JSXChild::ExpressionContainer(container) => {
                    if let Some(expression) = container.expression.as_expression() {
                        out.push(self.expression(expression)?);
                    }
                }
                JSXChild::Spread(spread) => {
                    return Err(ModuleError::Unsupported(format!(
                        "spread children: {}",
                        spread.span.source_text(self.source)
                    )));
                }
            }
        }
        Ok(out)
    }

    fn attributes(&self, attributes: &[JSXAttributeItem<'_>]) -> Result<String, ModuleError> {
        if attributes.is_empty() {
            return Ok("null".to_string());
        }

        // Runs of named attributes become object literals; spreads sit between them.
        let mut segments: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut has_spread = false;

        for item in attributes {
            match item {
                JSXAttributeItem::Attribute(attribute) => {
                    let value = match &attribute.value {
                        None => "true".to_string(),
                        Some(JSXAttributeValue::StringLiteral(s)) => js_string(&decode_entities(s.value.as_str())),
                        Some(JSXAttributeValue::ExpressionContainer(container)) => match &container.expression {
                            JSXExpression::EmptyExpression(empty) => {
                                return Err(ModuleError::Unsupported(format!(
                                    "empty attribute value at byte {}",
                                    empty.span.start
                                )));
                            }
                            expression => match expression.as_expression() {
                                Some(expression) => self.expression(expression)?,
                                None => continue,
                            },
                        },
                        Some(JSXAttributeValue::Element(element)) => self.element(element)?,
                        Some(JSXAttributeValue::Fragment(fragment)) => self.fragment(fragment)?,
                    };
                    current.push(format!("{}: {}", property_key(&attribute_name(&attribute.name)), value));
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    has_spread = true;
                    if !current.is_empty() {
                        segments.push(format!("{{ {} }}", current.join(", ")));
                        current.clear();
                    }
                    segments.push(self.expression(&spread.argument)?);
                }
            }
        }

        if !current.is_empty() {
            segments.push(format!("{{ {} }}", current.join(", ")));
        }

        if has_spread {
            Ok(format!("Object.assign({{}}, {})", segments.join(", ")))
        } else {
            Ok(segments.join(", "))
        }
    }
}

/// Collects one edit per outermost JSX node.
struct JsxFinder<'l, 's> {
    lowering: &'l JsxLowering<'s>,
    edits: Vec<Edit>,
    error: Option<ModuleError>,
}

impl<'l, 's> JsxFinder<'l, 's> {
    fn new(lowering: &'l JsxLowering<'s>) -> Self {
        Self {
            lowering,
            edits: Vec::new(),
            error: None,
        }
    }

    fn push(&mut self, span: Span, lowered: Result<String, ModuleError>) {
        match lowered {
            Ok(code) => self.edits.push(Edit::replace(span, code)),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
    }

    fn finish(self) -> Result<Vec<Edit>, ModuleError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.edits),
        }
    }
}

impl<'a> Visit<'a> for JsxFinder<'_, '_> {
    fn visit_jsx_element(&mut self, it: &JSXElement<'a>) {
        let lowered = self.lowering.element(it);
        self.push(it.span, lowered);
    }

    fn visit_jsx_fragment(&mut self, it: &JSXFragment<'a>) {
        let lowered = self.lowering.fragment(it);
        self.push(it.span, lowered);
    }
}

fn property_key(name: &str) -> String {
    let valid_identifier = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid_identifier {
        name.to_string()
    } else {
        js_string(name)
    }
}

/// Quote a string as a JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    // JSON string syntax is a subset of JavaScript string syntax.
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lower(source: &str) -> String {
        lower_jsx(source, &LowerOptions::default()).unwrap()
    }

    #[test]
    fn lowers_intrinsic_elements_with_children() {
        let out = lower("const el = <div className=\"box\"><h1>{title}</h1>Hi</div>;");

        assert_eq!(
            out,
            "const el = React.createElement(\"div\", { className: \"box\" }, \
             React.createElement(\"h1\", null, title), \"Hi\");"
        );
    }

    #[test]
    fn lowers_components_by_reference() {
        let out = lower("x = <Navigation active />;");

        assert_eq!(out, "x = React.createElement(Navigation, { active: true });");
    }

    #[test]
    fn lowers_spread_attributes_with_object_assign() {
        let out = lower("x = <a {...props} data-id=\"1\" />");

        assert_eq!(
            out,
            "x = React.createElement(\"a\", Object.assign({}, props, { \"data-id\": \"1\" }))"
        );
    }

    #[test]
    fn lowers_fragments_and_nested_expressions() {
        let out = lower("f(<>{list.map(i => <li>{i}</li>)}</>)");

        assert_eq!(
            out,
            "f(React.createElement(React.Fragment, null, \
             list.map(i => React.createElement(\"li\", null, i))))"
        );
    }

    #[test]
    fn lowers_elements_used_as_attribute_values() {
        let out = lower("x = <Button icon={<Star size={2} />} />;");

        assert_eq!(
            out,
            "x = React.createElement(Button, { icon: React.createElement(Star, { size: 2 }) });"
        );
    }

    #[test]
    fn honours_custom_factory() {
        let options = LowerOptions {
            factory: "h".to_string(),
            fragment: "Fragment".to_string(),
        };
        let out = lower_jsx("v = <p>x</p>", &options).unwrap();

        assert_eq!(out, "v = h(\"p\", null, \"x\")");
    }

    #[test]
    fn leaves_plain_javascript_alone() {
        let source = "if (a < b) { c = d / 2; }";

        assert_eq!(lower(source), source);
    }

    #[test]
    fn spread_children_are_rejected() {
        let err = lower_jsx("x = <ul>{...items}</ul>;", &LowerOptions::default()).unwrap_err();

        assert!(matches!(err, ModuleError::Unsupported(_)));
    }

    #[test]
    fn splice_orders_inserts_before_replacements() {
        let edits = vec![
            Edit::replace(Span::new(4, 7), "X".to_string()),
            Edit::insert(4, "+"),
            Edit::insert(0, "<"),
        ];

        assert_eq!(splice("abc def ghi", 0, edits), "<abc +X ghi");
    }
}
