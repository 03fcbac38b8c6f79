//! Owned JSX trees.
//!
//! Component analysis keeps the JSX a component renders after the parser's
//! arena is gone, so element trees are copied out of the oxc AST. Embedded
//! JavaScript (attribute expressions, expression children, spreads) is kept
//! as source text with enclosing parentheses removed.

use oxc_ast::ast::{
    Expression, JSXAttributeItem, JSXAttributeName, JSXAttributeValue, JSXChild, JSXElement, JSXExpression,
};
use oxc_span::GetSpan;

/// A node in a JSX tree.
#[derive(Debug, Clone, PartialEq)]
pub enum JsxNode {
    /// `<name ...>children</name>` or `<name ... />`
    Element(JsxElement),
    /// `<>children</>`
    Fragment(Vec<JsxNode>),
    /// Literal text, already whitespace-cleaned and entity-decoded
    Text(String),
    /// `{expression}` child, as trimmed source text
    Expression(String),
}

/// A JSX element.
#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
    /// Tag name (`div`, `Navigation`, `Foo.Bar`)
    pub name: String,

    /// Attributes in source order
    pub attributes: Vec<JsxAttribute>,

    /// Child nodes
    pub children: Vec<JsxNode>,

    /// Whether written as `<name />`
    pub self_closing: bool,
}

impl JsxElement {
    /// Whether this is an intrinsic (HTML) element rather than a component.
    pub fn is_intrinsic(&self) -> bool {
        is_intrinsic(&self.name)
    }
}

/// Whether a tag name refers to an HTML element rather than a component.
pub fn is_intrinsic(name: &str) -> bool {
    let starts_lower = name.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    (starts_lower && !name.contains('.')) || name.contains('-') || name.contains(':')
}

/// A JSX attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttribute {
    /// `name`, `name="value"`, `name={expr}`
    Named { name: String, value: AttrValue },
    /// `{...expr}`
    Spread(String),
}

/// Value of a named attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Bare attribute: `disabled`
    Boolean,
    /// Quoted string, entity-decoded
    String(String),
    /// `{expr}` as trimmed source text
    Expression(String),
    /// Element used as a value: `icon=<Star />`
    Element(Box<JsxNode>),
}

impl JsxNode {
    /// Copy the JSX element or fragment `expression` denotes, looking
    /// through parentheses. Other expressions give `None`.
    pub fn from_expression(source: &str, expression: &Expression<'_>) -> Option<Self> {
        match expression.without_parentheses() {
            Expression::JSXElement(element) => Some(Self::from_element(source, element)),
            Expression::JSXFragment(fragment) => Some(Self::Fragment(copy_children(source, &fragment.children))),
            _ => None,
        }
    }

    /// Copy an element and everything under it.
    pub fn from_element(source: &str, element: &JSXElement<'_>) -> Self {
        let opening = &element.opening_element;
        let mut attributes = Vec::with_capacity(opening.attributes.len());

        for item in &opening.attributes {
            match item {
                JSXAttributeItem::Attribute(attribute) => {
                    let value = match &attribute.value {
                        None => AttrValue::Boolean,
                        Some(JSXAttributeValue::StringLiteral(s)) => AttrValue::String(decode_entities(s.value.as_str())),
                        Some(JSXAttributeValue::ExpressionContainer(container)) => {
                            match expression_text(source, &container.expression) {
                                Some(text) => AttrValue::Expression(text),
                                None => continue,
                            }
                        }
                        Some(JSXAttributeValue::Element(element)) => {
                            AttrValue::Element(Box::new(Self::from_element(source, element)))
                        }
                        Some(JSXAttributeValue::Fragment(fragment)) => {
                            AttrValue::Element(Box::new(Self::Fragment(copy_children(source, &fragment.children))))
                        }
                    };
                    attributes.push(JsxAttribute::Named {
                        name: attribute_name(&attribute.name),
                        value,
                    });
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    attributes.push(JsxAttribute::Spread(text_of(source, &spread.argument)));
                }
            }
        }

        Self::Element(JsxElement {
            name: opening.name.to_string(),
            attributes,
            children: copy_children(source, &element.children),
            self_closing: element.closing_element.is_none(),
        })
    }
}

fn copy_children(source: &str, children: &[JSXChild<'_>]) -> Vec<JsxNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match child {
            JSXChild::Text(text) => {
                let cleaned = decode_entities(&clean_jsx_text(text.value.as_str()));
                if !cleaned.is_empty() {
                    out.push(JsxNode::Text(cleaned));
                }
            }
            JSXChild::Element(element) => out.push(JsxNode::from_element(source, element)),
            JSXChild::Fragment(fragment) => out.push(JsxNode::Fragment(copy_children(source, &fragment.children))),
            JSXChild::ExpressionContainer(container) => {
                if let Some(text) = expression_text(source, &container.expression) {
                    out.push(JsxNode::Expression(text));
                }
            }
            JSXChild::Spread(spread) => {
                out.push(JsxNode::Expression(format!("...{}", text_of(source, &spread.expression))));
            }
        }
    }
    out
}

/// Attribute names as written, `xlink:href` included.
pub(crate) fn attribute_name(name: &JSXAttributeName<'_>) -> String {
    match name {
        JSXAttributeName::Identifier(identifier) => identifier.name.to_string(),
        JSXAttributeName::NamespacedName(namespaced) => namespaced.to_string(),
    }
}

/// `None` for `{}` and comment-only containers.
fn expression_text(source: &str, expression: &JSXExpression<'_>) -> Option<String> {
    expression.as_expression().map(|e| text_of(source, e))
}

fn text_of(source: &str, expression: &Expression<'_>) -> String {
    expression
        .without_parentheses()
        .span()
        .source_text(source)
        .trim()
        .to_string()
}


/// Apply JSX whitespace rules to a raw text run.
///
/// Lines are trimmed where they meet a line break, blank lines are dropped
/// and the surviving lines are joined with single spaces. Text without line
/// breaks is kept as-is.
pub fn clean_jsx_text(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|l| l.chars().any(|c| c != ' ' && c != '\t'));

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut trimmed = line.replace('\t', " ");
        if i != 0 {
            trimmed = trimmed.trim_start_matches(' ').to_string();
        }
        if i != lines.len() - 1 {
            trimmed = trimmed.trim_end_matches(' ').to_string();
        }
        if !trimmed.is_empty() {
            out.push_str(&trimmed);
            if Some(i) != last_non_empty {
                out.push(' ');
            }
        }
    }
    out
}

/// Decode the HTML entities JSX text and attribute strings may contain.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate.find(';').and_then(|semi| {
            let entity = &candidate[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse, MODULE_SOURCE};
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;
    use pretty_assertions::assert_eq;

    /// Tree of the JSX in a single expression statement.
    fn tree(source: &str) -> JsxNode {
        let allocator = Allocator::default();
        let program = parse(&allocator, source, MODULE_SOURCE).unwrap();
        let Some(Statement::ExpressionStatement(statement)) = program.body.first() else {
            panic!("expected an expression statement");
        };
        JsxNode::from_expression(source, &statement.expression).unwrap()
    }

    #[test]
    fn copies_nested_elements_and_attributes() {
        let node = tree(
            r#"(<div>
				<h1>{this.state.message}</h1>
			<input type="text" value={ (this.state.message) } onChange={ this.handleChange.bind(this) } />
		</div>);"#,
        );

        let JsxNode::Element(div) = node else {
            panic!("expected element");
        };
        assert_eq!(div.name, "div");
        assert_eq!(div.children.len(), 2);

        let JsxNode::Element(input) = &div.children[1] else {
            panic!("expected input element");
        };
        assert!(input.self_closing);
        assert_eq!(
            input.attributes[1],
            JsxAttribute::Named {
                name: "value".to_string(),
                value: AttrValue::Expression("this.state.message".to_string()),
            }
        );
    }

    #[test]
    fn copies_fragments_and_spreads() {
        let node = tree("<><Item {...props} key=\"a\" /></>;");

        let JsxNode::Fragment(children) = node else {
            panic!("expected fragment");
        };
        let JsxNode::Element(item) = &children[0] else {
            panic!("expected element");
        };
        assert_eq!(item.attributes[0], JsxAttribute::Spread("props".to_string()));
        assert!(!item.is_intrinsic());
    }

    #[test]
    fn expression_children_keep_their_source() {
        let node = tree("<ul>{items.map(i => <li title='it&apos;s'>{i}</li>)}</ul>;");

        let JsxNode::Element(ul) = node else {
            panic!("expected element");
        };
        assert_eq!(
            ul.children,
            vec![JsxNode::Expression("items.map(i => <li title='it&apos;s'>{i}</li>)".to_string())]
        );
    }

    #[test]
    fn drops_comment_only_expressions() {
        let node = tree("<p>{/* note */}hi &amp; bye</p>;");

        let JsxNode::Element(p) = node else {
            panic!("expected element");
        };
        assert_eq!(p.children, vec![JsxNode::Text("hi & bye".to_string())]);
    }

    #[test]
    fn member_and_namespaced_names() {
        let JsxNode::Element(element) = tree("<Foo.Bar xlink:href=\"#a\" />;") else {
            panic!("expected element");
        };

        assert_eq!(element.name, "Foo.Bar");
        assert!(!element.is_intrinsic());
        assert!(matches!(&element.attributes[0], JsxAttribute::Named { name, .. } if name == "xlink:href"));
    }

    #[test]
    fn classifies_tag_names() {
        assert!(is_intrinsic("div"));
        assert!(is_intrinsic("my-widget"));
        assert!(!is_intrinsic("Navigation"));
        assert!(!is_intrinsic("this.props.as"));
    }

    #[test]
    fn cleans_multiline_text() {
        assert_eq!(clean_jsx_text("\n   Hello\n   world  \n"), "Hello world");
        assert_eq!(clean_jsx_text("  keep  inline "), "  keep  inline ");
        assert_eq!(clean_jsx_text("\n\t\t\n"), "");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("a &amp; b &#65;&#x42; &unknown;"), "a & b AB &unknown;");
    }
}
