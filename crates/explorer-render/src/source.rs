//! Components backed by JSX source files.
//!
//! A page module is analysed statically rather than executed: the default
//! export's declared title, initial state, default props, the JSX returned
//! from `render()` and its lifecycle hooks are read from the oxc AST, and
//! imported child components are loaded the same way. Rendering then
//! evaluates the JSX tree against state and props.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use explorer_js::{parse, AttrValue, JsxAttribute, JsxElement, JsxNode, Resolver, MODULE_SOURCE};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrowFunctionExpression, AssignmentTarget, CallExpression, Class, ClassElement, Declaration,
    ExportDefaultDeclarationKind, Expression, Function, FunctionBody, ImportDeclarationSpecifier,
    MethodDefinitionKind, ObjectPropertyKind, Program, PropertyDefinition, Statement, UnaryOperator,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::GetSpan;
use regex::Regex;

use crate::component::{ClientContext, Component, RenderContext, RenderError};
use crate::markup::{is_void_element, Element, Node};
use crate::value::{Props, Value};

static MEMBER_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:this\.)?(props|state)\.([A-Za-z_$][\w$]*)$").expect("valid regex")
});

/// Client lifecycle hooks a component may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    DidMount,
    DidUpdate,
    WillUnmount,
}

impl LifecycleHook {
    fn from_method(name: &str) -> Option<Self> {
        match name {
            "componentDidMount" => Some(Self::DidMount),
            "componentDidUpdate" => Some(Self::DidUpdate),
            "componentWillUnmount" => Some(Self::WillUnmount),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentKind {
    Class,
    Function,
}

/// A component loaded from a `.jsx` module.
#[derive(Debug)]
pub struct JsxComponent {
    name: String,
    path: PathBuf,
    kind: ComponentKind,
    title: Option<String>,
    state: Props,
    default_props: Props,
    /// `None` when `render()` returns `null`.
    template: Option<JsxNode>,
    /// Each hook with the literal `alert` messages its body raises.
    hooks: Vec<(LifecycleHook, Vec<String>)>,
    imports: HashMap<String, Arc<JsxComponent>>,
}

impl JsxComponent {
    /// Load the default-exported component of a module, with its local imports.
    pub fn load(path: &Path) -> Result<Arc<Self>, RenderError> {
        let root = path.parent().unwrap_or(Path::new("."));
        let mut loader = Loader {
            resolver: Resolver::new(root),
            stack: Vec::new(),
            cache: HashMap::new(),
        };
        loader.load(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lifecycle hooks declared by this component.
    pub fn hooks(&self) -> Vec<LifecycleHook> {
        self.hooks.iter().map(|(hook, _)| *hook).collect()
    }

    fn unsupported(&self, expression: &str) -> RenderError {
        RenderError::UnsupportedExpression {
            component: self.name.clone(),
            expression: expression.to_string(),
        }
    }
}

impl Component for JsxComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn render(&self, ctx: &RenderContext) -> Result<Node, RenderError> {
        let Some(template) = &self.template else {
            return Ok(Node::empty());
        };

        let mut props = self.default_props.clone();
        props.extend(ctx.props.iter().map(|(k, v)| (k.clone(), v.clone())));

        let scope = Scope {
            component: self,
            props: &props,
            children: &ctx.children,
        };
        scope.render_node(template)
    }

    fn did_mount(&self, client: &mut ClientContext<'_>) {
        for (hook, messages) in &self.hooks {
            if *hook != LifecycleHook::DidMount {
                continue;
            }
            for message in messages {
                client.alert(message);
            }
        }
    }
}

struct Loader {
    resolver: Resolver,
    stack: Vec<PathBuf>,
    cache: HashMap<PathBuf, Arc<JsxComponent>>,
}

impl Loader {
    fn load(&mut self, path: &Path) -> Result<Arc<JsxComponent>, RenderError> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(Arc::clone(cached));
        }
        if self.stack.contains(&key) {
            return Err(RenderError::ImportCycle(path.to_path_buf()));
        }

        let source = fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.stack.push(key.clone());
        let analysed = self.analyse(path, &source);
        self.stack.pop();

        let component = Arc::new(analysed?);
        tracing::debug!(
            "Loaded component {} from {} ({} imports)",
            component.name,
            path.display(),
            component.imports.len()
        );
        self.cache.insert(key, Arc::clone(&component));
        Ok(component)
    }

    fn analyse(&mut self, path: &Path, source: &str) -> Result<JsxComponent, RenderError> {
        let allocator = Allocator::default();
        let program = parse(&allocator, source, MODULE_SOURCE)?;
        let file_stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Component");

        let (name, declared) =
            default_export(&program, file_stem).ok_or_else(|| RenderError::NoComponent(path.to_path_buf()))?;

        let mut title = None;
        let mut state = Props::new();
        let mut default_props = None;
        let mut hooks = Vec::new();

        let (kind, render) = match declared {
            Declared::Class(class) => {
                let mut render = None;
                for element in &class.body.body {
                    match element {
                        ClassElement::PropertyDefinition(property) => {
                            let Some(value) = &property.value else {
                                continue;
                            };
                            match (property.r#static, property_name(property).as_deref()) {
                                (true, Some("title")) => title = string_value(value),
                                (true, Some("defaultProps")) => default_props = Some(object_props(value)),
                                (false, Some("state")) => state = object_props(value),
                                _ => {}
                            }
                        }
                        ClassElement::MethodDefinition(method) if !method.r#static => {
                            let Some(body) = &method.value.body else {
                                continue;
                            };
                            if method.kind == MethodDefinitionKind::Constructor {
                                if let Some(initial) = constructor_state(body) {
                                    state = initial;
                                }
                                continue;
                            }
                            let Some(method_name) = method.key.static_name() else {
                                continue;
                            };
                            if method_name == "render" {
                                render = Some(Render::Body(body));
                            } else if let Some(hook) = LifecycleHook::from_method(&method_name) {
                                let mut alerts = Alerts::default();
                                alerts.visit_function_body(body);
                                hooks.push((hook, alerts.messages));
                            }
                        }
                        _ => {}
                    }
                }
                let render = render.ok_or_else(|| RenderError::MissingRender { component: name.clone() })?;
                (ComponentKind::Class, render)
            }
            Declared::Function(function) => {
                let body = function
                    .body
                    .as_deref()
                    .ok_or_else(|| RenderError::MissingRender { component: name.clone() })?;
                (ComponentKind::Function, Render::Body(body))
            }
            Declared::Arrow(arrow) => (ComponentKind::Function, Render::Arrow(arrow)),
        };

        if title.is_none() {
            title = member_assignment(&program, &name, "title").and_then(string_value);
        }
        let default_props = default_props
            .or_else(|| member_assignment(&program, &name, "defaultProps").map(object_props))
            .unwrap_or_default();

        let template = render.template(source, &name)?;

        let mut imports = HashMap::new();
        for statement in &program.body {
            let Statement::ImportDeclaration(import) = statement else {
                continue;
            };
            let request = import.source.value.as_str();
            if !(request.starts_with("./") || request.starts_with("../")) {
                continue;
            }
            let default_local = import.specifiers.iter().flatten().find_map(|specifier| match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => Some(s.local.name.to_string()),
                _ => None,
            });
            let Some(local) = default_local.filter(|local| local.starts_with(|c: char| c.is_ascii_uppercase()))
            else {
                continue;
            };
            let resolved = self.resolver.resolve(request, path)?;
            let child = self.load(resolved.path())?;
            imports.insert(local, child);
        }

        Ok(JsxComponent {
            name,
            path: path.to_path_buf(),
            kind,
            title,
            state,
            default_props,
            template,
            hooks,
            imports,
        })
    }
}

/// A component definition in the AST.
enum Declared<'p, 'a> {
    Class(&'p Class<'a>),
    Function(&'p Function<'a>),
    Arrow(&'p ArrowFunctionExpression<'a>),
}

impl<'p, 'a> Declared<'p, 'a> {
    fn from_expression(expression: &'p Expression<'a>) -> Option<Self> {
        match expression.without_parentheses() {
            Expression::ClassExpression(class) => Some(Self::Class(class)),
            Expression::FunctionExpression(function) => Some(Self::Function(function)),
            Expression::ArrowFunctionExpression(arrow) => Some(Self::Arrow(arrow)),
            _ => None,
        }
    }
}

/// Where a component's render output is returned from.
enum Render<'p, 'a> {
    Body(&'p FunctionBody<'a>),
    Arrow(&'p ArrowFunctionExpression<'a>),
}

impl Render<'_, '_> {
    /// The JSX returned at the top level of the render body.
    fn template(&self, source: &str, component: &str) -> Result<Option<JsxNode>, RenderError> {
        let returned = match self {
            Render::Arrow(arrow) if arrow.expression => match arrow.body.statements.first() {
                Some(Statement::ExpressionStatement(statement)) => Some(Some(&statement.expression)),
                _ => None,
            },
            Render::Arrow(arrow) => returned_expression(&arrow.body),
            Render::Body(body) => returned_expression(body),
        };

        let Some(returned) = returned else {
            return Err(RenderError::MissingRender {
                component: component.to_string(),
            });
        };

        match returned.map(|e| e.without_parentheses()) {
            None | Some(Expression::NullLiteral(_)) => Ok(None),
            Some(expression) => JsxNode::from_expression(source, expression).map(Some).ok_or_else(|| {
                RenderError::UnsupportedExpression {
                    component: component.to_string(),
                    expression: expression.span().source_text(source).to_string(),
                }
            }),
        }
    }
}

/// The argument of the first top-level `return`, if there is one.
fn returned_expression<'p, 'a>(body: &'p FunctionBody<'a>) -> Option<Option<&'p Expression<'a>>> {
    body.statements.iter().find_map(|statement| match statement {
        Statement::ReturnStatement(ret) => Some(ret.argument.as_ref()),
        _ => None,
    })
}

/// Find the default export and its name.
fn default_export<'p, 'a>(program: &'p Program<'a>, fallback_name: &str) -> Option<(String, Declared<'p, 'a>)> {
    for statement in &program.body {
        let exported = match statement {
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    let name = class.id.as_ref().map(|id| id.name.to_string());
                    return Some((name.unwrap_or_else(|| fallback_name.to_string()), Declared::Class(class)));
                }
                ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                    let name = function.id.as_ref().map(|id| id.name.to_string());
                    return Some((name.unwrap_or_else(|| fallback_name.to_string()), Declared::Function(function)));
                }
                other => other.as_expression(),
            },
            Statement::ExpressionStatement(statement) => match &statement.expression {
                Expression::AssignmentExpression(assignment) if is_module_exports(&assignment.left) => {
                    Some(&assignment.right)
                }
                _ => None,
            },
            _ => None,
        };

        let Some(expression) = exported else {
            continue;
        };
        if let Expression::Identifier(id) = expression.without_parentheses() {
            let name = id.name.to_string();
            return top_level_definition(program, &name).map(|declared| (name, declared));
        }
        return Declared::from_expression(expression).map(|declared| (fallback_name.to_string(), declared));
    }
    None
}

fn is_module_exports(target: &AssignmentTarget<'_>) -> bool {
    matches!(target, AssignmentTarget::StaticMemberExpression(member)
        if member.object.is_specific_id("module") && member.property.name == "exports")
}

/// The class or function a top-level binding called `name` defines.
fn top_level_definition<'p, 'a>(program: &'p Program<'a>, name: &str) -> Option<Declared<'p, 'a>> {
    program.body.iter().find_map(|statement| {
        let declaration = match statement {
            Statement::ExportNamedDeclaration(export) => export.declaration.as_ref()?,
            other => other.as_declaration()?,
        };
        match declaration {
            Declaration::ClassDeclaration(class) if class.id.as_ref().is_some_and(|id| id.name == name) => {
                Some(Declared::Class(class))
            }
            Declaration::FunctionDeclaration(function)
                if function.id.as_ref().is_some_and(|id| id.name == name) =>
            {
                Some(Declared::Function(function))
            }
            Declaration::VariableDeclaration(vars) => vars.declarations.iter().find_map(|declarator| {
                let binding = declarator.id.get_binding_identifier()?;
                if binding.name != name {
                    return None;
                }
                Declared::from_expression(declarator.init.as_ref()?)
            }),
            _ => None,
        }
    })
}

/// Right-hand side of a top-level `object.member = value` statement.
fn member_assignment<'p, 'a>(program: &'p Program<'a>, object: &str, member: &str) -> Option<&'p Expression<'a>> {
    program.body.iter().find_map(|statement| {
        let Statement::ExpressionStatement(statement) = statement else {
            return None;
        };
        let Expression::AssignmentExpression(assignment) = &statement.expression else {
            return None;
        };
        match &assignment.left {
            AssignmentTarget::StaticMemberExpression(target)
                if target.object.is_specific_id(object) && target.property.name == member =>
            {
                Some(&assignment.right)
            }
            _ => None,
        }
    })
}

/// `this.state = {...}` at the top level of a constructor.
fn constructor_state(body: &FunctionBody<'_>) -> Option<Props> {
    body.statements.iter().find_map(|statement| {
        let Statement::ExpressionStatement(statement) = statement else {
            return None;
        };
        let Expression::AssignmentExpression(assignment) = &statement.expression else {
            return None;
        };
        match &assignment.left {
            AssignmentTarget::StaticMemberExpression(target)
                if matches!(target.object, Expression::ThisExpression(_)) && target.property.name == "state" =>
            {
                Some(object_props(&assignment.right))
            }
            _ => None,
        }
    })
}

fn property_name(property: &PropertyDefinition<'_>) -> Option<String> {
    if property.computed {
        return None;
    }
    property.key.static_name().map(|name| name.to_string())
}

/// Literal entries of an object expression.
///
/// Entries with non-literal values (functions, computed values) are skipped.
fn object_props(expression: &Expression<'_>) -> Props {
    let mut props = Props::new();
    let Expression::ObjectExpression(object) = expression.without_parentheses() else {
        return props;
    };

    for property in &object.properties {
        let ObjectPropertyKind::ObjectProperty(property) = property else {
            continue;
        };
        let Some(key) = property.key.static_name().filter(|_| !property.computed) else {
            continue;
        };
        match literal_value(&property.value) {
            Some(value) => {
                props.insert(key.to_string(), value);
            }
            None => tracing::debug!("Skipping non-literal entry '{}'", key),
        }
    }

    props
}

fn string_value(expression: &Expression<'_>) -> Option<String> {
    match literal_value(expression)? {
        Value::Str(s) => Some(s),
        _ => None,
    }
}

/// A string, number, boolean, `null` or `undefined` literal.
fn literal_value(expression: &Expression<'_>) -> Option<Value> {
    match expression.without_parentheses() {
        Expression::StringLiteral(s) => Some(Value::Str(s.value.to_string())),
        Expression::NumericLiteral(n) => Some(Value::Number(n.value)),
        Expression::BooleanLiteral(b) => Some(Value::Bool(b.value)),
        Expression::NullLiteral(_) => Some(Value::Null),
        Expression::Identifier(id) if id.name == "undefined" => Some(Value::Null),
        Expression::TemplateLiteral(template) if template.expressions.is_empty() => template
            .quasis
            .first()
            .and_then(|quasi| quasi.value.cooked.as_ref())
            .map(|cooked| Value::Str(cooked.to_string())),
        Expression::UnaryExpression(unary) if unary.operator == UnaryOperator::UnaryNegation => {
            match literal_value(&unary.argument)? {
                Value::Number(n) => Some(Value::Number(-n)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Literal messages passed to `alert`, `window.alert` or `global.alert`.
#[derive(Default)]
struct Alerts {
    messages: Vec<String>,
}

impl<'a> Visit<'a> for Alerts {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        let callee = it.callee.without_parentheses();
        let is_alert = callee.is_specific_id("alert")
            || callee.is_specific_member_access("window", "alert")
            || callee.is_specific_member_access("global", "alert");
        if is_alert {
            if let [Argument::StringLiteral(message)] = &it.arguments[..] {
                self.messages.push(message.value.to_string());
            }
        }
        walk::walk_call_expression(self, it);
    }
}

/// Evaluation scope for one component render.
struct Scope<'a> {
    component: &'a JsxComponent,
    props: &'a Props,
    children: &'a [Node],
}

impl Scope<'_> {
    fn render_node(&self, node: &JsxNode) -> Result<Node, RenderError> {
        match node {
            JsxNode::Text(text) => Ok(Node::Text(text.clone())),
            JsxNode::Fragment(children) => Ok(Node::Fragment(self.render_children(children)?)),
            JsxNode::Expression(expression) => self.render_expression(expression),
            JsxNode::Element(element) if element.is_intrinsic() => self.render_intrinsic(element),
            JsxNode::Element(element) => self.render_component(element),
        }
    }

    fn render_children(&self, children: &[JsxNode]) -> Result<Vec<Node>, RenderError> {
        children.iter().map(|child| self.render_node(child)).collect()
    }

    fn render_expression(&self, expression: &str) -> Result<Node, RenderError> {
        if matches!(expression, "this.props.children" | "props.children" | "children") {
            return Ok(Node::Fragment(self.children.to_vec()));
        }
        let value = self.evaluate(expression)?;
        Ok(value.as_text().map(Node::Text).unwrap_or_else(Node::empty))
    }

    fn render_intrinsic(&self, element: &JsxElement) -> Result<Node, RenderError> {
        let mut out = Element::new(element.name.clone());

        for attribute in &element.attributes {
            match attribute {
                JsxAttribute::Named { name, value } => {
                    if is_client_only_attribute(name) {
                        continue;
                    }
                    let rendered = match value {
                        AttrValue::Boolean => Some(String::new()),
                        AttrValue::String(s) => Some(s.clone()),
                        AttrValue::Expression(expression) => attribute_text(self.evaluate(expression)?),
                        AttrValue::Element(_) => return Err(self.component.unsupported(name)),
                    };
                    if let Some(rendered) = rendered {
                        out.set_attribute(html_attribute_name(name), rendered);
                    }
                }
                JsxAttribute::Spread(expression) => {
                    for (name, value) in self.spread(expression)? {
                        if is_client_only_attribute(name) {
                            continue;
                        }
                        if let Some(rendered) = attribute_text(value.clone()) {
                            out.set_attribute(html_attribute_name(name), rendered);
                        }
                    }
                }
            }
        }

        if !is_void_element(&element.name) {
            out.children = self.render_children(&element.children)?;
        }
        Ok(out.into())
    }

    fn render_component(&self, element: &JsxElement) -> Result<Node, RenderError> {
        if matches!(element.name.as_str(), "React.Fragment" | "Fragment") {
            return Ok(Node::Fragment(self.render_children(&element.children)?));
        }

        let child = self
            .component
            .imports
            .get(&element.name)
            .ok_or_else(|| RenderError::UnknownComponent {
                component: self.component.name.clone(),
                name: element.name.clone(),
            })?;

        let mut props = Props::new();
        for attribute in &element.attributes {
            match attribute {
                JsxAttribute::Named { name, value } => {
                    if matches!(name.as_str(), "key" | "ref") {
                        continue;
                    }
                    let value = match value {
                        AttrValue::Boolean => Value::Bool(true),
                        AttrValue::String(s) => Value::Str(s.clone()),
                        AttrValue::Expression(expression) => self.evaluate(expression)?,
                        AttrValue::Element(_) => return Err(self.component.unsupported(name)),
                    };
                    props.insert(name.clone(), value);
                }
                JsxAttribute::Spread(expression) => {
                    for (name, value) in self.spread(expression)? {
                        props.insert(name.clone(), value.clone());
                    }
                }
            }
        }

        let ctx = RenderContext::new(props).with_children(self.render_children(&element.children)?);
        child.render(&ctx)
    }

    fn spread(&self, expression: &str) -> Result<&Props, RenderError> {
        match expression {
            "this.props" | "props" => Ok(self.props),
            "this.state" => Ok(&self.component.state),
            _ => Err(self.component.unsupported(&format!("...{expression}"))),
        }
    }

    fn evaluate(&self, expression: &str) -> Result<Value, RenderError> {
        if let Some(value) = Value::parse_literal(expression) {
            return Ok(value);
        }

        let lookup = |map: &Props, key: &str| map.get(key).cloned().unwrap_or(Value::Null);

        if let Some(captures) = MEMBER_PATH.captures(expression) {
            let map = if &captures[1] == "state" {
                &self.component.state
            } else {
                self.props
            };
            return Ok(lookup(map, &captures[2]));
        }
        if self.component.kind == ComponentKind::Function && is_identifier(expression) {
            return Ok(lookup(self.props, expression));
        }

        Err(self.component.unsupported(expression))
    }
}

fn attribute_text(value: Value) -> Option<String> {
    match value {
        Value::Bool(true) => Some(String::new()),
        Value::Bool(false) | Value::Null => None,
        other => other.as_text(),
    }
}

fn html_attribute_name(name: &str) -> &str {
    match name {
        "className" => "class",
        "htmlFor" => "for",
        other => other,
    }
}

/// Attributes that only matter to the client runtime.
fn is_client_only_attribute(name: &str) -> bool {
    let is_handler = name
        .strip_prefix("on")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()));
    is_handler || matches!(name, "key" | "ref" | "children")
}

fn is_identifier(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
