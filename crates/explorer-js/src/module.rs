//! ES module to CommonJS lowering.
//!
//! Module sources are parsed with oxc and rewritten in place: import
//! declarations become `require` calls, exports become assignments on
//! `exports` and JSX becomes factory calls. All rewrites are span edits
//! against the original text, so everything outside them is emitted untouched.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, Declaration, Expression, ExportDefaultDeclarationKind, ExportNamedDeclaration,
    ImportDeclaration, ImportDeclarationSpecifier, ModuleExportName, Program, Statement,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::GetSpan;

use crate::lower::{js_string, splice, Edit, JsxLowering, LowerOptions};
use crate::parse::{parse, SyntaxError, MODULE_SOURCE, SCRIPT_SOURCE};

/// Name of the helper the bundle prelude defines for default-import interop.
pub const DEFAULT_INTEROP_HELPER: &str = "__explorerDefault";

const ES_MODULE_MARKER: &str = "Object.defineProperty(exports, \"__esModule\", { value: true });";

/// A module lowered to CommonJS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredModule {
    /// CommonJS code with JSX lowered.
    pub code: String,

    /// Distinct `require` requests in first-occurrence order.
    pub requests: Vec<String>,
}

/// Errors produced while lowering a module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Unsupported module syntax: {0}")]
    Unsupported(String),
}

/// Lower an ES module (with JSX) to CommonJS.
pub fn lower_module(source: &str, options: &LowerOptions) -> Result<LoweredModule, ModuleError> {
    let allocator = Allocator::default();
    let program = parse(&allocator, source, MODULE_SOURCE)?;

    let mut edits = JsxLowering::new(source, options).program(&program)?;
    let mut trailer = Vec::new();
    let mut imports = 0usize;
    let mut is_es_module = false;

    for statement in &program.body {
        let span = statement.span();
        let (start, end) = (span.start as usize, span.end as usize);

        match statement {
            Statement::ImportDeclaration(decl) => {
                is_es_module = true;
                let request = js_string(decl.source.value.as_str());

                let Some(specifiers) = decl.specifiers.as_ref().filter(|s| !s.is_empty()) else {
                    edits.push(Edit::replace(span, format!("require({request});")));
                    continue;
                };

                let binding = format!("_import{imports}");
                imports += 1;
                let mut out = format!("var {binding} = require({request});");
                for specifier in specifiers {
                    match specifier {
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            out.push_str(&format!(
                                " var {} = {DEFAULT_INTEROP_HELPER}({binding});",
                                s.local.name
                            ));
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            out.push_str(&format!(" var {} = {binding};", s.local.name));
                        }
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            let imported = export_name(&s.imported);
                            let value = if imported == "default" {
                                format!("{DEFAULT_INTEROP_HELPER}({binding})")
                            } else {
                                member(&binding, &imported)
                            };
                            out.push_str(&format!(" var {} = {value};", s.local.name));
                        }
                    }
                }
                edits.push(Edit::replace(span, out));
            }

            Statement::ExportDefaultDeclaration(decl) => {
                is_es_module = true;
                let inner_start = decl.declaration.span().start as usize;

                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                        Some(f.id.as_ref().map(|id| id.name.to_string()))
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                        Some(c.id.as_ref().map(|id| id.name.to_string()))
                    }
                    _ => None,
                };

                let needs_semicolon = match named {
                    Some(Some(name)) => {
                        edits.push(prefix(start, inner_start, ""));
                        trailer.push(format!("exports.default = {name};"));
                        false
                    }
                    Some(None) => {
                        edits.push(prefix(start, inner_start, "exports.default = "));
                        true
                    }
                    None => {
                        edits.push(prefix(start, inner_start, "exports.default = "));
                        !source[start..end].trim_end().ends_with(';')
                    }
                };
                if needs_semicolon {
                    edits.push(Edit::insert(end, ";"));
                }
            }

            Statement::ExportNamedDeclaration(decl) => {
                is_es_module = true;

                if let Some(declaration) = &decl.declaration {
                    edits.push(prefix(start, declaration.span().start as usize, ""));
                    for name in declared_names(declaration)? {
                        trailer.push(format!("{} = {name};", member("exports", &name)));
                    }
                    continue;
                }

                let mut out = String::new();
                match &decl.source {
                    Some(source_literal) => {
                        let binding = format!("_import{imports}");
                        imports += 1;
                        out.push_str(&format!(
                            "var {binding} = require({});",
                            js_string(source_literal.value.as_str())
                        ));
                        for specifier in &decl.specifiers {
                            let local = export_name(&specifier.local);
                            let exported = export_name(&specifier.exported);
                            let value = if local == "default" {
                                format!("{DEFAULT_INTEROP_HELPER}({binding})")
                            } else {
                                member(&binding, &local)
                            };
                            out.push_str(&format!(" {} = {value};", member("exports", &exported)));
                        }
                    }
                    None => {
                        for specifier in &decl.specifiers {
                            let local = export_name(&specifier.local);
                            let exported = export_name(&specifier.exported);
                            trailer.push(format!("{} = {local};", member("exports", &exported)));
                        }
                    }
                }
                edits.push(Edit::replace(span, out));
            }

            Statement::ExportAllDeclaration(_) => {
                return Err(ModuleError::Unsupported(format!(
                    "`export *` is not supported: {}",
                    source[start..end].trim()
                )));
            }

            _ => {}
        }
    }

    if is_es_module {
        edits.push(marker(&program));
    }

    let mut code = splice(source, 0, edits);
    if is_es_module && !trailer.is_empty() {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&trailer.join("\n"));
        code.push('\n');
    }

    let mut requests = Requests::default();
    requests.visit_program(&program);

    Ok(LoweredModule {
        code,
        requests: requests.found,
    })
}

/// The `__esModule` marker goes after the directive prologue and any hashbang.
fn marker(program: &Program<'_>) -> Edit {
    if let Some(directive) = program.directives.last() {
        return Edit::insert(directive.span.end as usize, format!("\n{ES_MODULE_MARKER}"));
    }
    if let Some(hashbang) = &program.hashbang {
        return Edit::insert(hashbang.span.end as usize, format!("\n{ES_MODULE_MARKER}"));
    }
    Edit::insert(0, format!("{ES_MODULE_MARKER} "))
}

fn prefix(start: usize, end: usize, replacement: &str) -> Edit {
    Edit {
        start,
        end,
        replacement: replacement.to_string(),
    }
}

/// Collect distinct static `require("...")` requests from CommonJS source.
///
/// Only calls whose single argument is a string literal are reported, and
/// member calls like `obj.require("x")` are ignored.
pub fn collect_requires(source: &str) -> Result<Vec<String>, SyntaxError> {
    let allocator = Allocator::default();
    let program = parse(&allocator, source, SCRIPT_SOURCE)?;

    let mut requests = Requests::default();
    requests.visit_program(&program);
    Ok(requests.found)
}

/// Module requests in source order: imports, re-exports and static requires.
#[derive(Default)]
struct Requests {
    found: Vec<String>,
}

impl Requests {
    fn add(&mut self, request: &str) {
        if !self.found.iter().any(|r| r == request) {
            self.found.push(request.to_string());
        }
    }
}

impl<'a> Visit<'a> for Requests {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        self.add(it.source.value.as_str());
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source {
            self.add(source.value.as_str());
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let (Expression::Identifier(callee), [Argument::StringLiteral(request)]) =
            (&it.callee, &it.arguments[..])
        {
            if callee.name == "require" {
                self.add(request.value.as_str());
            }
        }
        walk::walk_call_expression(self, it);
    }
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    name.name().to_string()
}

fn declared_names(declaration: &Declaration<'_>) -> Result<Vec<String>, ModuleError> {
    match declaration {
        Declaration::VariableDeclaration(vars) => vars
            .declarations
            .iter()
            .map(|declarator| {
                declarator
                    .id
                    .get_binding_identifier()
                    .map(|id| id.name.to_string())
                    .ok_or_else(|| {
                        ModuleError::Unsupported("destructuring in exported declarations".to_string())
                    })
            })
            .collect(),
        Declaration::FunctionDeclaration(f) => Ok(f.id.iter().map(|id| id.name.to_string()).collect()),
        Declaration::ClassDeclaration(c) => Ok(c.id.iter().map(|id| id.name.to_string()).collect()),
        _ => Ok(Vec::new()),
    }
}

fn member(object: &str, property: &str) -> String {
    let is_identifier = property
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && property.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        format!("{object}.{property}")
    } else {
        format!("{object}[{}]", js_string(property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lower(source: &str) -> LoweredModule {
        lower_module(source, &LowerOptions::default()).unwrap()
    }

    #[test]
    fn rewrites_default_and_named_imports() {
        let module = lower("import React, { Component as Base } from 'react';\nvar x = 1;\n");

        assert!(module
            .code
            .contains("var _import0 = require(\"react\"); var React = __explorerDefault(_import0); var Base = _import0.Component;"));
        assert!(module.code.ends_with("\nvar x = 1;\n"));
        assert_eq!(module.requests, vec!["react".to_string()]);
    }

    #[test]
    fn exports_named_default_class_after_body() {
        let module = lower("export default class About {\n  render() { return <h1>About</h1>; }\n}\n");

        assert!(module.code.contains("class About {"));
        assert!(!module.code.contains("export default"));
        assert!(module.code.contains("React.createElement(\"h1\", null, \"About\")"));
        assert!(module.code.trim_end().ends_with("exports.default = About;"));
        assert!(module.code.starts_with("Object.defineProperty(exports, \"__esModule\""));
    }

    #[test]
    fn anonymous_default_export_becomes_assignment() {
        let module = lower("export default function () { return 1; }\n");

        assert!(module.code.contains("exports.default = function () { return 1; };"));
    }

    #[test]
    fn default_expression_export() {
        let module = lower("const a = 1;\nexport default a\n");

        assert!(module.code.contains("exports.default = a;"));
    }

    #[test]
    fn named_declarations_and_specifiers() {
        let module = lower("export const a = 1, b = 2;\nfunction c() {}\nexport { c as d };\n");

        assert!(module.code.contains("const a = 1, b = 2;"));
        assert!(module.code.contains("exports.a = a;"));
        assert!(module.code.contains("exports.b = b;"));
        assert!(module.code.contains("exports.d = c;"));
    }

    #[test]
    fn re_exports_require_the_source() {
        let module = lower("export { default as Navigation, helper } from './navigation/Navigation';\n");

        assert!(module.code.contains("require(\"./navigation/Navigation\")"));
        assert!(module.code.contains("exports.Navigation = __explorerDefault(_import0);"));
        assert!(module.code.contains("exports.helper = _import0.helper;"));
        assert_eq!(module.requests, vec!["./navigation/Navigation".to_string()]);
    }

    #[test]
    fn export_star_is_rejected() {
        let err = lower_module("export * from './x';", &LowerOptions::default()).unwrap_err();

        assert!(matches!(err, ModuleError::Unsupported(_)));
    }

    #[test]
    fn invalid_syntax_is_reported() {
        let err = lower_module("const = ;", &LowerOptions::default()).unwrap_err();

        assert!(matches!(err, ModuleError::Syntax(_)));
    }

    #[test]
    fn collect_requires_reports_syntax_errors() {
        assert!(collect_requires("var = ;").is_err());
    }

    #[test]
    fn lowers_jsx_in_nested_expression_positions() {
        let module = lower(
            "const s = `${<b>x</b>}`;\nconst t = c ? <a /> : <i>y</i>;\nconst u = cond && <em />;\n",
        );

        assert!(module.code.contains("`${React.createElement(\"b\", null, \"x\")}`"));
        assert!(module
            .code
            .contains("c ? React.createElement(\"a\", null) : React.createElement(\"i\", null, \"y\")"));
        assert!(module.code.contains("cond && React.createElement(\"em\", null)"));
        assert!(!module.code.contains('<'));
    }

    #[test]
    fn operators_next_to_slashes_and_angles_pass_through() {
        let source = "let i = 0, n = 4, a = 1, b = 2;\n\
                      const half = i++ / 2;\n\
                      while (i-- < n) {}\n\
                      while (i++<n) {}\n\
                      const q = (a) / b / (n);\n\
                      if (true) /'/.test('a');\n";
        let module = lower(source);

        assert_eq!(module.code, source);
    }

    #[test]
    fn jsx_next_to_postfix_operators() {
        let module = lower("let i = 0;\nconst el = <p>{i++ / 2}</p>;\n");

        assert!(module.code.contains("React.createElement(\"p\", null, i++ / 2)"));
    }

    #[test]
    fn marker_follows_the_directive_prologue() {
        let module = lower("\"use strict\";\nimport x from 'y';\nx();\n");

        assert!(module.code.starts_with("\"use strict\";\nObject.defineProperty(exports, \"__esModule\""));
        assert!(module.code.contains("var x = __explorerDefault(_import0);"));
    }

    #[test]
    fn requests_include_nested_requires_in_source_order() {
        let module = lower("import a from './a';\nfunction load() { return require('./b'); }\nexport { c } from './c';\n");

        assert_eq!(
            module.requests,
            vec!["./a".to_string(), "./b".to_string(), "./c".to_string()]
        );
    }

    #[test]
    fn commonjs_sources_pass_through() {
        let source = "var React = require('react');\nmodule.exports = function () {};\n";
        let module = lower(source);

        assert_eq!(module.code, source);
        assert_eq!(module.requests, vec!["react".to_string()]);
    }

    #[test]
    fn collects_only_static_requires() {
        let source = r#"
            var a = require("a");
            var b = require('b');
            var again = require("a");
            var dynamic = require(name);
            var other = loader.require("c");
            // require("commented")
            var nested = function () { return require("d"); };
        "#;

        assert_eq!(collect_requires(source).unwrap(), vec!["a".to_string(), "b".to_string(), "d".to_string()]);
    }
}
