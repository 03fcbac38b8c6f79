//! Bundle code generation.
//!
//! A bundle is one IIFE holding a table of module factories. Requests a
//! bundle cannot satisfy from its own table fall through to the `require` of
//! the bundle loaded before it, which is how page bundles reach the shared
//! libraries.

use serde_json::{Map, Value};

use explorer_js::DEFAULT_INTEROP_HELPER;

use super::collect::CollectedModule;

/// Global through which bundles chain their `require` functions.
pub const GLOBAL_REQUIRE: &str = "__explorerRequire";

pub(crate) struct EmitOptions<'a> {
    /// Names other bundles may `require`, mapped to module ids
    pub exposed: &'a [(String, String)],

    /// Module executed when the bundle loads
    pub run: Option<&'a str>,

    pub node_env: &'a str,
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

pub(crate) fn emit(modules: &[CollectedModule], options: &EmitOptions<'_>) -> String {
    let mut out = String::new();

    out.push_str("(function (global, previousRequire) {\n");
    out.push_str(&format!(
        "var process = {{ env: {{ NODE_ENV: {} }} }};\n",
        js_string(options.node_env)
    ));
    out.push_str(&format!(
        "function {DEFAULT_INTEROP_HELPER}(m) {{ return m && m.__esModule ? m[\"default\"] : m; }}\n"
    ));

    out.push_str("var definitions = {\n");
    for module in modules {
        let deps: Map<String, Value> = module
            .deps
            .iter()
            .map(|(request, target)| (request.clone(), Value::String(target.clone())))
            .collect();
        out.push_str(&format!(
            "{}: [function (require, module, exports) {{\n{}\n}}, {}],\n",
            js_string(&module.id),
            module.code.trim_end(),
            Value::Object(deps)
        ));
    }
    out.push_str("};\n");

    let exposed: Map<String, Value> = options
        .exposed
        .iter()
        .map(|(name, id)| (name.clone(), Value::String(id.clone())))
        .collect();
    out.push_str(&format!("var exposed = {};\n", Value::Object(exposed)));

    out.push_str(RUNTIME);
    out.push_str(&format!("global.{GLOBAL_REQUIRE} = globalRequire;\n"));
    if let Some(entry) = options.run {
        out.push_str(&format!("load({});\n", js_string(entry)));
    }
    out.push_str(&format!(
        "}})(typeof window !== \"undefined\" ? window : this, typeof {GLOBAL_REQUIRE} === \"function\" ? {GLOBAL_REQUIRE} : undefined);\n"
    ));

    out
}

const RUNTIME: &str = r#"var cache = {};
function load(id) {
  if (cache[id]) return cache[id].exports;
  var definition = definitions[id];
  var module = cache[id] = { exports: {} };
  definition[0].call(module.exports, function (request) {
    var target = definition[1][request];
    if (target !== undefined && definitions[target]) return load(target);
    return globalRequire(target !== undefined ? target : request);
  }, module, module.exports);
  return module.exports;
}
function globalRequire(name) {
  if (exposed[name] !== undefined) return load(exposed[name]);
  if (typeof previousRequire === "function") return previousRequire(name);
  throw new Error("Cannot find module '" + name + "'");
}
"#;
