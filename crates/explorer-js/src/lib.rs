//! JavaScript source toolkit for the Project Explorer build.
//!
//! Provides the pieces the bundler needs to treat component modules as data:
//! oxc parsing, owned JSX trees with `createElement` lowering, ES module to
//! CommonJS lowering and `node_modules` style request resolution.

pub mod jsx;
pub mod lower;
pub mod module;
pub mod parse;
pub mod resolve;

pub use jsx::{clean_jsx_text, decode_entities, is_intrinsic, AttrValue, JsxAttribute, JsxElement, JsxNode};
pub use lower::{lower_jsx, LowerOptions};
pub use module::{collect_requires, lower_module, LoweredModule, ModuleError, DEFAULT_INTEROP_HELPER};
pub use parse::{parse, SyntaxError, MODULE_SOURCE, SCRIPT_SOURCE};
pub use resolve::{package_name, Resolved, ResolveError, Resolver};
