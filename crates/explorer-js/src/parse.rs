//! Parsing entry point.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Project source files: ES modules with JSX.
pub const MODULE_SOURCE: SourceType = SourceType::jsx();

/// Installed package files and emitted bundles: classic scripts.
pub const SCRIPT_SOURCE: SourceType = SourceType::cjs();

/// The parser rejected a source file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .messages.join("; "))]
pub struct SyntaxError {
    pub messages: Vec<String>,
}

/// Parse `source` into `allocator`, failing on any diagnostic.
pub fn parse<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    source_type: SourceType,
) -> Result<Program<'a>, SyntaxError> {
    let parsed = Parser::new(allocator, source, source_type).parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        let mut messages: Vec<String> = parsed.errors.iter().map(|e| e.to_string()).collect();
        if messages.is_empty() {
            messages.push("parser aborted".to_string());
        }
        return Err(SyntaxError { messages });
    }

    Ok(parsed.program)
}
