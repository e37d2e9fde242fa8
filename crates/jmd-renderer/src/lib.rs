//! Extensible Markdown tokenizer with directive dispatch.
//!
//! Documents are tokenized by a host grammar that offers every block start
//! and inline position to registered [`ExtensionDescriptor`]s before
//! falling back to `CommonMark`. Extension tokens render through their own
//! functions; everything else renders through `pulldown-cmark`.
//!
//! # Architecture
//!
//! - [`ExtensionRegistry`]: ordered extensions, dispatched by priority
//! - [`Lexer`] / [`Renderer`]: the host grammar over one registry
//! - [`directive`]: `:::container`, `::block` and `:inline` directives
//!   synthesized from [`DirectiveSpec`]s
//! - [`description_list`]: `term:: definition` lists
//! - [`function_call`]: `name(...)` evaluated in a Lua
//!   [`EvaluationContext`]
//! - [`pattern_extension`]: delimiter and template extensions declared in
//!   front matter
//! - [`Compiler`]: front matter, inclusion and the built-in extension set
//!
//! # Example
//!
//! ```
//! use jmd_renderer::Compiler;
//!
//! let result = Compiler::default()
//!     .compile(":::note\nSome *text*.\n:::\n")
//!     .unwrap();
//! assert_eq!(result.html, "<note>\n<p>Some <strong>text</strong>.</p>\n</note>\n");
//! ```

mod attrs;
mod compiler;
mod description_list;
pub mod directive;
mod error;
mod extension;
mod fence;
mod function_call;
mod include;
mod lexer;
mod metadata;
mod pattern;
mod placeholder;
mod registry;
mod render;
mod script;
mod syntax;
mod token;
mod util;

pub use attrs::{AttributeError, Attributes};
pub use compiler::{CompileOptions, CompileResult, Compiler, SetupFn, TokenTree};
pub use description_list::{DESCRIPTION_LIST, description_list};
pub use directive::{DirectiveSpec, create_directive, create_directives, directive_type_name};
pub use error::{Error, Result};
pub use extension::{ExtensionDescriptor, RenderFn, Rendered, StartFn, TokenizeFn};
pub use function_call::{CallMode, CallTokenize, FunctionOptions, function_call};
pub use include::{DEFAULT_MAX_DEPTH, Expanded, Includer, ReadFile};
pub use lexer::Lexer;
pub use metadata::{FunctionDecl, Metadata, split_front_matter};
pub use pattern::{ContentPolicy, PatternError, PatternSpec, pattern_extension};
pub use registry::ExtensionRegistry;
pub use render::Renderer;
pub use script::{EvaluationContext, ScriptError, lua_string_literal};
pub use syntax::{
    anchor, inline_comment, latex, moustache, script_blocks, syntax_modifications,
};
pub use token::{
    Argument, CODE, CallErrorKind, CallOutcome, DescriptionEntry, DirectiveMeta, Level, MARKDOWN,
    Payload, RenderMode, SPACE, TEXT, Token, concat_raw,
};
pub use util::{escape_html, fnv1a};
