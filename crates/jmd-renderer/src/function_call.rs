//! Function-call extensions.
//!
//! A registered name followed by a call, e.g. `double(5)` or
//! `math.max(1, 2)`, is evaluated in the document's [`EvaluationContext`]
//! and replaced by its value.
//!
//! Simple calls take everything up to the first `)` as one string argument.
//! Complex calls are delimited by a call-chain scanner and validated with a
//! real Lua parser, so nested calls, tables and strings holding parentheses
//! work; parse and evaluation failures are rendered in place.

use std::rc::Rc;

use full_moon::ast::Stmt;
use regex::Regex;

use crate::error::{Error, Result};
use crate::extension::{ExtensionDescriptor, Rendered};
use crate::lexer::Lexer;
use crate::render::Renderer;
use crate::script::{EvaluationContext, lua_string_literal};
use crate::token::{CallOutcome, Level, Payload, RenderMode, Token};
use crate::util::escape_html;

/// How the call is delimited and evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallMode {
    /// `name(text up to the first closing parenthesis)`.
    #[default]
    Simple,
    /// Any single Lua call expression starting with the name.
    Complex,
}

/// What happens to the value of a successful simple call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallTokenize {
    /// Emitted as HTML.
    #[default]
    None,
    /// Tokenized as inline Markdown.
    Inline,
    /// Tokenized as block Markdown; the extension becomes block level.
    Block,
}

/// Options for [`function_call`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionOptions {
    pub mode: CallMode,
    pub tokenize: CallTokenize,
    /// The name is an object: the trigger is `.`, `:` or `[` instead of `(`.
    pub object: bool,
}

impl FunctionOptions {
    #[must_use]
    pub fn simple(tokenize: CallTokenize) -> Self {
        Self {
            mode: CallMode::Simple,
            tokenize,
            object: false,
        }
    }

    #[must_use]
    pub fn complex() -> Self {
        Self {
            mode: CallMode::Complex,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_object(mut self, object: bool) -> Self {
        self.object = object;
        self
    }
}

/// Build the extension for calls to `name`.
///
/// Token kind and descriptor name are `name`.
pub fn function_call(
    name: &str,
    options: FunctionOptions,
    context: Rc<EvaluationContext>,
) -> Result<ExtensionDescriptor> {
    let level = match (options.mode, options.tokenize) {
        (CallMode::Simple, CallTokenize::Block) => Level::Block,
        _ => Level::Inline,
    };
    let triggers: &'static [char] = if options.object {
        &['.', ':', '[']
    } else {
        &['(']
    };

    let start = {
        let name = name.to_owned();
        move |src: &str| find_call_start(src, &name, triggers)
    };

    let descriptor = match options.mode {
        CallMode::Simple => {
            let member = if options.object {
                r"(?:[.:][A-Za-z_][A-Za-z0-9_]*)+"
            } else {
                ""
            };
            let pattern = format!(r"^({}{member})\(((?s:[^)]*))\)", regex::escape(name));
            let regex = Regex::new(&pattern).map_err(|source| Error::Regex {
                extension: name.to_owned(),
                source,
            })?;
            let kind = name.to_owned();
            let tokenize = move |src: &str, lexer: &Lexer<'_>| {
                tokenize_simple(&kind, level, options.tokenize, &regex, &context, src, lexer)
            };
            ExtensionDescriptor::new(name, level, start, tokenize, render_call)
        }
        CallMode::Complex => {
            let kind = name.to_owned();
            let tokenize = move |src: &str, _: &Lexer<'_>| {
                Ok(tokenize_complex(&kind, triggers, &context, src))
            };
            ExtensionDescriptor::new(name, level, start, tokenize, render_call)
        }
    };
    Ok(descriptor)
}

/// First occurrence of `name` + trigger that does not continue an
/// identifier.
fn find_call_start(src: &str, name: &str, triggers: &[char]) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = src[from..].find(name) {
        let at = from + found;
        let after = &src[at + name.len()..];
        let standalone = !src[..at]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if standalone && after.starts_with(triggers) {
            return Some(at);
        }
        from = at + name.len().max(1);
    }
    None
}

fn tokenize_simple(
    kind: &str,
    level: Level,
    tokenize: CallTokenize,
    regex: &Regex,
    context: &EvaluationContext,
    src: &str,
    lexer: &Lexer<'_>,
) -> Result<Option<Token>> {
    let Some(captures) = regex.captures(src) else {
        return Ok(None);
    };
    let raw = captures.get(0).map_or("", |m| m.as_str());
    let callee = captures.get(1).map_or("", |m| m.as_str());
    let argument = captures.get(2).map_or("", |m| m.as_str());
    let call = format!("{callee}({})", lua_string_literal(argument));

    let mut token = Token::new(kind, level, raw);
    match context.eval(&call) {
        Ok(value) => {
            match tokenize {
                CallTokenize::Inline => {
                    token.tokens = lexer.inline_tokens(&value)?;
                    token.mode = RenderMode::Inline;
                }
                CallTokenize::Block => {
                    token.tokens = lexer.block_tokens(&value)?;
                    token.mode = RenderMode::Block;
                }
                CallTokenize::None => {}
            }
            token.text = value.clone();
            token.payload = Payload::Call(CallOutcome::Success(value));
        }
        Err(err) => token.payload = Payload::Call(eval_error(err.message())),
    }
    Ok(Some(token))
}

fn tokenize_complex(
    kind: &str,
    triggers: &[char],
    context: &EvaluationContext,
    src: &str,
) -> Option<Token> {
    let after = src.strip_prefix(kind)?;
    if !after.starts_with(triggers) {
        return None;
    }
    let len = kind.len() + call_chain_len(after);
    let candidate = &src[..len];

    let outcome = match full_moon::parse(candidate) {
        Ok(ast) => {
            let block = ast.nodes();
            let mut stmts = block.stmts();
            let single_call = matches!(stmts.next(), Some(Stmt::FunctionCall(_)))
                && stmts.next().is_none()
                && block.last_stmt().is_none();
            if !single_call {
                return None;
            }
            match context.eval(candidate) {
                Ok(value) => CallOutcome::Success(value),
                Err(err) => eval_error(err.message()),
            }
        }
        Err(errors) => {
            // A valid expression that is not a call (`obj.field`) is plain text.
            if full_moon::parse(&format!("return {candidate}")).is_ok() {
                return None;
            }
            let first = errors.first()?;
            let mut pos = first.range().0.bytes();
            // Running out of input blames the last character.
            if pos >= candidate.len() {
                pos = candidate
                    .trim_end()
                    .char_indices()
                    .last()
                    .map_or(0, |(i, _)| i);
            }
            let pos = pos.max(1);
            CallOutcome::ParseError {
                message: first.to_string(),
                pos,
            }
        }
    };

    let mut token = Token::new(kind, Level::Inline, candidate);
    if let CallOutcome::Success(value) = &outcome {
        token.text.clone_from(value);
    }
    Some(token.with_payload(Payload::Call(outcome)))
}

fn eval_error(message: &str) -> CallOutcome {
    CallOutcome::EvalError {
        message: message.lines().next().unwrap_or_default().to_owned(),
        detail: message.to_owned(),
    }
}

/// Length of the call chain at the start of `src`: member accesses,
/// method calls, index expressions and argument lists. An argument list
/// that never closes runs to the end of the line.
fn call_chain_len(src: &str) -> usize {
    let bytes = src.as_bytes();
    let mut pos = 0;
    loop {
        match bytes.get(pos) {
            Some(b'.' | b':') => {
                let name = identifier_len(&src[pos + 1..]);
                if name == 0 {
                    return pos;
                }
                pos += 1 + name;
            }
            Some(b'(' | b'[' | b'{') => match balanced_len(&src[pos..]) {
                Some(len) => pos += len,
                None => return src.find('\n').unwrap_or(src.len()),
            },
            Some(b'"' | b'\'') => match string_len(&src[pos..]) {
                Some(len) => pos += len,
                None => return src.find('\n').unwrap_or(src.len()),
            },
            _ => return pos,
        }
    }
}

fn identifier_len(src: &str) -> usize {
    if !src.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return 0;
    }
    src.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(src.len())
}

/// Length of a quoted string at the start of `src`, including quotes.
fn string_len(src: &str) -> Option<usize> {
    let quote = src.chars().next()?;
    let mut escaped = false;
    for (i, c) in src.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '\n' => return None,
            c if c == quote => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Length of a bracketed group at the start of `src`, skipping over
/// strings.
fn balanced_len(src: &str) -> Option<usize> {
    let mut stack = Vec::new();
    let mut pos = 0;
    while pos < src.len() {
        let c = src[pos..].chars().next()?;
        match c {
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let open = stack.pop()?;
                if !matches!((open, c), ('(', ')') | ('[', ']') | ('{', '}')) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(pos + 1);
                }
            }
            '"' | '\'' => {
                pos += string_len(&src[pos..])?;
                continue;
            }
            _ => {}
        }
        pos += c.len_utf8();
    }
    None
}

fn render_call(token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
    let Payload::Call(outcome) = &token.payload else {
        return Ok(Rendered::Skip);
    };
    let html = match outcome {
        CallOutcome::Success(value) if token.tokens.is_empty() => value.clone(),
        CallOutcome::Success(_) => renderer.render_children(token)?,
        CallOutcome::ParseError { message, pos } => {
            let split = (*pos).min(token.raw.len());
            let split = (0..=split)
                .rev()
                .find(|&i| token.raw.is_char_boundary(i))
                .unwrap_or(0);
            format!(
                r#"<span class="jmd-error jmd-parse-error" title="{}"><span class="jmd-valid">{}</span><span class="jmd-invalid">{}</span></span>"#,
                escape_html(message),
                escape_html(&token.raw[..split]),
                escape_html(&token.raw[split..])
            )
        }
        CallOutcome::EvalError { message, detail } => format!(
            r#"<span class="jmd-error jmd-eval-error"><code>{}</code>: {}</span><details class="jmd-error-details"><summary>Details</summary><pre>{}</pre></details>"#,
            escape_html(&token.raw),
            escape_html(message),
            escape_html(detail)
        ),
    };
    Ok(Rendered::Html(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ExtensionRegistry;
    use crate::token::CallErrorKind;
    use pretty_assertions::assert_eq;

    fn context() -> Rc<EvaluationContext> {
        let context = EvaluationContext::new();
        context
            .register_function("double", |arg| {
                (arg.trim().parse::<i64>().unwrap_or(0) * 2).to_string()
            })
            .unwrap();
        Rc::new(context)
    }

    fn render(registry: &ExtensionRegistry, src: &str) -> String {
        let tokens = Lexer::new(registry).block_tokens(src).unwrap();
        Renderer::new(registry).render_block(&tokens).unwrap()
    }

    #[test]
    fn test_simple_inline_tokenized() {
        let mut registry = ExtensionRegistry::new();
        registry.register(
            function_call(
                "double",
                FunctionOptions::simple(CallTokenize::Inline),
                context(),
            )
            .unwrap(),
        );
        let tokens = Lexer::new(&registry).inline_tokens("double(5)").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "10");
        assert_eq!(tokens[0].tokens[0].raw, "10");
        assert_eq!(render(&registry, "Twice five is double(5).\n"), "<p>Twice five is 10.</p>\n");
    }

    #[test]
    fn test_simple_block_level() {
        let context = context();
        context
            .exec("setup", "function items(s) return '- ' .. s .. '\\n- two\\n' end")
            .unwrap();
        let mut registry = ExtensionRegistry::new();
        let descriptor =
            function_call("items", FunctionOptions::simple(CallTokenize::Block), context).unwrap();
        assert_eq!(descriptor.level(), Level::Block);
        registry.register(descriptor);
        assert_eq!(
            render(&registry, "items(one)\n"),
            "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_simple_argument_is_string_literal() {
        let context = context();
        context
            .exec("setup", "function echo(s) return '[' .. s .. ']' end")
            .unwrap();
        let mut registry = ExtensionRegistry::new();
        registry.register(function_call("echo", FunctionOptions::default(), context).unwrap());
        assert_eq!(
            render(&registry, "echo(say \"hi\")\n"),
            "<p>[say \"hi\"]</p>\n"
        );
    }

    #[test]
    fn test_word_boundary() {
        assert_eq!(find_call_start("redouble(2) double(3)", "double", &['(']), Some(12));
        assert_eq!(find_call_start("double 2", "double", &['(']), None);
    }

    #[test]
    fn test_complex_success() {
        let mut registry = ExtensionRegistry::new();
        registry.register(
            function_call("math", FunctionOptions::complex().with_object(true), context()).unwrap(),
        );
        assert_eq!(
            render(&registry, "Max is math.max(1, (2), 3).\n"),
            "<p>Max is 3.</p>\n"
        );
    }

    #[test]
    fn test_complex_nested_strings() {
        let context = context();
        context
            .exec("setup", "function wrap(a, b) return '<b>' .. a .. b .. '</b>' end")
            .unwrap();
        let mut registry = ExtensionRegistry::new();
        registry.register(function_call("wrap", FunctionOptions::complex(), context).unwrap());
        let tokens = Lexer::new(&registry)
            .inline_tokens("x wrap(\"(\", double(2)) y")
            .unwrap();
        assert_eq!(tokens[1].raw, "wrap(\"(\", double(2))");
        assert_eq!(tokens[1].text, "<b>(4</b>");
    }

    #[test]
    fn test_complex_parse_error() {
        let mut registry = ExtensionRegistry::new();
        registry.register(
            function_call("math", FunctionOptions::complex().with_object(true), context()).unwrap(),
        );
        let tokens = Lexer::new(&registry).inline_tokens("math.max(1,").unwrap();
        let token = &tokens[0];
        assert_eq!(token.raw, "math.max(1,");
        let Payload::Call(outcome) = &token.payload else {
            panic!("expected call payload");
        };
        assert_eq!(outcome.error_kind(), Some(CallErrorKind::Parse));
        let CallOutcome::ParseError { pos, .. } = outcome else {
            unreachable!();
        };
        assert_eq!(*pos, 10);

        let html = Renderer::new(&registry).render_inline(&tokens).unwrap();
        assert!(html.contains("jmd-parse-error"), "{html}");
        assert!(
            html.contains(
                r#"<span class="jmd-valid">math.max(1</span><span class="jmd-invalid">,</span>"#
            ),
            "{html}"
        );
    }

    #[test]
    fn test_complex_eval_error() {
        let context = context();
        context.exec("setup", "function fail() error('bad input') end").unwrap();
        let mut registry = ExtensionRegistry::new();
        registry.register(function_call("fail", FunctionOptions::complex(), context).unwrap());
        let tokens = Lexer::new(&registry).inline_tokens("fail()").unwrap();
        let Payload::Call(outcome) = &tokens[0].payload else {
            panic!("expected call payload");
        };
        assert_eq!(outcome.error_kind(), Some(CallErrorKind::Eval));
        let html = Renderer::new(&registry).render_inline(&tokens).unwrap();
        assert!(html.contains("jmd-eval-error"), "{html}");
        assert!(html.contains("<details"), "{html}");
        assert!(html.contains("bad input"), "{html}");
    }

    #[test]
    fn test_complex_field_access_is_text() {
        let mut registry = ExtensionRegistry::new();
        registry.register(
            function_call("math", FunctionOptions::complex().with_object(true), context()).unwrap(),
        );
        let tokens = Lexer::new(&registry).inline_tokens("math.pi is known").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_host());
    }

    #[test]
    fn test_call_chain_len() {
        assert_eq!(call_chain_len(".max(1, 2) rest"), 10);
        assert_eq!(call_chain_len("(\")\") tail"), 5);
        assert_eq!(call_chain_len(":m{1}[2] x"), 8);
        assert_eq!(call_chain_len("(1,\nnext"), 3);
    }
}
