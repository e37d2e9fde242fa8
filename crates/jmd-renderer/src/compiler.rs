//! Document compile pipeline.
//!
//! Front matter is split off, inclusions are expanded, front matter Lua
//! chunks run, and a registry is assembled from the built-in extensions
//! plus whatever the front matter declares. The body is then tokenized
//! and rendered against that registry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::description_list::description_list;
use crate::directive::{DirectiveSpec, create_directives, optional_specs, preset_specs, standard_specs};
use crate::error::{Error, Result};
use crate::extension::ExtensionDescriptor;
use crate::function_call::function_call;
use crate::include::{DEFAULT_MAX_DEPTH, Includer, ReadFile};
use crate::lexer::Lexer;
use crate::metadata::{Metadata, split_front_matter};
use crate::pattern::{PatternSpec, pattern_extension};
use crate::registry::ExtensionRegistry;
use crate::render::Renderer;
use crate::script::{EvaluationContext, ScriptError};
use crate::syntax::{anchor, inline_comment, latex, moustache, script_blocks, syntax_modifications};
use crate::token::Token;

/// Compile switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// `/italic/`, `*strong*`, `__underline__`, sub- and superscripts.
    pub jmarkdown_syntax: bool,
    /// LaTeX passthrough.
    pub latex: bool,
    /// Inline comment marker and whether comments keep their text.
    /// Front matter `Inline comment:` takes precedence.
    pub inline_comment: Option<(String, bool)>,
    /// Optional container names and whether each is shown by default.
    pub optionals: Vec<(String, bool)>,
    pub max_include_depth: usize,
    /// Directory `[[...]]` inclusions in [`Compiler::compile`] resolve
    /// against.
    pub base_dir: PathBuf,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            jmarkdown_syntax: true,
            latex: true,
            inline_comment: None,
            optionals: Vec::new(),
            max_include_depth: DEFAULT_MAX_DEPTH,
            base_dir: PathBuf::from("."),
        }
    }
}

/// Output of a compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    /// Body HTML, without a document shell.
    pub html: String,
    pub metadata: Metadata,
    /// Non-fatal problems, such as unresolved inclusions.
    pub warnings: Vec<String>,
}

/// Tokenized body and what was learned on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenTree {
    pub tokens: Vec<Token>,
    pub metadata: Metadata,
    pub warnings: Vec<String>,
}

/// Prepares each compile's evaluation context before front matter Lua runs.
pub type SetupFn = dyn Fn(&EvaluationContext) -> std::result::Result<(), ScriptError>;

/// Front matter, expanded body and the registry built for them.
struct Prepared {
    metadata: Rc<Metadata>,
    body: String,
    warnings: Vec<String>,
    registry: ExtensionRegistry,
}

/// Compiles jmd documents to HTML.
///
/// Every compile gets a fresh [`EvaluationContext`], so Lua globals never
/// carry over from one document to the next. Host helpers are installed
/// into each new context by the setup hooks.
///
/// # Example
///
/// ```
/// use jmd_renderer::{CompileOptions, Compiler};
///
/// let compiler = Compiler::new(CompileOptions::default());
/// let result = compiler.compile("Title: Demo\n----\n::title[Hello]\n").unwrap();
/// assert_eq!(result.html, "<div class=\"title\">Hello\n</div>");
/// assert_eq!(result.metadata.title(), Some("Demo"));
/// ```
pub struct Compiler {
    options: CompileOptions,
    setup: Vec<Rc<SetupFn>>,
    extensions: Vec<ExtensionDescriptor>,
    read: Box<ReadFile>,
}

impl Compiler {
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            setup: Vec::new(),
            extensions: Vec::new(),
            read: Box::new(|path: &Path| fs::read_to_string(path)),
        }
    }

    /// Add an extension. Added extensions are tried before the built-in
    /// ones of the same priority.
    #[must_use]
    pub fn with_extension(mut self, descriptor: ExtensionDescriptor) -> Self {
        self.extensions.push(descriptor);
        self
    }

    /// Replace how documents and inclusions are read.
    #[must_use]
    pub fn with_reader<F>(mut self, read: F) -> Self
    where
        F: Fn(&Path) -> io::Result<String> + 'static,
    {
        self.read = Box::new(read);
        self
    }

    /// Run `setup` on the evaluation context of every compile.
    #[must_use]
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&EvaluationContext) -> std::result::Result<(), ScriptError> + 'static,
    {
        self.setup.push(Rc::new(setup));
        self
    }

    /// Install a native helper as a global Lua function in every compile.
    #[must_use]
    pub fn with_function<F>(self, name: &str, helper: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        let name = name.to_owned();
        let helper = Rc::new(helper);
        self.with_setup(move |context| {
            let helper = Rc::clone(&helper);
            context.register_function(&name, move |arg| helper(arg))
        })
    }

    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a document whose inclusions resolve against
    /// [`CompileOptions::base_dir`].
    pub fn compile(&self, markdown: &str) -> Result<CompileResult> {
        self.compile_in(markdown, &self.options.base_dir)
    }

    /// Read and compile a document; inclusions resolve against its
    /// directory.
    pub fn compile_file(&self, path: &Path) -> Result<CompileResult> {
        let markdown = (self.read)(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        self.compile_in(&markdown, base_dir)
    }

    /// Tokenize a document without rendering it.
    pub fn tokenize(&self, markdown: &str) -> Result<TokenTree> {
        let prepared = self.prepare(markdown, &self.options.base_dir)?;
        let tokens = Lexer::new(&prepared.registry).block_tokens(&prepared.body)?;
        Ok(TokenTree {
            tokens,
            metadata: Metadata::clone(&prepared.metadata),
            warnings: prepared.warnings,
        })
    }

    fn compile_in(&self, markdown: &str, base_dir: &Path) -> Result<CompileResult> {
        let prepared = self.prepare(markdown, base_dir)?;
        let tokens = Lexer::new(&prepared.registry).block_tokens(&prepared.body)?;
        let html = Renderer::new(&prepared.registry).render_block(&tokens)?;

        tracing::debug!(
            tokens = tokens.len(),
            html_len = html.len(),
            warnings = prepared.warnings.len(),
            "Compiled document"
        );
        Ok(CompileResult {
            html,
            metadata: Metadata::clone(&prepared.metadata),
            warnings: prepared.warnings,
        })
    }

    fn prepare(&self, markdown: &str, base_dir: &Path) -> Result<Prepared> {
        let (metadata, body) = split_front_matter(markdown);
        let expanded = Includer::new(&*self.read)
            .with_max_depth(self.options.max_include_depth)
            .expand(body, base_dir);

        let context = Rc::new(EvaluationContext::new());
        for setup in &self.setup {
            setup(&*context)?;
        }
        for chunk in metadata.lua() {
            context.exec("front matter", chunk)?;
        }

        let metadata = Rc::new(metadata);
        let registry = self.registry(&metadata, &context)?;
        Ok(Prepared {
            metadata,
            body: expanded.text,
            warnings: expanded.warnings,
            registry,
        })
    }

    /// Registration order breaks ties between extensions of equal
    /// priority: earlier wins.
    fn registry(
        &self,
        metadata: &Rc<Metadata>,
        context: &Rc<EvaluationContext>,
    ) -> Result<ExtensionRegistry> {
        let mut registry = ExtensionRegistry::new();
        registry.register_many(self.extensions.iter().cloned());

        registry.register(script_blocks(Rc::clone(context)));
        if self.options.latex {
            registry.register(latex());
        }
        registry.register(moustache(Rc::clone(metadata), Rc::clone(context)));
        registry.register(anchor());

        let comment = metadata
            .inline_comment()
            .or_else(|| self.options.inline_comment.clone());
        if let Some((marker, verbatim)) = comment {
            registry.register(inline_comment(&marker, verbatim)?);
        }

        for declaration in metadata.functions() {
            registry.register(function_call(
                &declaration.name,
                declaration.options,
                Rc::clone(context),
            )?);
        }
        for (name, definition) in metadata.extensions() {
            registry.register(pattern_extension(PatternSpec::parse(&name, definition)?));
        }

        if self.options.jmarkdown_syntax {
            registry.register_many(syntax_modifications());
        }

        // Declared optionals come first so they override the built-in ones.
        let specs: Vec<DirectiveSpec> = metadata
            .optionals()
            .iter()
            .chain(&self.options.optionals)
            .flat_map(|(name, default)| optional_specs(name, *default))
            .chain(preset_specs())
            .chain(standard_specs())
            .collect();
        registry.register_many(create_directives(specs)?);
        registry.register(description_list());

        tracing::debug!(extensions = registry.len(), "Built extension registry");
        Ok(registry)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("setup", &self.setup.len())
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Rendered;
    use crate::token::Level;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn compile(markdown: &str) -> CompileResult {
        Compiler::default().compile(markdown).unwrap()
    }

    #[test]
    fn test_plain_markdown() {
        assert_eq!(compile("# Hi\n\nText.\n").html, "<h1>Hi</h1>\n<p>Text.</p>\n");
    }

    #[test]
    fn test_front_matter_is_not_rendered() {
        let result = compile("Title: T\nCSS: a.css\n----\nBody\n");
        assert_eq!(result.html, "<p>Body</p>\n");
        assert_eq!(result.metadata.css(), vec!["a.css"]);
    }

    #[test]
    fn test_front_matter_pattern_extension() {
        let result = compile("Extension 1: << >> false\n  <b>${content1}</b>\n----\nSay <<hi>>.\n");
        assert_eq!(result.html, "<p>Say <b>hi</b>.</p>\n");
    }

    #[test]
    fn test_front_matter_function_and_lua() {
        let src = "Lua: function shout(s) return s:upper() .. '!' end\n\
                   Function: shout simple inline\n----\nshout(*hey*)\n";
        assert_eq!(compile(src).html, "<p><strong>HEY</strong>!</p>\n");
    }

    #[test]
    fn test_lua_failure_in_front_matter_is_fatal() {
        let err = Compiler::default()
            .compile("Lua: x = = 1\n----\nBody\n")
            .unwrap_err();
        assert!(matches!(err, Error::Script(_)));
    }

    #[test]
    fn test_malformed_pattern_is_fatal() {
        let err = Compiler::default()
            .compile("Extension 1: <<\n----\nBody\n")
            .unwrap_err();
        assert!(matches!(err, Error::Pattern(_)));
    }

    #[test]
    fn test_optionals_from_front_matter() {
        let src = "Optionals: hint solution[true]\n----\n:::hint\nH\n:::\n:::solution\nS\n:::\n";
        assert_eq!(compile(src).html, "<p>S</p>\n");
        let shown = "Optionals: hint\n----\n:::hint{include}\nH\n:::\n";
        assert_eq!(compile(shown).html, "<p>H</p>\n");
    }

    #[test]
    fn test_declared_optional_overrides_builtin() {
        let src = "Optionals: answer[true]\n----\n:::answer\n42\n:::\n";
        assert_eq!(compile(src).html, "<p>42</p>\n");
        assert_eq!(compile(":::answer\n42\n:::\n").html, "");
    }

    #[test]
    fn test_normal_syntax_option() {
        let options = CompileOptions {
            jmarkdown_syntax: false,
            ..CompileOptions::default()
        };
        let result = Compiler::new(options).compile("*a* and H_2O\n").unwrap();
        assert_eq!(result.html, "<p><em>a</em> and H_2O</p>\n");
        assert_eq!(compile("*a*\n").html, "<p><strong>a</strong></p>\n");
    }

    #[test]
    fn test_lua_globals_do_not_leak_between_compiles() {
        let compiler = Compiler::default();
        compiler.compile("Lua: secret = 'from doc A'\n----\nA\n").unwrap();
        let html = compiler.compile("B {{secret}}\n").unwrap().html;
        assert_eq!(html, "<p>B {{secret}}</p>\n");
    }

    #[test]
    fn test_setup_runs_for_every_compile() {
        let compiler = Compiler::default()
            .with_function("double", |arg| (arg.parse::<i64>().unwrap_or(0) * 2).to_string())
            .with_setup(|context| context.set_global("course", "Logic"));
        for _ in 0..2 {
            let html = compiler
                .compile("Function: double simple inline\n----\n{{course}} double(4)\n")
                .unwrap()
                .html;
            assert_eq!(html, "<p>Logic 8</p>\n");
        }
    }

    #[test]
    fn test_inline_comment_from_front_matter() {
        let result = compile("Inline comment: // true\n----\nKeep // drop\n");
        assert_eq!(result.html, "<p>Keep <!-- drop --></p>\n");
    }

    #[test]
    fn test_moustache_reads_metadata() {
        let result = compile("Course: Logic 101\n----\nWelcome to {{Course}}.\n");
        assert_eq!(result.html, "<p>Welcome to Logic 101.</p>\n");
    }

    #[test]
    fn test_custom_extension_runs_first() {
        let shout = ExtensionDescriptor::new(
            "shout",
            Level::Inline,
            |src| src.find('!'),
            |src, _| {
                Ok(src
                    .starts_with("!!")
                    .then(|| Token::new("shout", Level::Inline, "!!")))
            },
            |_, _| Ok(Rendered::Html("<b>!</b>".to_owned())),
        );
        let compiler = Compiler::default().with_extension(shout);
        assert_eq!(compiler.compile("Hey!!\n").unwrap().html, "<p>Hey<b>!</b></p>\n");
    }

    #[test]
    fn test_compile_file_resolves_includes_next_to_it() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.md"), "# Main\n\n[[part.md]]\n").unwrap();
        std::fs::write(dir.path().join("part.md"), "Part *one*.\n").unwrap();

        let result = Compiler::default()
            .compile_file(&dir.path().join("main.md"))
            .unwrap();
        assert_eq!(result.html, "<h1>Main</h1>\n<p>Part <strong>one</strong>.</p>\n");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_include_is_a_warning() {
        let result = compile("[[missing.md]]\n");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.html, "<p>[[missing.md]]</p>\n");
    }

    #[test]
    fn test_compile_file_missing_document() {
        let dir = TempDir::new().unwrap();
        let err = Compiler::default()
            .compile_file(&dir.path().join("none.md"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_tokenize_exposes_tree() {
        let tree = Compiler::default().tokenize("::title[T]\n\nText\n").unwrap();
        let kinds: Vec<_> = tree.tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds.len(), 3);
        assert!(kinds[0].starts_with("directiveBlock"));
        assert_eq!(&kinds[1..], &["space", "markdown"]);
    }
}
