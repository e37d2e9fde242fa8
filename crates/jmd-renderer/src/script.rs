//! Per-document Lua evaluation context.
//!
//! Function-call extensions, script blocks and moustache references all
//! evaluate against the same [`EvaluationContext`], so helpers defined by one
//! script are visible to every later call in the document.

use std::fmt;

use mlua::{Function, Lua, Value};

/// Failure inside the evaluation context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// A native helper could not be installed.
    #[error("failed to register function `{name}`: {message}")]
    Register { name: String, message: String },

    /// A chunk failed to load or raised while running.
    #[error("script `{chunk}` failed: {message}")]
    Exec { chunk: String, message: String },

    /// An expression failed to load or raised while evaluating.
    #[error("evaluating `{expression}` failed: {message}")]
    Eval { expression: String, message: String },
}

impl ScriptError {
    /// Underlying Lua message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Register { message, .. }
            | Self::Exec { message, .. }
            | Self::Eval { message, .. } => message,
        }
    }
}

/// A Lua state scoped to one document compile.
///
/// # Example
///
/// ```
/// use jmd_renderer::EvaluationContext;
///
/// let context = EvaluationContext::new();
/// context.exec("setup", "function greet(name) return 'hi ' .. name end").unwrap();
/// assert_eq!(context.eval("greet('bob')").unwrap(), "hi bob");
/// ```
pub struct EvaluationContext {
    lua: Lua,
}

impl EvaluationContext {
    #[must_use]
    pub fn new() -> Self {
        Self { lua: Lua::new() }
    }

    /// Install a native helper as a global Lua function.
    ///
    /// The helper receives its first argument converted with `tostring`
    /// (an empty string when missing) and returns a string.
    pub fn register_function<F>(&self, name: &str, helper: F) -> Result<(), ScriptError>
    where
        F: Fn(&str) -> String + 'static,
    {
        let register = || -> mlua::Result<()> {
            let function = self.lua.create_function(move |lua, arg: Value| {
                Ok(helper(&display(lua, arg)?))
            })?;
            self.lua.globals().set(name, function)
        };
        register().map_err(|err| ScriptError::Register {
            name: name.to_owned(),
            message: err.to_string(),
        })
    }

    /// Set a global string variable.
    pub fn set_global(&self, name: &str, value: &str) -> Result<(), ScriptError> {
        self.lua
            .globals()
            .set(name, value)
            .map_err(|err| ScriptError::Register {
                name: name.to_owned(),
                message: err.to_string(),
            })
    }

    /// Whether a global function named `name` exists.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.lua.globals().get::<Function>(name).is_ok()
    }

    /// Run a chunk for its side effects.
    pub fn exec(&self, chunk: &str, source: &str) -> Result<(), ScriptError> {
        self.run(chunk, source).map(|_| ())
    }

    /// Run a chunk and return the value it returns, converted with
    /// `tostring`. `nil` (or no return) yields `None`.
    pub fn run(&self, chunk: &str, source: &str) -> Result<Option<String>, ScriptError> {
        let run = || -> mlua::Result<Option<String>> {
            let value = self
                .lua
                .load(source)
                .set_name(format!("={chunk}"))
                .eval::<Value>()?;
            if value.is_nil() {
                return Ok(None);
            }
            display(&self.lua, value).map(Some)
        };
        run().map_err(|err| {
            tracing::warn!(chunk, error = %err, "Script failed");
            ScriptError::Exec {
                chunk: chunk.to_owned(),
                message: err.to_string(),
            }
        })
    }

    /// Evaluate an expression and convert its value with `tostring`.
    /// `nil` yields an empty string.
    pub fn eval(&self, expression: &str) -> Result<String, ScriptError> {
        let eval = || -> mlua::Result<String> {
            let value = self
                .lua
                .load(format!("return {expression}"))
                .set_name("=expression")
                .eval::<Value>()?;
            display(&self.lua, value)
        };
        eval().map_err(|err| ScriptError::Eval {
            expression: expression.to_owned(),
            message: err.to_string(),
        })
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext").finish_non_exhaustive()
    }
}

/// Lua `tostring`, except that `nil` is empty and strings are kept as is.
fn display(lua: &Lua, value: Value) -> mlua::Result<String> {
    match value {
        Value::Nil => Ok(String::new()),
        Value::String(s) => Ok(s.to_string_lossy()),
        other => lua
            .globals()
            .get::<Function>("tostring")?
            .call::<String>(other),
    }
}

/// Quote `text` as a Lua string literal.
#[must_use]
pub fn lua_string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\0' => literal.push_str("\\0"),
            _ => literal.push(c),
        }
    }
    literal.push('"');
    literal
}
