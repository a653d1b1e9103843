//! Error taxonomy, return-code classes, return-options plumbing, and the Error
//! Trace Engine (spec.md §4.I, §7).
//!
//! Follows the teacher's `ExcType`/`strum` pattern (`exception_private::ExcType`):
//! a plain enum carrying `Display`/`EnumString`/`IntoStaticStr` so `-errorcode`
//! rendering and `catch`/`throw` code parsing share one source of truth instead of
//! hand-written match arms on both sides.

use std::fmt;

use strum::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::parser::CodeRange;

/// Error kinds from spec.md §7. Carried as the first element of `-errorcode`
/// unless the script supplies its own via `error`/`throw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    Parse,
    Type,
    Name,
    Arity,
    Arith,
    Range,
    Control,
    Recursion,
    Cancelled,
    User,
}

/// The five return-code classes plus integer extensions (spec.md §3.6).
///
/// `Other(i64)` covers codes beyond the five named ones (Tcl allows arbitrary
/// positive `-code` values via `return -code N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok,
    Error,
    Return,
    Break,
    Continue,
    Other(i64),
}

impl ReturnCode {
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::Return => 2,
            Self::Break => 3,
            Self::Continue => 4,
            Self::Other(n) => n,
        }
    }

    #[must_use]
    pub fn from_i64(n: i64) -> Self {
        match n {
            0 => Self::Ok,
            1 => Self::Error,
            2 => Self::Return,
            3 => Self::Break,
            4 => Self::Continue,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// A single entry in the structured `-errorstack` list: either the command that
/// initiated the error (`Inner`) or a procedure frame it unwound through (`Call`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    Inner(String),
    Call(String),
}

/// The return-options dict (spec.md §3.6), kept as a small struct rather than a
/// generic map since its key set is fixed and every consumer (`catch`, `try`,
/// uncaught-error reporting) needs typed access to all of them.
#[derive(Debug, Clone, Default)]
pub struct ReturnOptions {
    pub code: i64,
    pub level: i64,
    pub error_info: Option<String>,
    pub error_code: Option<Vec<String>>,
    pub error_stack: Option<Vec<StackEntry>>,
    pub error_line: Option<u32>,
}

impl ReturnOptions {
    #[must_use]
    pub fn ok() -> Self {
        Self { code: ReturnCode::Ok.as_i64(), level: 0, ..Self::default() }
    }

    #[must_use]
    pub fn with_code(code: ReturnCode) -> Self {
        Self { code: code.as_i64(), level: 0, ..Self::default() }
    }
}

/// A raised core error before it is wrapped into return-options.
///
/// This is the crate's `Result::Err` payload for internal plumbing; it carries
/// enough to populate `ReturnOptions` once it reaches a `catch`/`try` boundary or
/// the outermost `script_eval`.
#[derive(Debug, Clone)]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
    pub error_code: Vec<String>,
    pub location: Option<CodeRange>,
}

impl CoreError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), error_code: vec![kind.into()], location: None }
    }

    #[must_use]
    pub fn with_code(mut self, code: Vec<String>) -> Self {
        self.error_code = code;
        self
    }

    #[must_use]
    pub fn at(mut self, loc: CodeRange) -> Self {
        self.location = Some(loc);
        self
    }

    // -- canonical message constructors (spec.md §6, exact text is contract) --

    #[must_use]
    pub fn wrong_num_args(signature: &str) -> Self {
        Self::new(ErrorKind::Arity, format!("wrong # args: should be \"{signature}\""))
    }

    #[must_use]
    pub fn invalid_command_name(name: &str) -> Self {
        Self::new(ErrorKind::Name, format!("invalid command name \"{name}\""))
    }

    #[must_use]
    pub fn no_such_variable(name: &str) -> Self {
        Self::new(ErrorKind::Name, format!("can't read \"{name}\": no such variable"))
    }

    #[must_use]
    pub fn variable_is_array(name: &str) -> Self {
        Self::new(ErrorKind::Name, format!("can't set \"{name}\": variable is array"))
    }

    #[must_use]
    pub fn variable_isnt_array(name: &str) -> Self {
        Self::new(ErrorKind::Name, format!("can't set \"{name}\": variable isn't array"))
    }

    #[must_use]
    pub fn expected_integer(got: &str) -> Self {
        Self::new(ErrorKind::Type, format!("expected integer but got \"{got}\""))
    }

    #[must_use]
    pub fn expected_double(got: &str) -> Self {
        Self::new(ErrorKind::Type, format!("expected floating-point number but got \"{got}\""))
    }

    #[must_use]
    pub fn expected_bool(got: &str) -> Self {
        Self::new(ErrorKind::Type, format!("expected boolean but got \"{got}\""))
    }

    #[must_use]
    pub fn missing_value_to_go_with_key() -> Self {
        Self::new(ErrorKind::Type, "missing value to go with key")
    }

    #[must_use]
    pub fn divide_by_zero() -> Self {
        Self::new(ErrorKind::Arith, "divide by zero").with_code(vec!["ARITH".into(), "DIVZERO".into()])
    }

    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "eval cancelled").with_code(vec!["CANCELLED".into()])
    }

    #[must_use]
    pub fn too_many_nested_evaluations() -> Self {
        Self::new(ErrorKind::Recursion, "too many nested evaluations (infinite loop?)")
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CoreError {}

/// Accumulates stack-trace context across propagation (spec.md §4.I).
///
/// Observable to scripts as the reserved `::tcl::errors::{active,info,stack,line}`
/// variables; the core mutates this in place as an error unwinds, then copies it
/// into a `ReturnOptions` and clears it at a catching boundary.
#[derive(Debug, Clone, Default)]
pub struct ErrorTrace {
    pub active: bool,
    pub info: String,
    pub stack: Vec<StackEntry>,
    pub line: u32,
}

impl ErrorTrace {
    /// Begins a new trace at the point an `error`/`throw` (or any uncaught
    /// built-in failure) is raised.
    pub fn begin(&mut self, cmd_and_args: &str, line: u32) {
        self.active = true;
        self.info = format!("{cmd_and_args}\n    while executing\n\"{cmd_and_args}\"");
        self.stack = vec![StackEntry::Inner(cmd_and_args.to_string())];
        self.line = line;
    }

    /// Appends context as a procedure frame unwinds with the error still live
    /// (spec.md §4.I transition 2).
    pub fn unwind_through_proc(&mut self, name: &str, line: u32, call_repr: &str) {
        if !self.active {
            return;
        }
        self.info.push_str(&format!(
            "\n    (procedure \"{name}\" line {line})\n    invoked from within\n\"{call_repr}\""
        ));
        self.stack.push(StackEntry::Call(call_repr.to_string()));
    }

    /// Copies the accumulated trace into return-options and clears the active
    /// trace, as happens at `catch`/`try` or the outermost `script_eval`.
    pub fn capture_and_clear(&mut self, opts: &mut ReturnOptions) {
        opts.error_info = Some(self.info.clone());
        opts.error_stack = Some(self.stack.clone());
        opts.error_line = Some(self.line);
        self.active = false;
        self.info.clear();
        self.stack.clear();
        self.line = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_roundtrips_through_strum() {
        let kind: ErrorKind = "Arith".parse().unwrap();
        assert_eq!(kind, ErrorKind::Arith);
        let s: &'static str = ErrorKind::Name.into();
        assert_eq!(s, "Name");
    }

    #[test]
    fn canonical_messages_match_contract_text() {
        assert_eq!(
            CoreError::wrong_num_args("foo a b").message,
            "wrong # args: should be \"foo a b\""
        );
        assert_eq!(
            CoreError::no_such_variable("x").message,
            "can't read \"x\": no such variable"
        );
        assert_eq!(CoreError::divide_by_zero().message, "divide by zero");
        assert_eq!(CoreError::divide_by_zero().error_code, vec!["ARITH", "DIVZERO"]);
    }

    #[test]
    fn trace_accumulates_across_unwind_and_clears_on_capture() {
        let mut trace = ErrorTrace::default();
        trace.begin("error oops", 1);
        trace.unwind_through_proc("bar", 1, "bar");
        trace.unwind_through_proc("foo", 1, "foo");
        assert!(trace.info.contains("while executing"));
        assert!(trace.info.contains("invoked from within"));
        assert_eq!(
            trace.stack,
            vec![
                StackEntry::Inner("error oops".into()),
                StackEntry::Call("bar".into()),
                StackEntry::Call("foo".into()),
            ]
        );
        let mut opts = ReturnOptions::ok();
        trace.capture_and_clear(&mut opts);
        assert!(!trace.active);
        assert!(trace.stack.is_empty());
        assert!(opts.error_stack.is_some());
    }
}
