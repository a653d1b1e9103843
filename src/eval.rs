//! Evaluator trampoline (spec.md §4.F): drives one script's command sequence
//! with an explicit loop (never native recursion for sibling commands within
//! a single script), dispatches to built-ins/procedures/foreign objects, and
//! propagates return-code signals.
//!
//! Nested evaluation (command substitution, control-flow bodies, procedure
//! invocation) recurses at the Rust call site through [`eval_script`]
//! itself; every such entry is gated by [`Interp::enter_nested`] against the
//! same recursion limit that bounds call-frame depth, so the "too many nested
//! evaluations" contract (spec.md §8) holds uniformly rather than only at
//! procedure boundaries. Flattening control-flow bodies into the same
//! explicit continuation stack used for the top-level command sequence was
//! judged out of proportion to this crate's scope; see DESIGN.md.

use crate::errors::{CoreError, ErrorKind, ReturnOptions};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::Interp;
use crate::namespace::NodeId;
use crate::parser::ParseStatus;

/// A non-OK outcome propagating up through command boundaries (spec.md
/// §3.6, §4.F). `Result::Ok` carries the OK-path result value directly so
/// built-ins read naturally as `Result<ValueHandle, Signal>`.
#[derive(Debug, Clone)]
pub enum Signal {
    Error(CoreError),
    Return { value: ValueHandle, options: ReturnOptions },
    Break,
    Continue,
    Other { code: i64, value: ValueHandle },
}

pub type CmdResult = Result<ValueHandle, Signal>;

impl<H: HostOps> Interp<H> {
    /// Guards a nested `eval_script` entry (command substitution, a
    /// control-flow body, or a procedure call) against the recursion limit,
    /// running `body` and decrementing on every exit path.
    pub(crate) fn enter_nested<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T, Signal>) -> Result<T, Signal> {
        if self.eval_depth >= self.limits.recursion_limit {
            return Err(Signal::Error(CoreError::too_many_nested_evaluations()));
        }
        self.eval_depth += 1;
        let result = body(self);
        self.eval_depth -= 1;
        result
    }

    fn check_cancel(&self) -> Result<(), Signal> {
        if self.host.control_should_yield() {
            return Err(Signal::Error(CoreError::cancelled()));
        }
        Ok(())
    }
}

/// Runs every command in `src` in source order (spec.md §4.F phases 1-4),
/// using an explicit loop over [`crate::parser::Parser`] rather than
/// recursing per sibling command.
pub fn eval_script<H: HostOps>(interp: &mut Interp<H>, src: &[u8]) -> CmdResult {
    let mut parser = crate::parser::Parser::new(src);
    let mut last_result = interp.empty_value(Arena::Scratch).map_err(Signal::Error)?;
    loop {
        interp.check_cancel()?;
        match parser.parse_command() {
            ParseStatus::End => return Ok(last_result),
            ParseStatus::Ok(cmd) => {
                if cmd.words.is_empty() {
                    continue;
                }
                interp.check_cancel()?;
                let args = substitute_words(interp, &cmd.words)?;
                interp.frames.current_mut().line = cmd.line;
                last_result = dispatch(interp, &args)?;
            }
            ParseStatus::Incomplete { kind, .. } => {
                return Err(Signal::Error(CoreError::new(ErrorKind::Parse, format!("{kind:?} not terminated"))));
            }
            ParseStatus::Error { message, .. } => {
                return Err(Signal::Error(CoreError::new(ErrorKind::Parse, message)));
            }
        }
    }
}

fn substitute_words<H: HostOps>(interp: &mut Interp<H>, words: &[crate::parser::Word]) -> Result<Vec<ValueHandle>, Signal> {
    let mut args = Vec::with_capacity(words.len());
    for word in words {
        args.push(crate::subst::subst_word(interp, word)?);
    }
    Ok(args)
}

enum Dispatch {
    Builtin(&'static str),
    Proc { ns: NodeId, name: String, params: ValueHandle, body: ValueHandle },
}

fn lookup_command<H: HostOps>(interp: &Interp<H>, name: &str) -> Option<Dispatch> {
    let (absolute, path, simple) = crate::namespace::NamespaceTree::split_qualified(name);
    if absolute || !path.is_empty() {
        let ns = interp.namespaces.resolve_path(interp.current_ns(), &path, absolute)?;
        if let Some((params, body)) = interp.host.proc_lookup(interp.namespaces.storage(ns), simple) {
            return Some(Dispatch::Proc { ns, name: simple.to_string(), params, body });
        }
        if ns == interp.global_ns {
            if let Some((&key, _)) = interp.builtins.get_key_value(simple) {
                return Some(Dispatch::Builtin(key));
            }
        }
        return None;
    }
    let mut cur = Some(interp.current_ns());
    while let Some(ns) = cur {
        if let Some((params, body)) = interp.host.proc_lookup(interp.namespaces.storage(ns), simple) {
            return Some(Dispatch::Proc { ns, name: simple.to_string(), params, body });
        }
        cur = interp.namespaces.parent(ns);
    }
    interp.builtins.get_key_value(simple).map(|(&key, _)| Dispatch::Builtin(key))
}

/// DISPATCH phase (spec.md §4.F step 3-4): resolves `args[0]` to a command
/// and invokes it.
pub fn dispatch<H: HostOps>(interp: &mut Interp<H>, args: &[ValueHandle]) -> CmdResult {
    let name_bytes = interp.host.value_string_bytes(args[0]).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Name, e.message)))?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    match lookup_command(interp, &name) {
        Some(Dispatch::Builtin(key)) => {
            let storage = interp.namespaces.storage(interp.current_ns());
            interp.host.trace_fire(storage, key, crate::hostops::TraceEvent::Call);
            interp.tracer.on_trace_fire("call", key);
            interp.tracer.on_dispatch(key, interp.eval_depth);
            let func = *interp.builtins.get(key).expect("looked up from builtins map");
            func(interp, key, &args[1..])
        }
        Some(Dispatch::Proc { ns, name, params, body }) => {
            let storage = interp.namespaces.storage(ns);
            interp.host.trace_fire(storage, &name, crate::hostops::TraceEvent::Call);
            interp.tracer.on_trace_fire("call", &name);
            interp.tracer.on_dispatch(&name, interp.eval_depth);
            interp.enter_nested(|interp| crate::proc::invoke(interp, ns, &name, params, body, &args[1..]))
        }
        None => {
            if let Some(handler) = interp.host.bind_unknown().map(str::to_string) {
                let mut full_args = Vec::with_capacity(args.len() + 1);
                let handler_val = crate::value::new_string(&mut interp.host, &handler, Arena::Scratch).map_err(Signal::Error)?;
                full_args.push(handler_val);
                full_args.extend_from_slice(args);
                interp.enter_nested(|interp| dispatch(interp, &full_args))
            } else if interp.host.foreign_is_foreign(args[0]) {
                crate::foreign::invoke_as_command(interp, args)
            } else {
                Err(Signal::Error(CoreError::invalid_command_name(&name)))
            }
        }
    }
}

/// `command_exec` (spec.md §6): dispatches an already-substituted argument
/// vector directly, for hosts/built-ins that construct commands
/// programmatically (`apply`, `uplevel`, foreign dispatch).
pub fn command_exec<H: HostOps>(interp: &mut Interp<H>, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return interp.empty_value(Arena::Scratch).map_err(Signal::Error);
    }
    interp.enter_nested(|interp| dispatch(interp, args))
}
