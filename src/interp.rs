//! The interpreter: ties the namespace tree, frame stack, built-in registry,
//! and error trace together, and exposes the public entry points (spec.md
//! §6): [`Interp::script_eval`], [`Interp::command_exec`], [`Interp::subst_value`],
//! and incremental parsing via [`crate::parser::Parser`] directly.

use std::collections::HashMap;

use crate::errors::{CoreError, ErrorKind, ReturnCode, ReturnOptions};
use crate::eval::{CmdResult, Signal};
use crate::frame::{FrameStack, VarLocation};
use crate::hostops::{Arena, HostOps, LinkTarget, NsHandle, TraceEvent, TraceHandle, ValueHandle};
use crate::namespace::{NamespaceTree, NodeId};
use crate::tracer::{CoreTracer, NoopTracer};

/// Runtime-configurable limits (spec.md §5, §9.3 ambient configuration).
/// Constructor parameter, not a global — the core does no environment/file
/// config reads.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub recursion_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { recursion_limit: 1000 }
    }
}

/// A registered built-in command implementation.
pub type BuiltinFn<H> = fn(&mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult;

/// Flags accepted by [`Interp::script_eval`] (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalFlags {
    Local,
    Global,
}

/// One `trace add` registration, kept interpreter-side since `HostOps` only
/// exposes a flat handle for removal, not enumeration (spec.md §4.J `trace`).
pub struct TraceRecord {
    pub ns: NsHandle,
    pub name: String,
    pub event: TraceEvent,
    pub command: String,
    pub handle: TraceHandle,
}

pub struct Interp<H: HostOps> {
    pub host: H,
    pub namespaces: NamespaceTree,
    pub frames: FrameStack,
    pub error_trace: crate::errors::ErrorTrace,
    pub limits: Limits,
    pub eval_depth: usize,
    pub global_ns: NodeId,
    pub(crate) builtins: HashMap<&'static str, BuiltinFn<H>>,
    pub result: ValueHandle,
    pub traces: Vec<TraceRecord>,
    /// Observes dispatch, trace-fire, and error-trace transitions (spec.md
    /// §9.2). `NoopTracer` by default; swap via [`Interp::set_tracer`].
    pub tracer: Box<dyn CoreTracer>,
}

impl<H: HostOps> Interp<H> {
    /// `interp_init` (spec.md §6): populates builtins and the reserved
    /// `::tcl`/`::tcl::errors`/`::tcl::trace` namespaces, initializes the
    /// global frame.
    pub fn new(mut host: H, limits: Limits) -> Result<Self, CoreError> {
        let namespaces = NamespaceTree::new(&mut host)?;
        let global_ns = namespaces.root();
        let frames = FrameStack::new(global_ns, namespaces.storage(global_ns), limits.recursion_limit);
        let empty = host.value_from_bytes(b"", Arena::Permanent).map_err(|e| CoreError::new(ErrorKind::Name, e.message))?;
        let mut interp = Self {
            host,
            namespaces,
            frames,
            error_trace: crate::errors::ErrorTrace::default(),
            limits,
            eval_depth: 0,
            global_ns,
            builtins: HashMap::new(),
            result: empty,
            traces: Vec::new(),
            tracer: Box::new(NoopTracer),
        };
        interp.namespaces.ensure_path(&mut interp.host, global_ns, &["tcl"], true)?;
        interp.namespaces.ensure_path(&mut interp.host, global_ns, &["tcl", "errors"], true)?;
        interp.namespaces.ensure_path(&mut interp.host, global_ns, &["tcl", "trace"], true)?;
        crate::builtins::register_all(&mut interp.builtins);
        Ok(interp)
    }

    #[must_use]
    pub fn current_ns(&self) -> NodeId {
        self.frames.current().ns
    }

    pub fn new_string(&mut self, s: &str, arena: Arena) -> Result<ValueHandle, CoreError> {
        crate::value::new_string(&mut self.host, s, arena)
    }

    pub fn empty_value(&mut self, arena: Arena) -> Result<ValueHandle, CoreError> {
        self.new_string("", arena)
    }

    // -- command lookup (spec.md §4.E "Command lookup") ------------------------

    /// Resolves a command name to its defining namespace and simple name,
    /// walking parents for an unqualified name with no explicit path.
    #[must_use]
    pub fn resolve_command_ns(&self, name: &str) -> Option<(NodeId, String)> {
        let (absolute, path, simple) = NamespaceTree::split_qualified(name);
        if absolute || !path.is_empty() {
            let ns = self.namespaces.resolve_path(self.current_ns(), &path, absolute)?;
            return Some((ns, simple.to_string()));
        }
        // Unqualified: walk from current namespace up through parents to ::.
        let mut cur = Some(self.current_ns());
        while let Some(ns) = cur {
            if self.host.proc_lookup(self.namespaces.storage(ns), simple).is_some() || self.builtins.contains_key(simple) {
                return Some((ns, simple.to_string()));
            }
            cur = self.namespaces.parent(ns);
        }
        Some((self.current_ns(), simple.to_string()))
    }

    // -- variable resolution (spec.md §4.E) -------------------------------------

    /// Resolves a (possibly array, possibly namespace-qualified) variable name
    /// to the `NsHandle`/storage key it ultimately reads/writes, following
    /// frame links unless `ns` was explicit in the name.
    fn resolve_var_storage(&mut self, name: &str) -> (NsHandle, String) {
        let (absolute, path, simple) = NamespaceTree::split_qualified(name);
        if absolute || !path.is_empty() {
            let ns = self
                .namespaces
                .ensure_path(&mut self.host, self.current_ns(), &path, absolute)
                .unwrap_or(self.current_ns());
            return (self.namespaces.storage(ns), simple.to_string());
        }
        match self.frames.current().resolve(simple) {
            VarLocation::Local(ns) => (ns, simple.to_string()),
            VarLocation::Linked(LinkTarget::Namespace { ns, name }) => (ns, name),
            VarLocation::Linked(LinkTarget::UpFrame { target_level, target_name }) => {
                let storage = self.frames.at_level(target_level).map_or(self.namespaces.storage(self.global_ns), |f| f.locals);
                (storage, target_name)
            }
        }
    }

    /// Resolves `name` to the `(NsHandle, simple name)` pair that `var_read`/
    /// `var_write` fire traces against, for `trace add|remove variable` to
    /// register under the same key.
    #[must_use]
    pub fn resolve_var_location(&mut self, name: &str) -> (NsHandle, String) {
        self.resolve_var_storage(name)
    }

    pub fn var_read(&mut self, name: &str, index: Option<&[u8]>) -> Result<ValueHandle, CoreError> {
        let (storage, simple) = self.resolve_var_storage(name);
        let value = if let Some(key) = index {
            self.host.array_get(storage, &simple, key)
        } else {
            self.host.var_get(storage, &simple)
        };
        let value = value.ok_or_else(|| {
            let display = index.map_or_else(|| name.to_string(), |k| format!("{name}({})", String::from_utf8_lossy(k)));
            CoreError::no_such_variable(&display)
        })?;
        self.host.trace_fire(storage, &simple, TraceEvent::Read);
        self.tracer.on_trace_fire("read", &simple);
        Ok(value)
    }

    pub fn var_write(&mut self, name: &str, index: Option<&[u8]>, value: ValueHandle) -> Result<(), CoreError> {
        let (storage, simple) = self.resolve_var_storage(name);
        if let Some(key) = index {
            if self.host.var_exists(storage, &simple) && !self.host.array_is_array(storage, &simple) {
                return Err(CoreError::variable_isnt_array(&simple));
            }
            self.host.array_set(storage, &simple, key, value).map_err(|e| CoreError::new(ErrorKind::Name, e.message))?;
        } else {
            if self.host.array_is_array(storage, &simple) {
                return Err(CoreError::variable_is_array(&simple));
            }
            self.host.var_set(storage, &simple, value).map_err(|e| CoreError::new(ErrorKind::Name, e.message))?;
        }
        self.host.trace_fire(storage, &simple, TraceEvent::Write);
        self.tracer.on_trace_fire("write", &simple);
        Ok(())
    }

    #[must_use]
    pub fn var_exists(&mut self, name: &str) -> bool {
        let (storage, simple) = self.resolve_var_storage(name);
        self.host.var_exists(storage, &simple) || self.host.array_is_array(storage, &simple)
    }

    pub fn var_unset(&mut self, name: &str) -> bool {
        let (storage, simple) = self.resolve_var_storage(name);
        let existed = self.host.var_unset(storage, &simple);
        if existed {
            self.host.trace_fire(storage, &simple, TraceEvent::Unset);
            self.tracer.on_trace_fire("unset", &simple);
        }
        existed
    }

    /// `upvar level otherVar localName` (spec.md §4.E).
    pub fn link_upvar(&mut self, level_spec: &str, other_var: &str, local_name: &str) -> Result<(), CoreError> {
        let level = self
            .frames
            .resolve_level(level_spec)
            .ok_or_else(|| CoreError::new(ErrorKind::Control, format!("bad level \"{level_spec}\"")))?;
        let target = LinkTarget::UpFrame { target_level: level, target_name: other_var.to_string() };
        self.frames.current_mut().links.insert(local_name.to_string(), target);
        Ok(())
    }

    /// `global name` (spec.md §4.E).
    pub fn link_global(&mut self, name: &str) {
        let target = LinkTarget::Namespace { ns: self.namespaces.storage(self.global_ns), name: name.to_string() };
        self.frames.current_mut().links.insert(name.to_string(), target);
    }

    /// `variable name ?value?` (spec.md §4.E): ensures the namespace var
    /// exists (optionally initializing), and if inside a proc frame, links
    /// the local name to it.
    pub fn link_variable(&mut self, name: &str, init: Option<ValueHandle>) -> Result<(), CoreError> {
        let ns = self.current_ns();
        let storage = self.namespaces.storage(ns);
        if let Some(v) = init {
            self.host.var_set(storage, name, v).map_err(|e| CoreError::new(ErrorKind::Name, e.message))?;
        } else if !self.host.var_exists(storage, name) {
            // Declares without a value; reads before the first `set` still
            // raise NAME, matching ordinary unset-variable semantics.
        }
        if self.frames.current().level != 0 {
            let target = LinkTarget::Namespace { ns: storage, name: name.to_string() };
            self.frames.current_mut().links.insert(name.to_string(), target);
        }
        Ok(())
    }

    /// Swaps in a different tracer (spec.md §9.2). Typically called once
    /// right after [`Interp::new`], before any script runs.
    pub fn set_tracer(&mut self, tracer: Box<dyn CoreTracer>) {
        self.tracer = tracer;
    }

    /// Translates an in-flight [`Signal`] into a [`ReturnOptions`] dict, as
    /// happens at `catch`/`try` boundaries and at the outermost `script_eval`.
    pub fn signal_to_options(&mut self, signal: &Signal) -> ReturnOptions {
        match signal {
            Signal::Error(err) => {
                let mut opts = ReturnOptions::with_code(ReturnCode::Error);
                opts.error_code = Some(err.error_code.clone());
                if !self.error_trace.active {
                    // `error`/`throw` already called `begin` with the exact
                    // "cmd args" text; every other CoreError site (arity,
                    // NAME, ARITH, ...) never does, so without this the
                    // caught options dict would carry an empty -errorinfo/
                    // -errorstack for those failures. Synthesize a minimal
                    // one-entry trace from the error itself so catch/try
                    // never reports a blank trace for a real ERROR.
                    let line = self.frames.current().line;
                    self.error_trace.begin(&err.message, line);
                    self.tracer.on_error_begin(&err.message, line);
                }
                self.error_trace.capture_and_clear(&mut opts);
                self.tracer.on_error_clear(opts.error_stack.as_deref().unwrap_or(&[]));
                opts
            }
            Signal::Return { options, .. } => options.clone(),
            Signal::Break => ReturnOptions::with_code(ReturnCode::Break),
            Signal::Continue => ReturnOptions::with_code(ReturnCode::Continue),
            Signal::Other { code, .. } => ReturnOptions::with_code(ReturnCode::from_i64(*code)),
        }
    }

    /// `script_eval` (spec.md §6): evaluates a script buffer at the current
    /// or global frame depending on `flags`, updating `self.result`.
    pub fn script_eval(&mut self, src: &[u8], flags: EvalFlags) -> Result<ValueHandle, Signal> {
        if flags == EvalFlags::Global {
            // Actually run at frame 0, the same way `uplevel #0` does
            // (builtins::control::cmd_uplevel): detach every frame above
            // level 0 so frame 0 becomes current, run nested, then restore
            // the tail regardless of outcome. Reassigning only the current
            // frame's `ns` field is not enough — unqualified variable
            // resolution (`resolve_var_storage`) reads/writes
            // `frame.locals`/`frame.links` on whatever frame is current, and
            // never consults `frame.ns`, so that alone would leave
            // unqualified variable access still landing in the caller's
            // frame instead of the global one.
            let tail = self.frames.detach_above(0).expect("level 0 always exists");
            let result = crate::eval::eval_script(self, src);
            self.frames.restore_tail(tail);
            result
        } else {
            crate::eval::eval_script(self, src)
        }
    }

    /// `subst` (spec.md §6): runs substitution over a word without executing
    /// any command that isn't itself inside a `[...]` segment (command
    /// substitutions still execute; that is what "substitution" means for
    /// `[...]`). `no_commands`/`no_variables`/`no_backslashes` mirror the
    /// `subst` built-in's flags.
    pub fn subst_bytes(&mut self, src: &[u8], no_commands: bool, no_variables: bool, no_backslashes: bool) -> CmdResult {
        crate::subst::subst_top_level(self, src, no_commands, no_variables, no_backslashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_hostops::MemHost;

    #[test]
    fn script_eval_global_writes_unqualified_vars_into_global_frame_not_current() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        interp.frames.push(&mut interp.host, interp.global_ns, "caller".to_string(), vec![]).unwrap();

        interp.script_eval(b"set x 1", EvalFlags::Global).unwrap();

        // The pushed frame (still current) never got a local `x`: an
        // unqualified read against it fails, proving GLOBAL actually ran
        // against frame 0's storage rather than merely relabeling the
        // current frame's namespace.
        assert!(interp.script_eval(b"set x", EvalFlags::Local).is_err());

        let global_storage = interp.namespaces.storage(interp.global_ns);
        let v = interp.host.var_get(global_storage, "x").expect("global frame should hold x");
        assert_eq!(crate::builtins::text(&interp, v).unwrap(), "1");

        interp.frames.pop(&mut interp.host);
    }
}
