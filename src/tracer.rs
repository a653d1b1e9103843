//! Execution tracing (spec.md §9.2's ambient engineering surface): a
//! trait-based hook system for observing the evaluator trampoline from
//! outside, without the core doing any I/O itself.
//!
//! The teacher ships a `VmTracer` trait keyed to bytecode dispatch
//! (`on_instruction`, `on_call`, cell load/store, ...) with a family of
//! concrete tracers (`NoopTracer`, `StderrTracer`, `ProfilingTracer`,
//! `CoverageTracer`, `RecordingTracer`). This crate has no bytecode and no
//! instruction pointer, so [`CoreTracer`] is keyed instead to the three
//! things a command trampoline can actually report: command dispatch
//! (`eval::dispatch`), variable/command trace firing (the `trace` built-in),
//! and error-trace transitions (`errors::ErrorTrace`). Each concrete tracer
//! below plays the same role as its teacher counterpart, just over these
//! narrower events.
//!
//! Unlike the teacher, [`Interp`](crate::interp::Interp) holds its tracer as
//! `Box<dyn CoreTracer>` rather than a third type parameter. The teacher's
//! `VM<'a, T, P, Tr>` monomorphizes so `NoopTracer` compiles away entirely;
//! threading an equivalent type parameter through every built-in function
//! pointer already registered in `builtins::BuiltinFn<H>` would ripple
//! through the whole crate for a cold path that is off by default anyway.
//! [`NoopTracer`]'s methods still cost only a vtable call each, which is
//! negligible next to the `Vec<ValueHandle>` allocation every dispatch
//! already does.

use crate::errors::StackEntry;

/// A trace event, as recorded by [`RecordingTracer`] for post-mortem replay.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    /// A command was resolved and is about to run.
    Dispatch { name: String, depth: usize },
    /// A registered `trace add variable|command|execution` fired.
    Fire { op: &'static str, name: String },
    /// An `error`/`throw` (or unwinding built-in failure) started a trace.
    ErrorBegin { cmd_and_args: String, line: u32 },
    /// A procedure frame unwound with the error still live.
    ErrorUnwind { proc_name: String, line: u32 },
    /// The trace was copied into `-errorinfo`/`-errorstack` and cleared.
    ErrorClear { stack: Vec<StackEntry> },
}

/// Hook points a tracer can observe. All methods default to no-ops so a
/// tracer only overrides what it cares about, mirroring the teacher's
/// `VmTracer`.
pub trait CoreTracer: std::fmt::Debug {
    /// Called from `eval::dispatch` once a command name resolves, before it
    /// runs. `depth` is the current nested-evaluation depth
    /// ([`Interp::eval_depth`](crate::interp::Interp)).
    #[inline(always)]
    fn on_dispatch(&mut self, _name: &str, _depth: usize) {}

    /// Called wherever `HostOps::trace_fire` is invoked (variable read,
    /// write, unset, rename, or command call) for a name with a registered
    /// trace.
    #[inline(always)]
    fn on_trace_fire(&mut self, _op: &'static str, _name: &str) {}

    /// Called when `ErrorTrace::begin` starts accumulating a new trace.
    #[inline(always)]
    fn on_error_begin(&mut self, _cmd_and_args: &str, _line: u32) {}

    /// Called when `ErrorTrace::unwind_through_proc` appends a frame.
    #[inline(always)]
    fn on_error_unwind(&mut self, _proc_name: &str, _line: u32) {}

    /// Called when `ErrorTrace::capture_and_clear` drains the live trace.
    #[inline(always)]
    fn on_error_clear(&mut self, _stack: &[StackEntry]) {}
}

// ============================================================================
// NoopTracer — zero-registration production default
// ============================================================================

/// Does nothing. The default tracer for every [`Interp::new`](crate::interp::Interp::new).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl CoreTracer for NoopTracer {}

// ============================================================================
// StderrTracer — human-readable log
// ============================================================================

/// Prints a human-readable log of dispatch, trace-fire, and error-trace
/// events to stderr. Useful for interactively watching a script run.
#[derive(Debug)]
pub struct StderrTracer {
    limit: Option<usize>,
    count: usize,
    stopped: bool,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self { limit: None, count: 0, stopped: false }
    }

    /// Stops producing output after `limit` events, to avoid flooding stderr
    /// from a tight loop.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), count: 0, stopped: false }
    }

    fn tick(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count >= limit
        {
            eprintln!("--- trace limit reached ({limit} events) ---");
            self.stopped = true;
        }
        true
    }
}

impl Default for StderrTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreTracer for StderrTracer {
    fn on_dispatch(&mut self, name: &str, depth: usize) {
        if self.tick() {
            eprintln!("[dispatch] {name:<20} depth={depth}");
        }
    }

    fn on_trace_fire(&mut self, op: &'static str, name: &str) {
        if self.tick() {
            eprintln!("  ... TRACE {op:<6} {name}");
        }
    }

    fn on_error_begin(&mut self, cmd_and_args: &str, line: u32) {
        if self.tick() {
            eprintln!("  >>> ERROR at line {line}: {cmd_and_args}");
        }
    }

    fn on_error_unwind(&mut self, proc_name: &str, line: u32) {
        if self.tick() {
            eprintln!("  <<< unwind through \"{proc_name}\" line {line}");
        }
    }

    fn on_error_clear(&mut self, stack: &[StackEntry]) {
        if self.tick() {
            eprintln!("  === trace cleared ({} frames)", stack.len());
        }
    }
}

// ============================================================================
// ProfilingTracer — per-command dispatch counts and max depth
// ============================================================================

/// Collects dispatch frequency per command name and the maximum nested-eval
/// depth reached, the command-trampoline analogue of the teacher's opcode
/// frequency counters.
#[derive(Debug, Default)]
pub struct ProfilingTracer {
    dispatch_counts: std::collections::HashMap<String, u64>,
    total_dispatches: u64,
    max_depth: usize,
}

/// Summary produced by [`ProfilingTracer::report`].
#[derive(Debug)]
pub struct ProfilingReport {
    pub dispatch_counts: Vec<(String, u64)>,
    pub total_dispatches: u64,
    pub max_depth: usize,
}

impl ProfilingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch counts sorted by frequency, most-called first.
    #[must_use]
    pub fn report(&self) -> ProfilingReport {
        let mut dispatch_counts: Vec<_> = self.dispatch_counts.iter().map(|(k, &v)| (k.clone(), v)).collect();
        dispatch_counts.sort_by(|a, b| b.1.cmp(&a.1));
        ProfilingReport { dispatch_counts, total_dispatches: self.total_dispatches, max_depth: self.max_depth }
    }
}

impl CoreTracer for ProfilingTracer {
    fn on_dispatch(&mut self, name: &str, depth: usize) {
        *self.dispatch_counts.entry(name.to_string()).or_insert(0) += 1;
        self.total_dispatches += 1;
        if depth > self.max_depth {
            self.max_depth = depth;
        }
    }
}

impl std::fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Profiling Report ===")?;
        writeln!(f, "Total dispatches: {}", self.total_dispatches)?;
        writeln!(f, "Max eval depth:   {}", self.max_depth)?;
        writeln!(f)?;
        writeln!(f, "--- Command Frequency ---")?;
        for (name, count) in &self.dispatch_counts {
            let pct = (*count as f64 / self.total_dispatches as f64) * 100.0;
            writeln!(f, "  {name:<24} {count:>8}  ({pct:>5.1}%)")?;
        }
        Ok(())
    }
}

// ============================================================================
// CoverageTracer — which commands were ever dispatched
// ============================================================================

/// Records the set of distinct command names dispatched, the
/// command-trampoline analogue of the teacher's instruction-offset coverage
/// (there is no instruction pointer here — a command name is the unit of
/// "was this code path exercised").
#[derive(Debug, Default)]
pub struct CoverageTracer {
    names: std::collections::BTreeSet<String>,
}

impl CoverageTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn covered_names(&self) -> &std::collections::BTreeSet<String> {
        &self.names
    }

    #[must_use]
    pub fn coverage_count(&self) -> usize {
        self.names.len()
    }
}

impl CoreTracer for CoverageTracer {
    fn on_dispatch(&mut self, name: &str, _depth: usize) {
        self.names.insert(name.to_string());
    }
}

// ============================================================================
// RecordingTracer — full event log for replay/post-mortem
// ============================================================================

/// Records every event into a `Vec<TraceEvent>` for deterministic replay or
/// post-mortem inspection. The most expensive tracer; use it for debugging a
/// specific run, not production.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { events: Vec::with_capacity(limit.min(1024)), limit: Some(limit) }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    fn at_limit(&self) -> bool {
        self.limit.is_some_and(|l| self.events.len() >= l)
    }

    fn push(&mut self, event: TraceEvent) {
        if !self.at_limit() {
            self.events.push(event);
        }
    }
}

impl CoreTracer for RecordingTracer {
    fn on_dispatch(&mut self, name: &str, depth: usize) {
        self.push(TraceEvent::Dispatch { name: name.to_string(), depth });
    }

    fn on_trace_fire(&mut self, op: &'static str, name: &str) {
        self.push(TraceEvent::Fire { op, name: name.to_string() });
    }

    fn on_error_begin(&mut self, cmd_and_args: &str, line: u32) {
        self.push(TraceEvent::ErrorBegin { cmd_and_args: cmd_and_args.to_string(), line });
    }

    fn on_error_unwind(&mut self, proc_name: &str, line: u32) {
        self.push(TraceEvent::ErrorUnwind { proc_name: proc_name.to_string(), line });
    }

    fn on_error_clear(&mut self, stack: &[StackEntry]) {
        self.push(TraceEvent::ErrorClear { stack: stack.to_vec() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiling_tracer_counts_dispatches_and_max_depth() {
        let mut t = ProfilingTracer::new();
        t.on_dispatch("set", 1);
        t.on_dispatch("set", 2);
        t.on_dispatch("incr", 1);
        let report = t.report();
        assert_eq!(report.total_dispatches, 3);
        assert_eq!(report.max_depth, 2);
        assert_eq!(report.dispatch_counts[0], ("set".to_string(), 2));
    }

    #[test]
    fn coverage_tracer_dedups_names() {
        let mut t = CoverageTracer::new();
        t.on_dispatch("set", 0);
        t.on_dispatch("set", 0);
        t.on_dispatch("incr", 0);
        assert_eq!(t.coverage_count(), 2);
    }

    #[test]
    fn recording_tracer_captures_event_sequence() {
        let mut t = RecordingTracer::new();
        t.on_dispatch("set", 0);
        t.on_error_begin("error oops", 1);
        t.on_error_unwind("foo", 1);
        t.on_error_clear(&[]);
        assert_eq!(t.events().len(), 4);
    }

    #[test]
    fn recording_tracer_respects_limit() {
        let mut t = RecordingTracer::with_limit(2);
        t.on_dispatch("a", 0);
        t.on_dispatch("b", 0);
        t.on_dispatch("c", 0);
        assert_eq!(t.events().len(), 2);
    }
}
