//! The capability vtable through which the core obtains every resource it needs.
//!
//! `HostOps` is the sole interface between this crate and an embedder. The core
//! never allocates, stores, or frees script-visible value content itself — it asks
//! the host to do so through the methods below, and holds only opaque handles in
//! return. Grouping follows spec.md §4.B: method name prefixes (`var_`, `ns_`,
//! `string_`, ...) stand in for the "namespaces of operations" the spec describes,
//! the same way the teacher exposes one cohesive capability trait per concern
//! (`ResourceTracker`, `PrintWriter`) rather than many micro-traits.
//!
//! All methods are ordinary trait methods (no hidden state beyond `&mut self`); the
//! host may call back into the core only through the published re-entrant entry
//! points in [`crate::interp`].

use std::fmt;

/// Which arena a handle was allocated from.
///
/// Scratch handles are released en bloc when the top-level [`crate::interp::script_eval`]
/// call that created them returns; permanent handles survive until the host
/// explicitly frees them (`unset`, namespace deletion, proc redefinition, foreign
/// `destroy`). The core never frees either on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arena {
    Scratch,
    Permanent,
}

/// Opaque handle to a host-owned value.
///
/// Identity of the handle is NOT semantic equality — two handles can carry equal
/// string representations without being the same handle. Semantic equality is
/// computed by shimmering both sides to string and comparing bytes (see
/// [`crate::value`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueHandle {
    raw: u64,
    arena: Arena,
}

impl ValueHandle {
    #[must_use]
    pub fn new(raw: u64, arena: Arena) -> Self {
        Self { raw, arena }
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.raw
    }

    #[must_use]
    pub fn arena(self) -> Arena {
        self.arena
    }

    #[must_use]
    pub fn is_scratch(self) -> bool {
        matches!(self.arena, Arena::Scratch)
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value#{}", self.raw)
    }
}

/// Opaque handle to a host-owned namespace variable/command table.
///
/// The namespace tree's topology (parent/child edges, paths) is core-owned
/// bookkeeping (see [`crate::namespace`]); only the variable and command storage
/// inside a namespace crosses the host boundary, addressed by this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NsHandle(u64);

impl NsHandle {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A value's internal representation kind, as currently cached by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepKind {
    Absent,
    Integer,
    Double,
    List,
    Dict,
    Custom,
    Foreign,
}

/// IEEE-754 classification of a double value, per spec.md §3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoubleClass {
    Normal,
    Zero,
    PosInf,
    NegInf,
    Nan,
}

/// `double(...)` formatting specifier, per HostOps `double.format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatSpecifier {
    Exp,
    Fixed,
    General,
}

/// Transcendental/rounding operations dispatched through `HostOps::double_math`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Sqrt,
    Exp,
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Floor,
    Ceil,
    Round,
    Abs,
    Pow,
    Atan2,
    Fmod,
    Hypot,
}

/// Error returned by a `HostOps` method when the requested operation cannot be
/// performed (host-side allocation failure, malformed list/dict syntax, etc).
///
/// This is distinct from [`crate::errors::CoreError`]: a `HostOpsError` is a leaf
/// failure from the capability boundary, which the core wraps into the richer
/// error taxonomy before it reaches script-visible `-errorcode`/`-errorinfo`.
#[derive(Debug, Clone)]
pub struct HostOpsError {
    pub message: String,
    /// Byte offset into the input that caused a parse failure, if applicable
    /// (e.g. `list.parse-from-string` / `dict.parse-from-string` not consuming
    /// the entire input).
    pub location: Option<usize>,
}

impl HostOpsError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), location: None }
    }

    #[must_use]
    pub fn at(message: impl Into<String>, location: usize) -> Self {
        Self { message: message.into(), location: Some(location) }
    }
}

impl fmt::Display for HostOpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HostOpsError {}

/// Result alias for fallible `HostOps` calls.
pub type HostResult<T> = Result<T, HostOpsError>;

/// A frame-local or namespace-relative link target, per spec.md §3.3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    /// `upvar`: an alias to a variable in an ancestor frame, addressed by
    /// absolute level index (0 = global).
    UpFrame { target_level: usize, target_name: String },
    /// `global`/`variable`: an alias to a namespace-scoped variable.
    Namespace { ns: NsHandle, name: String },
}

/// A single registered trace callback identifier, opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceHandle(u64);

impl TraceHandle {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Events a variable/command trace can fire on, per HostOps `trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    Read,
    Write,
    Unset,
    Rename,
    Call,
}

/// Opaque handle to a host-managed foreign object's method dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForeignHandle(u64);

impl ForeignHandle {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// The capability vtable. An embedder implements this trait once per interpreter
/// instance; the instance is not safe for concurrent use (spec.md §5), but
/// separate instances with instance-local `HostOps` state may run on separate
/// threads.
///
/// Every method here is a primitive: the core composes them into the richer
/// behavior of namespaces, frames, shimmering, and built-ins. No method here
/// should need to call back into the core.
pub trait HostOps {
    // -- interp --------------------------------------------------------
    /// Creates a value from raw bytes in the given arena. The string rep is the
    /// bytes verbatim; no internal rep is installed.
    fn value_from_bytes(&mut self, bytes: &[u8], arena: Arena) -> HostResult<ValueHandle>;

    /// Borrows the current string bytes of a value. Valid until the next
    /// mutation or rep change of the same handle.
    fn value_string_bytes(&self, v: ValueHandle) -> HostResult<&[u8]>;

    /// Returns the internal representation kind currently cached for `v`.
    fn value_rep_kind(&self, v: ValueHandle) -> RepKind;

    // -- shimmer installation (called after the core parses/derives a new rep) --
    fn value_install_integer(&mut self, v: ValueHandle, i: i64) -> HostResult<()>;
    fn value_install_double(&mut self, v: ValueHandle, d: f64) -> HostResult<()>;
    fn value_get_integer(&self, v: ValueHandle) -> Option<i64>;
    fn value_get_double(&self, v: ValueHandle) -> Option<f64>;

    /// Invalidates the cached string rep after an internal-rep mutation
    /// (list append, dict put, ...).
    fn value_invalidate_string(&mut self, v: ValueHandle);
    /// Invalidates all cached internal reps after a string-rep mutation.
    fn value_invalidate_internal(&mut self, v: ValueHandle);

    // -- list -----------------------------------------------------------
    fn list_create_empty(&mut self, arena: Arena) -> HostResult<ValueHandle>;
    fn list_length(&self, v: ValueHandle) -> Option<usize>;
    /// `-1` / out-of-range semantics are the caller's responsibility (spec.md
    /// §8): this returns `None` for any index the host can't satisfy.
    fn list_at(&self, v: ValueHandle, index: i64) -> Option<ValueHandle>;
    fn list_push(&mut self, v: ValueHandle, item: ValueHandle) -> HostResult<()>;
    fn list_set_at(&mut self, v: ValueHandle, index: usize, item: ValueHandle) -> HostResult<()>;
    fn list_concat(&mut self, a: ValueHandle, b: ValueHandle, arena: Arena) -> HostResult<ValueHandle>;
    fn list_range(&mut self, v: ValueHandle, start: usize, end: usize, arena: Arena) -> HostResult<ValueHandle>;
    /// Parses a Tcl list literal from `bytes`. Must consume the entire input or
    /// fail with a `HostOpsError` carrying the failing byte offset.
    fn list_parse_from_string(&mut self, bytes: &[u8], arena: Arena) -> HostResult<ValueHandle>;
    fn list_try_as(&mut self, v: ValueHandle, arena: Arena) -> HostResult<ValueHandle>;

    // -- dict -------------------------------------------------------------
    fn dict_create_empty(&mut self, arena: Arena) -> HostResult<ValueHandle>;
    fn dict_get(&self, v: ValueHandle, key: &[u8]) -> Option<ValueHandle>;
    fn dict_put(&mut self, v: ValueHandle, key: ValueHandle, value: ValueHandle) -> HostResult<()>;
    fn dict_remove(&mut self, v: ValueHandle, key: &[u8]) -> HostResult<bool>;
    fn dict_keys(&self, v: ValueHandle) -> Vec<ValueHandle>;
    fn dict_size(&self, v: ValueHandle) -> Option<usize>;
    fn dict_parse_from_string(&mut self, bytes: &[u8], arena: Arena) -> HostResult<ValueHandle>;
    fn dict_try_as(&mut self, v: ValueHandle, arena: Arena) -> HostResult<ValueHandle>;

    // -- double -----------------------------------------------------------
    fn double_classify(&self, d: f64) -> DoubleClass {
        if d.is_nan() {
            DoubleClass::Nan
        } else if d.is_infinite() {
            if d > 0.0 { DoubleClass::PosInf } else { DoubleClass::NegInf }
        } else if d == 0.0 {
            DoubleClass::Zero
        } else {
            DoubleClass::Normal
        }
    }
    fn double_format(&self, d: f64, spec: FormatSpecifier, precision: Option<usize>) -> String;
    fn double_math(&self, op: MathOp, a: f64, b: Option<f64>) -> HostResult<f64>;

    // -- string -------------------------------------------------------------
    /// Number of UTF-8 codepoints ("runes") in the value's string rep.
    fn string_rune_len(&self, v: ValueHandle) -> HostResult<usize>;
    fn string_intern(&mut self, bytes: &[u8]) -> HostResult<ValueHandle>;
    fn string_builder_new(&mut self) -> u64;
    fn string_builder_append_bytes(&mut self, builder: u64, bytes: &[u8]);
    fn string_builder_append_value(&mut self, builder: u64, v: ValueHandle) -> HostResult<()>;
    fn string_builder_finish(&mut self, builder: u64, arena: Arena) -> HostResult<ValueHandle>;
    /// Glob matching (`string match` / `switch -glob`), `*`, `?`, `[...]`, `\x`.
    fn string_match_glob(&self, pattern: &[u8], text: &[u8], nocase: bool) -> bool;

    // -- proc ---------------------------------------------------------------
    /// Registers a procedure body value under `name` in namespace `ns`, returning
    /// the previous body if one was replaced (for `info` introspection/`rename`).
    fn proc_define(&mut self, ns: NsHandle, name: &str, params: ValueHandle, body: ValueHandle) -> HostResult<()>;
    fn proc_lookup(&self, ns: NsHandle, name: &str) -> Option<(ValueHandle, ValueHandle)>;
    fn proc_undefine(&mut self, ns: NsHandle, name: &str) -> bool;
    /// All procedure names defined directly in `ns` (not descendants), for
    /// `info procs`/`info commands`.
    fn proc_names(&self, ns: NsHandle) -> Vec<String>;

    // -- var (namespace variable storage) ------------------------------------
    fn var_get(&self, ns: NsHandle, name: &str) -> Option<ValueHandle>;
    fn var_set(&mut self, ns: NsHandle, name: &str, value: ValueHandle) -> HostResult<()>;
    fn var_unset(&mut self, ns: NsHandle, name: &str) -> bool;
    fn var_exists(&self, ns: NsHandle, name: &str) -> bool;
    fn var_names(&self, ns: NsHandle) -> Vec<String>;

    // -- array element access (per-element namespace-variable convention) ----
    fn array_get(&self, ns: NsHandle, name: &str, key: &[u8]) -> Option<ValueHandle>;
    fn array_set(&mut self, ns: NsHandle, name: &str, key: &[u8], value: ValueHandle) -> HostResult<()>;
    fn array_is_array(&self, ns: NsHandle, name: &str) -> bool;

    // -- ns (namespace variable/command table allocation) --------------------
    /// Allocates a fresh, empty variable/command table for a namespace path.
    /// The core owns the tree topology; this returns only the storage handle.
    fn ns_table_create(&mut self) -> HostResult<NsHandle>;
    fn ns_table_delete(&mut self, ns: NsHandle);

    // -- trace ----------------------------------------------------------------
    fn trace_add(&mut self, ns: NsHandle, name: &str, event: TraceEvent, callback: ValueHandle) -> TraceHandle;
    fn trace_remove(&mut self, handle: TraceHandle);
    fn trace_fire(&mut self, ns: NsHandle, name: &str, event: TraceEvent);

    // -- foreign ----------------------------------------------------------------
    fn foreign_is_foreign(&self, v: ValueHandle) -> bool;
    fn foreign_type_name(&self, v: ValueHandle) -> Option<&str>;
    fn foreign_string_rep(&mut self, v: ValueHandle) -> HostResult<()>;
    fn foreign_methods(&self, v: ValueHandle) -> Vec<String>;
    fn foreign_invoke(
        &mut self,
        v: ValueHandle,
        method: &str,
        args: &[ValueHandle],
        arena: Arena,
    ) -> HostResult<ValueHandle>;
    fn foreign_destroy(&mut self, v: ValueHandle) -> HostResult<()>;

    // -- bind.unknown -----------------------------------------------------------
    /// Invoked when command lookup fails entirely; returning `None` means "no
    /// unknown handler, surface NAME error".
    fn bind_unknown(&self) -> Option<&str> {
        None
    }

    // -- control ------------------------------------------------------------------
    /// Sampled at every PARSE and every SUBST checkpoint (spec.md §5). Returning
    /// `true` makes the trampoline return `ERROR {CANCELLED}` at the next
    /// checkpoint.
    fn control_should_yield(&self) -> bool {
        false
    }
}
