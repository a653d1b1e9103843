//! In-memory reference [`HostOps`] implementation.
//!
//! This is test scaffolding, not a shipped host: it exists purely so the
//! crate's own test suite (and doctests) can exercise the real evaluator end
//! to end, the same way the teacher's unit tests instantiate `Heap`/
//! `Namespaces` directly without a CLI sitting in front of them.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::hostops::{
    Arena, FormatSpecifier, HostOps, HostOpsError, HostResult, MathOp, NsHandle, RepKind, TraceEvent, TraceHandle, ValueHandle,
};

#[derive(Clone, Default)]
struct ValueRecord {
    bytes: Vec<u8>,
    integer: Option<i64>,
    double: Option<f64>,
    list: Option<Vec<ValueHandle>>,
    dict: Option<IndexMap<Vec<u8>, (ValueHandle, ValueHandle)>>,
}

impl ValueRecord {
    fn rep_kind(&self) -> RepKind {
        if self.dict.is_some() {
            RepKind::Dict
        } else if self.list.is_some() {
            RepKind::List
        } else if self.integer.is_some() {
            RepKind::Integer
        } else if self.double.is_some() {
            RepKind::Double
        } else {
            RepKind::Absent
        }
    }
}

#[derive(Default)]
struct NsTable {
    vars: HashMap<String, ValueHandle>,
    arrays: HashMap<String, HashMap<Vec<u8>, ValueHandle>>,
    procs: HashMap<String, (ValueHandle, ValueHandle)>,
}

/// Reference host. Every handle's raw id is unique within a `MemHost`
/// instance; arenas are tracked only on the handle itself (scratch values are
/// never actually swept here — a real host would reclaim them at
/// `script_eval` boundaries, but this reference host is short-lived per test).
pub struct MemHost {
    values: HashMap<u64, ValueRecord>,
    next_value: u64,
    ns_tables: HashMap<u64, NsTable>,
    next_ns: u64,
    builders: HashMap<u64, Vec<u8>>,
    next_builder: u64,
    traces: HashMap<u64, (NsHandle, String, TraceEvent, ValueHandle)>,
    next_trace: u64,
    foreign: HashMap<u64, (String, Vec<String>)>,
    yield_now: bool,
}

impl Default for MemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            next_value: 1,
            ns_tables: HashMap::new(),
            next_ns: 1,
            builders: HashMap::new(),
            next_builder: 1,
            traces: HashMap::new(),
            next_trace: 1,
            foreign: HashMap::new(),
            yield_now: false,
        }
    }

    /// Test hook: makes the next `control_should_yield` poll return `true`.
    pub fn request_cancel(&mut self) {
        self.yield_now = true;
    }

    fn alloc_value(&mut self, bytes: Vec<u8>) -> u64 {
        let id = self.next_value;
        self.next_value += 1;
        self.values.insert(id, ValueRecord { bytes, ..ValueRecord::default() });
        id
    }

    fn rec(&self, v: ValueHandle) -> &ValueRecord {
        self.values.get(&v.raw()).expect("dangling ValueHandle passed to MemHost")
    }

    fn rec_mut(&mut self, v: ValueHandle) -> &mut ValueRecord {
        self.values.get_mut(&v.raw()).expect("dangling ValueHandle passed to MemHost")
    }

    /// Canonical Tcl-ish list-element quoting: brace the element if it
    /// contains anything that would otherwise split words or reopen
    /// substitution.
    fn format_list_element(bytes: &[u8]) -> Vec<u8> {
        let needs_braces = bytes.is_empty()
            || bytes.iter().any(|&b| matches!(b, b' ' | b'\t' | b'\n' | b'{' | b'}' | b'[' | b']' | b'$' | b'"' | b';' | b'\\'));
        if !needs_braces {
            return bytes.to_vec();
        }
        let mut out = Vec::with_capacity(bytes.len() + 2);
        out.push(b'{');
        out.extend_from_slice(bytes);
        out.push(b'}');
        out
    }

    fn join_list(items: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(b' ');
            }
            out.extend_from_slice(&Self::format_list_element(item));
        }
        out
    }

    fn list_item_bytes(&self, v: ValueHandle) -> Vec<Vec<u8>> {
        if let Some(list) = &self.rec(v).list {
            return list.iter().map(|h| self.rec(*h).bytes.clone()).collect();
        }
        Self::parse_list_bytes(&self.rec(v).bytes)
    }

    /// Minimal recursive-descent Tcl list parser: whitespace-separated words,
    /// `{...}` verbatim groups, and backslash escapes preserved literally
    /// (list parsing, unlike command parsing, does not interpret `$`/`[`).
    fn parse_list_bytes(src: &[u8]) -> Vec<Vec<u8>> {
        let mut items = Vec::new();
        let mut i = 0;
        while i < src.len() {
            while matches!(src.get(i), Some(b' ' | b'\t' | b'\n')) {
                i += 1;
            }
            if i >= src.len() {
                break;
            }
            if src[i] == b'{' {
                let mut depth = 1i64;
                let start = i + 1;
                let mut j = start;
                while j < src.len() && depth > 0 {
                    match src[j] {
                        b'\\' => j += 1,
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        _ => {}
                    }
                    j += 1;
                }
                items.push(src[start..(j - 1).max(start)].to_vec());
                i = j;
            } else {
                let start = i;
                while i < src.len() && !matches!(src[i], b' ' | b'\t' | b'\n') {
                    if src[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                items.push(src[start..i.min(src.len())].to_vec());
            }
        }
        items
    }

    fn recompute_bytes_from_rep(&mut self, v: ValueHandle) {
        if let Some(dict) = self.rec(v).dict.clone() {
            let mut items = Vec::new();
            for (k, val) in dict.values() {
                items.push(self.rec(*k).bytes.clone());
                items.push(self.rec(*val).bytes.clone());
            }
            self.rec_mut(v).bytes = Self::join_list(&items);
        } else if let Some(list) = self.rec(v).list.clone() {
            let items: Vec<Vec<u8>> = list.iter().map(|h| self.rec(*h).bytes.clone()).collect();
            self.rec_mut(v).bytes = Self::join_list(&items);
        }
    }
}

impl HostOps for MemHost {
    fn value_from_bytes(&mut self, bytes: &[u8], _arena: Arena) -> HostResult<ValueHandle> {
        let raw = self.alloc_value(bytes.to_vec());
        Ok(ValueHandle::new(raw, _arena))
    }

    fn value_string_bytes(&self, v: ValueHandle) -> HostResult<&[u8]> {
        Ok(&self.rec(v).bytes)
    }

    fn value_rep_kind(&self, v: ValueHandle) -> RepKind {
        self.rec(v).rep_kind()
    }

    fn value_install_integer(&mut self, v: ValueHandle, i: i64) -> HostResult<()> {
        self.rec_mut(v).integer = Some(i);
        Ok(())
    }

    fn value_install_double(&mut self, v: ValueHandle, d: f64) -> HostResult<()> {
        self.rec_mut(v).double = Some(d);
        Ok(())
    }

    fn value_get_integer(&self, v: ValueHandle) -> Option<i64> {
        self.rec(v).integer
    }

    fn value_get_double(&self, v: ValueHandle) -> Option<f64> {
        self.rec(v).double
    }

    fn value_invalidate_string(&mut self, v: ValueHandle) {
        self.recompute_bytes_from_rep(v);
    }

    fn value_invalidate_internal(&mut self, v: ValueHandle) {
        let rec = self.rec_mut(v);
        rec.integer = None;
        rec.double = None;
        rec.list = None;
        rec.dict = None;
    }

    fn list_create_empty(&mut self, arena: Arena) -> HostResult<ValueHandle> {
        let raw = self.alloc_value(Vec::new());
        self.values.get_mut(&raw).unwrap().list = Some(Vec::new());
        Ok(ValueHandle::new(raw, arena))
    }

    fn list_length(&self, v: ValueHandle) -> Option<usize> {
        if let Some(list) = &self.rec(v).list {
            Some(list.len())
        } else {
            Some(Self::parse_list_bytes(&self.rec(v).bytes).len())
        }
    }

    fn list_at(&self, v: ValueHandle, index: i64) -> Option<ValueHandle> {
        if index < 0 {
            return None;
        }
        let list = self.rec(v).list.as_ref()?;
        list.get(index as usize).copied()
    }

    fn list_push(&mut self, v: ValueHandle, item: ValueHandle) -> HostResult<()> {
        if self.rec(v).list.is_none() {
            let items = self.list_item_bytes(v);
            let arena = v.arena();
            let mut handles = Vec::with_capacity(items.len());
            for item in items {
                handles.push(ValueHandle::new(self.alloc_value(item), arena));
            }
            self.rec_mut(v).list = Some(handles);
        }
        self.rec_mut(v).list.as_mut().unwrap().push(item);
        self.recompute_bytes_from_rep(v);
        Ok(())
    }

    fn list_set_at(&mut self, v: ValueHandle, index: usize, item: ValueHandle) -> HostResult<()> {
        let list = self.rec_mut(v).list.as_mut().ok_or_else(|| HostOpsError::new("not a list"))?;
        if index >= list.len() {
            return Err(HostOpsError::new("list index out of range"));
        }
        list[index] = item;
        self.recompute_bytes_from_rep(v);
        Ok(())
    }

    fn list_concat(&mut self, a: ValueHandle, b: ValueHandle, arena: Arena) -> HostResult<ValueHandle> {
        let mut items = self.list_item_bytes(a);
        items.extend(self.list_item_bytes(b));
        let raw = self.alloc_value(Self::join_list(&items));
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            handles.push(ValueHandle::new(self.alloc_value(item), arena));
        }
        self.values.get_mut(&raw).unwrap().list = Some(handles);
        Ok(ValueHandle::new(raw, arena))
    }

    fn list_range(&mut self, v: ValueHandle, start: usize, end: usize, arena: Arena) -> HostResult<ValueHandle> {
        let items = self.list_item_bytes(v);
        let end = end.min(items.len());
        let slice: Vec<Vec<u8>> = if start >= end { Vec::new() } else { items[start..end].to_vec() };
        let raw = self.alloc_value(Self::join_list(&slice));
        let mut handles = Vec::with_capacity(slice.len());
        for item in slice {
            handles.push(ValueHandle::new(self.alloc_value(item), arena));
        }
        self.values.get_mut(&raw).unwrap().list = Some(handles);
        Ok(ValueHandle::new(raw, arena))
    }

    fn list_parse_from_string(&mut self, bytes: &[u8], arena: Arena) -> HostResult<ValueHandle> {
        let items = Self::parse_list_bytes(bytes);
        let raw = self.alloc_value(bytes.to_vec());
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            handles.push(ValueHandle::new(self.alloc_value(item), arena));
        }
        self.values.get_mut(&raw).unwrap().list = Some(handles);
        Ok(ValueHandle::new(raw, arena))
    }

    fn list_try_as(&mut self, v: ValueHandle, _arena: Arena) -> HostResult<ValueHandle> {
        if self.rec(v).list.is_none() {
            let items = self.list_item_bytes(v);
            let arena = v.arena();
            let mut handles = Vec::with_capacity(items.len());
            for item in items {
                handles.push(ValueHandle::new(self.alloc_value(item), arena));
            }
            self.rec_mut(v).list = Some(handles);
        }
        Ok(v)
    }

    fn dict_create_empty(&mut self, arena: Arena) -> HostResult<ValueHandle> {
        let raw = self.alloc_value(Vec::new());
        self.values.get_mut(&raw).unwrap().dict = Some(IndexMap::new());
        Ok(ValueHandle::new(raw, arena))
    }

    fn dict_get(&self, v: ValueHandle, key: &[u8]) -> Option<ValueHandle> {
        self.rec(v).dict.as_ref()?.get(key).map(|(_, val)| *val)
    }

    fn dict_put(&mut self, v: ValueHandle, key: ValueHandle, value: ValueHandle) -> HostResult<()> {
        if self.rec(v).dict.is_none() {
            self.rec_mut(v).dict = Some(IndexMap::new());
        }
        let key_bytes = self.rec(key).bytes.clone();
        self.rec_mut(v).dict.as_mut().unwrap().insert(key_bytes, (key, value));
        self.recompute_bytes_from_rep(v);
        Ok(())
    }

    fn dict_remove(&mut self, v: ValueHandle, key: &[u8]) -> HostResult<bool> {
        let removed = self.rec_mut(v).dict.as_mut().map(|d| d.shift_remove(key).is_some()).unwrap_or(false);
        if removed {
            self.recompute_bytes_from_rep(v);
        }
        Ok(removed)
    }

    fn dict_keys(&self, v: ValueHandle) -> Vec<ValueHandle> {
        self.rec(v).dict.as_ref().map(|d| d.values().map(|(k, _)| *k).collect()).unwrap_or_default()
    }

    fn dict_size(&self, v: ValueHandle) -> Option<usize> {
        self.rec(v).dict.as_ref().map(IndexMap::len)
    }

    fn dict_parse_from_string(&mut self, bytes: &[u8], arena: Arena) -> HostResult<ValueHandle> {
        let items = Self::parse_list_bytes(bytes);
        if items.len() % 2 != 0 {
            return Err(HostOpsError::new("missing value to go with key"));
        }
        let mut dict = IndexMap::new();
        let raw = self.alloc_value(bytes.to_vec());
        for pair in items.chunks(2) {
            let key_handle = ValueHandle::new(self.alloc_value(pair[0].clone()), arena);
            let val_handle = ValueHandle::new(self.alloc_value(pair[1].clone()), arena);
            dict.insert(pair[0].clone(), (key_handle, val_handle));
        }
        self.values.get_mut(&raw).unwrap().dict = Some(dict);
        Ok(ValueHandle::new(raw, arena))
    }

    fn dict_try_as(&mut self, v: ValueHandle, arena: Arena) -> HostResult<ValueHandle> {
        if self.rec(v).dict.is_some() {
            return Ok(v);
        }
        let bytes = self.rec(v).bytes.clone();
        self.dict_parse_from_string(&bytes, arena)
    }

    fn double_format(&self, d: f64, spec: FormatSpecifier, precision: Option<usize>) -> String {
        let p = precision.unwrap_or(6);
        match spec {
            FormatSpecifier::Fixed => format!("{d:.p$}"),
            FormatSpecifier::Exp => {
                let s = format!("{d:.p$e}");
                // Normalize Rust's "1.5e2" into Tcl-ish "1.500000e+02".
                if let Some(epos) = s.find('e') {
                    let (mantissa, exp) = s.split_at(epos);
                    let exp_val: i32 = exp[1..].parse().unwrap_or(0);
                    format!("{mantissa}e{}{:02}", if exp_val < 0 { "-" } else { "+" }, exp_val.abs())
                } else {
                    s
                }
            }
            FormatSpecifier::General => {
                if d == d.trunc() && d.abs() < 1e15 {
                    format!("{d:.1}")
                } else {
                    format!("{d}")
                }
            }
        }
    }

    fn double_math(&self, op: MathOp, a: f64, b: Option<f64>) -> HostResult<f64> {
        let r = match op {
            MathOp::Sqrt => a.sqrt(),
            MathOp::Exp => a.exp(),
            MathOp::Log => a.ln(),
            MathOp::Log10 => a.log10(),
            MathOp::Sin => a.sin(),
            MathOp::Cos => a.cos(),
            MathOp::Tan => a.tan(),
            MathOp::Asin => a.asin(),
            MathOp::Acos => a.acos(),
            MathOp::Atan => a.atan(),
            MathOp::Sinh => a.sinh(),
            MathOp::Cosh => a.cosh(),
            MathOp::Tanh => a.tanh(),
            MathOp::Floor => a.floor(),
            MathOp::Ceil => a.ceil(),
            MathOp::Round => round_half_to_even(a),
            MathOp::Abs => a.abs(),
            MathOp::Pow => a.powf(b.unwrap_or(0.0)),
            MathOp::Atan2 => a.atan2(b.unwrap_or(0.0)),
            MathOp::Fmod => a % b.unwrap_or(1.0),
            MathOp::Hypot => a.hypot(b.unwrap_or(0.0)),
        };
        Ok(r)
    }

    fn string_rune_len(&self, v: ValueHandle) -> HostResult<usize> {
        Ok(String::from_utf8_lossy(&self.rec(v).bytes).chars().count())
    }

    fn string_intern(&mut self, bytes: &[u8]) -> HostResult<ValueHandle> {
        let raw = self.alloc_value(bytes.to_vec());
        Ok(ValueHandle::new(raw, Arena::Permanent))
    }

    fn string_builder_new(&mut self) -> u64 {
        let id = self.next_builder;
        self.next_builder += 1;
        self.builders.insert(id, Vec::new());
        id
    }

    fn string_builder_append_bytes(&mut self, builder: u64, bytes: &[u8]) {
        self.builders.get_mut(&builder).expect("unknown builder").extend_from_slice(bytes);
    }

    fn string_builder_append_value(&mut self, builder: u64, v: ValueHandle) -> HostResult<()> {
        let bytes = self.rec(v).bytes.clone();
        self.builders.get_mut(&builder).expect("unknown builder").extend_from_slice(&bytes);
        Ok(())
    }

    fn string_builder_finish(&mut self, builder: u64, arena: Arena) -> HostResult<ValueHandle> {
        let bytes = self.builders.remove(&builder).expect("unknown builder");
        let raw = self.alloc_value(bytes);
        Ok(ValueHandle::new(raw, arena))
    }

    fn string_match_glob(&self, pattern: &[u8], text: &[u8], nocase: bool) -> bool {
        glob_match(pattern, text, nocase)
    }

    fn proc_define(&mut self, ns: NsHandle, name: &str, params: ValueHandle, body: ValueHandle) -> HostResult<()> {
        self.ns_tables.entry(ns.raw()).or_default().procs.insert(name.to_string(), (params, body));
        Ok(())
    }

    fn proc_lookup(&self, ns: NsHandle, name: &str) -> Option<(ValueHandle, ValueHandle)> {
        self.ns_tables.get(&ns.raw())?.procs.get(name).copied()
    }

    fn proc_undefine(&mut self, ns: NsHandle, name: &str) -> bool {
        self.ns_tables.get_mut(&ns.raw()).is_some_and(|t| t.procs.remove(name).is_some())
    }

    fn proc_names(&self, ns: NsHandle) -> Vec<String> {
        self.ns_tables.get(&ns.raw()).map(|t| t.procs.keys().cloned().collect()).unwrap_or_default()
    }

    fn var_get(&self, ns: NsHandle, name: &str) -> Option<ValueHandle> {
        self.ns_tables.get(&ns.raw())?.vars.get(name).copied()
    }

    fn var_set(&mut self, ns: NsHandle, name: &str, value: ValueHandle) -> HostResult<()> {
        self.ns_tables.entry(ns.raw()).or_default().vars.insert(name.to_string(), value);
        Ok(())
    }

    fn var_unset(&mut self, ns: NsHandle, name: &str) -> bool {
        self.ns_tables.get_mut(&ns.raw()).is_some_and(|t| t.vars.remove(name).is_some())
    }

    fn var_exists(&self, ns: NsHandle, name: &str) -> bool {
        self.ns_tables.get(&ns.raw()).is_some_and(|t| t.vars.contains_key(name))
    }

    fn var_names(&self, ns: NsHandle) -> Vec<String> {
        self.ns_tables.get(&ns.raw()).map(|t| t.vars.keys().cloned().collect()).unwrap_or_default()
    }

    fn array_get(&self, ns: NsHandle, name: &str, key: &[u8]) -> Option<ValueHandle> {
        self.ns_tables.get(&ns.raw())?.arrays.get(name)?.get(key).copied()
    }

    fn array_set(&mut self, ns: NsHandle, name: &str, key: &[u8], value: ValueHandle) -> HostResult<()> {
        self.ns_tables.entry(ns.raw()).or_default().arrays.entry(name.to_string()).or_default().insert(key.to_vec(), value);
        Ok(())
    }

    fn array_is_array(&self, ns: NsHandle, name: &str) -> bool {
        self.ns_tables.get(&ns.raw()).is_some_and(|t| t.arrays.contains_key(name))
    }

    fn ns_table_create(&mut self) -> HostResult<NsHandle> {
        let id = self.next_ns;
        self.next_ns += 1;
        self.ns_tables.insert(id, NsTable::default());
        Ok(NsHandle::new(id))
    }

    fn ns_table_delete(&mut self, ns: NsHandle) {
        self.ns_tables.remove(&ns.raw());
    }

    fn trace_add(&mut self, ns: NsHandle, name: &str, event: TraceEvent, callback: ValueHandle) -> TraceHandle {
        let id = self.next_trace;
        self.next_trace += 1;
        self.traces.insert(id, (ns, name.to_string(), event, callback));
        TraceHandle::new(id)
    }

    fn trace_remove(&mut self, handle: TraceHandle) {
        self.traces.remove(&handle.raw());
    }

    fn trace_fire(&mut self, _ns: NsHandle, _name: &str, _event: TraceEvent) {}

    fn foreign_is_foreign(&self, v: ValueHandle) -> bool {
        self.foreign.contains_key(&v.raw())
    }

    fn foreign_type_name(&self, v: ValueHandle) -> Option<&str> {
        self.foreign.get(&v.raw()).map(|(ty, _)| ty.as_str())
    }

    fn foreign_string_rep(&mut self, _v: ValueHandle) -> HostResult<()> {
        Ok(())
    }

    fn foreign_methods(&self, v: ValueHandle) -> Vec<String> {
        self.foreign.get(&v.raw()).map(|(_, methods)| methods.clone()).unwrap_or_default()
    }

    fn foreign_invoke(&mut self, _v: ValueHandle, method: &str, _args: &[ValueHandle], arena: Arena) -> HostResult<ValueHandle> {
        let raw = self.alloc_value(method.as_bytes().to_vec());
        Ok(ValueHandle::new(raw, arena))
    }

    fn foreign_destroy(&mut self, v: ValueHandle) -> HostResult<()> {
        self.foreign.remove(&v.raw());
        Ok(())
    }

    fn control_should_yield(&self) -> bool {
        self.yield_now
    }
}

fn round_half_to_even(a: f64) -> f64 {
    let floor = a.floor();
    let diff = a - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

fn glob_match(pattern: &[u8], text: &[u8], nocase: bool) -> bool {
    fn norm(b: u8, nocase: bool) -> u8 {
        if nocase { b.to_ascii_lowercase() } else { b }
    }
    fn go(p: &[u8], t: &[u8], nocase: bool) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some(b'*') => go(&p[1..], t, nocase) || (!t.is_empty() && go(p, &t[1..], nocase)),
            Some(b'?') => !t.is_empty() && go(&p[1..], &t[1..], nocase),
            Some(b'[') => {
                let Some(close) = p.iter().position(|&b| b == b']') else {
                    return !t.is_empty() && norm(p[0], nocase) == norm(t[0], nocase) && go(&p[1..], &t[1..], nocase);
                };
                if t.is_empty() {
                    return false;
                }
                let class = &p[1..close];
                let c = norm(t[0], nocase);
                let matched = class.iter().any(|&b| norm(b, nocase) == c);
                matched && go(&p[close + 1..], &t[1..], nocase)
            }
            Some(b'\\') if p.len() > 1 => !t.is_empty() && norm(p[1], nocase) == norm(t[0], nocase) && go(&p[2..], &t[1..], nocase),
            Some(&pb) => !t.is_empty() && norm(pb, nocase) == norm(t[0], nocase) && go(&p[1..], &t[1..], nocase),
        }
    }
    go(pattern, text, nocase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_roundtrips_bytes() {
        let mut h = MemHost::new();
        let v = h.value_from_bytes(b"hello", Arena::Permanent).unwrap();
        assert_eq!(h.value_string_bytes(v).unwrap(), b"hello");
    }

    #[test]
    fn list_push_updates_string_rep() {
        let mut h = MemHost::new();
        let v = h.list_create_empty(Arena::Permanent).unwrap();
        let item = h.value_from_bytes(b"a b", Arena::Permanent).unwrap();
        h.list_push(v, item).unwrap();
        assert_eq!(h.value_string_bytes(v).unwrap(), b"{a b}");
    }

    #[test]
    fn dict_put_and_get() {
        let mut h = MemHost::new();
        let v = h.dict_create_empty(Arena::Permanent).unwrap();
        let k = h.value_from_bytes(b"k", Arena::Permanent).unwrap();
        let val = h.value_from_bytes(b"v", Arena::Permanent).unwrap();
        h.dict_put(v, k, val).unwrap();
        assert_eq!(h.dict_get(v, b"k"), Some(val));
    }

    #[test]
    fn glob_star_and_question_mark() {
        assert!(glob_match(b"a*c", b"abbbc", false));
        assert!(glob_match(b"a?c", b"abc", false));
        assert!(!glob_match(b"a?c", b"abbc", false));
    }

    #[test]
    fn glob_character_class() {
        assert!(glob_match(b"[abc]x", b"bx", false));
        assert!(!glob_match(b"[abc]x", b"dx", false));
    }
}
