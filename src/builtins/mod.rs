//! Built-in Command Library (spec.md §4.J): control flow, variable/namespace
//! commands, list/dict/string operations, and `expr`/`info`/`trace` wiring.
//!
//! Each submodule owns one family and registers its commands into the shared
//! table via [`register_all`], mirroring how the core groups `HostOps` itself
//! by name prefix (`var_`, `ns_`, ...) rather than one command per file.

mod control;
mod dicts;
mod introspect;
mod lists;
mod strings;
mod vars;

use std::collections::HashMap;

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::{BuiltinFn, Interp};

/// Populates `map` with every built-in this crate implements. Called once
/// from [`Interp::new`].
pub fn register_all<H: HostOps>(map: &mut HashMap<&'static str, BuiltinFn<H>>) {
    control::register(map);
    vars::register(map);
    lists::register(map);
    dicts::register(map);
    strings::register(map);
    introspect::register(map);
}

// -- shared helpers used across the built-in families -----------------------

pub(crate) fn text<H: HostOps>(interp: &Interp<H>, v: ValueHandle) -> Result<String, Signal> {
    interp
        .host
        .value_string_bytes(v)
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))
}

pub(crate) fn arity(name: &str, args: &[ValueHandle], min: usize, max: usize, usage: &str) -> Result<(), Signal> {
    if args.len() < min || args.len() > max {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} {usage}"))));
    }
    Ok(())
}

pub(crate) fn new_str<H: HostOps>(interp: &mut Interp<H>, s: &str) -> CmdResult {
    interp.new_string(s, Arena::Scratch).map_err(Signal::Error)
}

pub(crate) fn new_int<H: HostOps>(interp: &mut Interp<H>, i: i64) -> CmdResult {
    crate::value::new_integer(&mut interp.host, i, Arena::Scratch).map_err(Signal::Error)
}

pub(crate) fn new_bool<H: HostOps>(interp: &mut Interp<H>, b: bool) -> CmdResult {
    crate::value::new_bool(&mut interp.host, b, Arena::Scratch).map_err(Signal::Error)
}

pub(crate) fn list_items<H: HostOps>(interp: &mut Interp<H>, v: ValueHandle) -> Result<Vec<ValueHandle>, Signal> {
    let list = interp.host.list_try_as(v, Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
    let n = interp.host.list_length(list).unwrap_or(0);
    Ok((0..n).filter_map(|i| interp.host.list_at(list, i as i64)).collect())
}

pub(crate) fn new_list<H: HostOps>(interp: &mut Interp<H>, items: &[ValueHandle]) -> CmdResult {
    let v = interp.host.list_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
    for &item in items {
        interp.host.list_push(v, item).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
    }
    Ok(v)
}
