//! Dict built-ins (spec.md §4.J): `dict create/get/set/unset/exists/keys/
//! values/size/for/merge/update/with/incr/append/lappend`, all delegating
//! storage to [`HostOps`]'s `dict_*` family (spec.md §4.B) and keeping
//! nested-key-path navigation (`dict get d a b c`) as plain recursion over
//! those primitives.

use std::collections::HashMap;

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::{BuiltinFn, Interp};

use super::{arity, list_items, new_int, new_list, new_str, text};

pub fn register<H: HostOps>(map: &mut HashMap<&'static str, BuiltinFn<H>>) {
    map.insert("dict", cmd_dict);
}

fn dict_of<H: HostOps>(interp: &mut Interp<H>, v: ValueHandle) -> CmdResult {
    interp.host.dict_try_as(v, Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))
}

fn ordered_pairs<H: HostOps>(interp: &mut Interp<H>, d: ValueHandle) -> Result<Vec<(String, ValueHandle)>, Signal> {
    let keys = interp.host.dict_keys(d);
    let mut out = Vec::with_capacity(keys.len());
    for k in keys {
        let key_text = text(interp, k)?;
        let value = interp.host.dict_get(d, key_text.as_bytes()).expect("key came from dict_keys of the same dict");
        out.push((key_text, value));
    }
    Ok(out)
}

/// Follows `keys` into `dict`, creating intermediate dicts where missing,
/// then writes `value` at the final key. Mutates dict handles in place, the
/// same way a Tcl dict shimmers without disturbing sibling keys.
fn set_path<H: HostOps>(interp: &mut Interp<H>, dict: ValueHandle, keys: &[String], value: ValueHandle) -> Result<(), Signal> {
    if keys.len() == 1 {
        let k = new_str(interp, &keys[0])?;
        interp.host.dict_put(dict, k, value).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
        return Ok(());
    }
    let existing = interp.host.dict_get(dict, keys[0].as_bytes());
    let nested = match existing {
        Some(v) => dict_of(interp, v)?,
        None => interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?,
    };
    let k = new_str(interp, &keys[0])?;
    interp.host.dict_put(dict, k, nested).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
    set_path(interp, nested, &keys[1..], value)
}

fn get_path<H: HostOps>(interp: &mut Interp<H>, dict: ValueHandle, keys: &[String]) -> Result<Option<ValueHandle>, Signal> {
    let mut cur = dict;
    for (i, k) in keys.iter().enumerate() {
        let d = dict_of(interp, cur)?;
        match interp.host.dict_get(d, k.as_bytes()) {
            Some(v) if i + 1 == keys.len() => return Ok(Some(v)),
            Some(v) => cur = v,
            None => return Ok(None),
        }
    }
    Ok(Some(cur))
}

fn remove_path<H: HostOps>(interp: &mut Interp<H>, dict: ValueHandle, keys: &[String]) -> Result<(), Signal> {
    if keys.is_empty() {
        return Ok(());
    }
    let mut cur = dict;
    for k in &keys[..keys.len() - 1] {
        let d = dict_of(interp, cur)?;
        match interp.host.dict_get(d, k.as_bytes()) {
            Some(v) => cur = v,
            None => return Ok(()),
        }
    }
    let d = dict_of(interp, cur)?;
    interp.host.dict_remove(d, keys.last().expect("checked non-empty").as_bytes()).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
    Ok(())
}

fn cmd_dict<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} subcommand ?arg ...?"))));
    }
    let sub = text(interp, args[0])?;
    let rest = &args[1..];
    match sub.as_str() {
        "create" => {
            if rest.len() % 2 != 0 {
                return Err(Signal::Error(CoreError::wrong_num_args("dict create ?key value ...?")));
            }
            let d = interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
            for pair in rest.chunks(2) {
                interp.host.dict_put(d, pair[0], pair[1]).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
            }
            Ok(d)
        }
        "get" => {
            if rest.is_empty() {
                return Err(Signal::Error(CoreError::wrong_num_args("dict get dictionary ?key ...?")));
            }
            let keys: Vec<String> = rest[1..].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            match get_path(interp, rest[0], &keys)? {
                Some(v) => Ok(v),
                None => Err(Signal::Error(CoreError::new(ErrorKind::Value, format!("key \"{}\" not known in dictionary", keys.last().unwrap_or(&String::new()))))),
            }
        }
        "exists" => {
            if rest.is_empty() {
                return Err(Signal::Error(CoreError::wrong_num_args("dict exists dictionary key ?key ...?")));
            }
            let keys: Vec<String> = rest[1..].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            let found = get_path(interp, rest[0], &keys)?.is_some();
            super::new_bool(interp, found)
        }
        "size" => {
            arity(&sub, rest, 1, 1, "dictionary")?;
            let d = dict_of(interp, rest[0])?;
            new_int(interp, interp.host.dict_size(d).unwrap_or(0) as i64)
        }
        "keys" => {
            arity(&sub, rest, 1, 1, "dictionary")?;
            let d = dict_of(interp, rest[0])?;
            let keys: Vec<String> = ordered_pairs(interp, d)?.into_iter().map(|(k, _)| k).collect();
            let handles: Vec<ValueHandle> = keys.iter().map(|k| interp.new_string(k, Arena::Scratch)).collect::<Result<_, _>>().map_err(Signal::Error)?;
            new_list(interp, &handles)
        }
        "values" => {
            arity(&sub, rest, 1, 1, "dictionary")?;
            let d = dict_of(interp, rest[0])?;
            let values: Vec<ValueHandle> = ordered_pairs(interp, d)?.into_iter().map(|(_, v)| v).collect();
            new_list(interp, &values)
        }
        "set" => {
            if rest.len() < 3 {
                return Err(Signal::Error(CoreError::wrong_num_args("dict set dictVarName key ?key ...? value")));
            }
            let var_name = text(interp, rest[0])?;
            let keys: Vec<String> = rest[1..rest.len() - 1].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            let value = rest[rest.len() - 1];
            let current = match interp.var_read(&var_name, None) {
                Ok(v) => dict_of(interp, v)?,
                Err(_) => interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?,
            };
            set_path(interp, current, &keys, value)?;
            interp.var_write(&var_name, None, current).map_err(Signal::Error)?;
            Ok(current)
        }
        "unset" => {
            if rest.len() < 2 {
                return Err(Signal::Error(CoreError::wrong_num_args("dict unset dictVarName key ?key ...?")));
            }
            let var_name = text(interp, rest[0])?;
            let keys: Vec<String> = rest[1..].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            let current = dict_of(interp, interp.var_read(&var_name, None).map_err(Signal::Error)?)?;
            remove_path(interp, current, &keys)?;
            interp.var_write(&var_name, None, current).map_err(Signal::Error)?;
            Ok(current)
        }
        "merge" => {
            let merged = interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
            for &v in rest {
                let d = dict_of(interp, v)?;
                for (k, val) in ordered_pairs(interp, d)? {
                    let key = new_str(interp, &k)?;
                    interp.host.dict_put(merged, key, val).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
                }
            }
            Ok(merged)
        }
        "for" => cmd_dict_for(interp, rest),
        "update" => cmd_dict_update(interp, rest),
        "with" => cmd_dict_with(interp, rest),
        "incr" => {
            if rest.is_empty() {
                return Err(Signal::Error(CoreError::wrong_num_args("dict incr dictVarName key ?increment?")));
            }
            let var_name = text(interp, rest[0])?;
            let key = if rest.len() >= 2 { text(interp, rest[1])? } else { return Err(Signal::Error(CoreError::wrong_num_args("dict incr dictVarName key ?increment?"))) };
            let delta = if rest.len() >= 3 { crate::value::try_as_integer(&mut interp.host, rest[2]).map_err(Signal::Error)? } else { 1 };
            let current = match interp.var_read(&var_name, None) {
                Ok(v) => dict_of(interp, v)?,
                Err(_) => interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?,
            };
            let existing = get_path(interp, current, &[key.clone()])?;
            let base = match existing {
                Some(v) => crate::value::try_as_integer(&mut interp.host, v).map_err(Signal::Error)?,
                None => 0,
            };
            let sum = new_int(interp, base.wrapping_add(delta))?;
            set_path(interp, current, &[key], sum)?;
            interp.var_write(&var_name, None, current).map_err(Signal::Error)?;
            Ok(current)
        }
        "append" => {
            if rest.len() < 2 {
                return Err(Signal::Error(CoreError::wrong_num_args("dict append dictVarName key ?value ...?")));
            }
            let var_name = text(interp, rest[0])?;
            let key = text(interp, rest[1])?;
            let current = match interp.var_read(&var_name, None) {
                Ok(v) => dict_of(interp, v)?,
                Err(_) => interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?,
            };
            let mut s = match get_path(interp, current, &[key.clone()])? {
                Some(v) => text(interp, v)?,
                None => String::new(),
            };
            for &v in &rest[2..] {
                s.push_str(&text(interp, v)?);
            }
            let value = new_str(interp, &s)?;
            set_path(interp, current, &[key], value)?;
            interp.var_write(&var_name, None, current).map_err(Signal::Error)?;
            Ok(current)
        }
        "lappend" => {
            if rest.len() < 2 {
                return Err(Signal::Error(CoreError::wrong_num_args("dict lappend dictVarName key ?value ...?")));
            }
            let var_name = text(interp, rest[0])?;
            let key = text(interp, rest[1])?;
            let current = match interp.var_read(&var_name, None) {
                Ok(v) => dict_of(interp, v)?,
                Err(_) => interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?,
            };
            let mut items = match get_path(interp, current, &[key.clone()])? {
                Some(v) => list_items(interp, v)?,
                None => Vec::new(),
            };
            items.extend_from_slice(&rest[2..]);
            let value = new_list(interp, &items)?;
            set_path(interp, current, &[key], value)?;
            interp.var_write(&var_name, None, current).map_err(Signal::Error)?;
            Ok(current)
        }
        other => Err(Signal::Error(CoreError::new(ErrorKind::Name, format!("unknown subcommand \"{other}\": must be one of create, get, exists, size, keys, values, set, unset, merge, for, update, with, incr, append, lappend")))),
    }
}

/// `dict for {keyVar valueVar} dictionary body`
fn cmd_dict_for<H: HostOps>(interp: &mut Interp<H>, rest: &[ValueHandle]) -> CmdResult {
    arity("dict for", rest, 3, 3, "{keyVar valueVar} dictionary body")?;
    let names = list_items(interp, rest[0])?;
    if names.len() != 2 {
        return Err(Signal::Error(CoreError::new(ErrorKind::Arity, "must have exactly two variable names")));
    }
    let key_var = text(interp, names[0])?;
    let val_var = text(interp, names[1])?;
    let d = dict_of(interp, rest[1])?;
    let body_bytes = text(interp, rest[2])?.into_bytes();
    for (k, v) in ordered_pairs(interp, d)? {
        let key_val = new_str(interp, &k)?;
        interp.var_write(&key_var, None, key_val).map_err(Signal::Error)?;
        interp.var_write(&val_var, None, v).map_err(Signal::Error)?;
        match interp.enter_nested(|interp| crate::eval::eval_script(interp, &body_bytes)) {
            Ok(_) => {}
            Err(Signal::Break) => break,
            Err(Signal::Continue) => {}
            Err(other) => return Err(other),
        }
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

/// `dict update dictVarName key varName ?key varName ...? body`
fn cmd_dict_update<H: HostOps>(interp: &mut Interp<H>, rest: &[ValueHandle]) -> CmdResult {
    if rest.len() < 4 || rest.len() % 2 != 0 {
        return Err(Signal::Error(CoreError::wrong_num_args("dict update dictVarName key varName ?key varName ...? body")));
    }
    let var_name = text(interp, rest[0])?;
    let body = *rest.last().expect("checked length >= 4");
    let pairs = &rest[1..rest.len() - 1];
    let dict = dict_of(interp, interp.var_read(&var_name, None).map_err(Signal::Error)?)?;
    let mut bindings = Vec::new();
    for pair in pairs.chunks(2) {
        let key = text(interp, pair[0])?;
        let local = text(interp, pair[1])?;
        if let Some(v) = get_path(interp, dict, &[key.clone()])? {
            interp.var_write(&local, None, v).map_err(Signal::Error)?;
        }
        bindings.push((key, local));
    }
    let outcome = {
        let bytes = text(interp, body)?.into_bytes();
        interp.enter_nested(|interp| crate::eval::eval_script(interp, &bytes))
    };
    for (key, local) in bindings {
        if let Ok(v) = interp.var_read(&local, None) {
            set_path(interp, dict, &[key], v)?;
        }
    }
    interp.var_write(&var_name, None, dict).map_err(Signal::Error)?;
    outcome
}

/// `dict with dictVarName ?key ...? body`
fn cmd_dict_with<H: HostOps>(interp: &mut Interp<H>, rest: &[ValueHandle]) -> CmdResult {
    if rest.len() < 2 {
        return Err(Signal::Error(CoreError::wrong_num_args("dict with dictVarName ?key ...? body")));
    }
    let var_name = text(interp, rest[0])?;
    let body = *rest.last().expect("checked length >= 2");
    let path_keys: Vec<String> = rest[1..rest.len() - 1].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
    let root = dict_of(interp, interp.var_read(&var_name, None).map_err(Signal::Error)?)?;
    let target = match get_path(interp, root, &path_keys)? {
        Some(v) => dict_of(interp, v)?,
        None => interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?,
    };
    let pairs = ordered_pairs(interp, target)?;
    for (k, v) in &pairs {
        interp.var_write(k, None, *v).map_err(Signal::Error)?;
    }
    let outcome = {
        let bytes = text(interp, body)?.into_bytes();
        interp.enter_nested(|interp| crate::eval::eval_script(interp, &bytes))
    };
    for (k, _) in &pairs {
        if let Ok(v) = interp.var_read(k, None) {
            let mut full = path_keys.clone();
            full.push(k.clone());
            set_path(interp, root, &full, v)?;
        }
    }
    interp.var_write(&var_name, None, root).map_err(Signal::Error)?;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{EvalFlags, Limits};
    use crate::mem_hostops::MemHost;

    fn run<H: HostOps>(interp: &mut Interp<H>, src: &str) -> CmdResult {
        interp.script_eval(src.as_bytes(), EvalFlags::Local)
    }

    #[test]
    fn create_keys_and_size_round_trip() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lsort [dict keys [dict create a 1 b 2 c 3]]").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "a b c");
    }

    #[test]
    fn set_creates_nested_path_and_get_follows_it() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "dict set d a b 1; dict get $d a b").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1");
    }

    #[test]
    fn incr_defaults_missing_key_to_zero() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "dict incr d n 5; dict get $d n").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "5");
    }

    #[test]
    fn dict_for_visits_every_pair() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "set acc {}; dict for {k v} [dict create a 1 b 2] {append acc $k$v}; set acc").unwrap();
        assert!(text(&interp, v).unwrap().contains("a1") && text(&interp, v).unwrap().contains("b2"));
    }

    #[test]
    fn dict_with_writes_outer_variables() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "dict set d x 1; dict with d {incr x}; dict get $d x").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "2");
    }
}
