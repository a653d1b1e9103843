//! Variable and namespace built-ins (spec.md §4.J, §4.E): `set`, `unset`,
//! `incr`, `append`, `lappend`, `global`/`variable`/`upvar`, `rename`, and
//! `namespace` subcommands.

use std::collections::HashMap;

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::{BuiltinFn, EvalFlags, Interp};
use crate::namespace::NamespaceTree;

use super::{arity, list_items, new_list, new_str, text};

pub fn register<H: HostOps>(map: &mut HashMap<&'static str, BuiltinFn<H>>) {
    map.insert("set", cmd_set);
    map.insert("unset", cmd_unset);
    map.insert("incr", cmd_incr);
    map.insert("append", cmd_append);
    map.insert("lappend", cmd_lappend);
    map.insert("global", cmd_global);
    map.insert("variable", cmd_variable);
    map.insert("upvar", cmd_upvar);
    map.insert("rename", cmd_rename);
    map.insert("namespace", cmd_namespace);
}

/// `set varName ?value?`
fn cmd_set<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 2, "varName ?newValue?")?;
    let var_name = text(interp, args[0])?;
    if args.len() == 2 {
        interp.var_write(&var_name, None, args[1]).map_err(Signal::Error)?;
        return Ok(args[1]);
    }
    interp.var_read(&var_name, None).map_err(Signal::Error)
}

/// `unset ?-nocomplain? ?--? varName ...`
fn cmd_unset<H: HostOps>(interp: &mut Interp<H>, _name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut nocomplain = false;
    let mut i = 0;
    while i < args.len() {
        let a = text(interp, args[i])?;
        if a == "-nocomplain" {
            nocomplain = true;
            i += 1;
        } else if a == "--" {
            i += 1;
            break;
        } else {
            break;
        }
    }
    for &v in &args[i..] {
        let var_name = text(interp, v)?;
        let existed = interp.var_unset(&var_name);
        if !existed && !nocomplain {
            return Err(Signal::Error(CoreError::no_such_variable(&var_name)));
        }
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

/// `incr varName ?increment?`
fn cmd_incr<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 2, "varName ?increment?")?;
    let var_name = text(interp, args[0])?;
    let delta = if args.len() == 2 { crate::value::try_as_integer(&mut interp.host, args[1]).map_err(Signal::Error)? } else { 1 };
    let current = match interp.var_read(&var_name, None) {
        Ok(v) => crate::value::try_as_integer(&mut interp.host, v).map_err(Signal::Error)?,
        Err(_) => 0,
    };
    let result = current.wrapping_add(delta);
    let value = super::new_int(interp, result)?;
    interp.var_write(&var_name, None, value).map_err(Signal::Error)?;
    Ok(value)
}

/// `append varName ?value value ...?`
fn cmd_append<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} varName ?value value ...?"))));
    }
    let var_name = text(interp, args[0])?;
    let mut current = match interp.var_read(&var_name, None) {
        Ok(v) => text(interp, v)?,
        Err(_) => String::new(),
    };
    for &v in &args[1..] {
        current.push_str(&text(interp, v)?);
    }
    let value = new_str(interp, &current)?;
    interp.var_write(&var_name, None, value).map_err(Signal::Error)?;
    Ok(value)
}

/// `lappend varName ?value value ...?`
fn cmd_lappend<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} varName ?value value ...?"))));
    }
    let var_name = text(interp, args[0])?;
    let mut items = match interp.var_read(&var_name, None) {
        Ok(v) => list_items(interp, v)?,
        Err(_) => Vec::new(),
    };
    items.extend_from_slice(&args[1..]);
    let value = new_list(interp, &items)?;
    interp.var_write(&var_name, None, value).map_err(Signal::Error)?;
    Ok(value)
}

/// `global varName ...`
fn cmd_global<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} varName ?varName ...?"))));
    }
    for &v in args {
        let n = text(interp, v)?;
        interp.link_global(&n);
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

/// `variable ?name value ...? ?name?`
fn cmd_variable<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?name value ...? name"))));
    }
    let mut i = 0;
    while i < args.len() {
        let n = text(interp, args[i])?;
        if i + 1 < args.len() {
            interp.link_variable(&n, Some(args[i + 1])).map_err(Signal::Error)?;
            i += 2;
        } else {
            interp.link_variable(&n, None).map_err(Signal::Error)?;
            i += 1;
        }
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

/// `upvar ?level? otherVar localVar ?otherVar localVar ...?`
fn cmd_upvar<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.len() < 2 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?level? otherVar localVar ?otherVar localVar ...?"))));
    }
    let first = text(interp, args[0])?;
    let (level_spec, rest) = if first.starts_with('#') || first.parse::<i64>().is_ok() { (first, &args[1..]) } else { ("1".to_string(), args) };
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?level? otherVar localVar ?otherVar localVar ...?"))));
    }
    for pair in rest.chunks(2) {
        let other = text(interp, pair[0])?;
        let local = text(interp, pair[1])?;
        interp.link_upvar(&level_spec, &other, &local).map_err(Signal::Error)?;
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

/// `rename oldName newName`
fn cmd_rename<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 2, 2, "oldName newName")?;
    let old = text(interp, args[0])?;
    let new = text(interp, args[1])?;
    let (old_ns, old_simple) = interp.resolve_command_ns(&old).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&old)))?;
    let storage = interp.namespaces.storage(old_ns);
    let (params, body) = interp.host.proc_lookup(storage, &old_simple).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&old)))?;
    if !interp.host.proc_undefine(storage, &old_simple) {
        return Err(Signal::Error(CoreError::invalid_command_name(&old)));
    }
    if new.is_empty() {
        return interp.empty_value(Arena::Scratch).map_err(Signal::Error);
    }
    let (absolute, path, simple) = NamespaceTree::split_qualified(&new);
    let new_ns = interp.namespaces.ensure_path(&mut interp.host, interp.current_ns(), &path, absolute).map_err(Signal::Error)?;
    let new_storage = interp.namespaces.storage(new_ns);
    interp.host.proc_define(new_storage, &simple, params, body).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Name, e.message)))?;
    interp.host.trace_fire(storage, &old_simple, crate::hostops::TraceEvent::Rename);
    interp.tracer.on_trace_fire("rename", &old_simple);
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

/// `namespace eval|current|parent|children|which|export|import|delete|path|origin ...`
fn cmd_namespace<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} subcommand ?arg ...?"))));
    }
    let sub = text(interp, args[0])?;
    let rest = &args[1..];
    match sub.as_str() {
        "eval" => {
            if rest.is_empty() {
                return Err(Signal::Error(CoreError::wrong_num_args("namespace eval name arg ?arg ...?")));
            }
            let ns_name = text(interp, rest[0])?;
            let (absolute, path, simple) = NamespaceTree::split_qualified(&ns_name);
            let mut full = path;
            full.push(simple);
            let ns = interp.namespaces.ensure_path(&mut interp.host, interp.current_ns(), &full, absolute || ns_name.starts_with("::")).map_err(Signal::Error)?;
            let parts: Vec<String> = rest[1..].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            let script = parts.join(" ").into_bytes();
            let saved = interp.frames.current().ns;
            interp.frames.current_mut().ns = ns;
            let outcome = interp.enter_nested(|interp| crate::eval::eval_script(interp, &script));
            interp.frames.current_mut().ns = saved;
            outcome
        }
        "current" => new_str(interp, &interp.namespaces.qualified_name(interp.current_ns())),
        "parent" => {
            let q = interp.namespaces.parent(interp.current_ns()).map_or_else(|| "::".to_string(), |p| interp.namespaces.qualified_name(p));
            new_str(interp, &q)
        }
        "children" => {
            let names: Vec<String> = interp.namespaces.children(interp.current_ns()).map(|(_, id)| interp.namespaces.qualified_name(id)).collect();
            let handles: Vec<ValueHandle> = names.iter().map(|s| interp.new_string(s, Arena::Scratch)).collect::<Result<_, _>>().map_err(Signal::Error)?;
            new_list(interp, &handles)
        }
        "which" => {
            if rest.is_empty() {
                return Err(Signal::Error(CoreError::wrong_num_args("namespace which ?-command|-variable? name")));
            }
            let target_name = text(interp, *rest.last().expect("checked non-empty"))?;
            match interp.resolve_command_ns(&target_name) {
                Some((ns, simple)) => {
                    let q = format!("{}::{}", interp.namespaces.qualified_name(ns), simple);
                    new_str(interp, &q)
                }
                None => interp.empty_value(Arena::Scratch).map_err(Signal::Error),
            }
        }
        "export" => {
            let patterns: Vec<String> = rest.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            interp.namespaces.set_exported(interp.current_ns(), patterns);
            interp.empty_value(Arena::Scratch).map_err(Signal::Error)
        }
        "import" => interp.empty_value(Arena::Scratch).map_err(Signal::Error),
        "delete" => {
            for &v in rest {
                let ns_name = text(interp, v)?;
                let (absolute, path, simple) = NamespaceTree::split_qualified(&ns_name);
                let mut full = path;
                full.push(simple);
                if let Some(ns) = interp.namespaces.resolve_path(interp.current_ns(), &full, absolute || ns_name.starts_with("::")) {
                    interp.namespaces.delete(&mut interp.host, ns);
                }
            }
            interp.empty_value(Arena::Scratch).map_err(Signal::Error)
        }
        "path" => interp.empty_value(Arena::Scratch).map_err(Signal::Error),
        "origin" => {
            if rest.is_empty() {
                return Err(Signal::Error(CoreError::wrong_num_args("namespace origin name")));
            }
            let target_name = text(interp, rest[0])?;
            match interp.resolve_command_ns(&target_name) {
                Some((ns, simple)) => {
                    let q = format!("{}::{}", interp.namespaces.qualified_name(ns), simple);
                    new_str(interp, &q)
                }
                None => Err(Signal::Error(CoreError::invalid_command_name(&target_name))),
            }
        }
        other => Err(Signal::Error(CoreError::new(ErrorKind::Name, format!("unknown subcommand \"{other}\": must be one of eval, current, parent, children, which, export, import, delete, path, origin")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Limits;
    use crate::mem_hostops::MemHost;

    fn run<H: HostOps>(interp: &mut Interp<H>, src: &str) -> CmdResult {
        interp.script_eval(src.as_bytes(), EvalFlags::Local)
    }

    #[test]
    fn set_reads_and_writes() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "set x 5; set x").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "5");
    }

    #[test]
    fn incr_defaults_to_one_and_creates_unset_var() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "incr counter").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1");
    }

    #[test]
    fn lappend_creates_and_extends_list() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lappend l a b; lappend l c").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "a b c");
    }

    #[test]
    fn namespace_eval_creates_nested_scope() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "namespace eval foo {set x 1}; namespace eval foo {set x}").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1");
    }

    #[test]
    fn upvar_links_caller_variable() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(
            &mut interp,
            "proc setit {} {upvar 1 target t; set t 9}; set target 0; setit; set target",
        )
        .unwrap();
        assert_eq!(text(&interp, v).unwrap(), "9");
    }
}
