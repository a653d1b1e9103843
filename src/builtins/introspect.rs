//! Introspection built-ins (spec.md §4.J, §4.K): `info` subcommands and
//! `trace add|remove|info variable|command|execution`.
//!
//! `trace_fire` notifications are raised by the core itself at the relevant
//! checkpoints (`Interp::var_read`/`var_write`/`var_unset`, `eval::dispatch`,
//! `rename` — see their call sites); this module only owns registration
//! bookkeeping, since `HostOps::trace_add` returns an opaque handle with no
//! enumeration counterpart (spec.md §4.B keeps the vtable to primitives, the
//! richer `trace info` bookkeeping lives here the same way `namespace`'s tree
//! topology lives in [`crate::namespace`] rather than in HostOps).

use std::collections::HashMap;

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, TraceEvent, ValueHandle};
use crate::interp::{BuiltinFn, Interp, TraceRecord};

use super::{arity, new_bool, new_list, new_str, text};

pub fn register<H: HostOps>(map: &mut HashMap<&'static str, BuiltinFn<H>>) {
    map.insert("info", cmd_info);
    map.insert("trace", cmd_trace);
}

fn glob_filter<H: HostOps>(interp: &Interp<H>, names: Vec<String>, pattern: Option<&str>) -> Vec<String> {
    match pattern {
        None => names,
        Some(p) => names.into_iter().filter(|n| interp.host.string_match_glob(p.as_bytes(), n.as_bytes(), false)).collect(),
    }
}

fn str_list<H: HostOps>(interp: &mut Interp<H>, mut names: Vec<String>) -> CmdResult {
    names.sort();
    names.dedup();
    let handles: Vec<ValueHandle> = names.iter().map(|s| interp.new_string(s, Arena::Scratch)).collect::<Result<_, _>>().map_err(Signal::Error)?;
    new_list(interp, &handles)
}

/// `info commands|procs|vars|exists|level|body|args|default|script|errorstack|type|methods`
fn cmd_info<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} subcommand ?arg ...?"))));
    }
    let sub = text(interp, args[0])?;
    let rest = &args[1..];
    match sub.as_str() {
        "commands" => {
            let pattern = rest.first().map(|&v| text(interp, v)).transpose()?;
            let mut names: Vec<String> = interp.builtins.keys().map(|k| (*k).to_string()).collect();
            names.extend(interp.host.proc_names(interp.namespaces.storage(interp.current_ns())));
            if interp.current_ns() != interp.global_ns {
                names.extend(interp.host.proc_names(interp.namespaces.storage(interp.global_ns)));
            }
            str_list(interp, glob_filter(interp, names, pattern.as_deref()))
        }
        "procs" => {
            let pattern = rest.first().map(|&v| text(interp, v)).transpose()?;
            let names = interp.host.proc_names(interp.namespaces.storage(interp.current_ns()));
            str_list(interp, glob_filter(interp, names, pattern.as_deref()))
        }
        "vars" => {
            let pattern = rest.first().map(|&v| text(interp, v)).transpose()?;
            let locals = interp.frames.current().locals;
            let mut names = interp.host.var_names(locals);
            names.extend(interp.frames.current().links.keys().cloned());
            str_list(interp, glob_filter(interp, names, pattern.as_deref()))
        }
        "exists" => {
            arity("info exists", rest, 1, 1, "varName")?;
            let var_name = text(interp, rest[0])?;
            new_bool(interp, interp.var_exists(&var_name))
        }
        "level" => {
            if rest.is_empty() {
                return super::new_int(interp, interp.frames.current().level as i64);
            }
            let spec = text(interp, rest[0])?;
            let n: i64 = spec.parse().map_err(|_| Signal::Error(CoreError::new(ErrorKind::Control, format!("bad level \"{spec}\""))))?;
            let current = interp.frames.current().level;
            let level = if n > 0 { n as usize } else { current.checked_sub((-n) as usize).ok_or_else(|| Signal::Error(CoreError::new(ErrorKind::Control, format!("bad level \"{spec}\""))))? };
            let frame = interp.frames.at_level(level).ok_or_else(|| Signal::Error(CoreError::new(ErrorKind::Control, format!("bad level \"{spec}\""))))?;
            let mut parts = vec![frame.command_name.clone()];
            parts.extend(frame.command_args.iter().cloned());
            new_str(interp, &parts.join(" "))
        }
        "body" => {
            arity("info body", rest, 1, 1, "procName")?;
            let proc_name = text(interp, rest[0])?;
            let (ns, simple) = interp.resolve_command_ns(&proc_name).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&proc_name)))?;
            let storage = interp.namespaces.storage(ns);
            let (_, body) = interp.host.proc_lookup(storage, &simple).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&proc_name)))?;
            Ok(body)
        }
        "args" => {
            arity("info args", rest, 1, 1, "procName")?;
            let proc_name = text(interp, rest[0])?;
            let (ns, simple) = interp.resolve_command_ns(&proc_name).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&proc_name)))?;
            let storage = interp.namespaces.storage(ns);
            let (params, _) = interp.host.proc_lookup(storage, &simple).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&proc_name)))?;
            let specs = crate::proc::parse_params(&mut interp.host, params).map_err(Signal::Error)?;
            let names: Vec<String> = specs.iter().map(|p| if p.is_rest { "args".to_string() } else { p.name.clone() }).collect();
            str_list_ordered(interp, names)
        }
        "default" => {
            arity("info default", rest, 3, 3, "procName paramName varName")?;
            let proc_name = text(interp, rest[0])?;
            let param_name = text(interp, rest[1])?;
            let var_name = text(interp, rest[2])?;
            let (ns, simple) = interp.resolve_command_ns(&proc_name).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&proc_name)))?;
            let storage = interp.namespaces.storage(ns);
            let (params, _) = interp.host.proc_lookup(storage, &simple).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(&proc_name)))?;
            let specs = crate::proc::parse_params(&mut interp.host, params).map_err(Signal::Error)?;
            match specs.iter().find(|p| p.name == param_name).and_then(|p| p.default) {
                Some(default) => {
                    let text_val = crate::proc::string_of(&interp.host, default);
                    let v = new_str(interp, &text_val)?;
                    interp.var_write(&var_name, None, v).map_err(Signal::Error)?;
                    new_bool(interp, true)
                }
                None => new_bool(interp, false),
            }
        }
        "script" => interp.empty_value(Arena::Scratch).map_err(Signal::Error),
        "errorstack" => {
            let stack = interp.error_trace.stack.clone();
            super::control::errorstack_to_list(interp, &stack)
        }
        "type" => {
            arity("info type", rest, 1, 1, "value")?;
            let type_name = crate::foreign::type_name(interp, rest[0]).unwrap_or_else(|| "string".to_string());
            new_str(interp, &type_name)
        }
        "methods" => {
            arity("info methods", rest, 1, 1, "value")?;
            let methods = crate::foreign::methods(interp, rest[0]);
            str_list_ordered(interp, methods)
        }
        other => Err(Signal::Error(CoreError::new(
            ErrorKind::Name,
            format!("unknown subcommand \"{other}\": must be one of commands, procs, vars, exists, level, body, args, default, script, errorstack, type, methods"),
        ))),
    }
}

/// Like [`str_list`] but preserves input order (parameter lists, method
/// tables) instead of sorting.
fn str_list_ordered<H: HostOps>(interp: &mut Interp<H>, names: Vec<String>) -> CmdResult {
    let handles: Vec<ValueHandle> = names.iter().map(|s| interp.new_string(s, Arena::Scratch)).collect::<Result<_, _>>().map_err(Signal::Error)?;
    new_list(interp, &handles)
}

fn event_for_op(kind: &str, op: &str) -> Option<TraceEvent> {
    match (kind, op) {
        ("variable", "read") => Some(TraceEvent::Read),
        ("variable", "write") => Some(TraceEvent::Write),
        ("variable", "unset") => Some(TraceEvent::Unset),
        ("command", "rename") => Some(TraceEvent::Rename),
        ("execution", "enter") => Some(TraceEvent::Call),
        _ => None,
    }
}

fn op_for_event(event: TraceEvent) -> &'static str {
    match event {
        TraceEvent::Read => "read",
        TraceEvent::Write => "write",
        TraceEvent::Unset => "unset",
        TraceEvent::Rename => "rename",
        TraceEvent::Call => "enter",
    }
}

/// `trace add|remove|info variable|command|execution name ops command`
fn cmd_trace<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} add|remove|info ...?"))));
    }
    let action = text(interp, args[0])?;
    let rest = &args[1..];
    match action.as_str() {
        "add" => {
            arity("trace add", rest, 4, 4, "variable|command|execution name opList command")?;
            let kind = text(interp, rest[0])?;
            let target = text(interp, rest[1])?;
            let ops = super::list_items(interp, rest[2])?.iter().map(|&v| text(interp, v)).collect::<Result<Vec<_>, _>>()?;
            let callback = text(interp, rest[3])?;
            let (ns, simple) = trace_location(interp, &kind, &target)?;
            for op in &ops {
                if let Some(event) = event_for_op(&kind, op) {
                    let cb_val = rest[3];
                    let handle = interp.host.trace_add(ns, &simple, event, cb_val);
                    interp.traces.push(TraceRecord { ns, name: simple.clone(), event, command: callback.clone(), handle });
                }
            }
            interp.empty_value(Arena::Scratch).map_err(Signal::Error)
        }
        "remove" => {
            arity("trace remove", rest, 4, 4, "variable|command|execution name opList command")?;
            let kind = text(interp, rest[0])?;
            let target = text(interp, rest[1])?;
            let ops = super::list_items(interp, rest[2])?.iter().map(|&v| text(interp, v)).collect::<Result<Vec<_>, _>>()?;
            let callback = text(interp, rest[3])?;
            let (ns, simple) = trace_location(interp, &kind, &target)?;
            let events: Vec<TraceEvent> = ops.iter().filter_map(|op| event_for_op(&kind, op)).collect();
            let mut removed = Vec::new();
            interp.traces.retain(|rec| {
                let matches = rec.ns == ns && rec.name == simple && rec.command == callback && events.contains(&rec.event);
                if matches {
                    removed.push(rec.handle);
                }
                !matches
            });
            for handle in removed {
                interp.host.trace_remove(handle);
            }
            interp.empty_value(Arena::Scratch).map_err(Signal::Error)
        }
        "info" => {
            arity("trace info", rest, 2, 2, "variable|command|execution name")?;
            let kind = text(interp, rest[0])?;
            let target = text(interp, rest[1])?;
            let (ns, simple) = trace_location(interp, &kind, &target)?;
            let mut entries = Vec::new();
            for rec in &interp.traces {
                if rec.ns == ns && rec.name == simple {
                    let op_val = new_str(interp, op_for_event(rec.event))?;
                    let cmd_val = new_str(interp, &rec.command)?;
                    entries.push(new_list(interp, &[op_val, cmd_val])?);
                }
            }
            new_list(interp, &entries)
        }
        other => Err(Signal::Error(CoreError::new(ErrorKind::Name, format!("unknown option \"{other}\": must be one of add, remove, info")))),
    }
}

fn trace_location<H: HostOps>(interp: &mut Interp<H>, kind: &str, target: &str) -> Result<(crate::hostops::NsHandle, String), Signal> {
    match kind {
        "variable" => Ok(interp.resolve_var_location(target)),
        "command" | "execution" => {
            let (ns, simple) = interp.resolve_command_ns(target).ok_or_else(|| Signal::Error(CoreError::invalid_command_name(target)))?;
            Ok((interp.namespaces.storage(ns), simple))
        }
        other => Err(Signal::Error(CoreError::new(ErrorKind::Name, format!("bad trace type \"{other}\": must be variable, command, or execution")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Limits;
    use crate::mem_hostops::MemHost;

    fn run<H: HostOps>(interp: &mut Interp<H>, src: &str) -> CmdResult {
        interp.script_eval(src.as_bytes(), crate::interp::EvalFlags::Local)
    }

    #[test]
    fn info_commands_includes_builtins_and_procs() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "proc myproc {} {}; lsearch [info commands] myproc").unwrap();
        assert_ne!(text(&interp, v).unwrap(), "-1");
    }

    #[test]
    fn info_args_and_default_reconstruct_proc_signature() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(
            &mut interp,
            "proc greet {who {greeting hi}} {return $greeting}; info args greet",
        )
        .unwrap();
        assert_eq!(text(&interp, v).unwrap(), "who greeting");
        let v = run(&mut interp, "info default greet greeting out; set out").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "hi");
        let v = run(&mut interp, "info default greet who out").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "0");
    }

    #[test]
    fn info_exists_reflects_variable_presence() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "set x 1; list [info exists x] [info exists y]").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1 0");
    }

    #[test]
    fn info_errorstack_reads_live_trace_before_catch_clears_it() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        run(&mut interp, "proc foo {} {bar}; proc bar {} {error oops}").unwrap();
        assert!(run(&mut interp, "foo").is_err());
        let v = run(&mut interp, "info errorstack").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "INNER {error oops} CALL bar CALL foo");
    }

    #[test]
    fn trace_add_fires_on_variable_write() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        run(&mut interp, "trace add variable x write logit").unwrap();
        run(&mut interp, "set x 1").unwrap();
        assert_eq!(interp.traces.len(), 1);
    }
}
