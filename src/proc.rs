//! Procedure Engine (spec.md §4.H): parameter binding and body invocation.

use crate::errors::{CoreError, ErrorKind, ReturnCode};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::Interp;
use crate::namespace::NodeId;

pub(crate) struct ParamSpec {
    pub(crate) name: String,
    pub(crate) default: Option<ValueHandle>,
    pub(crate) is_rest: bool,
}

pub(crate) fn string_of<H: HostOps>(host: &H, v: ValueHandle) -> String {
    host.value_string_bytes(v).map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default()
}

pub(crate) fn parse_params<H: HostOps>(host: &mut H, params: ValueHandle) -> Result<Vec<ParamSpec>, CoreError> {
    let list = host.list_try_as(params, Arena::Scratch).map_err(|e| CoreError::new(ErrorKind::Arity, e.message))?;
    let n = host.list_length(list).unwrap_or(0);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let item = host.list_at(list, i as i64).expect("index within list_length bound");
        let sub = host.list_try_as(item, Arena::Scratch).map_err(|e| CoreError::new(ErrorKind::Arity, e.message))?;
        let sub_len = host.list_length(sub).unwrap_or(1);
        let name_handle = host.list_at(sub, 0).unwrap_or(item);
        let name = string_of(host, name_handle);
        let is_rest = name == "args" && i + 1 == n;
        let default = if sub_len >= 2 { host.list_at(sub, 1) } else { None };
        out.push(ParamSpec { name, default, is_rest });
    }
    Ok(out)
}

fn signature(proc_name: &str, params: &[ParamSpec]) -> String {
    let mut parts = vec![proc_name.to_string()];
    for p in params {
        if p.is_rest {
            parts.push("args".to_string());
        } else if p.default.is_some() {
            parts.push(format!("?{}?", p.name));
        } else {
            parts.push(p.name.clone());
        }
    }
    parts.join(" ")
}

/// Invokes a procedure: binds `args` against `params`, pushes a call frame in
/// the procedure's defining namespace, evaluates `body`, and translates the
/// outcome back to the caller (spec.md §4.H).
pub fn invoke<H: HostOps>(interp: &mut Interp<H>, ns: NodeId, name: &str, params: ValueHandle, body: ValueHandle, args: &[ValueHandle]) -> CmdResult {
    let specs = parse_params(&mut interp.host, params).map_err(Signal::Error)?;
    let has_rest = specs.last().is_some_and(|p| p.is_rest);
    let fixed = specs.len() - usize::from(has_rest);
    let required = specs.iter().take(fixed).filter(|p| p.default.is_none()).count();
    if args.len() < required || (!has_rest && args.len() > fixed) {
        return Err(Signal::Error(CoreError::wrong_num_args(&signature(name, &specs))));
    }

    let mut bindings = Vec::with_capacity(specs.len());
    let mut idx = 0usize;
    for p in &specs {
        if p.is_rest {
            let rest_list = interp.host.list_create_empty(Arena::Permanent).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Arity, e.message)))?;
            for &a in &args[idx..] {
                interp.host.list_push(rest_list, a).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Arity, e.message)))?;
            }
            bindings.push((p.name.clone(), rest_list));
            idx = args.len();
        } else if idx < args.len() {
            bindings.push((p.name.clone(), args[idx]));
            idx += 1;
        } else if let Some(def) = p.default {
            bindings.push((p.name.clone(), def));
        }
    }

    let arg_summary: Vec<String> = args.iter().map(|&a| string_of(&interp.host, a)).collect();
    interp.frames.push(&mut interp.host, ns, name.to_string(), arg_summary.clone()).map_err(Signal::Error)?;
    let locals = interp.frames.current().locals;
    for (pname, value) in bindings {
        interp.host.var_set(locals, &pname, value).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Name, e.message)))?;
    }

    let body_bytes = interp.host.value_string_bytes(body).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?.to_vec();
    let outcome = crate::eval::eval_script(interp, &body_bytes);
    let line = interp.frames.current().line;

    match outcome {
        Ok(value) => {
            interp.frames.pop(&mut interp.host);
            Ok(value)
        }
        Err(Signal::Return { value, mut options }) => {
            interp.frames.pop(&mut interp.host);
            if options.level > 1 {
                options.level -= 1;
                return Err(Signal::Return { value, options });
            }
            match ReturnCode::from_i64(options.code) {
                ReturnCode::Ok => Ok(value),
                ReturnCode::Error => {
                    let mut err = CoreError::new(ErrorKind::User, string_of(&interp.host, value));
                    if let Some(code) = options.error_code {
                        err = err.with_code(code);
                    }
                    Err(Signal::Error(err))
                }
                other => Err(Signal::Other { code: other.as_i64(), value }),
            }
        }
        Err(Signal::Error(err)) => {
            let call_repr = if arg_summary.is_empty() {
                name.to_string()
            } else {
                format!("{name} {}", arg_summary.join(" "))
            };
            interp.error_trace.unwind_through_proc(name, line, &call_repr);
            interp.tracer.on_error_unwind(name, line);
            interp.frames.pop(&mut interp.host);
            Err(Signal::Error(err))
        }
        Err(Signal::Break) => {
            interp.frames.pop(&mut interp.host);
            Err(Signal::Error(CoreError::new(ErrorKind::Control, "invoked \"break\" outside of a loop")))
        }
        Err(Signal::Continue) => {
            interp.frames.pop(&mut interp.host);
            Err(Signal::Error(CoreError::new(ErrorKind::Control, "invoked \"continue\" outside of a loop")))
        }
        Err(other @ Signal::Other { .. }) => {
            interp.frames.pop(&mut interp.host);
            Err(other)
        }
    }
}
