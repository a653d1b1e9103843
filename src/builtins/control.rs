//! Control flow built-ins (spec.md §4.J): `if`, loops, `switch`, return-code
//! commands, `catch`/`try`, and the script-composition family
//! (`eval`/`uplevel`/`apply`/`tailcall`).

use std::collections::HashMap;

use crate::errors::{CoreError, ErrorKind, ReturnCode, ReturnOptions, StackEntry};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::{BuiltinFn, EvalFlags, Interp};

use super::{arity, list_items, new_list, new_str, text};

pub fn register<H: HostOps>(map: &mut HashMap<&'static str, BuiltinFn<H>>) {
    map.insert("if", cmd_if);
    map.insert("while", cmd_while);
    map.insert("for", cmd_for);
    map.insert("foreach", cmd_foreach);
    map.insert("switch", cmd_switch);
    map.insert("break", cmd_break);
    map.insert("continue", cmd_continue);
    map.insert("return", cmd_return);
    map.insert("error", cmd_error);
    map.insert("throw", cmd_throw);
    map.insert("catch", cmd_catch);
    map.insert("try", cmd_try);
    map.insert("tailcall", cmd_tailcall);
    map.insert("eval", cmd_eval);
    map.insert("uplevel", cmd_uplevel);
    map.insert("apply", cmd_apply);
}

fn is_true<H: HostOps>(interp: &mut Interp<H>, v: ValueHandle) -> Result<bool, Signal> {
    crate::value::try_as_bool(&interp.host, v).or_else(|_| {
        let n = crate::value::try_as_number(&mut interp.host, v)?;
        Ok(n.as_f64() != 0.0)
    }).map_err(Signal::Error)
}

fn eval_body<H: HostOps>(interp: &mut Interp<H>, body: ValueHandle) -> CmdResult {
    let bytes = text(interp, body)?.into_bytes();
    interp.enter_nested(|interp| crate::eval::eval_script(interp, &bytes))
}

/// `if cond body ?elseif cond body ...? ?else body?`
fn cmd_if<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} cond ?then? body ...?else? body"))));
    }
    let mut i = 0;
    loop {
        if i >= args.len() {
            return interp.empty_value(Arena::Scratch).map_err(Signal::Error);
        }
        let cond = args[i];
        i += 1;
        if i < args.len() && text(interp, args[i])? == "then" {
            i += 1;
        }
        if i >= args.len() {
            return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} cond ?then? body ...?else? body"))));
        }
        let body = args[i];
        i += 1;
        if is_true(interp, cond)? {
            return eval_body(interp, body);
        }
        if i >= args.len() {
            return interp.empty_value(Arena::Scratch).map_err(Signal::Error);
        }
        let kw = text(interp, args[i])?;
        if kw == "elseif" {
            i += 1;
            continue;
        }
        if kw == "else" {
            i += 1;
            if i >= args.len() {
                return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} cond ?then? body ...?else? body"))));
            }
            return eval_body(interp, args[i]);
        }
        // Bare trailing body with no `else` keyword.
        return eval_body(interp, args[i]);
    }
}

fn cmd_while<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 2, 2, "test command")?;
    let (cond_src, body) = (args[0], args[1]);
    let cond_bytes = text(interp, cond_src)?.into_bytes();
    loop {
        let cond_val = interp.enter_nested(|interp| crate::expr::eval_expr(interp, &cond_bytes))?;
        if !is_true(interp, cond_val)? {
            break;
        }
        match eval_body(interp, body) {
            Ok(_) => {}
            Err(Signal::Break) => break,
            Err(Signal::Continue) => {}
            Err(other) => return Err(other),
        }
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

fn cmd_for<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 4, 4, "start test next command")?;
    let (start, test, next, body) = (args[0], args[1], args[2], args[3]);
    eval_body(interp, start)?;
    let test_bytes = text(interp, test)?.into_bytes();
    loop {
        let cond_val = interp.enter_nested(|interp| crate::expr::eval_expr(interp, &test_bytes))?;
        if !is_true(interp, cond_val)? {
            break;
        }
        match eval_body(interp, body) {
            Ok(_) => {}
            Err(Signal::Break) => break,
            Err(Signal::Continue) => {}
            Err(other) => return Err(other),
        }
        eval_body(interp, next)?;
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

/// `foreach varlist list ?varlist list ...? body`
fn cmd_foreach<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.len() < 3 || args.len() % 2 != 1 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} varList list ?varList list ...? command"))));
    }
    let body = *args.last().expect("checked length >= 3");
    let pairs = &args[..args.len() - 1];
    let mut groups = Vec::new();
    let mut max_len = 0usize;
    for pair in pairs.chunks(2) {
        let vars: Vec<String> = list_items(interp, pair[0])?.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
        let items = list_items(interp, pair[1])?;
        max_len = max_len.max(items.len().div_ceil(vars.len().max(1)));
        groups.push((vars, items));
    }
    for round in 0..max_len {
        for (vars, items) in &groups {
            for (i, var) in vars.iter().enumerate() {
                let idx = round * vars.len() + i;
                let value = match items.get(idx).copied() {
                    Some(v) => v,
                    None => interp.empty_value(Arena::Scratch).map_err(Signal::Error)?,
                };
                interp.var_write(var, None, value).map_err(Signal::Error)?;
            }
        }
        match eval_body(interp, body) {
            Ok(_) => {}
            Err(Signal::Break) => break,
            Err(Signal::Continue) => {}
            Err(other) => return Err(other),
        }
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

enum SwitchMode {
    Exact,
    Glob,
    Regexp,
}

/// `switch ?-exact|-glob|-regexp? ?--? string pattern body ?pattern body ...?`
/// also accepts a single trailing list argument of `pattern body` pairs.
fn cmd_switch<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut mode = SwitchMode::Exact;
    let mut i = 0;
    while i < args.len() {
        let a = text(interp, args[i])?;
        match a.as_str() {
            "-exact" => mode = SwitchMode::Exact,
            "-glob" => mode = SwitchMode::Glob,
            "-regexp" => mode = SwitchMode::Regexp,
            "--" => {
                i += 1;
                break;
            }
            _ => break,
        }
        i += 1;
    }
    if i >= args.len() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?options? string pattern body ...?"))));
    }
    let subject = text(interp, args[i])?;
    i += 1;
    let rest = &args[i..];
    let cases: Vec<ValueHandle> = if rest.len() == 1 { list_items(interp, rest[0])? } else { rest.to_vec() };
    if cases.is_empty() || cases.len() % 2 != 0 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?options? string pattern body ...?"))));
    }
    let mut j = 0;
    while j < cases.len() {
        let pattern = text(interp, cases[j])?;
        let matched = pattern == "default" && j + 2 == cases.len()
            || match mode {
                SwitchMode::Exact => pattern == subject,
                SwitchMode::Glob => interp.host.string_match_glob(pattern.as_bytes(), subject.as_bytes(), false),
                SwitchMode::Regexp => {
                    fancy_regex::Regex::new(&pattern).ok().and_then(|re| re.is_match(&subject).ok()).unwrap_or(false)
                }
            };
        if matched {
            // Fall through bodies of literal "-" to the next non-"-" body.
            let mut k = j + 1;
            loop {
                let body_text = text(interp, cases[k])?;
                if body_text == "-" {
                    k += 2;
                    continue;
                }
                return eval_body(interp, cases[k]);
            }
        }
        j += 2;
    }
    interp.empty_value(Arena::Scratch).map_err(Signal::Error)
}

fn cmd_break<H: HostOps>(_interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 0, 0, "")?;
    Err(Signal::Break)
}

fn cmd_continue<H: HostOps>(_interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 0, 0, "")?;
    Err(Signal::Continue)
}

/// `return ?-code code? ?-errorcode list? ?-level n? ?result?`
fn cmd_return<H: HostOps>(interp: &mut Interp<H>, _name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut options = ReturnOptions::ok();
    options.level = 1;
    let mut i = 0;
    while i + 1 < args.len() {
        let flag = text(interp, args[i])?;
        match flag.as_str() {
            "-code" => {
                let code_text = text(interp, args[i + 1])?;
                options.code = match code_text.as_str() {
                    "ok" => ReturnCode::Ok.as_i64(),
                    "error" => ReturnCode::Error.as_i64(),
                    "return" => ReturnCode::Return.as_i64(),
                    "break" => ReturnCode::Break.as_i64(),
                    "continue" => ReturnCode::Continue.as_i64(),
                    other => crate::value::parse_integer(other).ok_or_else(|| Signal::Error(CoreError::new(ErrorKind::Control, format!("bad completion code \"{other}\""))))?,
                };
            }
            "-level" => {
                let n = crate::value::parse_integer(&text(interp, args[i + 1])?)
                    .ok_or_else(|| Signal::Error(CoreError::new(ErrorKind::Control, "expected integer for -level")))?;
                options.level = n;
            }
            "-errorcode" => {
                let parts: Vec<String> = list_items(interp, args[i + 1])?.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
                options.error_code = Some(parts);
            }
            "-errorinfo" => {
                options.error_info = Some(text(interp, args[i + 1])?);
            }
            _ => break,
        }
        i += 2;
    }
    let value = if i < args.len() { args[i] } else { interp.empty_value(Arena::Scratch).map_err(Signal::Error)? };
    Err(Signal::Return { value, options })
}

/// `error message ?errorInfo? ?errorCode?`
fn cmd_error<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 3, "message ?errorInfo? ?errorCode?")?;
    let message = text(interp, args[0])?;
    let mut err = CoreError::new(ErrorKind::User, message.clone());
    if args.len() >= 3 {
        let code = list_items(interp, args[2])?.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
        err = err.with_code(code);
    }
    let line = interp.frames.current().line;
    let cmd_and_args = format!("error {message}");
    interp.error_trace.begin(&cmd_and_args, line);
    interp.tracer.on_error_begin(&cmd_and_args, line);
    if args.len() >= 2 {
        let extra = text(interp, args[1])?;
        interp.error_trace.info.push_str(&format!("\n{extra}"));
    }
    Err(Signal::Error(err))
}

/// `throw code message`
fn cmd_throw<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 2, 2, "code message")?;
    let code = list_items(interp, args[0])?.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
    let message = text(interp, args[1])?;
    let err = CoreError::new(ErrorKind::User, message.clone()).with_code(code.clone());
    let line = interp.frames.current().line;
    let cmd_and_args = format!("throw {} {message}", code.join(" "));
    interp.error_trace.begin(&cmd_and_args, line);
    interp.tracer.on_error_begin(&cmd_and_args, line);
    Err(Signal::Error(err))
}

/// `catch script ?resultVarName? ?optionsVarName?`
fn cmd_catch<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 3, "script ?resultVarName? ?optionsVarName?")?;
    let script = text(interp, args[0])?.into_bytes();
    let outcome = interp.enter_nested(|interp| crate::eval::eval_script(interp, &script));
    let (code, value) = match &outcome {
        Ok(v) => (ReturnCode::Ok.as_i64(), *v),
        Err(signal) => {
            let opts = interp.signal_to_options(signal);
            let code = opts.code;
            let value = match signal {
                Signal::Error(e) => new_str(interp, &e.message)?,
                Signal::Return { value, .. } => *value,
                Signal::Break | Signal::Continue => interp.empty_value(Arena::Scratch).map_err(Signal::Error)?,
                Signal::Other { value, .. } => *value,
            };
            if args.len() >= 2 {
                interp.var_write(&text(interp, args[1])?, None, value).map_err(Signal::Error)?;
            }
            if args.len() >= 3 {
                let dict = options_to_dict(interp, &opts)?;
                interp.var_write(&text(interp, args[2])?, None, dict).map_err(Signal::Error)?;
            }
            return new_int(interp, code);
        }
    };
    if args.len() >= 2 {
        interp.var_write(&text(interp, args[1])?, None, value).map_err(Signal::Error)?;
    }
    if args.len() >= 3 {
        let dict = options_to_dict(interp, &ReturnOptions::ok())?;
        interp.var_write(&text(interp, args[2])?, None, dict).map_err(Signal::Error)?;
    }
    new_int(interp, code)
}

fn new_int<H: HostOps>(interp: &mut Interp<H>, i: i64) -> CmdResult {
    super::new_int(interp, i)
}

/// Renders a structured `-errorstack` as a flat Tcl list: `INNER {cmd args…}
/// CALL {proc args…} CALL {proc args…} …` (spec.md §4.I). Shared with `info
/// errorstack` (builtins::introspect), which renders the live
/// `interp.error_trace.stack` the same way.
pub(super) fn errorstack_to_list<H: HostOps>(interp: &mut Interp<H>, stack: &[StackEntry]) -> CmdResult {
    let mut entries = Vec::with_capacity(stack.len() * 2);
    for entry in stack {
        let (tag, repr) = match entry {
            StackEntry::Inner(s) => ("INNER", s),
            StackEntry::Call(s) => ("CALL", s),
        };
        entries.push(new_str(interp, tag)?);
        entries.push(new_str(interp, repr)?);
    }
    new_list(interp, &entries)
}

fn options_to_dict<H: HostOps>(interp: &mut Interp<H>, opts: &ReturnOptions) -> CmdResult {
    let dict = interp.host.dict_create_empty(Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
    let put = |interp: &mut Interp<H>, dict: ValueHandle, k: &str, v: ValueHandle| -> Result<(), Signal> {
        let key = new_str(interp, k)?;
        interp.host.dict_put(dict, key, v).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))
    };
    let code_val = new_int(interp, opts.code)?;
    put(interp, dict, "-code", code_val)?;
    let level_val = new_int(interp, opts.level)?;
    put(interp, dict, "-level", level_val)?;
    if let Some(ec) = &opts.error_code {
        let list = new_list(interp, &ec.iter().map(|s| interp.new_string(s, Arena::Scratch)).collect::<Result<Vec<_>, _>>().map_err(Signal::Error)?)?;
        put(interp, dict, "-errorcode", list)?;
    }
    if let Some(info) = &opts.error_info {
        let v = new_str(interp, info)?;
        put(interp, dict, "-errorinfo", v)?;
    }
    if let Some(stack) = &opts.error_stack {
        let list = errorstack_to_list(interp, stack)?;
        put(interp, dict, "-errorstack", list)?;
    }
    if let Some(line) = opts.error_line {
        let v = new_int(interp, i64::from(line))?;
        put(interp, dict, "-errorline", v)?;
    }
    Ok(dict)
}

/// `try body ?on code varlist handler? ?trap pattern varlist handler?* ?finally script?`
fn cmd_try<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} body ?handler ...? ?finally script?"))));
    }
    let body_src = text(interp, args[0])?.into_bytes();
    let outcome = interp.enter_nested(|interp| crate::eval::eval_script(interp, &body_src));

    struct Handler {
        kind: HandlerKind,
        var_list: Option<ValueHandle>,
        body: ValueHandle,
    }
    enum HandlerKind {
        On(i64),
        Trap(Vec<String>),
    }
    let mut handlers = Vec::new();
    let mut finally = None;
    let mut i = 1;
    while i < args.len() {
        let kw = text(interp, args[i])?;
        match kw.as_str() {
            "on" => {
                arity_window(name, args, i, 4)?;
                let code_text = text(interp, args[i + 1])?;
                let code = match code_text.as_str() {
                    "ok" => ReturnCode::Ok.as_i64(),
                    "error" => ReturnCode::Error.as_i64(),
                    "return" => ReturnCode::Return.as_i64(),
                    "break" => ReturnCode::Break.as_i64(),
                    "continue" => ReturnCode::Continue.as_i64(),
                    other => crate::value::parse_integer(other).unwrap_or(1),
                };
                handlers.push(Handler { kind: HandlerKind::On(code), var_list: Some(args[i + 2]), body: args[i + 3] });
                i += 4;
            }
            "trap" => {
                arity_window(name, args, i, 4)?;
                let pattern = list_items(interp, args[i + 1])?.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
                handlers.push(Handler { kind: HandlerKind::Trap(pattern), var_list: Some(args[i + 2]), body: args[i + 3] });
                i += 4;
            }
            "finally" => {
                if i + 2 != args.len() {
                    return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} body ?handler ...? finally script"))));
                }
                finally = Some(args[i + 1]);
                i += 2;
            }
            _ => return Err(Signal::Error(CoreError::new(ErrorKind::Control, format!("bad handler keyword \"{kw}\"")))),
        }
    }

    let (code, result_value, err_code) = match &outcome {
        Ok(v) => (ReturnCode::Ok.as_i64(), *v, Vec::new()),
        Err(Signal::Error(e)) => (ReturnCode::Error.as_i64(), new_str(interp, &e.message)?, e.error_code.clone()),
        Err(Signal::Return { value, options }) => (options.code, *value, options.error_code.clone().unwrap_or_default()),
        Err(Signal::Break) => (ReturnCode::Break.as_i64(), interp.empty_value(Arena::Scratch).map_err(Signal::Error)?, Vec::new()),
        Err(Signal::Continue) => (ReturnCode::Continue.as_i64(), interp.empty_value(Arena::Scratch).map_err(Signal::Error)?, Vec::new()),
        Err(Signal::Other { code, value }) => (*code, *value, Vec::new()),
    };

    let mut handled = None;
    for h in &handlers {
        let hit = match &h.kind {
            HandlerKind::On(c) => *c == code,
            HandlerKind::Trap(pattern) => code == ReturnCode::Error.as_i64() && err_code.starts_with(pattern.as_slice()),
        };
        if hit {
            handled = Some(h);
            break;
        }
    }

    let final_result = if let Some(h) = handled {
        if let Some(vl) = h.var_list {
            let names: Vec<String> = list_items(interp, vl)?.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            if let Some(rv) = names.first() {
                interp.var_write(rv, None, result_value).map_err(Signal::Error)?;
            }
            if let Some(ov) = names.get(1) {
                let dict = options_to_dict(interp, &ReturnOptions { code, level: 1, error_code: Some(err_code.clone()), ..ReturnOptions::default() })?;
                interp.var_write(ov, None, dict).map_err(Signal::Error)?;
            }
        }
        eval_body(interp, h.body)
    } else {
        outcome
    };

    if let Some(f) = finally {
        let finally_outcome = eval_body(interp, f);
        if finally_outcome.is_err() {
            return finally_outcome;
        }
    }
    final_result
}

fn arity_window(name: &str, args: &[ValueHandle], i: usize, window: usize) -> Result<(), Signal> {
    if i + window > args.len() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} body ?handler ...? ?finally script?"))));
    }
    Ok(())
}

/// Approximates tail-call elimination: dispatches the target command directly
/// and propagates its outcome as this command's own, without dropping the
/// calling Rust stack frame early. True frame elision is out of scope (see
/// DESIGN.md).
fn cmd_tailcall<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} command ?arg ...?"))));
    }
    interp.enter_nested(|interp| crate::eval::dispatch(interp, args))
}

/// `eval arg ?arg ...?`: concatenates its arguments with single spaces to
/// form one script, as Tcl's `eval` does.
fn cmd_eval<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} arg ?arg ...?"))));
    }
    let parts: Vec<String> = args.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
    let script = parts.join(" ").into_bytes();
    interp.enter_nested(|interp| crate::eval::eval_script(interp, &script))
}

/// `uplevel ?level? arg ?arg ...?`: runs the script in an ancestor frame,
/// sharing its actual local storage and links (not merely its namespace).
fn cmd_uplevel<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?level? command ?arg ...?"))));
    }
    let mut i = 0;
    let first = text(interp, args[0])?;
    let level = if first == "#0" || first.parse::<i64>().is_ok() || first.strip_prefix('#').is_some() {
        i = 1;
        interp.frames.resolve_level(&first).ok_or_else(|| Signal::Error(CoreError::new(ErrorKind::Control, format!("bad level \"{first}\""))))?
    } else {
        interp.frames.resolve_level("1").expect("level 1 relative to any frame is always resolvable")
    };
    if i >= args.len() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?level? command ?arg ...?"))));
    }
    let parts: Vec<String> = args[i..].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
    let script = parts.join(" ").into_bytes();

    let tail = interp
        .frames
        .detach_above(level)
        .ok_or_else(|| Signal::Error(CoreError::new(ErrorKind::Control, format!("bad level \"{first}\""))))?;
    let outcome = interp.enter_nested(|interp| crate::eval::eval_script(interp, &script));
    interp.frames.restore_tail(tail);
    outcome
}

/// `apply {params body ?ns?} ?arg ...?`
fn cmd_apply<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} lambdaExpr ?arg ...?"))));
    }
    let spec_items = list_items(interp, args[0])?;
    if spec_items.len() < 2 {
        return Err(Signal::Error(CoreError::new(ErrorKind::Arity, "can't interpret as a lambda expression")));
    }
    let params = spec_items[0];
    let body = spec_items[1];
    let ns = if spec_items.len() >= 3 {
        let ns_name = text(interp, spec_items[2])?;
        let (absolute, path, simple) = crate::namespace::NamespaceTree::split_qualified(&ns_name);
        let mut full = path;
        full.push(simple);
        interp.namespaces.ensure_path(&mut interp.host, interp.current_ns(), &full, absolute).map_err(Signal::Error)?
    } else {
        interp.current_ns()
    };
    interp.enter_nested(|interp| crate::proc::invoke(interp, ns, name, params, body, &args[1..]))
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
    fn if_chooses_matching_branch() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "if {0} {set r a} elseif {1} {set r b} else {set r c}; set r").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "b");
    }

    #[test]
    fn while_loop_breaks_on_condition() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "set i 0; while {$i < 5} {incr i}; set i").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "5");
    }

    #[test]
    fn foreach_binds_multiple_variables_per_iteration() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "set acc {}; foreach {a b} {1 2 3 4} {append acc $a$b}; set acc").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1234");
    }

    #[test]
    fn catch_captures_error_and_sets_result_var() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "catch {error boom} msg; set msg").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "boom");
    }

    #[test]
    fn switch_falls_through_dash_bodies() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "switch b {a - b {set r hit} default {set r miss}}; set r").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "hit");
    }

    #[test]
    fn tailcall_propagates_target_result() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "proc inner {} {return ok}; proc outer {} {tailcall inner}; outer").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "ok");
    }

    #[test]
    fn catch_options_dict_carries_errorstack_through_unwinding_procs() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(
            &mut interp,
            "proc foo {} {bar}; proc bar {} {error oops}; catch foo _ o; dict get $o -errorstack",
        )
        .unwrap();
        assert_eq!(text(&interp, v).unwrap(), "INNER {error oops} CALL bar CALL foo");
    }

    #[test]
    fn catch_synthesizes_errorinfo_for_non_error_command_failures() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        run(&mut interp, "catch { set x(1) 2; set x 1 } msg opts").unwrap();
        let info = text(&interp, run(&mut interp, "dict get $opts -errorinfo").unwrap()).unwrap();
        let msg = text(&interp, run(&mut interp, "set msg").unwrap()).unwrap();
        assert!(!info.is_empty());
        assert!(info.contains(&msg));
    }
}
