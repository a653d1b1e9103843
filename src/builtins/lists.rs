//! List built-ins (spec.md §4.J): construction/access (`list`, `llength`,
//! `lindex`, `lrange`), mutation-by-value (`linsert`, `lreplace`), ordering
//! (`lsort`, `lreverse`), search (`lsearch`), and the small combinators
//! (`lrepeat`, `lassign`, `lmap`, `join`, `concat`, `split`).
//!
//! `lappend` lives in [`super::vars`] instead, alongside the other
//! var-mutating commands (`set`, `append`) it shares its read-modify-write
//! shape with.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::{BuiltinFn, Interp};

use super::{arity, list_items, new_list, new_str, text};

pub fn register<H: HostOps>(map: &mut HashMap<&'static str, BuiltinFn<H>>) {
    map.insert("list", cmd_list);
    map.insert("llength", cmd_llength);
    map.insert("lindex", cmd_lindex);
    map.insert("lrange", cmd_lrange);
    map.insert("linsert", cmd_linsert);
    map.insert("lreplace", cmd_lreplace);
    map.insert("lsort", cmd_lsort);
    map.insert("lsearch", cmd_lsearch);
    map.insert("lreverse", cmd_lreverse);
    map.insert("lrepeat", cmd_lrepeat);
    map.insert("lassign", cmd_lassign);
    map.insert("lmap", cmd_lmap);
    map.insert("join", cmd_join);
    map.insert("concat", cmd_concat);
    map.insert("split", cmd_split);
}

/// Normalizes a Tcl `end`/`end-N` index relative to a list of length `len`,
/// clamping to `[0, len]` the way `lrange`/`lindex` tolerate out-of-range
/// bounds rather than erroring (spec.md §8).
fn resolve_index(spec: &str, len: usize) -> i64 {
    if let Some(rest) = spec.strip_prefix("end") {
        let base = len as i64 - 1;
        if rest.is_empty() {
            return base;
        }
        if let Some(n) = rest.strip_prefix('-').and_then(|d| d.parse::<i64>().ok()) {
            return base - n;
        }
        if let Some(n) = rest.strip_prefix('+').and_then(|d| d.parse::<i64>().ok()) {
            return base + n;
        }
    }
    crate::value::parse_integer(spec).unwrap_or(-1)
}

fn cmd_list<H: HostOps>(interp: &mut Interp<H>, _name: &str, args: &[ValueHandle]) -> CmdResult {
    new_list(interp, args)
}

fn cmd_llength<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 1, "list")?;
    let items = list_items(interp, args[0])?;
    super::new_int(interp, items.len() as i64)
}

/// `lindex list ?index ...?`: each successive index descends into a nested
/// list, per Tcl's `lindex` chaining.
fn cmd_lindex<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} list ?index ...?"))));
    }
    let indices: Vec<ValueHandle> = if args.len() == 2 {
        match list_items(interp, args[1]) {
            Ok(items) if items.len() > 1 => items,
            _ => vec![args[1]],
        }
    } else {
        args[1..].to_vec()
    };
    let mut cur = args[0];
    for idx in indices {
        let items = list_items(interp, cur)?;
        let spec = text(interp, idx)?;
        let i = resolve_index(&spec, items.len());
        cur = match usize::try_from(i).ok().and_then(|i| items.get(i)).copied() {
            Some(v) => v,
            None => return interp.empty_value(Arena::Scratch).map_err(Signal::Error),
        };
    }
    Ok(cur)
}

/// `lrange list first last`
fn cmd_lrange<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 3, 3, "list first last")?;
    let items = list_items(interp, args[0])?;
    let first = resolve_index(&text(interp, args[1])?, items.len()).max(0) as usize;
    let last = resolve_index(&text(interp, args[2])?, items.len());
    if last < first as i64 || first >= items.len() {
        return new_list(interp, &[]);
    }
    let last = (last as usize).min(items.len() - 1);
    new_list(interp, &items[first..=last])
}

/// `linsert list index element ?element ...?`
fn cmd_linsert<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.len() < 2 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} list index ?element ...?"))));
    }
    let mut items = list_items(interp, args[0])?;
    let at = resolve_index(&text(interp, args[1])?, items.len()).clamp(0, items.len() as i64) as usize;
    for (offset, &v) in args[2..].iter().enumerate() {
        items.insert(at + offset, v);
    }
    new_list(interp, &items)
}

/// `lreplace list first last ?element ...?`
fn cmd_lreplace<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.len() < 3 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} list first last ?element ...?"))));
    }
    let mut items = list_items(interp, args[0])?;
    let first = resolve_index(&text(interp, args[1])?, items.len()).max(0) as usize;
    let last = resolve_index(&text(interp, args[2])?, items.len());
    let last = if last < 0 { first.saturating_sub(1) } else { (last as usize).min(items.len().saturating_sub(1)) };
    if first > items.len() {
        return Err(Signal::Error(CoreError::new(ErrorKind::Value, "list doesn't contain element")));
    }
    let end = (last + 1).max(first).min(items.len());
    let replacement = args[3..].to_vec();
    items.splice(first.min(items.len())..end, replacement);
    new_list(interp, &items)
}

enum SortKey {
    Integer,
    Real,
    Dictionary,
    Ascii,
}

/// `lsort ?-integer|-real|-dictionary|-ascii? ?-decreasing? ?-unique? ?-index N? list`
fn cmd_lsort<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut key = SortKey::Ascii;
    let mut decreasing = false;
    let mut unique = false;
    let mut index: Option<usize> = None;
    let mut i = 0;
    while i < args.len() {
        let a = text(interp, args[i])?;
        match a.as_str() {
            "-integer" => key = SortKey::Integer,
            "-real" => key = SortKey::Real,
            "-dictionary" => key = SortKey::Dictionary,
            "-ascii" => key = SortKey::Ascii,
            "-decreasing" => decreasing = true,
            "-increasing" => decreasing = false,
            "-unique" => unique = true,
            "-index" => {
                i += 1;
                if i >= args.len() {
                    return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?options? list"))));
                }
                index = crate::value::parse_integer(&text(interp, args[i])?).map(|n| n as usize);
            }
            _ => break,
        }
        i += 1;
    }
    if i + 1 != args.len() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?options? list"))));
    }
    let mut items = list_items(interp, args[i])?;

    let sort_key_of = |interp: &mut Interp<H>, v: ValueHandle| -> Result<ValueHandle, Signal> {
        match index {
            Some(n) => {
                let nested = list_items(interp, v)?;
                Ok(nested.get(n).copied().unwrap_or(v))
            }
            None => Ok(v),
        }
    };

    let mut keyed: Vec<(String, ValueHandle)> = Vec::with_capacity(items.len());
    for &v in &items {
        let k = sort_key_of(interp, v)?;
        keyed.push((text(interp, k)?, v));
    }
    items.clear();

    let mut err: Option<CoreError> = None;
    keyed.sort_by(|(a, _), (b, _)| {
        if err.is_some() {
            return Ordering::Equal;
        }
        let ord = match key {
            SortKey::Integer => match (crate::value::parse_integer(a), crate::value::parse_integer(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    err = Some(CoreError::expected_integer(if crate::value::parse_integer(a).is_none() { a } else { b }));
                    Ordering::Equal
                }
            },
            SortKey::Real => match (crate::value::parse_double(a), crate::value::parse_double(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => {
                    err = Some(CoreError::expected_double(if crate::value::parse_double(a).is_none() { a } else { b }));
                    Ordering::Equal
                }
            },
            SortKey::Dictionary => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()).then_with(|| a.cmp(b)),
            SortKey::Ascii => a.cmp(b),
        };
        if decreasing { ord.reverse() } else { ord }
    });
    if let Some(e) = err {
        return Err(Signal::Error(e));
    }

    let mut out: Vec<ValueHandle> = Vec::with_capacity(keyed.len());
    let mut seen: Vec<String> = Vec::new();
    for (k, v) in keyed {
        if unique {
            if seen.iter().any(|s| s == &k) {
                continue;
            }
            seen.push(k);
        }
        out.push(v);
    }
    new_list(interp, &out)
}

enum SearchMode {
    Exact,
    Glob,
    Regexp,
}

/// `lsearch ?-exact|-glob|-regexp? ?-all? ?-inline? ?-not? ?-start index? list pattern`
fn cmd_lsearch<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut mode = SearchMode::Glob;
    let mut all = false;
    let mut inline = false;
    let mut negate = false;
    let mut start = 0usize;
    let mut i = 0;
    while i < args.len() {
        let a = text(interp, args[i])?;
        match a.as_str() {
            "-exact" => mode = SearchMode::Exact,
            "-glob" => mode = SearchMode::Glob,
            "-regexp" => mode = SearchMode::Regexp,
            "-all" => all = true,
            "-inline" => inline = true,
            "-not" => negate = true,
            "-start" => {
                i += 1;
                if i >= args.len() {
                    return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?options? list pattern"))));
                }
                start = crate::value::parse_integer(&text(interp, args[i])?).unwrap_or(0).max(0) as usize;
            }
            "--" => {
                i += 1;
                break;
            }
            _ => break,
        }
        i += 1;
    }
    if i + 2 != args.len() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?options? list pattern"))));
    }
    let items = list_items(interp, args[i])?;
    let pattern = text(interp, args[i + 1])?;
    let re = if matches!(mode, SearchMode::Regexp) { fancy_regex::Regex::new(&pattern).ok() } else { None };

    let mut hits = Vec::new();
    for (idx, &item) in items.iter().enumerate().skip(start) {
        let s = text(interp, item)?;
        let hit = match mode {
            SearchMode::Exact => s == pattern,
            SearchMode::Glob => interp.host.string_match_glob(pattern.as_bytes(), s.as_bytes(), false),
            SearchMode::Regexp => re.as_ref().and_then(|re| re.is_match(&s).ok()).unwrap_or(false),
        };
        if hit != negate {
            hits.push((idx, item));
            if !all {
                break;
            }
        }
    }
    if inline {
        new_list(interp, &hits.iter().map(|(_, v)| *v).collect::<Vec<_>>())
    } else if all {
        let nums: Vec<ValueHandle> = hits.iter().map(|(i, _)| super::new_int(interp, *i as i64)).collect::<Result<_, _>>()?;
        new_list(interp, &nums)
    } else {
        super::new_int(interp, hits.first().map_or(-1, |(i, _)| *i as i64))
    }
}

fn cmd_lreverse<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 1, "list")?;
    let mut items = list_items(interp, args[0])?;
    items.reverse();
    new_list(interp, &items)
}

/// `lrepeat count element ?element ...?`
fn cmd_lrepeat<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.len() < 2 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} count element ?element ...?"))));
    }
    let count = crate::value::try_as_integer(&mut interp.host, args[0]).map_err(Signal::Error)?;
    if count < 0 {
        return Err(Signal::Error(CoreError::new(ErrorKind::Value, "bad count")));
    }
    let mut out = Vec::with_capacity(args[1..].len() * count as usize);
    for _ in 0..count {
        out.extend_from_slice(&args[1..]);
    }
    new_list(interp, &out)
}

/// `lassign list ?varName ...?`
fn cmd_lassign<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} list ?varName ...?"))));
    }
    let items = list_items(interp, args[0])?;
    let names: Vec<String> = args[1..].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
    for (i, n) in names.iter().enumerate() {
        let value = match items.get(i).copied() {
            Some(v) => v,
            None => interp.empty_value(Arena::Scratch).map_err(Signal::Error)?,
        };
        interp.var_write(n, None, value).map_err(Signal::Error)?;
    }
    let leftover = items.get(names.len()..).unwrap_or(&[]);
    new_list(interp, leftover)
}

/// `lmap varList list ?varList list ...? body`, modeled on `foreach`: binds
/// the same round-robin variable groups but collects each body's result
/// instead of discarding it.
fn cmd_lmap<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
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
    let mut out = Vec::new();
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
        let bytes = text(interp, body)?.into_bytes();
        match interp.enter_nested(|interp| crate::eval::eval_script(interp, &bytes)) {
            Ok(v) => out.push(v),
            Err(Signal::Break) => break,
            Err(Signal::Continue) => {}
            Err(other) => return Err(other),
        }
    }
    new_list(interp, &out)
}

/// `join list ?joinString?`
fn cmd_join<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 2, "list ?joinString?")?;
    let items = list_items(interp, args[0])?;
    let sep = if args.len() == 2 { text(interp, args[1])? } else { " ".to_string() };
    let parts: Vec<String> = items.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
    new_str(interp, &parts.join(&sep))
}

/// `concat ?arg ...?`
fn cmd_concat<H: HostOps>(interp: &mut Interp<H>, _name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut out = Vec::new();
    for &v in args {
        out.extend(list_items(interp, v)?);
    }
    new_list(interp, &out)
}

/// `split string ?splitChars?`: default split set is whitespace, each
/// character in `splitChars` is an independent delimiter, matching Tcl's
/// `split` (not a substring delimiter).
fn cmd_split<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    arity(name, args, 1, 2, "string ?splitChars?")?;
    let s = text(interp, args[0])?;
    let parts: Vec<&str> = if args.len() == 2 {
        let chars = text(interp, args[1])?;
        if chars.is_empty() { s.split("").filter(|p| !p.is_empty()).collect() } else { s.split(|c| chars.contains(c)).collect() }
    } else {
        s.split(|c: char| c.is_whitespace()).collect()
    };
    let handles: Vec<ValueHandle> = parts.iter().map(|p| interp.new_string(p, Arena::Scratch)).collect::<Result<_, _>>().map_err(Signal::Error)?;
    new_list(interp, &handles)
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
    fn lindex_chains_through_nested_lists() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lindex {{a b} {c d}} 1 0").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "c");
    }

    #[test]
    fn lsort_integer_orders_numerically() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lsort -integer {10 2 30 1}").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1 2 10 30");
    }

    #[test]
    fn lsort_unique_drops_duplicates() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lsort -unique {1 1 2 3 3}").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1 2 3");
    }

    #[test]
    fn lsearch_all_inline_returns_matching_values() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lsearch -all -inline {a ab abc b} a*").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "a ab abc");
    }

    #[test]
    fn lassign_binds_and_returns_remainder() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lassign {1 2 3 4} a b; list $a $b [lassign {1 2 3 4} a b]").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "1 2 {3 4}");
    }

    #[test]
    fn lmap_collects_body_results() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "lmap x {1 2 3} {expr {$x * 2}}").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "2 4 6");
    }

    #[test]
    fn join_and_split_round_trip_on_comma() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "join [split a,b,c ,] -").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "a-b-c");
    }
}
