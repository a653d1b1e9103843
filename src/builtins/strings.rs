//! String, formatting, and expression built-ins (spec.md §4.J): the `string`
//! subcommand family, `format`, `scan`, `regexp`/`regsub` (both on
//! `fancy_regex`, as `switch -regexp`/`lsearch -regexp` already are), `subst`,
//! and `expr` itself wired to [`crate::expr::eval_expr`].

use std::collections::HashMap;

use fancy_regex::Regex;

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, FormatSpecifier, HostOps, ValueHandle};
use crate::interp::{BuiltinFn, Interp};

use super::{arity, new_bool, new_int, new_str, text};

pub fn register<H: HostOps>(map: &mut HashMap<&'static str, BuiltinFn<H>>) {
    map.insert("string", cmd_string);
    map.insert("format", cmd_format);
    map.insert("scan", cmd_scan);
    map.insert("regexp", cmd_regexp);
    map.insert("regsub", cmd_regsub);
    map.insert("subst", cmd_subst);
    map.insert("expr", cmd_expr);
}

fn cmd_expr<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} arg ?arg ...?"))));
    }
    let parts: Vec<String> = args.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
    let src = parts.join(" ").into_bytes();
    interp.enter_nested(|interp| crate::expr::eval_expr(interp, &src))
}

/// `subst ?-nobackslashes? ?-nocommands? ?-novariables? string`
fn cmd_subst<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut no_backslashes = false;
    let mut no_commands = false;
    let mut no_variables = false;
    let mut i = 0;
    while i < args.len() {
        match text(interp, args[i])?.as_str() {
            "-nobackslashes" => no_backslashes = true,
            "-nocommands" => no_commands = true,
            "-novariables" => no_variables = true,
            "--" => {
                i += 1;
                break;
            }
            _ => break,
        }
        i += 1;
    }
    arity(name, &args[i..], 1, 1, "?-nobackslashes? ?-nocommands? ?-novariables? string")?;
    let src = text(interp, args[i])?.into_bytes();
    interp.subst_bytes(&src, no_commands, no_variables, no_backslashes)
}

fn resolve_char_index(spec: &str, len: usize) -> i64 {
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

/// `string subcommand ?arg ...?`
fn cmd_string<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} subcommand ?arg ...?"))));
    }
    let sub = text(interp, args[0])?;
    let rest = &args[1..];
    match sub.as_str() {
        "length" => {
            arity(&sub, rest, 1, 1, "string")?;
            let n = interp.host.string_rune_len(rest[0]).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
            new_int(interp, n as i64)
        }
        "index" => {
            arity(&sub, rest, 2, 2, "string charIndex")?;
            let chars: Vec<char> = text(interp, rest[0])?.chars().collect();
            let i = resolve_char_index(&text(interp, rest[1])?, chars.len());
            match usize::try_from(i).ok().and_then(|i| chars.get(i)) {
                Some(c) => new_str(interp, &c.to_string()),
                None => interp.empty_value(Arena::Scratch).map_err(Signal::Error),
            }
        }
        "range" => {
            arity(&sub, rest, 3, 3, "string first last")?;
            let chars: Vec<char> = text(interp, rest[0])?.chars().collect();
            let first = resolve_char_index(&text(interp, rest[1])?, chars.len()).max(0) as usize;
            let last = resolve_char_index(&text(interp, rest[2])?, chars.len());
            if last < first as i64 || first >= chars.len() {
                return new_str(interp, "");
            }
            let last = (last as usize).min(chars.len() - 1);
            new_str(interp, &chars[first..=last].iter().collect::<String>())
        }
        "toupper" => {
            arity(&sub, rest, 1, 1, "string")?;
            new_str(interp, &text(interp, rest[0])?.to_uppercase())
        }
        "tolower" => {
            arity(&sub, rest, 1, 1, "string")?;
            new_str(interp, &text(interp, rest[0])?.to_lowercase())
        }
        "totitle" => {
            arity(&sub, rest, 1, 1, "string")?;
            let s = text(interp, rest[0])?;
            let mut chars = s.chars();
            let out = match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            };
            new_str(interp, &out)
        }
        "trim" => trim(interp, &sub, rest, true, true),
        "trimleft" => trim(interp, &sub, rest, true, false),
        "trimright" => trim(interp, &sub, rest, false, true),
        "match" => {
            let mut nocase = false;
            let mut i = 0;
            if i < rest.len() && text(interp, rest[i])? == "-nocase" {
                nocase = true;
                i += 1;
            }
            arity(&sub, &rest[i..], 2, 2, "?-nocase? pattern string")?;
            let pattern = text(interp, rest[i])?;
            let subject = text(interp, rest[i + 1])?;
            new_bool(interp, interp.host.string_match_glob(pattern.as_bytes(), subject.as_bytes(), nocase))
        }
        "equal" => {
            let mut nocase = false;
            let mut i = 0;
            if i < rest.len() && text(interp, rest[i])? == "-nocase" {
                nocase = true;
                i += 1;
            }
            arity(&sub, &rest[i..], 2, 2, "?-nocase? string1 string2")?;
            let (a, b) = (text(interp, rest[i])?, text(interp, rest[i + 1])?);
            new_bool(interp, if nocase { a.eq_ignore_ascii_case(&b) } else { a == b })
        }
        "compare" => {
            let mut nocase = false;
            let mut i = 0;
            if i < rest.len() && text(interp, rest[i])? == "-nocase" {
                nocase = true;
                i += 1;
            }
            arity(&sub, &rest[i..], 2, 2, "?-nocase? string1 string2")?;
            let (mut a, mut b) = (text(interp, rest[i])?, text(interp, rest[i + 1])?);
            if nocase {
                a = a.to_lowercase();
                b = b.to_lowercase();
            }
            new_int(interp, i64::from(a.cmp(&b) as i8))
        }
        "first" => {
            arity(&sub, rest, 2, 3, "needle haystack ?startIndex?")?;
            let needle = text(interp, rest[0])?;
            let haystack: Vec<char> = text(interp, rest[1])?.chars().collect();
            let start = if rest.len() == 3 { resolve_char_index(&text(interp, rest[2])?, haystack.len()).max(0) as usize } else { 0 };
            let needle_chars: Vec<char> = needle.chars().collect();
            let found = (start..=haystack.len().saturating_sub(needle_chars.len().max(1)))
                .find(|&i| !needle_chars.is_empty() && haystack[i..].starts_with(needle_chars.as_slice()));
            new_int(interp, found.map_or(-1, |i| i as i64))
        }
        "last" => {
            arity(&sub, rest, 2, 3, "needle haystack ?lastIndex?")?;
            let needle = text(interp, rest[0])?;
            let haystack: Vec<char> = text(interp, rest[1])?.chars().collect();
            let needle_chars: Vec<char> = needle.chars().collect();
            let limit = if rest.len() == 3 { resolve_char_index(&text(interp, rest[2])?, haystack.len()) } else { haystack.len() as i64 - 1 };
            let found = (0..=haystack.len().saturating_sub(needle_chars.len().max(1)))
                .rev()
                .find(|&i| i as i64 <= limit && !needle_chars.is_empty() && haystack[i..].starts_with(needle_chars.as_slice()));
            new_int(interp, found.map_or(-1, |i| i as i64))
        }
        "reverse" => {
            arity(&sub, rest, 1, 1, "string")?;
            new_str(interp, &text(interp, rest[0])?.chars().rev().collect::<String>())
        }
        "repeat" => {
            arity(&sub, rest, 2, 2, "string count")?;
            let s = text(interp, rest[0])?;
            let n = crate::value::try_as_integer(&mut interp.host, rest[1]).map_err(Signal::Error)?.max(0);
            new_str(interp, &s.repeat(n as usize))
        }
        "replace" => {
            arity(&sub, rest, 3, 4, "string first last ?newstring?")?;
            let chars: Vec<char> = text(interp, rest[0])?.chars().collect();
            let first = resolve_char_index(&text(interp, rest[1])?, chars.len()).max(0) as usize;
            let last = resolve_char_index(&text(interp, rest[2])?, chars.len());
            let replacement = if rest.len() == 4 { text(interp, rest[3])? } else { String::new() };
            if last < first as i64 || first >= chars.len() {
                return new_str(interp, &chars.iter().collect::<String>());
            }
            let last = (last as usize).min(chars.len() - 1);
            let mut out: String = chars[..first].iter().collect();
            out.push_str(&replacement);
            out.extend(chars[last + 1..].iter());
            new_str(interp, &out)
        }
        "map" => {
            let mut nocase = false;
            let mut i = 0;
            if i < rest.len() && text(interp, rest[i])? == "-nocase" {
                nocase = true;
                i += 1;
            }
            arity(&sub, &rest[i..], 2, 2, "?-nocase? charMap string")?;
            let pairs = super::list_items(interp, rest[i])?;
            let mut subject = text(interp, rest[i + 1])?;
            for chunk in pairs.chunks(2) {
                if chunk.len() < 2 {
                    break;
                }
                let from = text(interp, chunk[0])?;
                let to = text(interp, chunk[1])?;
                subject = if nocase {
                    replace_case_insensitive(&subject, &from, &to)
                } else {
                    subject.replace(&from, &to)
                };
            }
            new_str(interp, &subject)
        }
        "cat" => {
            let parts: Vec<String> = rest.iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;
            new_str(interp, &parts.concat())
        }
        "is" => {
            arity(&sub, rest, 2, 2, "class string")?;
            let class = text(interp, rest[0])?;
            let s = text(interp, rest[1])?;
            let ok = match class.as_str() {
                "alpha" => !s.is_empty() && s.chars().all(char::is_alphabetic),
                "digit" => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
                "alnum" => !s.is_empty() && s.chars().all(char::is_alphanumeric),
                "space" => s.chars().all(char::is_whitespace),
                "upper" => !s.is_empty() && s.chars().all(char::is_uppercase),
                "lower" => !s.is_empty() && s.chars().all(char::is_lowercase),
                "ascii" => s.is_ascii(),
                "integer" => crate::value::parse_integer(&s).is_some(),
                "double" => crate::value::parse_double(&s).is_some(),
                "boolean" => crate::value::parse_bool(&s).is_some() || s.is_empty(),
                "list" => true,
                other => return Err(Signal::Error(CoreError::new(ErrorKind::Name, format!("unknown class \"{other}\"")))),
            };
            new_bool(interp, ok)
        }
        other => Err(Signal::Error(CoreError::new(ErrorKind::Name, format!("unknown subcommand \"{other}\": must be one of length, index, range, toupper, tolower, totitle, trim, trimleft, trimright, match, equal, compare, first, last, reverse, repeat, replace, map, cat, is")))),
    }
}

fn replace_case_insensitive(subject: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return subject.to_string();
    }
    let lower_subject = subject.to_lowercase();
    let lower_from = from.to_lowercase();
    let mut out = String::new();
    let mut rest = subject;
    let mut rest_lower = lower_subject.as_str();
    while let Some(pos) = rest_lower.find(&lower_from) {
        out.push_str(&rest[..pos]);
        out.push_str(to);
        rest = &rest[pos + from.len()..];
        rest_lower = &rest_lower[pos + from.len()..];
    }
    out.push_str(rest);
    out
}

fn trim<H: HostOps>(interp: &mut Interp<H>, sub: &str, rest: &[ValueHandle], left: bool, right: bool) -> CmdResult {
    arity(sub, rest, 1, 2, "string ?chars?")?;
    let s = text(interp, rest[0])?;
    let chars = if rest.len() == 2 { text(interp, rest[1])? } else { " \t\n\r".to_string() };
    let is_trim = |c: char| chars.contains(c);
    let mut slice = s.as_str();
    if left {
        slice = slice.trim_start_matches(is_trim);
    }
    if right {
        slice = slice.trim_end_matches(is_trim);
    }
    new_str(interp, slice)
}

enum Spec {
    Literal(char),
    Conv { flags: Flags, width: Option<usize>, precision: Option<usize>, conv: char },
}

#[derive(Default, Clone, Copy)]
struct Flags {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
}

fn parse_format(fmt: &str) -> Vec<Spec> {
    let mut out = Vec::new();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(Spec::Literal(c));
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push(Spec::Literal('%'));
            continue;
        }
        let mut flags = Flags::default();
        loop {
            match chars.peek() {
                Some('-') => { flags.left = true; chars.next(); }
                Some('0') => { flags.zero = true; chars.next(); }
                Some('+') => { flags.plus = true; chars.next(); }
                Some(' ') => { flags.space = true; chars.next(); }
                _ => break,
            }
        }
        let mut width_str = String::new();
        while chars.peek().is_some_and(char::is_ascii_digit) {
            width_str.push(chars.next().expect("peeked"));
        }
        let width = width_str.parse().ok();
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut prec_str = String::new();
            while chars.peek().is_some_and(char::is_ascii_digit) {
                prec_str.push(chars.next().expect("peeked"));
            }
            precision = Some(prec_str.parse().unwrap_or(0));
        }
        let conv = chars.next().unwrap_or('%');
        out.push(Spec::Conv { flags, width, precision, conv });
    }
    out
}

fn pad(s: String, width: Option<usize>, left: bool, zero: bool) -> String {
    let w = width.unwrap_or(0);
    if s.chars().count() >= w {
        return s;
    }
    let fill = if zero && !left { '0' } else { ' ' };
    let padding: String = std::iter::repeat_n(fill, w - s.chars().count()).collect();
    if left { s + &padding } else if zero && (s.starts_with('-') || s.starts_with('+')) {
        let (sign, rest) = s.split_at(1);
        format!("{sign}{padding}{rest}")
    } else {
        padding + &s
    }
}

/// `format formatString ?arg ...?`: supports `%d %i %u %x %X %o %b %e %f %g
/// %s %c %%` with `-`/`0`/`+`/` ` flags, width, and precision. Positional
/// (`%n$`) arguments are not supported.
fn cmd_format<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.is_empty() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} formatString ?arg ...?"))));
    }
    let fmt = text(interp, args[0])?;
    let specs = parse_format(&fmt);
    let mut arg_i = 1;
    let mut out = String::new();
    for spec in specs {
        match spec {
            Spec::Literal(c) => out.push(c),
            Spec::Conv { flags, width, precision, conv } => {
                if conv == '%' {
                    out.push('%');
                    continue;
                }
                if arg_i >= args.len() {
                    return Err(Signal::Error(CoreError::new(ErrorKind::Arity, "not enough arguments for all format specifiers")));
                }
                let arg = args[arg_i];
                arg_i += 1;
                let rendered = match conv {
                    'd' | 'i' => {
                        let n = crate::value::try_as_integer(&mut interp.host, arg).map_err(Signal::Error)?;
                        let mut s = n.unsigned_abs().to_string();
                        if let Some(p) = precision {
                            s = format!("{s:0>p$}");
                        }
                        if n < 0 { format!("-{s}") } else if flags.plus { format!("+{s}") } else if flags.space { format!(" {s}") } else { s }
                    }
                    'u' => (crate::value::try_as_integer(&mut interp.host, arg).map_err(Signal::Error)? as u64).to_string(),
                    'x' => format!("{:x}", crate::value::try_as_integer(&mut interp.host, arg).map_err(Signal::Error)?),
                    'X' => format!("{:X}", crate::value::try_as_integer(&mut interp.host, arg).map_err(Signal::Error)?),
                    'o' => format!("{:o}", crate::value::try_as_integer(&mut interp.host, arg).map_err(Signal::Error)?),
                    'b' => format!("{:b}", crate::value::try_as_integer(&mut interp.host, arg).map_err(Signal::Error)?),
                    'c' => {
                        let n = crate::value::try_as_integer(&mut interp.host, arg).map_err(Signal::Error)?;
                        char::from_u32(n as u32).map(|c| c.to_string()).unwrap_or_default()
                    }
                    's' => {
                        let s = text(interp, arg)?;
                        match precision {
                            Some(p) => s.chars().take(p).collect(),
                            None => s,
                        }
                    }
                    'e' | 'f' | 'g' => {
                        let d = crate::value::try_as_double(&mut interp.host, arg).map_err(Signal::Error)?;
                        let spec = match conv {
                            'e' => FormatSpecifier::Exp,
                            'f' => FormatSpecifier::Fixed,
                            _ => FormatSpecifier::General,
                        };
                        let s = interp.host.double_format(d, spec, precision);
                        if d >= 0.0 && flags.plus { format!("+{s}") } else { s }
                    }
                    other => return Err(Signal::Error(CoreError::new(ErrorKind::Value, format!("bad field specifier \"{other}\"")))),
                };
                out.push_str(&pad(rendered, width, flags.left, flags.zero));
            }
        }
    }
    new_str(interp, &out)
}

/// `scan string formatString ?varName ...?`: supports `%d %s %f %c` with an
/// optional width, matching whitespace-delimited fields left to right.
fn cmd_scan<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    if args.len() < 2 {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} string formatString ?varName ...?"))));
    }
    let input = text(interp, args[0])?;
    let fmt = text(interp, args[1])?;
    let var_names: Vec<String> = args[2..].iter().map(|&v| text(interp, v)).collect::<Result<_, _>>()?;

    let mut chars = input.chars().peekable();
    let mut fmt_chars = fmt.chars().peekable();
    let mut results = Vec::new();
    let mut matched = 0;

    while let Some(&fc) = fmt_chars.peek() {
        if fc == '%' {
            fmt_chars.next();
            let mut width = String::new();
            while fmt_chars.peek().is_some_and(char::is_ascii_digit) {
                width.push(fmt_chars.next().expect("peeked"));
            }
            let max = width.parse::<usize>().ok();
            let conv = fmt_chars.next().unwrap_or('s');
            while chars.peek().is_some_and(|c: &char| c.is_whitespace()) && conv != 'c' {
                chars.next();
            }
            match conv {
                'd' => {
                    let mut tok = String::new();
                    if chars.peek() == Some(&'-') {
                        tok.push(chars.next().expect("peeked"));
                    }
                    while chars.peek().is_some_and(char::is_ascii_digit) && max.is_none_or(|m| tok.len() < m) {
                        tok.push(chars.next().expect("peeked"));
                    }
                    match crate::value::parse_integer(&tok) {
                        Some(n) => {
                            results.push(super::new_int(interp, n)?);
                            matched += 1;
                        }
                        None => break,
                    }
                }
                'f' => {
                    let mut tok = String::new();
                    while chars.peek().is_some_and(|c: &char| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+') {
                        tok.push(chars.next().expect("peeked"));
                    }
                    match crate::value::parse_double(&tok) {
                        Some(d) => {
                            results.push(new_str(interp, &d.to_string())?);
                            matched += 1;
                        }
                        None => break,
                    }
                }
                's' => {
                    let mut tok = String::new();
                    while chars.peek().is_some_and(|c: &char| !c.is_whitespace()) && max.is_none_or(|m| tok.chars().count() < m) {
                        tok.push(chars.next().expect("peeked"));
                    }
                    results.push(new_str(interp, &tok)?);
                    matched += 1;
                }
                'c' => match chars.next() {
                    Some(c) => {
                        results.push(super::new_int(interp, c as i64)?);
                        matched += 1;
                    }
                    None => break,
                },
                '%' => {
                    if chars.peek() != Some(&'%') {
                        break;
                    }
                    chars.next();
                }
                _ => break,
            }
        } else if fc.is_whitespace() {
            fmt_chars.next();
            while chars.peek().is_some_and(|c: &char| c.is_whitespace()) {
                chars.next();
            }
        } else {
            fmt_chars.next();
            if chars.peek() == Some(&fc) {
                chars.next();
            } else {
                break;
            }
        }
    }

    if var_names.is_empty() {
        return super::new_list(interp, &results);
    }
    for (name, value) in var_names.iter().zip(results.iter()) {
        interp.var_write(name, None, *value).map_err(Signal::Error)?;
    }
    super::new_int(interp, matched)
}

/// `regexp ?-nocase? ?-all? ?-inline? ?-line? ?--? exp string ?matchVar
/// subMatchVar ...?`
fn cmd_regexp<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut nocase = false;
    let mut all = false;
    let mut inline = false;
    let mut i = 0;
    while i < args.len() {
        match text(interp, args[i])?.as_str() {
            "-nocase" => nocase = true,
            "-all" => all = true,
            "-inline" => inline = true,
            "-line" => {}
            "--" => {
                i += 1;
                break;
            }
            _ => break,
        }
        i += 1;
    }
    if i + 1 >= args.len() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?switches? exp string ?matchVar ...?"))));
    }
    let pattern_src = text(interp, args[i])?;
    let pattern = if nocase { format!("(?i){pattern_src}") } else { pattern_src };
    let subject = text(interp, args[i + 1])?;
    let var_names = &args[i + 2..];
    let re = Regex::new(&pattern).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Value, format!("couldn't compile regular expression pattern: {e}"))))?;

    if all {
        let mut count = 0;
        let mut inline_out = Vec::new();
        for caps in re.captures_iter(&subject).flatten() {
            count += 1;
            if inline {
                if var_names.is_empty() {
                    let m = caps.get(0).expect("capture 0 is always the whole match");
                    inline_out.push(new_str(interp, m.as_str())?);
                } else {
                    for g in 0..caps.len() {
                        inline_out.push(new_str(interp, caps.get(g).map_or("", |m| m.as_str()))?);
                    }
                }
            }
        }
        return if inline { super::new_list(interp, &inline_out) } else { super::new_int(interp, count) };
    }

    let caps = re.captures(&subject).ok().flatten();
    if inline {
        let items = match &caps {
            Some(c) => (0..c.len()).map(|g| c.get(g).map_or("", |m| m.as_str())).map(|s| new_str(interp, s)).collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        return super::new_list(interp, &items);
    }
    match &caps {
        Some(c) => {
            for (g, &var) in var_names.iter().enumerate() {
                let s = c.get(g).map_or("", |m| m.as_str());
                let v = new_str(interp, s)?;
                interp.var_write(&text(interp, var)?, None, v).map_err(Signal::Error)?;
            }
            new_bool(interp, true)
        }
        None => new_bool(interp, false),
    }
}

/// `regsub ?-all? ?-nocase? ?--? exp string subSpec ?varName?`: `subSpec` may
/// use `&`/`\0` for the whole match and `\N` for capture group N.
fn cmd_regsub<H: HostOps>(interp: &mut Interp<H>, name: &str, args: &[ValueHandle]) -> CmdResult {
    let mut all = false;
    let mut nocase = false;
    let mut i = 0;
    while i < args.len() {
        match text(interp, args[i])?.as_str() {
            "-all" => all = true,
            "-nocase" => nocase = true,
            "-line" => {}
            "--" => {
                i += 1;
                break;
            }
            _ => break,
        }
        i += 1;
    }
    if i + 2 >= args.len() {
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{name} ?switches? exp string subSpec ?varName?"))));
    }
    let pattern_src = text(interp, args[i])?;
    let pattern = if nocase { format!("(?i){pattern_src}") } else { pattern_src };
    let subject = text(interp, args[i + 1])?;
    let sub_spec = text(interp, args[i + 2])?;
    let var_name = args.get(i + 3).map(|&v| text(interp, v)).transpose()?;
    let re = Regex::new(&pattern).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Value, format!("couldn't compile regular expression pattern: {e}"))))?;

    let mut out = String::new();
    let mut pos = 0;
    let mut count = 0;
    for caps in re.captures_iter(&subject).flatten() {
        let m = caps.get(0).expect("capture 0 is always the whole match");
        if m.start() < pos {
            continue;
        }
        out.push_str(&subject[pos..m.start()]);
        out.push_str(&expand_sub_spec(&sub_spec, m.as_str(), Some(&caps)));
        count += 1;
        pos = m.end();
        if !all {
            break;
        }
    }
    out.push_str(subject.get(pos..).unwrap_or(""));

    if let Some(v) = var_name {
        let value = new_str(interp, &out)?;
        interp.var_write(&v, None, value).map_err(Signal::Error)?;
        super::new_int(interp, count)
    } else {
        new_str(interp, &out)
    }
}

fn expand_sub_spec(spec: &str, whole: &str, caps: Option<&fancy_regex::Captures>) -> String {
    let mut out = String::new();
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' {
            out.push_str(whole);
        } else if c == '\\' {
            match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    let n = d.to_digit(10).expect("checked ascii digit") as usize;
                    chars.next();
                    if n == 0 {
                        out.push_str(whole);
                    } else if let Some(g) = caps.and_then(|c| c.get(n)) {
                        out.push_str(g.as_str());
                    }
                }
                Some(_) => out.push(chars.next().expect("peeked")),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
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
    fn string_range_clamps_to_bounds() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "string range hello 2 100").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "llo");
    }

    #[test]
    fn format_pads_and_zero_fills_integers() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "format {%05d} 42").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "00042");
    }

    #[test]
    fn format_substitutes_string_argument() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "set y world; format %s [set x $y]").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "world");
    }

    #[test]
    fn regexp_captures_into_match_vars() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "regexp {(\\w+)@(\\w+)} user@host -> user host; list $user $host").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "user host");
    }

    #[test]
    fn regsub_all_replaces_every_match() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "regsub -all {[aeiou]} hello *").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "h*ll*");
    }

    #[test]
    fn expr_is_wired_through_the_command_table() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let v = run(&mut interp, "expr {2 + 3 * 4}").unwrap();
        assert_eq!(text(&interp, v).unwrap(), "14");
    }
}
