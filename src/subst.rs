//! Substitutor (spec.md §4.D): turns a parsed [`Word`] into a value,
//! resolving variable segments through the namespace/frame manager and
//! re-entering the evaluator for command-substitution segments.
//!
//! Single-segment words preserve the segment's own value (and thus its
//! internal representation) rather than forcing a string rebuild; multi-
//! segment words are concatenated through a host string builder.

use crate::errors::CoreError;
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::Interp;
use crate::parser::{Segment, Word};

/// Substitutes one word (spec.md §4.D).
pub fn subst_word<H: HostOps>(interp: &mut Interp<H>, word: &Word) -> CmdResult {
    subst_segments(interp, &word.segments)
}

/// Substitutes a bare segment sequence, shared by word substitution and the
/// expression evaluator's `$var`/`[cmd]`/`"..."` operand handling.
pub fn subst_segments<H: HostOps>(interp: &mut Interp<H>, segments: &[Segment]) -> CmdResult {
    if segments.len() == 1 {
        return resolve_segment(interp, &segments[0]);
    }
    let builder = interp.host.string_builder_new();
    for seg in segments {
        let v = resolve_segment(interp, seg)?;
        interp.host.string_builder_append_value(builder, v).map_err(|e| Signal::Error(CoreError::new(crate::errors::ErrorKind::Type, e.message)))?;
    }
    interp.host.string_builder_finish(builder, Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(crate::errors::ErrorKind::Type, e.message)))
}

fn resolve_segment<H: HostOps>(interp: &mut Interp<H>, seg: &Segment) -> CmdResult {
    match seg {
        Segment::Literal { bytes, .. } => interp.host.value_from_bytes(bytes, Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(crate::errors::ErrorKind::Type, e.message))),
        Segment::Variable { name, index, .. } => {
            let key = match index {
                Some(idx_word) => {
                    let idx_val = subst_word(interp, idx_word)?;
                    let bytes = interp
                        .host
                        .value_string_bytes(idx_val)
                        .map_err(|e| Signal::Error(CoreError::new(crate::errors::ErrorKind::Type, e.message)))?
                        .to_vec();
                    Some(bytes)
                }
                None => None,
            };
            interp.var_read(name, key.as_deref()).map_err(Signal::Error)
        }
        Segment::CommandSub { script, .. } => {
            let script = script.clone();
            interp.enter_nested(|interp| crate::eval::eval_script(interp, &script))
        }
    }
}

/// `subst` built-in / `subst(ops, interp, value, flags, out_result)` entry
/// point (spec.md §6): substitutes `src` as free-standing text (not split
/// into command words), honoring `-nocommands`/`-novariables`/
/// `-nobackslashes`.
pub fn subst_top_level<H: HostOps>(interp: &mut Interp<H>, src: &[u8], no_commands: bool, no_variables: bool, no_backslashes: bool) -> CmdResult {
    let parser = crate::parser::Parser::new(src);
    let segments = parser.scan_segments(0, src.len()).map_err(|status| Signal::Error(parse_status_to_error(status)))?;
    let builder = interp.host.string_builder_new();
    for seg in &segments {
        let bytes = match seg {
            Segment::Literal { bytes, range } => {
                if no_backslashes {
                    src[range.start..range.end].to_vec()
                } else {
                    bytes.clone()
                }
            }
            Segment::Variable { range, .. } if no_variables => src[range.start..range.end].to_vec(),
            Segment::CommandSub { range, .. } if no_commands => src[range.start..range.end].to_vec(),
            _ => {
                let v = resolve_segment(interp, seg)?;
                interp
                    .host
                    .value_string_bytes(v)
                    .map_err(|e| Signal::Error(CoreError::new(crate::errors::ErrorKind::Type, e.message)))?
                    .to_vec()
            }
        };
        interp.host.string_builder_append_bytes(builder, &bytes);
    }
    interp.host.string_builder_finish(builder, Arena::Scratch).map_err(|e| Signal::Error(CoreError::new(crate::errors::ErrorKind::Type, e.message)))
}

fn parse_status_to_error(status: crate::parser::ParseStatus) -> CoreError {
    match status {
        crate::parser::ParseStatus::Incomplete { kind, .. } => CoreError::new(crate::errors::ErrorKind::Parse, format!("{kind:?} not terminated")),
        crate::parser::ParseStatus::Error { message, .. } => CoreError::new(crate::errors::ErrorKind::Parse, message),
        _ => CoreError::new(crate::errors::ErrorKind::Parse, "unexpected parse status"),
    }
}
