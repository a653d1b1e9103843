//! Foreign Object Layer (spec.md §4.K): host-managed opaque values that
//! appear as ordinary commands. `command_name arg...` with `command_name`
//! bound to a foreign value dispatches `arg[0]` as a method name through
//! [`crate::hostops::HostOps::foreign_invoke`].

use crate::errors::{CoreError, ErrorKind};
use crate::eval::{CmdResult, Signal};
use crate::hostops::{Arena, HostOps, ValueHandle};
use crate::interp::Interp;

/// Invokes a foreign object as a command: `args[0]` is the object's value
/// handle (already resolved as a command name bound to a foreign value by
/// [`crate::eval::dispatch`]'s fallback), `args[1]` is the method name, the
/// rest are method arguments.
///
/// `info type $obj` / `info methods $obj` go through
/// [`type_name`]/[`methods`] directly rather than through this dispatcher,
/// since those are introspection, not invocation.
pub fn invoke_as_command<H: HostOps>(interp: &mut Interp<H>, args: &[ValueHandle]) -> CmdResult {
    let obj = args[0];
    if args.len() < 2 {
        let type_name = interp.host.foreign_type_name(obj).unwrap_or("object").to_string();
        return Err(Signal::Error(CoreError::wrong_num_args(&format!("{type_name} method ?arg ...?"))));
    }
    let method_bytes = interp.host.value_string_bytes(args[1]).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Type, e.message)))?;
    let method = String::from_utf8_lossy(method_bytes).into_owned();
    if method == "destroy" && args.len() == 2 {
        interp.host.foreign_destroy(obj).map_err(|e| Signal::Error(CoreError::new(ErrorKind::Name, e.message)))?;
        return interp.empty_value(Arena::Scratch).map_err(Signal::Error);
    }
    if !interp.host.foreign_methods(obj).iter().any(|m| m == &method) {
        return Err(Signal::Error(CoreError::new(ErrorKind::Name, format!("unknown method \"{method}\": no such method"))));
    }
    interp
        .host
        .foreign_invoke(obj, &method, &args[2..], Arena::Scratch)
        .map_err(|e| Signal::Error(CoreError::new(ErrorKind::Name, e.message)))
}

/// `info type $obj` (spec.md §4.K): `None` for ordinary (non-foreign) values.
#[must_use]
pub fn type_name<H: HostOps>(interp: &Interp<H>, v: ValueHandle) -> Option<String> {
    if interp.host.foreign_is_foreign(v) { interp.host.foreign_type_name(v).map(str::to_string) } else { None }
}

/// `info methods $obj` (spec.md §4.K).
pub fn methods<H: HostOps>(interp: &Interp<H>, v: ValueHandle) -> Vec<String> {
    interp.host.foreign_methods(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Limits;
    use crate::mem_hostops::MemHost;

    #[test]
    fn unknown_method_is_a_name_error() {
        let mut interp = Interp::new(MemHost::new(), Limits::default()).unwrap();
        let obj = interp.new_string("obj", Arena::Scratch).unwrap();
        let bad = interp.new_string("frobnicate", Arena::Scratch).unwrap();
        let err = invoke_as_command(&mut interp, &[obj, bad]);
        assert!(matches!(err, Err(Signal::Error(e)) if e.kind == ErrorKind::Name));
    }
}
