//! End-to-end coverage of spec.md §8's seed scenarios and boundary
//! behaviors, run against the in-memory reference host
//! ([`tcl_core::mem_hostops::MemHost`]) the same way the teacher's own
//! integration tests drive the real VM instead of mocking it.

use pretty_assertions::assert_eq;

use tcl_core::interp::{EvalFlags, Limits};
use tcl_core::mem_hostops::MemHost;
use tcl_core::{HostOps, Interp};

fn run(interp: &mut Interp<MemHost>, src: &str) -> String {
    let v = interp.script_eval(src.as_bytes(), EvalFlags::Local).unwrap_or_else(|e| panic!("{src:?} failed: {e:?}"));
    text(interp, v)
}

fn text(interp: &Interp<MemHost>, v: tcl_core::ValueHandle) -> String {
    String::from_utf8_lossy(interp.host.value_string_bytes(v).unwrap()).into_owned()
}

fn new_interp() -> Interp<MemHost> {
    Interp::new(MemHost::new(), Limits::default()).unwrap()
}

#[test]
fn seed_1_incr_and_expr() {
    let mut interp = new_interp();
    let out = run(&mut interp, "set x 5; incr x; set y [expr {$x * 2}]; list $x $y");
    assert_eq!(out, "6 12");
}

#[test]
fn seed_2_recursive_factorial() {
    let mut interp = new_interp();
    let out = run(
        &mut interp,
        "proc fact n { if {$n <= 1} {return 1}; expr {$n * [fact [expr {$n - 1}]]} }; fact 6",
    );
    assert_eq!(out, "720");
}

#[test]
fn seed_3_namespace_variable_scoping() {
    let mut interp = new_interp();
    let out = run(
        &mut interp,
        "namespace eval ::a { variable v 1; proc get {} { variable v; return $v } }; set r [::a::get]; ::a::get",
    );
    assert_eq!(out, "1");
    assert_eq!(run(&mut interp, "info exists ::a::v"), "1");
    assert_eq!(run(&mut interp, "info exists v"), "0");
}

#[test]
fn seed_4_upvar_aliases_caller_local() {
    let mut interp = new_interp();
    let out = run(
        &mut interp,
        "proc outer {} { set local 10; inner }; proc inner {} { upvar 1 local alias; incr alias; set alias }; outer",
    );
    assert_eq!(out, "11");
}

#[test]
fn seed_5_catch_reports_code_and_errorcode() {
    let mut interp = new_interp();
    let out = run(
        &mut interp,
        "catch { error \"boom\" BOOM } msg opts; list $msg [dict get $opts -code] [dict get $opts -errorcode]",
    );
    assert_eq!(out, "boom 1 BOOM");
}

#[test]
fn seed_6_dict_keys_and_size() {
    let mut interp = new_interp();
    let out = run(&mut interp, "lsort [dict keys [dict create a 1 b 2 c 3]]");
    assert_eq!(out, "a b c");
    assert_eq!(run(&mut interp, "dict size [dict create a 1 b 2]"), "2");
}

#[test]
fn seed_7_lsort_options() {
    let mut interp = new_interp();
    assert_eq!(run(&mut interp, "lsort -integer {10 2 30 1}"), "1 2 10 30");
    assert_eq!(run(&mut interp, "lsort -unique {1 1 2 3 3}"), "1 2 3");
}

#[test]
fn seed_8_ieee_division() {
    let mut interp = new_interp();
    assert_eq!(run(&mut interp, "expr {1.0/0.0}"), "Inf");
    assert_eq!(run(&mut interp, "expr {0.0/0.0}"), "NaN");
    assert_eq!(run(&mut interp, "expr {[isinf Inf] + [isnan NaN]}"), "2");
}

#[test]
fn seed_9_incomplete_brace_reports_incomplete() {
    use tcl_core::parser::{ParseStatus, Parser};
    let mut parser = Parser::new(b"set x {");
    match parser.parse_command() {
        ParseStatus::Incomplete { .. } => {}
        other => panic!("expected Incomplete, got {other:?}"),
    }
}

#[test]
fn seed_10_errorstack_carries_inner_and_call_frames() {
    let mut interp = new_interp();
    let out = run(
        &mut interp,
        "proc foo {} { bar }; proc bar {} { error oops }; catch foo _ o; dict get $o -errorstack",
    );
    assert_eq!(out, "INNER {error oops} CALL bar CALL foo");
}

#[test]
fn boundary_lindex_out_of_range_returns_empty() {
    let mut interp = new_interp();
    assert_eq!(run(&mut interp, "lindex {a b c} -1"), "");
    assert_eq!(run(&mut interp, "lindex {a b c} 10"), "");
}

#[test]
fn boundary_string_range_clamps() {
    let mut interp = new_interp();
    assert_eq!(run(&mut interp, "string range hello -5 2"), "hel");
    assert_eq!(run(&mut interp, "string range hello 3 100"), "lo");
    assert_eq!(run(&mut interp, "string range hello 4 1"), "");
}

#[test]
fn boundary_recursion_limit_fails_before_overrun() {
    let mut interp = Interp::new(MemHost::new(), Limits { recursion_limit: 50 }).unwrap();
    let result = interp.script_eval(b"proc loop {} { loop }; loop", EvalFlags::Local);
    assert!(result.is_err(), "expected recursion limit to trip, got {result:?}");
}

#[test]
fn integer_arithmetic_wraps_modulo_64_bits() {
    let mut interp = new_interp();
    assert_eq!(run(&mut interp, "expr {(1<<63)-1 + 1}"), "-9223372036854775808");
}
