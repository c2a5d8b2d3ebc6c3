//! Integration tests for the RPL compiler.
//!
//! Tests cover:
//! - Compile → run → decompile for the usual literal kinds
//! - Token boundaries decided by library probes
//! - Edit-form round trips (property tests)
//! - Failure leaves the arena untouched

use proptest::prelude::*;
use rpl_compiler::{compile, compile_words, decompile, decompile_words, CompileError};
use rpl_vm::{DecompileMode, ExecutionOutcome, Runtime, RuntimeConfig};

// ---- Test helpers ----

fn runtime() -> Runtime {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    rpl_stdlib::install_all(&mut rt).unwrap();
    rt
}

/// Compile and run `text`, then print the stack bottom to top.
fn eval(text: &str) -> Vec<String> {
    let mut rt = runtime();
    let program = compile(&mut rt, text).unwrap();
    rt.install(program).unwrap();
    assert_eq!(rt.run().unwrap(), ExecutionOutcome::Completed);
    rt.data()
        .as_slice()
        .iter()
        .map(|&p| decompile(&rt, p, DecompileMode::Display).unwrap())
        .collect()
}

// ---- Compile and run ----

#[test]
fn three_four_plus_is_seven() {
    assert_eq!(eval("3 4 +"), vec!["7"]);
}

#[test]
fn literals_push_themselves() {
    assert_eq!(
        eval("1 -2 2.5 \"hi\" 'x' { 1 2 } [ 3 4 ]"),
        vec!["1", "-2", "2.5", "\"hi\"", "'x'", "{ 1 2 }", "[ 3 4 ]"]
    );
}

#[test]
fn delimiters_need_no_spaces() {
    assert_eq!(eval("«2 3 *» EVAL"), vec!["6"]);
    assert_eq!(eval("{1 2}"), vec!["{ 1 2 }"]);
}

#[test]
fn ascii_aliases_compile_to_the_same_cells() {
    let rt = runtime();
    let a = compile_words(rt.registry(), "<< 1 2 <= >>").unwrap();
    let b = compile_words(rt.registry(), "« 1 2 ≤ »").unwrap();
    assert_eq!(a, b);
}

#[test]
fn command_names_win_over_identifiers() {
    assert_eq!(eval("5 DUP"), vec!["5", "5"]);
}

#[test]
fn comments_are_ignored() {
    assert_eq!(eval("1 @ first\n2 + @ sum"), vec!["3"]);
}

// ---- Failures ----

#[test]
fn failure_allocates_nothing() {
    let mut rt = runtime();
    let before = rt.store().stats();
    for bad in ["« 1", "1 }", "[ \"a\" ]", "'unterminated", "\"open"] {
        assert!(compile(&mut rt, bad).is_err(), "{bad} should not compile");
    }
    assert_eq!(rt.store().stats(), before);
}

#[test]
fn errors_display_their_position() {
    let rt = runtime();
    let err = compile_words(rt.registry(), "1 2\n3 ~~").unwrap_err();
    assert_eq!(err.to_string(), "2:3: unknown token '~~'");
    let err = compile_words(rt.registry(), "\"open").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { line: 1, col: 1, .. }));
}

// ---- Decompile ----

#[test]
fn decompile_words_of_standalone_object() {
    let rt = runtime();
    let words = compile_words(rt.registry(), "« DUP DROP »").unwrap();
    assert_eq!(
        decompile_words(rt.registry(), &words, DecompileMode::Edit).unwrap(),
        "« « DUP DROP » »"
    );
}

proptest! {
    /// Integer literals survive compile → decompile → compile.
    #[test]
    fn integer_lists_round_trip(values in prop::collection::vec(any::<i64>(), 0..12)) {
        let rt = runtime();
        let text = format!(
            "{{ {} }}",
            values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
        );
        let first = compile_words(rt.registry(), &text).unwrap();
        let printed = decompile_words(rt.registry(), &first, DecompileMode::Edit).unwrap();
        let second = compile_words(rt.registry(), &printed).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Finite reals survive the Edit form exactly.
    #[test]
    fn reals_round_trip(value in -1.0e300f64..1.0e300) {
        let rt = runtime();
        let text = rpl_stdlib::reals::format_real(value);
        let first = compile_words(rt.registry(), &text).unwrap();
        let printed = decompile_words(rt.registry(), &first, DecompileMode::Edit).unwrap();
        prop_assert_eq!(printed, format!("« {text} »"));
    }

    /// Extra whitespace never changes the compiled cells.
    #[test]
    fn whitespace_is_insignificant(pad in "[ \t\n]{1,4}") {
        let rt = runtime();
        let tight = compile_words(rt.registry(), "« 1 { 2 } + »").unwrap();
        let loose_text = format!("{pad}«{pad}1{pad}{{{pad}2{pad}}}{pad}+{pad}»{pad}");
        let loose = compile_words(rt.registry(), &loose_text).unwrap();
        prop_assert_eq!(tight, loose);
    }
}
