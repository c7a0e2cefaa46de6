use crate::arena::{Graph, Node};
use crate::engine::modem::{demodulate, demodulate_list, modulate, modulate_list};
use crate::engine::reduce::eval;
use crate::engine::subst::substitute;
use crate::engine::types::EvalContext;
use crate::engine::unparse::{unparse, unparse_with, PrintOptions};
use crate::error::EvalError;
use crate::parser::Parser;
use crate::trace::StepTrace;

fn eval_program(text: &str) -> Result<String, EvalError> {
    let mut g = Graph::new();
    let mut parser = Parser::new();
    let root = parser.parse(&mut g, text)?.expect("at least one binding");
    let mut ctx = EvalContext::new(&parser.bindings);
    let result = eval(&mut g, root, &mut ctx)?;
    Ok(unparse(&g, result))
}

#[test]
fn test_substitute_root_ref() {
    let mut g = Graph::new();
    let x = g.add(Node::Ref("X0".to_string()));
    let seven = g.add(Node::num(7));
    assert_eq!(substitute(&mut g, x, "X0", seven), seven);
}

#[test]
fn test_substitute_other_name_untouched() {
    let mut g = Graph::new();
    let y = g.add(Node::Ref("X1".to_string()));
    let seven = g.add(Node::num(7));
    let out = substitute(&mut g, y, "X0", seven);
    assert_eq!(out, y, "no occurrence: same node comes back");
    assert_eq!(unparse(&g, out), "X1");
}

#[test]
fn test_substitute_shares_off_path_subtrees() {
    // ((add 1) X0): the path to X0 is re-allocated, (add 1) is shared.
    let mut g = Graph::new();
    let add = g.add(Node::fun("add"));
    let one = g.add(Node::num(1));
    let partial = g.add(Node::Ap { fun: add, arg: one });
    let x = g.add(Node::Ref("X0".to_string()));
    let root = g.add(Node::Ap {
        fun: partial,
        arg: x,
    });
    let two = g.add(Node::num(2));
    let out = substitute(&mut g, root, "X0", two);
    assert_ne!(out, root, "path is copied");
    assert_eq!(unparse(&g, root), "((add 1) X0)", "input left intact");
    assert_eq!(unparse(&g, out), "((add 1) 2)");
    match g.get(out) {
        Node::Ap { fun, .. } => assert_eq!(*fun, partial, "off-path subtree shared"),
        other => panic!("expected application, found {other:?}"),
    }
}

#[test]
fn test_substitute_replaces_only_first_occurrence() {
    let mut g = Graph::new();
    let a = g.add(Node::Ref("X0".to_string()));
    let b = g.add(Node::Ref("X0".to_string()));
    let root = g.add(Node::Ap { fun: b, arg: a });
    let one = g.add(Node::num(1));
    // BFS visits the argument child before the function child.
    let out = substitute(&mut g, root, "X0", one);
    assert_eq!(unparse(&g, out), "(X0 1)");
}

#[test]
fn test_modulate_vectors() {
    assert_eq!(modulate(0), "010");
    assert_eq!(modulate(1), "01100001");
    assert_eq!(modulate(-1), "10100001");
    assert_eq!(modulate(2), "01100010");
    assert_eq!(modulate(16), "0111000010000");
    assert_eq!(modulate(-255), "1011011111111");
    assert_eq!(modulate(256), "011110000100000000");
}

#[test]
fn test_demodulate_vectors() {
    for value in [0i64, 1, -1, 2, 16, 255, -255, 256, i64::MAX, i64::MIN] {
        let bits = modulate(value);
        let (decoded, rest) = demodulate(bits.as_bytes()).unwrap();
        assert_eq!(decoded, value);
        assert!(rest.is_empty(), "whole string consumed for {value}");
    }
}

#[test]
fn test_demodulate_truncated() {
    assert!(matches!(
        demodulate(b"0"),
        Err(EvalError::Encoding(_))
    ));
    assert!(matches!(
        demodulate(b"0111"),
        Err(EvalError::Encoding(_))
    ));
    assert!(matches!(
        demodulate(b"01100"),
        Err(EvalError::Encoding(_))
    ));
}

#[test]
fn test_modulate_list_vectors() {
    let mut g = Graph::new();
    let nil = g.add(Node::fun("nil"));
    let mut bits = String::new();
    modulate_list(&g, nil, &mut bits).unwrap();
    assert_eq!(bits, "00");

    let two = g.add(Node::num(2));
    let inner = g.add(Node::Cons(two, nil));
    let one = g.add(Node::num(1));
    let list = g.add(Node::Cons(one, inner));
    let mut bits = String::new();
    modulate_list(&g, list, &mut bits).unwrap();
    assert_eq!(bits, "1101100001110110001000");
}

#[test]
fn test_demodulate_list_round_trip() {
    let mut g = Graph::new();
    let (list, rest) = demodulate_list(&mut g, b"1101100001110110001000").unwrap();
    assert!(rest.is_empty());
    assert_eq!(unparse(&g, list), "[ 1 :: [ 2 :: nil ] ]");
}

#[test]
fn test_modulate_list_rejects_lambda() {
    let mut g = Graph::new();
    let body = g.add(Node::Ref("X0".to_string()));
    let lambda = g.add(Node::Lambda {
        bound: "X0".to_string(),
        body,
    });
    let mut bits = String::new();
    assert!(matches!(
        modulate_list(&g, lambda, &mut bits),
        Err(EvalError::TypeMismatch(_))
    ));
}

#[test]
fn test_partial_application_prints_as_lambda() {
    assert_eq!(eval_program(":1 = ap add 7").unwrap(), "(X0.add(7, X0))");
    assert_eq!(eval_program(":1 = ap t 5").unwrap(), "(_.t(5, _))");
}

#[test]
fn test_if0_leaves_untaken_branch_unevaluated() {
    // The else branch applies dec to a combinator, which would fail if
    // it were ever forced.
    assert_eq!(
        eval_program(":1 = ap ap ap if0 ap dec 1 3 ap dec t").unwrap(),
        "3"
    );
}

#[test]
fn test_t_and_f_discard_unevaluated() {
    assert_eq!(eval_program(":1 = ap ap t 1 ap car 0").unwrap(), "1");
    assert_eq!(eval_program(":1 = ap ap f ap car 0 2").unwrap(), "2");
}

#[test]
fn test_nil_applied_yields_t_lazily() {
    assert_eq!(eval_program(":1 = ap nil ap car 0").unwrap(), "t");
}

#[test]
fn test_modulated_number_round_trips_through_program() {
    assert_eq!(eval_program(":1 = ap mod -255").unwrap(), "1011011111111");
    assert_eq!(eval_program(":1 = ap dem ap mod 256").unwrap(), "256");
}

#[test]
fn test_dem_requires_modulated_argument() {
    assert!(matches!(
        eval_program(":1 = ap dem 5"),
        Err(EvalError::TypeMismatch(_))
    ));
}

#[test]
fn test_demlist_round_trips_list() {
    assert_eq!(
        eval_program(":1 = ap demlist ap modlist ap ap cons 1 ap ap cons 2 nil").unwrap(),
        "[ 1 :: [ 2 :: nil ] ]"
    );
    assert_eq!(eval_program(":1 = ap demlist ap modlist nil").unwrap(), "nil");
}

#[test]
fn test_unknown_combinator() {
    assert_eq!(
        eval_program(":1 = ap frobnicate 1"),
        Err(EvalError::UnknownCombinator("frobnicate".to_string()))
    );
}

#[test]
fn test_unknown_binding() {
    assert_eq!(
        eval_program(":1 = ap ap add 1 :9"),
        Err(EvalError::UnknownBinding(":9".to_string()))
    );
}

#[test]
fn test_car_on_non_cons_fails() {
    assert!(matches!(
        eval_program(":1 = ap car 0"),
        Err(EvalError::TypeMismatch(_))
    ));
}

#[test]
fn test_applying_a_number_fails() {
    assert!(matches!(
        eval_program(":1 = ap 1 2"),
        Err(EvalError::TypeMismatch(_))
    ));
}

#[test]
fn test_division_by_zero_fails() {
    assert!(matches!(
        eval_program(":1 = ap ap div 1 0"),
        Err(EvalError::TypeMismatch(_))
    ));
}

#[test]
fn test_step_limit() {
    let mut g = Graph::new();
    let mut parser = Parser::new();
    let root = parser.parse(&mut g, ":1 = :1").unwrap().unwrap();
    let mut ctx = EvalContext::new(&parser.bindings);
    ctx.step_limit = 100;
    assert_eq!(
        eval(&mut g, root, &mut ctx),
        Err(EvalError::StepLimitExceeded(100))
    );
}

#[test]
fn test_fresh_names_are_per_context() {
    // Two runs of the same program allocate the same fresh names.
    let first = eval_program(":1 = ap add 7").unwrap();
    let second = eval_program(":1 = ap add 7").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_sharing_printer_marks_reencounters() {
    let mut g = Graph::new();
    let one = g.add(Node::num(1));
    let shared = g.add(Node::Ap { fun: one, arg: one });
    let root = g.add(Node::Ap {
        fun: shared,
        arg: shared,
    });
    let opts = PrintOptions {
        show_sharing: true,
        print_addr: false,
    };
    assert_eq!(
        unparse_with(&g, root, opts),
        format!("((1 {{#{}}}) {{#{}}})", one.0, shared.0)
    );
}

#[test]
fn test_addr_printer_prefixes_node_ids() {
    let mut g = Graph::new();
    let fun = g.add(Node::fun("inc"));
    let one = g.add(Node::num(1));
    let root = g.add(Node::Ap { fun, arg: one });
    let opts = PrintOptions {
        show_sharing: false,
        print_addr: true,
    };
    assert_eq!(unparse_with(&g, root, opts), format!("#{}|(inc 1)", root.0));
}

#[test]
fn test_apply_list_threads_head_and_tail() {
    // Applying a list applies the argument to the head, then threads the
    // tail: ([ 7 :: nil ]) t  ~>  ((t 7) nil)  ~>  7.
    assert_eq!(eval_program(":1 = ap ap ap cons 7 nil t").unwrap(), "7");
}

#[test]
fn test_step_trace_collects_printed_forms() {
    let mut g = Graph::new();
    let mut parser = Parser::new();
    let root = parser.parse(&mut g, ":1 = ap ap add 1 2").unwrap().unwrap();
    let mut trace = StepTrace::new(true, false);
    let mut ctx = EvalContext::new(&parser.bindings);
    ctx.trace = Some(&mut trace);
    let result = eval(&mut g, root, &mut ctx).unwrap();
    assert_eq!(unparse(&g, result), "3");
    drop(ctx);
    assert_eq!(trace.steps.first().unwrap(), "((add 1) 2)");
    assert_eq!(trace.steps.last().unwrap(), "3");
}

fn spine_limited(text: &str, spine_limit: usize) -> String {
    let mut g = Graph::new();
    let mut parser = Parser::new();
    let root = parser.parse(&mut g, text).unwrap().unwrap();
    let mut ctx = EvalContext::new(&parser.bindings);
    ctx.spine_limit = spine_limit;
    let result = eval(&mut g, root, &mut ctx).unwrap();
    unparse(&g, result)
}

#[test]
fn test_spine_cap_leaves_infinite_list_partial() {
    // :1 is the infinite list of 1s; forcing stops at the cap instead of
    // diverging. The head cells that were forced are real data.
    let out = spine_limited(":1 = ap ap cons 1 :1", 8);
    assert!(out.starts_with("[ 1 :: [ 1 :: "), "got: {out}");
}
