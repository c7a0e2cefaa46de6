//! Built-in combinator semantics: the strictness pre-pass, the staging of
//! curried primitives into lambdas over fresh variables, and the firing of
//! staged closures once every argument is in.

use crate::arena::{Graph, Node, NodeId};
use crate::engine::modem;
use crate::engine::reduce::{force_spine, reduce};
use crate::engine::types::EvalContext;
use crate::engine::unparse::unparse;
use crate::error::EvalError;
use smallvec::smallvec;

fn ap_arg(g: &Graph, id: NodeId) -> NodeId {
    match g.get(id) {
        Node::Ap { arg, .. } => *arg,
        other => unreachable!("expected application, found {other:?}"),
    }
}

fn set_ap_arg(g: &mut Graph, id: NodeId, child: NodeId) {
    match g.get_mut(id) {
        Node::Ap { arg, .. } => *arg = child,
        other => unreachable!("expected application, found {other:?}"),
    }
}

fn closure_arg(g: &Graph, id: NodeId, pos: usize) -> NodeId {
    match g.get(id) {
        Node::Closure { args, .. } => args[pos],
        other => unreachable!("expected closure, found {other:?}"),
    }
}

fn set_closure_arg(g: &mut Graph, id: NodeId, pos: usize, child: NodeId) {
    match g.get_mut(id) {
        Node::Closure { args, .. } => args[pos] = child,
        other => unreachable!("expected closure, found {other:?}"),
    }
}

fn num_value(g: &Graph, id: NodeId) -> Option<i64> {
    match g.get(id) {
        Node::Num { value, .. } => Some(*value),
        _ => None,
    }
}

/// Reduce the argument of `id` in place until it stops changing.
fn force_arg(g: &mut Graph, id: NodeId, ctx: &mut EvalContext) -> Result<(), EvalError> {
    loop {
        let arg = ap_arg(g, id);
        let reduced = reduce(g, arg, ctx)?;
        if reduced == arg {
            return Ok(());
        }
        set_ap_arg(g, id, reduced);
        ctx.record(g);
    }
}

/// Apply the built-in in the function position of the application `id`.
///
/// Strictness is decided here: `f` discards its argument unevaluated,
/// the unary strict group forces it to a fixpoint, and `modlist`
/// additionally forces the whole cons spine so encoding sees only data.
pub fn apply_function(
    g: &mut Graph,
    id: NodeId,
    ctx: &mut EvalContext,
) -> Result<NodeId, EvalError> {
    let fun = match g.get(id) {
        Node::Ap { fun, .. } => *fun,
        _ => {
            return Err(EvalError::TypeMismatch(format!(
                "expected function node: {}",
                unparse(g, id)
            )))
        }
    };
    let name = match g.get(fun) {
        Node::Fun(name) => name.clone(),
        _ => {
            return Err(EvalError::TypeMismatch(format!(
                "expected function node: {}",
                unparse(g, id)
            )))
        }
    };

    match name.as_str() {
        "f" => {
            // First argument ignored; never evaluated.
            let sentinel = g.add(Node::fun("_"));
            set_ap_arg(g, id, sentinel);
        }
        "if0" | "mod" | "dem" | "demlist" | "neg" | "inc" | "dec" | "isnil" | "car" | "cdr"
        | "double" => {
            force_arg(g, id, ctx)?;
        }
        "modlist" => {
            // Spine-forced eagerly: the whole list must be data before
            // encoding starts.
            loop {
                let arg = ap_arg(g, id);
                if g.get(arg).is_terminal() {
                    break;
                }
                let reduced = reduce(g, arg, ctx)?;
                if reduced == arg {
                    break;
                }
                set_ap_arg(g, id, reduced);
                ctx.record(g);
            }
            let arg = ap_arg(g, id);
            if matches!(g.get(arg), Node::Cons(..)) {
                force_spine(g, arg, ctx)?;
            }
        }
        _ => {}
    }

    let arg = ap_arg(g, id);
    match name.as_str() {
        "nil" => Ok(g.add(Node::fun("t"))),
        "modlist" => {
            if !matches!(g.get(arg), Node::Cons(..))
                && !matches!(g.get(arg), Node::Fun(n) if n == "nil")
            {
                return Err(EvalError::TypeMismatch(format!(
                    "expected list argument: {}",
                    unparse(g, id)
                )));
            }
            let mut bits = String::new();
            modem::modulate_list(g, arg, &mut bits)?;
            Ok(g.add(Node::Num {
                value: 0,
                modulated: Some(bits),
            }))
        }
        "demlist" => match g.get(arg) {
            Node::Num {
                modulated: Some(bits),
                ..
            } => {
                let bits = bits.clone();
                let (list, _) = modem::demodulate_list(g, bits.as_bytes())?;
                Ok(list)
            }
            _ => Err(EvalError::TypeMismatch(format!(
                "expected modulated list argument: {}",
                unparse(g, id)
            ))),
        },
        "neg" | "inc" | "dec" | "mod" | "dem" => match g.get(arg).clone() {
            Node::Num { value, modulated } => match name.as_str() {
                "neg" => Ok(g.add(Node::num(value.wrapping_neg()))),
                "inc" => Ok(g.add(Node::num(value.wrapping_add(1)))),
                "dec" => Ok(g.add(Node::num(value.wrapping_sub(1)))),
                "mod" => Ok(g.add(Node::Num {
                    value,
                    modulated: Some(modem::modulate(value)),
                })),
                _ => {
                    let bits = modulated.ok_or_else(|| {
                        EvalError::TypeMismatch(format!(
                            "expected modulated argument: {}",
                            unparse(g, id)
                        ))
                    })?;
                    let (value, _) = modem::demodulate(bits.as_bytes())?;
                    Ok(g.add(Node::num(value)))
                }
            },
            _ => Err(EvalError::TypeMismatch(format!(
                "expected single numeric argument: {}",
                unparse(g, id)
            ))),
        },
        "isnil" => {
            if matches!(g.get(arg), Node::Fun(n) if n == "nil") {
                Ok(g.add(Node::fun("t")))
            } else {
                Ok(g.add(Node::fun("f")))
            }
        }
        "car" => match g.get(arg) {
            Node::Cons(head, _) => Ok(*head),
            _ => Err(EvalError::TypeMismatch(format!(
                "'car' expects cons: {}",
                unparse(g, id)
            ))),
        },
        "cdr" => match g.get(arg) {
            Node::Cons(_, tail) => Ok(*tail),
            _ => Err(EvalError::TypeMismatch(format!(
                "'cdr' expects cons: {}",
                unparse(g, id)
            ))),
        },
        "cons" | "add" | "mul" | "div" | "eq" | "lt" | "t" | "f" => {
            stage_binary(g, &name, arg, ctx)
        }
        "double" => {
            // double x = X. x (x X)
            let var = ctx.fresh_var();
            let var_ref = g.add(Node::Ref(var.clone()));
            let inner = g.add(Node::Ap {
                fun: arg,
                arg: var_ref,
            });
            let body = g.add(Node::Ap { fun: arg, arg: inner });
            Ok(g.add(Node::Lambda { bound: var, body }))
        }
        "s" | "c" | "b" | "if0" => stage_ternary(g, &name, arg, ctx),
        "i" => Ok(arg),
        _ => Err(EvalError::UnknownCombinator(name)),
    }
}

/// First argument of a two-argument primitive: wrap the waiting half in a
/// lambda over a fresh variable. `t` ignores its second argument, so it
/// binds the discard sentinel instead of a fresh name. `cons` stages
/// directly into a cell.
fn stage_binary(
    g: &mut Graph,
    name: &str,
    first: NodeId,
    ctx: &mut EvalContext,
) -> Result<NodeId, EvalError> {
    let bound = if name == "t" {
        "_".to_string()
    } else {
        ctx.fresh_var()
    };
    let second = g.add(Node::Ref(bound.clone()));
    let body = if name == "cons" {
        g.add(Node::Cons(first, second))
    } else {
        g.add(Node::Closure {
            name: name.to_string(),
            args: smallvec![first, second],
        })
    };
    Ok(g.add(Node::Lambda { bound, body }))
}

/// First argument of a three-argument primitive: two nested lambdas over a
/// closure holding the remaining slots. `if0` is strict in its condition
/// and already knows which branch it will discard, so that slot binds `_`.
fn stage_ternary(
    g: &mut Graph,
    name: &str,
    first: NodeId,
    ctx: &mut EvalContext,
) -> Result<NodeId, EvalError> {
    let mut outer = ctx.fresh_var();
    let mut inner = ctx.fresh_var();
    if name == "if0" {
        let value = num_value(g, first).ok_or_else(|| {
            EvalError::TypeMismatch(format!(
                "'if0' expects numeric first argument: {}",
                unparse(g, first)
            ))
        })?;
        if value == 0 {
            inner = "_".to_string();
        } else {
            outer = "_".to_string();
        }
    }
    let second = g.add(Node::Ref(outer.clone()));
    let third = g.add(Node::Ref(inner.clone()));
    let closure = g.add(Node::Closure {
        name: name.to_string(),
        args: smallvec![first, second, third],
    });
    let body = g.add(Node::Lambda {
        bound: inner,
        body: closure,
    });
    Ok(g.add(Node::Lambda { bound: outer, body }))
}

/// Fire a staged closure whose arguments are all in.
pub fn apply_closure(
    g: &mut Graph,
    id: NodeId,
    ctx: &mut EvalContext,
) -> Result<NodeId, EvalError> {
    let (name, args) = match g.get(id) {
        Node::Closure { name, args } => (name.clone(), args.clone()),
        other => unreachable!("expected closure, found {other:?}"),
    };
    match name.as_str() {
        "add" | "mul" | "div" | "eq" | "lt" => {
            for pos in 0..args.len() {
                if num_value(g, closure_arg(g, id, pos)).is_some() {
                    continue;
                }
                loop {
                    let arg = closure_arg(g, id, pos);
                    let reduced = reduce(g, arg, ctx)?;
                    if reduced == arg {
                        break;
                    }
                    set_closure_arg(g, id, pos, reduced);
                    ctx.record(g);
                }
            }
            let lhs = num_value(g, closure_arg(g, id, 0));
            let rhs = num_value(g, closure_arg(g, id, 1));
            let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
                return Err(EvalError::TypeMismatch(format!(
                    "expected two numeric arguments: {}",
                    unparse(g, id)
                )));
            };
            match name.as_str() {
                "add" => Ok(g.add(Node::num(lhs.wrapping_add(rhs)))),
                "mul" => Ok(g.add(Node::num(lhs.wrapping_mul(rhs)))),
                "div" => {
                    if rhs == 0 {
                        return Err(EvalError::TypeMismatch(format!(
                            "division by zero: {}",
                            unparse(g, id)
                        )));
                    }
                    // Truncates toward zero.
                    Ok(g.add(Node::num(lhs.wrapping_div(rhs))))
                }
                "eq" => Ok(g.add(Node::fun(if lhs == rhs { "t" } else { "f" }))),
                _ => Ok(g.add(Node::fun(if lhs < rhs { "t" } else { "f" }))),
            }
        }
        "if0" => match num_value(g, args[0]) {
            Some(0) => Ok(args[1]),
            Some(_) => Ok(args[2]),
            None => Err(EvalError::TypeMismatch(format!(
                "'if0' expects numeric first argument: {}",
                unparse(g, id)
            ))),
        },
        "t" => Ok(args[0]),
        "f" => Ok(args[1]),
        "s" => {
            // s x y z = (x z) (y z)
            let left = g.add(Node::Ap {
                fun: args[0],
                arg: args[2],
            });
            let right = g.add(Node::Ap {
                fun: args[1],
                arg: args[2],
            });
            Ok(g.add(Node::Ap {
                fun: left,
                arg: right,
            }))
        }
        "c" => {
            // c x y z = (x z) y
            let left = g.add(Node::Ap {
                fun: args[0],
                arg: args[2],
            });
            Ok(g.add(Node::Ap {
                fun: left,
                arg: args[1],
            }))
        }
        "b" => {
            // b x y z = x (y z)
            let right = g.add(Node::Ap {
                fun: args[1],
                arg: args[2],
            });
            Ok(g.add(Node::Ap {
                fun: args[0],
                arg: right,
            }))
        }
        _ => Err(EvalError::UnknownCombinator(name)),
    }
}
