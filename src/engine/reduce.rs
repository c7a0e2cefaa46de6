use crate::arena::{Graph, Node, NodeId};
use crate::engine::primitives::{apply_closure, apply_function};
use crate::engine::subst::substitute;
use crate::engine::types::{EvalContext, PROGRESS_STEPS_OVERRIDE};
use crate::engine::unparse::unparse;
use crate::error::EvalError;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

fn progress_steps() -> u64 {
    static STEPS: OnceLock<u64> = OnceLock::new();
    let override_steps = PROGRESS_STEPS_OVERRIDE.load(Ordering::Relaxed);
    if override_steps != u64::MAX {
        return override_steps;
    }
    *STEPS.get_or_init(|| {
        std::env::var("APEVAL_PROGRESS_STEPS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1_000_000)
    })
}

pub fn set_progress_steps_override(steps: Option<u64>) {
    let val = steps.unwrap_or(u64::MAX);
    PROGRESS_STEPS_OVERRIDE.store(val, Ordering::Relaxed);
}

/// One head-normal reduction of `id`.
///
/// Terminals come back unchanged; a `Ref` expands to a deep clone of its
/// binding; a `Cons` reduces both children in place and comes back itself;
/// an `Ap` steps by the rule for its function position and re-reduces.
/// Reduced function positions and β-results are cached on the node in
/// place, so parents sharing it observe the reduction.
pub fn reduce(g: &mut Graph, id: NodeId, ctx: &mut EvalContext) -> Result<NodeId, EvalError> {
    ctx.count_step()?;
    let interval = progress_steps();
    if interval > 0 && ctx.steps as u64 % interval == 0 {
        eprintln!(
            "REDUCE_PROGRESS steps={} reachable={} pool={}",
            ctx.steps,
            g.reachable_count(id),
            g.len()
        );
    }
    match g.get(id).clone() {
        Node::Num { .. } | Node::Fun(_) | Node::Lambda { .. } => Ok(id),
        Node::Ref(name) => {
            let def = ctx
                .defs
                .get(&name)
                .copied()
                .ok_or(EvalError::UnknownBinding(name))?;
            Ok(g.deep_clone(def))
        }
        Node::Cons(head, tail) => {
            let reduced = reduce(g, head, ctx)?;
            if reduced != head {
                if let Node::Cons(slot, _) = g.get_mut(id) {
                    *slot = reduced;
                }
                ctx.record(g);
            }
            let reduced = reduce(g, tail, ctx)?;
            if reduced != tail {
                if let Node::Cons(_, slot) = g.get_mut(id) {
                    *slot = reduced;
                }
                ctx.record(g);
            }
            Ok(id)
        }
        Node::Ap { fun, arg } => match g.get(fun).clone() {
            // Applying a list applies the argument to its head, then
            // threads the tail through: (cons h t) x  ~>  ((x h) t).
            Node::Cons(head, tail) => {
                let inner = g.add(Node::Ap { fun: arg, arg: head });
                Ok(g.add(Node::Ap {
                    fun: inner,
                    arg: tail,
                }))
            }
            Node::Ap { .. } | Node::Ref(_) | Node::Closure { .. } => {
                let reduced = reduce(g, fun, ctx)?;
                if let Node::Ap { fun: slot, .. } = g.get_mut(id) {
                    *slot = reduced;
                }
                ctx.record(g);
                reduce(g, id, ctx)
            }
            Node::Lambda { bound, body } => {
                let instantiated = if bound == "_" {
                    body
                } else {
                    substitute(g, body, &bound, arg)
                };
                let forward = g.add(Node::fun("i"));
                g.set(
                    id,
                    Node::Ap {
                        fun: forward,
                        arg: instantiated,
                    },
                );
                ctx.record(g);
                reduce(g, id, ctx)
            }
            Node::Fun(_) => apply_function(g, id, ctx),
            Node::Num { .. } => Err(EvalError::TypeMismatch(format!(
                "expected function node: {}",
                unparse(g, id)
            ))),
        },
        Node::Closure { .. } => apply_closure(g, id, ctx),
    }
}

/// Whole-program evaluation, two phases: head-reduce the root until it is
/// terminal or reaches a fixpoint, then force the cons spine so lists
/// print fully evaluated. Phase two is bounded by `ctx.spine_limit`.
pub fn eval(g: &mut Graph, root: NodeId, ctx: &mut EvalContext) -> Result<NodeId, EvalError> {
    let mut curr = root;
    ctx.set_trace_root(curr);
    ctx.record(g);
    loop {
        if g.get(curr).is_terminal() {
            break;
        }
        let next = reduce(g, curr, ctx)?;
        if next == curr {
            break;
        }
        curr = next;
        ctx.set_trace_root(curr);
        ctx.record(g);
    }
    if matches!(g.get(curr), Node::Cons(..)) {
        force_spine(g, curr, ctx)?;
    }
    Ok(curr)
}

/// BFS over head/tail slots of a cons tree, reducing every slot to a
/// terminal and descending into nested cells. When the spine cap runs out
/// the remaining slots are left as they are.
pub fn force_spine(g: &mut Graph, root: NodeId, ctx: &mut EvalContext) -> Result<(), EvalError> {
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
    queue.push_back((root, 0));
    queue.push_back((root, 1));
    let mut forced = 0usize;
    while let Some((cell, side)) = queue.pop_front() {
        forced += 1;
        if forced > ctx.spine_limit {
            break;
        }
        loop {
            let child = cons_slot(g, cell, side);
            if g.get(child).is_terminal() {
                break;
            }
            let reduced = reduce(g, child, ctx)?;
            if reduced == child {
                break;
            }
            set_cons_slot(g, cell, side, reduced);
            ctx.record(g);
        }
        let child = cons_slot(g, cell, side);
        if matches!(g.get(child), Node::Cons(..)) {
            queue.push_back((child, 0));
            queue.push_back((child, 1));
        }
    }
    Ok(())
}

fn cons_slot(g: &Graph, cell: NodeId, side: usize) -> NodeId {
    match g.get(cell) {
        Node::Cons(head, tail) => {
            if side == 0 {
                *head
            } else {
                *tail
            }
        }
        other => unreachable!("spine queue holds cons cells, found {other:?}"),
    }
}

fn set_cons_slot(g: &mut Graph, cell: NodeId, side: usize, child: NodeId) {
    match g.get_mut(cell) {
        Node::Cons(head, tail) => {
            if side == 0 {
                *head = child;
            } else {
                *tail = child;
            }
        }
        other => unreachable!("spine queue holds cons cells, found {other:?}"),
    }
}
