//! Capture-free substitution of a lambda-bound reference.

use crate::arena::{Graph, Node, NodeId};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Child slot within a node: argument positions count from 0, the
/// function/body pointer is the sentinel `-1`. Search order visits the
/// argument children before the function child.
type Slot = i32;

fn children(node: &Node) -> SmallVec<[(Slot, NodeId); 3]> {
    let mut out = SmallVec::new();
    match node {
        Node::Ap { fun, arg } => {
            out.push((0, *arg));
            out.push((-1, *fun));
        }
        Node::Lambda { body, .. } => out.push((-1, *body)),
        Node::Cons(head, tail) => {
            out.push((0, *head));
            out.push((1, *tail));
        }
        Node::Closure { args, .. } => {
            for (pos, arg) in args.iter().enumerate() {
                out.push((pos as Slot, *arg));
            }
        }
        Node::Fun(_) | Node::Num { .. } | Node::Ref(_) => {}
    }
    out
}

fn with_child(node: &Node, slot: Slot, child: NodeId) -> Node {
    let mut copy = node.clone();
    match (&mut copy, slot) {
        (Node::Ap { arg, .. }, 0) => *arg = child,
        (Node::Ap { fun, .. }, -1) => *fun = child,
        (Node::Lambda { body, .. }, -1) => *body = child,
        (Node::Cons(head, _), 0) => *head = child,
        (Node::Cons(_, tail), 1) => *tail = child,
        (Node::Closure { args, .. }, pos) if pos >= 0 && (pos as usize) < args.len() => {
            args[pos as usize] = child
        }
        _ => unreachable!("no slot {slot} on {node:?}"),
    }
    copy
}

/// Replace the first `Ref(name)` in breadth-first order with `replacement`,
/// re-allocating only the nodes on the path from `root` down to the match.
/// Everything off that path stays shared with the input. Returns `root`
/// unchanged when no occurrence exists.
///
/// Only one occurrence is resolved per call; a body with several uses of
/// the bound name gets the rest resolved on later reduction passes.
pub fn substitute(g: &mut Graph, root: NodeId, name: &str, replacement: NodeId) -> NodeId {
    struct Queued {
        id: NodeId,
        path: Vec<(NodeId, Slot)>,
    }
    let mut queue: VecDeque<Queued> = VecDeque::new();
    queue.push_back(Queued {
        id: root,
        path: Vec::new(),
    });
    let found = loop {
        let Some(item) = queue.pop_front() else {
            return root;
        };
        match g.get(item.id) {
            Node::Ref(r) if r == name => break item,
            node => {
                for (slot, child) in children(node) {
                    let mut path = item.path.clone();
                    path.push((item.id, slot));
                    queue.push_back(Queued { id: child, path });
                }
            }
        }
    };
    let mut clone = replacement;
    for (parent, slot) in found.path.into_iter().rev() {
        let node = with_child(g.get(parent), slot, clone);
        clone = g.add(node);
    }
    clone
}
