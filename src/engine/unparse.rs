//! Structural printer for expression graphs.

use crate::arena::{Graph, Node, NodeId};
use std::collections::HashSet;

#[derive(Clone, Copy, Default)]
pub struct PrintOptions {
    /// Print `{#id}` instead of re-expanding a node already printed once.
    pub show_sharing: bool,
    /// Prefix lambdas, closures and applications with their node id.
    pub print_addr: bool,
}

pub fn unparse(g: &Graph, id: NodeId) -> String {
    unparse_with(g, id, PrintOptions::default())
}

pub fn unparse_with(g: &Graph, id: NodeId, opts: PrintOptions) -> String {
    enum Item<'a> {
        Node(NodeId),
        Text(&'a str),
        Owned(String),
    }

    let mut out = String::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<Item<'_>> = Vec::new();
    stack.push(Item::Node(id));

    while let Some(item) = stack.pop() {
        match item {
            Item::Text(s) => out.push_str(s),
            Item::Owned(s) => out.push_str(&s),
            Item::Node(curr) => {
                if opts.show_sharing && !seen.insert(curr) {
                    out.push_str(&format!("{{#{}}}", curr.0));
                    continue;
                }
                match g.get(curr) {
                    Node::Num {
                        modulated: Some(bits),
                        ..
                    } => out.push_str(bits),
                    Node::Num { value, .. } => out.push_str(&value.to_string()),
                    Node::Fun(name) => out.push_str(name),
                    Node::Ref(name) => out.push_str(name),
                    Node::Lambda { bound, body } => {
                        stack.push(Item::Text(")"));
                        stack.push(Item::Node(*body));
                        if opts.print_addr {
                            stack.push(Item::Owned(format!("#{}|({}.", curr.0, bound)));
                        } else {
                            stack.push(Item::Owned(format!("({bound}.")));
                        }
                    }
                    Node::Cons(head, tail) => {
                        stack.push(Item::Text(" ]"));
                        stack.push(Item::Node(*tail));
                        stack.push(Item::Text(" :: "));
                        stack.push(Item::Node(*head));
                        stack.push(Item::Text("[ "));
                    }
                    Node::Closure { name, args } => {
                        stack.push(Item::Text(")"));
                        for (pos, arg) in args.iter().enumerate().rev() {
                            stack.push(Item::Node(*arg));
                            if pos > 0 {
                                stack.push(Item::Text(", "));
                            }
                        }
                        if opts.print_addr {
                            stack.push(Item::Owned(format!("#{}|{}(", curr.0, name)));
                        } else {
                            stack.push(Item::Owned(format!("{name}(")));
                        }
                    }
                    Node::Ap { fun, arg } => {
                        stack.push(Item::Text(")"));
                        stack.push(Item::Node(*arg));
                        stack.push(Item::Text(" "));
                        stack.push(Item::Node(*fun));
                        if opts.print_addr {
                            stack.push(Item::Owned(format!("#{}|(", curr.0)));
                        } else {
                            stack.push(Item::Text("("));
                        }
                    }
                }
            }
        }
    }

    out
}
