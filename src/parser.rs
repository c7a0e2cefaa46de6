use crate::arena::{Graph, Node, NodeId};
use crate::error::EvalError;
use rustc_hash::FxHashMap;

/// Recursive-descent parser for binding programs.
///
/// Input is one binding per line, `name = tokens...`, tokens separated by
/// single spaces, prefix applications written with `ap`. Blank lines are
/// skipped. Besides the bindings table the parser keeps running counts of
/// leaf nodes and self-referential definitions.
pub struct Parser {
    /// Binding name to root node; later definitions overwrite earlier ones.
    pub bindings: FxHashMap<String, NodeId>,
    /// Non-`ap` leaf nodes seen across all bindings.
    pub leaf_count: usize,
    /// Bindings whose right-hand side refers to the binding itself.
    pub recursive_count: usize,
    parsing: Option<String>,
    last: Option<NodeId>,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            bindings: FxHashMap::default(),
            leaf_count: 0,
            recursive_count: 0,
            parsing: None,
            last: None,
        }
    }

    /// Parse a whole program into `g`, filling the bindings table.
    /// Returns the root of the last binding in source order.
    pub fn parse(&mut self, g: &mut Graph, text: &str) -> Result<Option<NodeId>, EvalError> {
        self.bindings.clear();
        self.last = None;
        for (row, line) in text.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = line.split(' ').collect();
            self.parsing = Some(tokens[0].to_string());
            if tokens.len() < 3 {
                return Err(EvalError::Parse {
                    line: row + 1,
                    message: format!("not enough tokens: {line}"),
                });
            }
            let mut pos = 2;
            let node = self
                .parse_expr(g, &tokens, &mut pos)
                .map_err(|message| EvalError::Parse {
                    line: row + 1,
                    message,
                })?;
            if pos < tokens.len() {
                return Err(EvalError::Parse {
                    line: row + 1,
                    message: format!("unparsed leftover: {}", tokens[pos..].join(" ")),
                });
            }
            self.bindings.insert(tokens[0].to_string(), node);
            self.last = Some(node);
        }
        Ok(self.last)
    }

    pub fn binding(&self, name: &str) -> Option<NodeId> {
        self.bindings.get(name).copied()
    }

    /// One expression with one token of lookahead: `ap` introduces an
    /// application of the next two expressions; `:`-tokens are references;
    /// integer tokens are numbers; anything else is a function name.
    fn parse_expr(
        &mut self,
        g: &mut Graph,
        tokens: &[&str],
        pos: &mut usize,
    ) -> Result<NodeId, String> {
        if *pos >= tokens.len() {
            return Err(format!("out of tokens at position {}", *pos));
        }
        let token = tokens[*pos];
        *pos += 1;
        if token == "ap" {
            let fun = self.parse_expr(g, tokens, pos)?;
            let arg = self.parse_expr(g, tokens, pos)?;
            return Ok(g.add(Node::Ap { fun, arg }));
        }
        self.leaf_count += 1;
        if token.starts_with(':') {
            if self.parsing.as_deref() == Some(token) {
                self.recursive_count += 1;
                self.parsing = None;
            }
            return Ok(g.add(Node::Ref(token.to_string())));
        }
        if let Ok(value) = token.parse::<i64>() {
            return Ok(g.add(Node::num(value)));
        }
        Ok(g.add(Node::Fun(token.to_string())))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
