//! Step trace - records the printed form of the root after every visible
//! reduction step. The reducer core does no I/O of its own; this is the
//! channel diagnostics flow through.

use crate::arena::{Graph, NodeId};
use crate::engine::unparse::unparse;

pub struct StepTrace {
    /// Accumulate printed forms in `steps`.
    pub keep: bool,
    /// Stream each step to stderr as `#n  -->  form`, eliding long runs
    /// shared with the previous step.
    pub print: bool,
    pub steps: Vec<String>,
    root: Option<NodeId>,
    prev: String,
}

impl StepTrace {
    pub fn new(keep: bool, print: bool) -> Self {
        Self {
            keep,
            print,
            steps: Vec::new(),
            root: None,
            prev: String::new(),
        }
    }

    /// The reducer points the trace at the current root; in-place child
    /// updates show up through it when the graph is re-printed.
    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// `step` is the reducer's entry counter at the time of the change.
    pub fn record(&mut self, g: &Graph, step: usize) {
        let Some(root) = self.root else { return };
        if !self.keep && !self.print {
            return;
        }
        let form = unparse(g, root);
        if self.keep {
            self.steps.push(form.clone());
        }
        if self.print {
            let (pfx, changed, sfx) = elide_common(&self.prev, &form);
            eprintln!("#{step}  -->  {pfx}{changed}{sfx}");
            self.prev = form;
        }
    }
}

/// Replace a shared prefix/suffix longer than six bytes with `{n}==` /
/// `=={n}` markers so consecutive step printouts show only what moved.
fn elide_common(prev: &str, next: &str) -> (String, String, String) {
    let p = prev.as_bytes();
    let n = next.as_bytes();
    let mut pfx = 0;
    while pfx < p.len() && pfx < n.len() && p[pfx] == n[pfx] {
        pfx += 1;
    }
    let mut sfx = 0;
    while sfx < p.len().saturating_sub(pfx)
        && sfx < n.len().saturating_sub(pfx)
        && p[p.len() - 1 - sfx] == n[n.len() - 1 - sfx]
    {
        sfx += 1;
    }
    let head = if pfx > 6 {
        format!("{{{pfx}}}==  ")
    } else {
        pfx = 0;
        String::new()
    };
    let tail = if sfx > 6 {
        format!("  =={{{sfx}}}")
    } else {
        sfx = 0;
        String::new()
    };
    let changed = String::from_utf8_lossy(&n[pfx..n.len() - sfx]).into_owned();
    (head, changed, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elide_common_short_strings_untouched() {
        let (pfx, changed, sfx) = elide_common("abc", "abd");
        assert_eq!(pfx, "");
        assert_eq!(changed, "abd");
        assert_eq!(sfx, "");
    }

    #[test]
    fn test_elide_common_long_prefix_and_suffix() {
        let (pfx, changed, sfx) =
            elide_common("aaaaaaaaaaXbbbbbbbbbb", "aaaaaaaaaaYbbbbbbbbbb");
        assert_eq!(pfx, "{10}==  ");
        assert_eq!(changed, "Y");
        assert_eq!(sfx, "  =={10}");
    }

    #[test]
    fn test_elide_common_identical_strings() {
        let (pfx, changed, sfx) = elide_common("aaaaaaaaaa", "aaaaaaaaaa");
        assert_eq!(pfx, "{10}==  ");
        assert_eq!(changed, "");
        assert_eq!(sfx, "");
    }
}
