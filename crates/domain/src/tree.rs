//! Threaded comment trees.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Comment, CommentId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(comment: Comment) -> Self {
        Self {
            comment,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &CommentId {
        &self.comment.id
    }
}

/// What [`CommentTree::walk_mut`] should do after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
    /// Detaches the subtree.
    Remove,
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommentTree {
    roots: Vec<CommentNode>,
}

/// Replies whose parent is absent are dropped, not promoted to roots.
pub fn build_tree(records: &[Comment]) -> CommentTree {
    let mut index: HashMap<&CommentId, usize> = HashMap::with_capacity(records.len());
    for (i, c) in records.iter().enumerate() {
        index.entry(&c.id).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (i, c) in records.iter().enumerate() {
        if index.get(&c.id) != Some(&i) {
            continue;
        }
        match &c.parent_id {
            None => roots.push(i),
            Some(parent) => match index.get(parent) {
                Some(&p) if p != i => children[p].push(i),
                _ => {}
            },
        }
    }

    fn assemble(records: &[Comment], children: &[Vec<usize>], i: usize) -> CommentNode {
        CommentNode {
            comment: records[i].clone(),
            children: children[i]
                .iter()
                .map(|&c| assemble(records, children, c))
                .collect(),
        }
    }

    CommentTree {
        roots: roots
            .into_iter()
            .map(|i| assemble(records, &children, i))
            .collect(),
    }
}

impl CommentTree {
    pub fn new(roots: Vec<CommentNode>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        fn count(nodes: &[CommentNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    /// Pre-order visit of every node. Nodes answered with [`Visit::Remove`]
    /// are detached (subtree included) and handed back.
    pub fn walk_mut<F>(&mut self, mut visitor: F) -> Vec<CommentNode>
    where
        F: FnMut(&mut CommentNode) -> Visit,
    {
        fn walk<F>(nodes: &mut Vec<CommentNode>, f: &mut F, removed: &mut Vec<CommentNode>) -> bool
        where
            F: FnMut(&mut CommentNode) -> Visit,
        {
            let mut i = 0;
            while i < nodes.len() {
                match f(&mut nodes[i]) {
                    Visit::Remove => {
                        removed.push(nodes.remove(i));
                        continue;
                    }
                    Visit::Stop => return true,
                    Visit::Skip => {}
                    Visit::Descend => {
                        if walk(&mut nodes[i].children, f, removed) {
                            return true;
                        }
                    }
                }
                i += 1;
            }
            false
        }

        let mut removed = Vec::new();
        walk(&mut self.roots, &mut visitor, &mut removed);
        removed
    }

    /// Applies `f` to the first node with `id`. Returns whether it was found.
    pub fn modify<F>(&mut self, id: &CommentId, f: F) -> bool
    where
        F: FnOnce(&mut CommentNode),
    {
        let mut f = Some(f);
        self.walk_mut(|node| {
            if node.id() == id {
                if let Some(f) = f.take() {
                    f(node);
                }
                Visit::Stop
            } else {
                Visit::Descend
            }
        });
        f.is_none()
    }

    pub fn find(&self, id: &CommentId) -> Option<&CommentNode> {
        fn find<'a>(nodes: &'a [CommentNode], id: &CommentId) -> Option<&'a CommentNode> {
            for n in nodes {
                if n.id() == id {
                    return Some(n);
                }
                if let Some(hit) = find(&n.children, id) {
                    return Some(hit);
                }
            }
            None
        }
        find(&self.roots, id)
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.find(id).is_some()
    }

    /// Places `node` first among the roots, or first among `parent`'s replies.
    /// Gives the node back when the parent isn't in the tree.
    pub fn insert_first(&mut self, parent: Option<&CommentId>, node: CommentNode) -> Result<(), CommentNode> {
        match parent {
            None => {
                self.roots.insert(0, node);
                Ok(())
            }
            Some(parent) => {
                let mut pending = Some(node);
                self.modify(parent, |p| {
                    if let Some(node) = pending.take() {
                        p.children.insert(0, node);
                    }
                });
                match pending {
                    None => Ok(()),
                    Some(node) => Err(node),
                }
            }
        }
    }

    /// Detaches every node with `id`, wherever it sits; its replies go with it.
    pub fn remove(&mut self, id: &CommentId) -> Option<CommentNode> {
        self.walk_mut(|node| {
            if node.id() == id {
                Visit::Remove
            } else {
                Visit::Descend
            }
        })
        .into_iter()
        .next()
    }

    pub fn replace(&mut self, id: &CommentId, comment: Comment) -> bool {
        self.modify(id, |node| node.comment = comment)
    }

    pub fn flatten(&self) -> Vec<CommentId> {
        fn push(nodes: &[CommentNode], out: &mut Vec<CommentId>) {
            for n in nodes {
                out.push(n.id().clone());
                push(&n.children, out);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        push(&self.roots, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportId;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn c(id: &str, parent: Option<&str>) -> Comment {
        Comment {
            id: CommentId::new_unchecked(id),
            report_id: ReportId::new_unchecked("r1"),
            parent_id: parent.map(CommentId::new_unchecked),
            author_name: "Anonymous".into(),
            text: format!("text of {id}"),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: None,
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id().as_str()).collect()
    }

    #[test]
    fn nests_replies_in_input_order() {
        let tree = build_tree(&[
            c("b", None),
            c("b2", Some("b")),
            c("a", None),
            c("b1", Some("b")),
            c("b2x", Some("b2")),
        ]);
        assert_eq!(ids(tree.roots()), ["b", "a"]);
        let b = &tree.roots()[0];
        assert_eq!(ids(&b.children), ["b2", "b1"]);
        assert_eq!(ids(&b.children[0].children), ["b2x"]);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn parent_listed_after_child_still_links() {
        let tree = build_tree(&[c("reply", Some("root")), c("root", None)]);
        assert_eq!(ids(&tree.roots()[0].children), ["reply"]);
    }

    #[test]
    fn orphans_are_dropped_not_promoted() {
        let tree = build_tree(&[c("a", None), c("lost", Some("gone")), c("lost-kid", Some("lost"))]);
        assert_eq!(tree.flatten(), vec![CommentId::new_unchecked("a")]);
    }

    #[test]
    fn flatten_covers_everything_reachable() {
        let records = vec![
            c("1", None),
            c("2", Some("1")),
            c("3", Some("2")),
            c("4", None),
            c("5", Some("4")),
            c("6", Some("missing")),
            c("7", Some("7")),
        ];
        let tree = build_tree(&records);
        let got: HashSet<_> = tree.flatten().into_iter().collect();
        let want: HashSet<_> = ["1", "2", "3", "4", "5"]
            .into_iter()
            .map(CommentId::new_unchecked)
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut dup = c("a", None);
        dup.text = "second".into();
        let tree = build_tree(&[c("a", None), dup]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.roots()[0].comment.text, "text of a");
    }

    #[test]
    fn remove_takes_only_the_target_subtree() {
        let mut tree = build_tree(&[
            c("R", None),
            c("C1", Some("R")),
            c("C2", Some("R")),
            c("G", Some("C1")),
        ]);
        let removed = tree.remove(&CommentId::new_unchecked("C1")).unwrap();
        assert_eq!(ids(&removed.children), ["G"]);
        assert_eq!(ids(&tree.roots()[0].children), ["C2"]);
        assert!(!tree.contains(&CommentId::new_unchecked("G")));
        assert!(tree.remove(&CommentId::new_unchecked("C1")).is_none());
    }

    #[test]
    fn insert_first_reaches_any_depth() {
        let mut tree = build_tree(&[c("a", None), c("b", Some("a")), c("c", Some("b"))]);
        tree.insert_first(Some(&CommentId::new_unchecked("c")), CommentNode::leaf(c("d", Some("c"))))
            .unwrap();
        tree.insert_first(None, CommentNode::leaf(c("z", None))).unwrap();
        assert_eq!(ids(tree.roots()), ["z", "a"]);
        assert_eq!(
            tree.flatten(),
            ["z", "a", "b", "c", "d"].map(CommentId::new_unchecked).to_vec()
        );

        let orphan = CommentNode::leaf(c("e", Some("nope")));
        assert!(tree.insert_first(Some(&CommentId::new_unchecked("nope")), orphan).is_err());
    }

    #[test]
    fn replace_keeps_position_and_children() {
        let mut tree = build_tree(&[c("a", None), c("b", None), c("b1", Some("b"))]);
        let mut swapped = c("b", None);
        swapped.text = "edited".into();
        assert!(tree.replace(&CommentId::new_unchecked("b"), swapped));
        let b = &tree.roots()[1];
        assert_eq!(b.comment.text, "edited");
        assert_eq!(ids(&b.children), ["b1"]);
    }

    #[test]
    fn walk_stop_and_skip() {
        let mut tree = build_tree(&[c("a", None), c("a1", Some("a")), c("b", None)]);
        let mut seen = Vec::new();
        tree.walk_mut(|n| {
            seen.push(n.id().as_str().to_string());
            if n.id().as_str() == "a" {
                Visit::Skip
            } else {
                Visit::Stop
            }
        });
        assert_eq!(seen, ["a", "b"]);
    }
}
