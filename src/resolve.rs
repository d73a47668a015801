// `<use>` expansion. Runs in passes until nothing is pending; a pass that
// resolves nothing means the rest reference each other, which is reported
// as cycles instead of retried.

use crate::node::NodeId;
use crate::transform::{AffineTransform, compose};
use crate::tree::{SvgTree, UseReference};
use std::collections::{BTreeMap, HashSet};

pub fn resolve_uses(tree: &mut SvgTree) {
    while !tree.pending_use.is_empty() {
        let pending: Vec<(NodeId, UseReference)> = tree
            .pending_use
            .iter()
            .map(|(id, reference)| (*id, reference.clone()))
            .collect();

        let mut progress = false;
        for (node, reference) in pending {
            if expand_use(tree, node, &reference) {
                tree.pending_use.shift_remove(&node);
                progress = true;
            }
        }

        if !progress {
            report_cycles(tree);
            break;
        }
    }
}

// Returns `false` only when the target is itself still waiting.
fn expand_use(tree: &mut SvgTree, node: NodeId, reference: &UseReference) -> bool {
    let Some(target_name) = reference.target.as_deref().filter(|t| !t.is_empty()) else {
        return true;
    };
    let Some(target) = tree.node_by_id(target_name) else {
        if !tree.is_id_ignored(target_name) {
            let line = tree.node(node).line;
            tree.log_error("Referenced id not found", line);
        }
        return true;
    };
    if tree.pending_use.contains_key(&target) {
        return false;
    }

    let copy = tree.deep_copy(target);
    tree.add_child(node, copy);

    let use_node = tree.node_mut(node);
    use_node.local_transform = compose(
        &use_node.local_transform,
        &AffineTransform::translate(reference.x, reference.y),
    );
    tree.use_expansions += 1;
    true
}

// Builds use-id -> target-id edges over the stuck nodes and logs each cycle
// once, starting from the first node of the cycle reached.
fn report_cycles(tree: &mut SvgTree) {
    let mut edges: BTreeMap<String, String> = BTreeMap::new();
    let mut lines: BTreeMap<String, u32> = BTreeMap::new();
    for (node, reference) in &tree.pending_use {
        let svg_node = tree.node(*node);
        let (Some(id), Some(target)) = (&svg_node.id, &reference.target) else {
            continue;
        };
        edges.insert(id.clone(), target.clone());
        lines.insert(id.clone(), svg_node.line);
    }

    let mut cycles = Vec::new();
    while let Some((first, _)) = edges.first_key_value() {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = first.clone();
        let mut next = edges.get(&current).cloned();
        while let Some(target) = next.clone() {
            if visited.contains(&current) {
                break;
            }
            visited.insert(current.clone());
            current = target;
            next = edges.get(&current).cloned();
        }

        // A chain that ends in a missing id is a broken link, reported when
        // the reference itself was resolved.
        if next.is_some() {
            let line = lines.get(&current).copied().unwrap_or(0);
            cycles.push((cycle_starting_at(&current, &edges), line));
        }
        edges.retain(|id, _| !visited.contains(id));
    }

    for (cycle, line) in cycles {
        tree.log_error(format!("Circular dependency of <use> nodes: {cycle}"), line);
    }
}

fn cycle_starting_at(start: &str, edges: &BTreeMap<String, String>) -> String {
    let mut out = start.to_string();
    let mut current = start;
    while let Some(next) = edges.get(current) {
        out.push_str(" -> ");
        out.push_str(next);
        if next == start {
            break;
        }
        current = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_document;
    use crate::node::NodeKind;
    use roxmltree::Document;

    fn resolved(svg: &str) -> SvgTree {
        let doc = Document::parse(svg).expect("test document parses");
        let mut tree = SvgTree::new();
        extract_document(&mut tree, &doc).expect("svg root");
        resolve_uses(&mut tree);
        tree
    }

    #[test]
    fn missing_target_is_one_error() {
        let tree = resolved(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <use href="#nothing"/>
  <path d="M0 0L1 1"/>
</svg>"##,
        );
        assert!(tree.pending_use.is_empty());
        assert_eq!(
            tree.error_message(),
            "ERROR @ line 2: Referenced id not found"
        );
    }

    #[test]
    fn ignored_target_is_silent() {
        let tree = resolved(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <custom id="skip"/>
  <use href="#skip"/>
</svg>"##,
        );
        assert_eq!(tree.error_message(), "");
    }

    #[test]
    fn three_node_cycle_is_reported_once() {
        let tree = resolved(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 10 10">
  <use id="a" xlink:href="#b"/>
  <use id="b" xlink:href="#c"/>
  <use id="c" xlink:href="#a"/>
</svg>"##,
        );
        assert_eq!(
            tree.error_message(),
            "ERROR @ line 2: Circular dependency of <use> nodes: a -> b -> c -> a"
        );
    }

    #[test]
    fn chained_uses_resolve_in_later_passes() {
        let tree = resolved(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <use id="outer" href="#inner" x="1"/>
  <use id="inner" href="#shape" y="2" fill="#ff0000"/>
  <defs><path id="shape" d="M0 0L1 1"/></defs>
</svg>"##,
        );
        assert_eq!(tree.error_message(), "");
        assert!(tree.pending_use.is_empty());
        assert_eq!(tree.use_expansions, 2);

        let inner = tree.node_by_id("inner").expect("inner");
        assert_eq!(tree.node(inner).local_transform.f, 2.0);
        let copy = tree.children(inner)[0];
        assert!(matches!(tree.node(copy).kind, NodeKind::Leaf(_)));
        assert_eq!(tree.node(copy).attribute("fill"), Some("#ff0000"));
    }

    #[test]
    fn copy_keeps_its_own_attributes() {
        let tree = resolved(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <defs><path id="shape" fill="#00ff00" d="M0 0L1 1"/></defs>
  <use id="u" href="#shape" fill="#ff0000" stroke="#0000ff"/>
</svg>"##,
        );
        let u = tree.node_by_id("u").expect("use");
        let copy = tree.children(u)[0];
        assert_eq!(tree.node(copy).attribute("fill"), Some("#00ff00"));
        assert_eq!(tree.node(copy).attribute("stroke"), Some("#0000ff"));
    }
}
