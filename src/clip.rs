use crate::node::{NodeId, NodeKind};
use crate::transform::compose;
use crate::tree::{ClipDeferral, SvgTree};

pub fn clip_reference_id(reference: &str) -> Option<&str> {
    let (_, rest) = reference.split_once('#')?;
    let id = match rest.find(')') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let id = id.trim();
    (!id.is_empty()).then_some(id)
}

pub fn substitute_clips(tree: &mut SvgTree) {
    let deferrals: Vec<(NodeId, ClipDeferral)> = tree
        .clip_deferrals
        .iter()
        .map(|(node, deferral)| (*node, deferral.clone()))
        .collect();
    for (node, deferral) in deferrals {
        substitute(tree, node, &deferral);
    }
}

fn substitute(tree: &mut SvgTree, node: NodeId, deferral: &ClipDeferral) {
    let Some(target) = clip_reference_id(&deferral.reference).and_then(|id| tree.node_by_id(id))
    else {
        return;
    };
    if !matches!(tree.node(target).kind, NodeKind::ClipPath(_)) {
        return;
    }

    let copy = tree.deep_copy(target);
    if !tree.replace_child(deferral.parent, node, copy) {
        return;
    }
    add_affected_node(tree, copy, node);
    tree.clip_substitutions += 1;
}

// The affected node fills its gaps from the clip's attributes, and the
// clip's transform is drawn in the affected node's space.
fn add_affected_node(tree: &mut SvgTree, clip: NodeId, affected: NodeId) {
    if let NodeKind::ClipPath(data) = &mut tree.node_mut(clip).kind {
        data.affected.push(affected);
    }
    let clip_attributes = tree.node(clip).attributes.clone();
    tree.fill_empty_attributes(affected, &clip_attributes);

    let affected_local = tree.node(affected).local_transform;
    let clip_node = tree.node_mut(clip);
    clip_node.local_transform = compose(&clip_node.local_transform, &affected_local);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_document;
    use roxmltree::Document;

    fn substituted(svg: &str) -> SvgTree {
        let doc = Document::parse(svg).expect("test document parses");
        let mut tree = SvgTree::new();
        extract_document(&mut tree, &doc).expect("svg root");
        substitute_clips(&mut tree);
        tree
    }

    #[test]
    fn extracts_reference_ids() {
        assert_eq!(clip_reference_id("url(#clip)"), Some("clip"));
        assert_eq!(clip_reference_id("url( #a b )"), Some("a b"));
        assert_eq!(clip_reference_id("#tail"), Some("tail"));
        assert_eq!(clip_reference_id("url(clip)"), None);
        assert_eq!(clip_reference_id("url(#)"), None);
    }

    #[test]
    fn clipped_leaf_moves_under_a_clip_copy() {
        let tree = substituted(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <clipPath id="c"><rect width="5" height="5"/></clipPath>
  <path id="p" transform="translate(2,0)" d="M0 0L9 9" clip-path="url(#c)"/>
</svg>"##,
        );
        let root = tree.root.expect("root");
        let leaf = tree.node_by_id("p").expect("leaf");
        let definition = tree.node_by_id("c").expect("clip");

        let children = tree.children(root);
        assert_eq!(children.len(), 1);
        let copy = children[0];
        assert_ne!(copy, definition);
        let NodeKind::ClipPath(data) = &tree.node(copy).kind else {
            panic!("expected clip node");
        };
        assert_eq!(data.affected, vec![leaf]);
        assert_eq!(data.children.len(), 1);
        assert_eq!(tree.node(copy).local_transform.e, 2.0);
        assert_eq!(tree.clip_substitutions, 1);
    }

    #[test]
    fn unknown_or_non_clip_targets_leave_the_node_alone() {
        let tree = substituted(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <path id="other" d="M0 0L1 1"/>
  <path d="M0 0L9 9" clip-path="url(#missing)"/>
  <path d="M0 0L9 9" clip-path="url(#other)"/>
</svg>"##,
        );
        let root = tree.root.expect("root");
        assert!(
            tree.children(root)
                .iter()
                .all(|c| matches!(tree.node(*c).kind, NodeKind::Leaf(_)))
        );
        assert_eq!(tree.clip_substitutions, 0);
    }

    #[test]
    fn each_reference_gets_its_own_copy() {
        let tree = substituted(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <mask id="m"><rect width="5" height="5" fill="#ffffff"/></mask>
  <g mask="url(#m)"><path d="M0 0L9 9"/></g>
  <path d="M0 0L9 9" mask="url(#m)"/>
</svg>"##,
        );
        let root = tree.root.expect("root");
        let children = tree.children(root);
        assert_eq!(children.len(), 2);
        assert_ne!(children[0], children[1]);
        for child in children {
            let NodeKind::ClipPath(data) = &tree.node(child).kind else {
                panic!("expected mask node");
            };
            assert!(data.is_mask);
            assert_eq!(data.affected.len(), 1);
        }
    }
}
