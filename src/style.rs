use crate::node::{NodeId, SVG_OPACITY, is_presentation_attribute};
use crate::tree::SvgTree;

const SVG_CLIP_PATH: &str = "clip-path";
const SVG_MASK: &str = "mask";

pub fn parse_style_block(tree: &mut SvgTree, text: &str) {
    for chunk in text.split('}') {
        let Some((selectors, body)) = chunk.split_once('{') else {
            continue;
        };
        let body = body.trim();
        for selector in selectors.split(',') {
            let selector = selector.trim();
            if !selector.is_empty() {
                tree.add_style_class(selector, body);
            }
        }
    }
}

// `name:value` pairs of a declaration list, in source order. Entries without
// exactly one colon or with an empty side are skipped.
pub fn declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let mut parts = decl.split(':');
        let name = parts.next()?.trim();
        let value = parts.next()?.trim();
        if parts.next().is_some() || name.is_empty() || value.is_empty() {
            return None;
        }
        Some((name, value))
    })
}

pub fn is_display_none(style: &str) -> bool {
    declarations(style).any(|(name, value)| name == "display" && value == "none")
}

pub fn has_zero_opacity(style: &str) -> bool {
    declarations(style).any(|(name, value)| {
        name == SVG_OPACITY && value.parse::<f64>().is_ok_and(|v| v == 0.0)
    })
}

// Applies a declaration list to a node. Declarations are applied from last
// to first, so for a repeated property the first one is kept; combined rule
// bodies put newer rules first for the same reason.
pub fn add_style_to_node(tree: &mut SvgTree, node: NodeId, style: &str) {
    let decls: Vec<(String, String)> = declarations(style)
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect();
    for (name, value) in decls.iter().rev() {
        if is_presentation_attribute(name) {
            tree.fill_presentation(node, name, value);
        }
        if name == SVG_CLIP_PATH || name == SVG_MASK {
            if let Some(parent) = tree.find_parent(node) {
                tree.add_clip_deferral(node, parent, value);
            }
        }
    }
}

// Cascade pass: every node registered under a selector receives that
// selector's rule body.
pub fn apply_styles(tree: &mut SvgTree) {
    let registrations: Vec<(String, Vec<NodeId>)> = tree
        .style_affected_nodes
        .iter()
        .map(|(selector, nodes)| (selector.clone(), nodes.iter().copied().collect()))
        .collect();
    for (selector, nodes) in registrations {
        let Some(body) = tree.style_class_attributes(&selector).map(str::to_string) else {
            continue;
        };
        for node in nodes {
            add_style_to_node(tree, node, &body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SvgNode;

    #[test]
    fn style_block_registers_each_selector() {
        let mut tree = SvgTree::new();
        parse_style_block(
            &mut tree,
            ".a, path.b { fill:#ff0000; }\n .c{stroke:blue}\n garbage",
        );
        assert_eq!(tree.style_class_attributes(".a"), Some("fill:#ff0000;"));
        assert_eq!(tree.style_class_attributes("path.b"), Some("fill:#ff0000;"));
        assert_eq!(tree.style_class_attributes(".c"), Some("stroke:blue"));
        assert_eq!(tree.style_class_attributes("garbage"), None);
    }

    #[test]
    fn declarations_skip_malformed_entries() {
        let decls: Vec<_> = declarations("fill: red; ; stroke:; a:b:c; opacity:0.5").collect();
        assert_eq!(decls, vec![("fill", "red"), ("opacity", "0.5")]);
    }

    #[test]
    fn detects_hidden_and_transparent_styles() {
        assert!(is_display_none("fill:red; display:none"));
        assert!(!is_display_none("display:inline"));
        assert!(has_zero_opacity("opacity:0"));
        assert!(has_zero_opacity("fill:red;opacity: 0.0;"));
        assert!(!has_zero_opacity("opacity:0.5"));
        assert!(!has_zero_opacity("fill-opacity:0"));
    }

    #[test]
    fn class_rule_overwrites_direct_attribute() {
        let mut tree = SvgTree::new();
        let leaf = tree.add_node(SvgNode::leaf("path", 1));
        tree.fill_presentation(leaf, "fill", "#00ff00");
        tree.add_affected_node_to_style_class(".cls", leaf);
        parse_style_block(&mut tree, ".cls{fill:#ff0000;}");
        apply_styles(&mut tree);
        assert_eq!(tree.node(leaf).attribute("fill"), Some("#ff0000"));
    }

    #[test]
    fn first_declaration_of_a_property_wins() {
        let mut tree = SvgTree::new();
        let leaf = tree.add_node(SvgNode::leaf("path", 1));
        add_style_to_node(&mut tree, leaf, "fill:#111111;fill:#222222;display:none");
        assert_eq!(tree.node(leaf).attribute("fill"), Some("#111111"));
        assert_eq!(tree.node(leaf).attribute("display"), None);
    }

    #[test]
    fn clip_reference_in_style_is_deferred() {
        let mut tree = SvgTree::new();
        let root = tree.add_node(SvgNode::group("svg", 1));
        tree.root = Some(root);
        let leaf = tree.add_node(SvgNode::leaf("path", 2));
        tree.add_child(root, leaf);
        add_style_to_node(&mut tree, leaf, "clip-path:url(#c)");
        let deferral = &tree.clip_deferrals[&leaf];
        assert_eq!(deferral.parent, root);
        assert_eq!(deferral.reference, "url(#c)");
    }
}
