use crate::color::Rgba;
use crate::error::ConvertError;
use crate::gradient::{
    GradientDef, GradientKind, GradientStop, gradient_attribute_name, normalize_offset,
    parse_offset, parse_opacity,
};
use crate::node::{NodeId, NodeKind, SvgNode, is_presentation_attribute};
use crate::shapes;
use crate::style::{self, add_style_to_node, has_zero_opacity, is_display_none};
use crate::transform::parse_transform_list;
use crate::tree::{SvgTree, UseReference, invalid_value};
use roxmltree::{Document, Node};
use std::collections::BTreeMap;

const LEAF_TAGS: [&str; 7] = [
    "path", "rect", "circle", "ellipse", "polygon", "polyline", "line",
];

const UNSUPPORTED_TAGS: &[&str] = &[
    // animation
    "animate",
    "animateColor",
    "animateMotion",
    "animateTransform",
    "mpath",
    "set",
    // containers
    "a",
    "glyph",
    "marker",
    "missing-glyph",
    "pattern",
    "switch",
    "symbol",
    // filter primitives
    "feBlend",
    "feColorMatrix",
    "feComponentTransfer",
    "feComposite",
    "feConvolveMatrix",
    "feDiffuseLighting",
    "feDisplacementMap",
    "feFlood",
    "feFuncA",
    "feFuncB",
    "feFuncG",
    "feFuncR",
    "feGaussianBlur",
    "feImage",
    "feMerge",
    "feMergeNode",
    "feMorphology",
    "feOffset",
    "feSpecularLighting",
    "feTile",
    "feTurbulence",
    "feDistantLight",
    "fePointLight",
    "feSpotLight",
    // fonts
    "font",
    "font-face",
    "font-face-format",
    "font-face-name",
    "font-face-src",
    "font-face-uri",
    "hkern",
    "vkern",
    // stray gradient stop
    "stop",
    // graphics and text
    "image",
    "text",
    "altGlyph",
    "altGlyphDef",
    "altGlyphItem",
    "glyphRef",
    "textPath",
    "tref",
    "tspan",
    // everything else
    "color-profile",
    "cursor",
    "filter",
    "foreignObject",
    "script",
    "view",
];

const SVG_CLIP_PATH: &str = "clip-path";
const SVG_MASK: &str = "mask";

pub fn line_of(doc: &Document<'_>, node: Node<'_, '_>) -> u32 {
    doc.text_pos_at(node.range().start).row
}

// Reads the root `<svg>` element and everything below it. A missing or
// malformed viewBox is logged and stops extraction.
pub fn extract_document(tree: &mut SvgTree, doc: &Document<'_>) -> Result<(), ConvertError> {
    let root_element = doc.root_element();
    if root_element.tag_name().name() != "svg" {
        return Err(ConvertError::NotSvg(format!(
            "root element is <{}>",
            root_element.tag_name().name()
        )));
    }

    let line = line_of(doc, root_element);
    tree.parse_dimension(
        root_element.attribute("width"),
        root_element.attribute("height"),
        root_element.attribute("viewBox"),
        line,
    );
    if tree.view_box.is_none() {
        tree.log_error("Missing \"viewBox\" in <svg> element", line);
        return Ok(());
    }

    let root = create_node(tree, root_element, SvgNode::group("svg", line));
    tree.root = Some(root);
    traverse(tree, doc, root, root_element);
    Ok(())
}

// Registers the id and reads the attributes every node kind shares: the
// transform and the presentation attributes.
fn create_node(tree: &mut SvgTree, element: Node<'_, '_>, mut node: SvgNode) -> NodeId {
    node.id = element.attribute("id").map(str::to_string);
    if let Some(transform) = element.attribute("transform") {
        node.local_transform = parse_transform_list(transform);
    }
    let id = tree.add_node(node);
    for attr in element.attributes() {
        if is_presentation_attribute(attr.name()) {
            tree.fill_presentation(id, attr.name(), attr.value());
        }
    }
    if let Some(name) = element.attribute("id") {
        tree.register_id(name, id);
    }
    id
}

fn traverse(tree: &mut SvgTree, doc: &Document<'_>, group: NodeId, element: Node<'_, '_>) {
    for child in element.children().filter(|n| n.is_element()) {
        if !child.has_children() && child.attributes().next().is_none() {
            continue;
        }
        let tag = child.tag_name().name();
        let line = line_of(doc, child);

        if LEAF_TAGS.contains(&tag) {
            let leaf = create_node(tree, child, SvgNode::leaf(tag, line));
            tree.add_child(group, leaf);
            extract_leaf(tree, doc, group, leaf, child);
            tree.has_leaf = true;
            continue;
        }

        match tag {
            "g" => {
                let node = create_node(tree, child, SvgNode::group(tag, line));
                tree.add_child(group, node);
                extract_group_attributes(tree, group, node, child);
                traverse(tree, doc, node, child);
            }
            "use" => {
                let node = create_node(tree, child, SvgNode::group(tag, line));
                tree.add_child(group, node);
                let reference = use_reference(tree, child, line);
                tree.add_pending_use(node, reference);
            }
            "defs" => {
                // Only the id registrations of the content matter.
                let holder = tree.add_node(SvgNode::group(tag, line));
                traverse(tree, doc, holder, child);
            }
            "clipPath" | "mask" => {
                let clip = SvgNode::clip_path(tag, line, tag == "mask");
                let node = create_node(tree, child, clip);
                traverse(tree, doc, node, child);
            }
            "style" => {
                let text: String = child
                    .descendants()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect();
                style::parse_style_block(tree, &text);
            }
            "linearGradient" | "radialGradient" => {
                let kind = if tag == "linearGradient" {
                    GradientKind::Linear
                } else {
                    GradientKind::Radial
                };
                let def = extract_gradient(tree, doc, kind, child);
                let mut node = SvgNode::new(tag, line, NodeKind::Gradient(def));
                node.id = child.attribute("id").map(str::to_string);
                let id = tree.add_node(node);
                if let Some(name) = child.attribute("id") {
                    tree.register_id(name, id);
                }
                tree.has_gradient = true;
            }
            _ => {
                if let Some(name) = child.attribute("id") {
                    tree.add_ignored_id(name);
                }
                if UNSUPPORTED_TAGS.contains(&tag) {
                    tree.log_error(format!("<{tag}> is not supported"), line);
                }
                traverse(tree, doc, group, child);
            }
        }
    }
}

fn extract_group_attributes(tree: &mut SvgTree, parent: NodeId, group: NodeId, element: Node<'_, '_>) {
    for attr in element.attributes() {
        let value = attr.value();
        match attr.name() {
            SVG_CLIP_PATH | SVG_MASK if !value.is_empty() => {
                tree.add_clip_deferral(group, parent, value);
            }
            "class" => {
                for class in value.split_whitespace() {
                    tree.add_affected_node_to_style_class(&format!(".{class}"), group);
                }
            }
            _ => {}
        }
    }
}

fn use_reference(tree: &mut SvgTree, element: Node<'_, '_>, line: u32) -> UseReference {
    let mut reference = UseReference::default();
    let plain = element
        .attributes()
        .find(|a| a.name() == "href" && a.namespace().is_none());
    let xlink = element.attributes().find(|a| a.name() == "href");
    if let Some(attr) = plain.or(xlink) {
        let raw = attr.value().trim();
        reference.target = Some(raw.strip_prefix('#').unwrap_or(raw).to_string());
    }
    for (name, slot) in [("x", &mut reference.x), ("y", &mut reference.y)] {
        if let Some(raw) = element.attribute(name) {
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => *slot = v,
                _ => tree.log_error(invalid_value(name, raw), line),
            }
        }
    }
    reference
}

// Nearest-first concatenation of ancestor `<g>` styles, or `None` when an
// ancestor hides its content.
fn ancestor_group_style(element: Node<'_, '_>) -> Option<String> {
    let mut combined = String::new();
    let mut parent = element.parent_element();
    while let Some(node) = parent.filter(|p| p.tag_name().name() == "g") {
        if let Some(style) = node.attribute("style") {
            combined.push_str(style);
            combined.push(';');
            if is_display_none(&combined) {
                return None;
            }
        }
        if node.attribute("display") == Some("none") {
            return None;
        }
        parent = node.parent_element();
    }
    Some(combined)
}

fn extract_leaf(
    tree: &mut SvgTree,
    doc: &Document<'_>,
    group: NodeId,
    leaf: NodeId,
    element: Node<'_, '_>,
) {
    let tag = element.tag_name().name();
    let line = line_of(doc, element);

    let hidden = element.attribute("display") == Some("none");
    match ancestor_group_style(element) {
        Some(style) if !hidden => {
            if !style.is_empty() {
                add_style_to_node(tree, leaf, &style);
            }
        }
        _ => {
            tree.add_affected_node_to_style_class(tag, leaf);
            return;
        }
    }

    let mut transparent = false;
    let mut numbers: BTreeMap<&str, f64> = BTreeMap::new();
    let mut path_data: Option<String> = None;

    for attr in element.attributes() {
        let name = attr.name();
        let value = attr.value();
        match name {
            "style" => {
                add_style_to_node(tree, leaf, value);
                if has_zero_opacity(value) {
                    transparent = true;
                }
            }
            _ if is_presentation_attribute(name) => tree.fill_presentation(leaf, name, value),
            SVG_CLIP_PATH | SVG_MASK => tree.add_clip_deferral(leaf, group, value),
            "class" => {
                for class in value.split_whitespace() {
                    tree.add_affected_node_to_style_class(&format!("{tag}.{class}"), leaf);
                    tree.add_affected_node_to_style_class(&format!(".{class}"), leaf);
                }
            }
            "d" if tag == "path" => path_data = Some(value.to_string()),
            "points" if tag == "polygon" || tag == "polyline" => {
                path_data = shapes::poly_to_path(value, tag == "polygon");
                if path_data.is_none() && !value.trim().is_empty() {
                    tree.log_error(invalid_value(name, value), line);
                }
            }
            _ => {
                let Some(horizontal) = shape_axis(tag, name) else {
                    continue;
                };
                let parsed = if horizontal {
                    tree.parse_x_value(value)
                } else {
                    tree.parse_y_value(value)
                };
                match parsed {
                    Some(v) => {
                        numbers.insert(name, v);
                    }
                    None => tree.log_error(invalid_value(name, value), line),
                }
            }
        }
    }

    let num = |name: &str, default: f64| numbers.get(name).copied().unwrap_or(default);
    let lowered = match tag {
        "rect" => shapes::rect_to_path(
            num("x", 0.0),
            num("y", 0.0),
            num("width", f64::NAN),
            num("height", f64::NAN),
            numbers.get("rx").copied(),
            numbers.get("ry").copied(),
        ),
        "circle" => shapes::circle_to_path(num("cx", 0.0), num("cy", 0.0), num("r", f64::NAN)),
        "ellipse" => shapes::ellipse_to_path(
            num("cx", 0.0),
            num("cy", 0.0),
            num("rx", f64::NAN),
            num("ry", f64::NAN),
        ),
        "line" => shapes::line_to_path(
            num("x1", 0.0),
            num("y1", 0.0),
            num("x2", 0.0),
            num("y2", 0.0),
        ),
        _ => path_data,
    };

    if !transparent {
        if let Some(leaf_data) = tree.node_mut(leaf).as_leaf_mut() {
            leaf_data.path_data = lowered;
        }
    }
    tree.add_affected_node_to_style_class(tag, leaf);
}

// Numeric geometry attributes per shape; `true` for the horizontal axis.
fn shape_axis(tag: &str, name: &str) -> Option<bool> {
    let horizontal = matches!(name, "x" | "width" | "rx" | "cx" | "x1" | "x2" | "r");
    let known = match tag {
        "rect" => matches!(name, "x" | "y" | "width" | "height" | "rx" | "ry"),
        "circle" => matches!(name, "cx" | "cy" | "r"),
        "ellipse" => matches!(name, "cx" | "cy" | "rx" | "ry"),
        "line" => matches!(name, "x1" | "y1" | "x2" | "y2"),
        _ => false,
    };
    known.then_some(horizontal)
}

fn extract_gradient(
    tree: &mut SvgTree,
    doc: &Document<'_>,
    kind: GradientKind,
    element: Node<'_, '_>,
) -> GradientDef {
    let mut def = GradientDef::new(kind);
    for attr in element.attributes() {
        if let Some(stored) = gradient_attribute_name(attr.name()) {
            def.attributes
                .insert(stored.to_string(), attr.value().trim().to_string());
        }
    }

    let mut greatest = 0.0;
    for stop in element
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "stop")
    {
        let line = line_of(doc, stop);
        let mut color = "rgb(0,0,0)".to_string();
        let mut opacity = "1".to_string();
        let mut offset = greatest;

        for attr in stop.attributes() {
            let value = attr.value();
            match attr.name() {
                "offset" => match parse_offset(value) {
                    Some(v) => offset = normalize_offset(v, greatest),
                    None => tree.log_error(invalid_value("offset", value), line),
                },
                "stop-color" => color = value.to_string(),
                "stop-opacity" => opacity = value.to_string(),
                "style" => {
                    for (name, decl) in style::declarations(value) {
                        match name {
                            "stop-color" => color = decl.to_string(),
                            "stop-opacity" => opacity = decl.to_string(),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        greatest = offset;

        let rgba = Rgba::parse(&color).unwrap_or_else(|| {
            tree.log_error(format!("Unsupported color format \"{}\"", color.trim()), line);
            Rgba::BLACK
        });
        let opacity = parse_opacity(&opacity).unwrap_or_else(|| {
            tree.log_error(invalid_value("stop-opacity", &opacity), line);
            1.0
        });
        def.stops.push(GradientStop {
            color: rgba,
            offset,
            opacity,
        });
    }
    def
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(svg: &str) -> SvgTree {
        let doc = Document::parse(svg).expect("test document parses");
        let mut tree = SvgTree::new();
        extract_document(&mut tree, &doc).expect("svg root");
        tree
    }

    fn leaves(tree: &SvgTree) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![tree.root.expect("root")];
        while let Some(id) = stack.pop() {
            match &tree.node(id).kind {
                NodeKind::Leaf(_) => out.push(id),
                _ => stack.extend(tree.node(id).children().iter().rev()),
            }
        }
        out
    }

    #[test]
    fn missing_view_box_stops_extraction() {
        let tree = extract(r##"<svg xmlns="http://www.w3.org/2000/svg"><path d="M0 0"/></svg>"##);
        assert!(tree.root.is_none());
        assert_eq!(
            tree.error_message(),
            "ERROR @ line 1: Missing \"viewBox\" in <svg> element"
        );
    }

    #[test]
    fn non_svg_root_is_rejected() {
        let doc = Document::parse("<html/>").expect("parses");
        let mut tree = SvgTree::new();
        assert!(matches!(
            extract_document(&mut tree, &doc),
            Err(ConvertError::NotSvg(_))
        ));
    }

    #[test]
    fn shapes_become_leaves_with_path_data() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 120 120">
  <rect x="10" y="10" width="100" height="50"/>
  <g fill="#ff0000"><circle cx="50" cy="50" r="20"/></g>
  <ellipse cx="5" cy="5" rx="0" ry="2"/>
</svg>"##,
        );
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 3);
        let path = |id: NodeId| tree.node(id).as_leaf().and_then(|l| l.path_data.clone());
        assert_eq!(path(leaves[0]).as_deref(), Some("M10,10H110V60H10Z"));
        assert!(path(leaves[1]).is_some());
        assert_eq!(tree.node(leaves[1]).attribute("fill"), Some("#ff0000"));
        assert_eq!(path(leaves[2]), None);
        assert!(tree.has_leaf);
    }

    #[test]
    fn unsupported_elements_are_reported_and_traversed() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <text id="t">hi</text>
  <switch><path d="M0 0L5 5"/></switch>
  <custom><path d="M1 1L5 5"/></custom>
</svg>"##,
        );
        assert_eq!(leaves(&tree).len(), 2);
        assert!(tree.is_id_ignored("t"));
        assert_eq!(
            tree.error_message(),
            "ERROR @ line 2: <text> is not supported\nERROR @ line 3: <switch> is not supported"
        );
    }

    #[test]
    fn hidden_ancestor_group_skips_leaf_path() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <g style="display:none"><path d="M0 0L5 5"/></g>
  <g display="none"><path d="M0 0L5 5"/></g>
  <g style="fill:#00ff00"><g><path d="M0 0L5 5" fill-opacity="0.5"/></g></g>
</svg>"##,
        );
        let leaves = leaves(&tree);
        let path = |id: NodeId| tree.node(id).as_leaf().and_then(|l| l.path_data.clone());
        assert_eq!(path(leaves[0]), None);
        assert_eq!(path(leaves[1]), None);
        assert!(path(leaves[2]).is_some());
        assert_eq!(tree.node(leaves[2]).attribute("fill"), Some("#00ff00"));
        assert_eq!(tree.node(leaves[2]).attribute("fill-opacity"), Some("0.5"));
    }

    #[test]
    fn zero_opacity_style_drops_the_shape() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <rect width="5" height="5" style="opacity:0"/>
</svg>"##,
        );
        let leaf = leaves(&tree)[0];
        assert_eq!(tree.node(leaf).as_leaf().and_then(|l| l.path_data.clone()), None);
    }

    #[test]
    fn invalid_numbers_are_logged_and_skipped() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <rect x="abc" width="5" height="5"/>
</svg>"##,
        );
        let leaf = leaves(&tree)[0];
        assert_eq!(
            tree.node(leaf).as_leaf().and_then(|l| l.path_data.clone()).as_deref(),
            Some("M0,0H5V5H0Z")
        );
        assert_eq!(
            tree.error_message(),
            "ERROR @ line 2: Invalid attribute value: x=\"abc\""
        );
    }

    #[test]
    fn invalid_points_are_logged() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <polygon points="0,0 a,b 5,5"/>
  <polyline points="1,1 4,4"/>
</svg>"##,
        );
        assert_eq!(
            tree.error_message(),
            "ERROR @ line 2: Invalid attribute value: points=\"0,0 a,b 5,5\""
        );
        let paths: Vec<Option<String>> = leaves(&tree)
            .into_iter()
            .map(|id| tree.node(id).as_leaf().and_then(|l| l.path_data.clone()))
            .collect();
        assert_eq!(paths, vec![None, Some("M1,1l3,3".to_string())]);
    }

    #[test]
    fn gradients_are_registered_but_not_displayed() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <linearGradient id="g" x1="0" x2="1" spreadMethod="reflect">
    <stop offset="0.5" stop-color="#ff0000"/>
    <stop offset="0.3" style="stop-color:#00ff00;stop-opacity:0.5"/>
    <stop offset="90%"/>
  </linearGradient>
</svg>"##,
        );
        let id = tree.node_by_id("g").expect("gradient id");
        let NodeKind::Gradient(def) = &tree.node(id).kind else {
            panic!("expected gradient node");
        };
        let offsets: Vec<f64> = def.stops.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0.5, 0.5, 0.9]);
        assert_eq!(def.stops[1].opacity, 0.5);
        assert_eq!(def.attributes.get("tileMode").map(String::as_str), Some("reflect"));
        assert_eq!(def.attributes.get("startX").map(String::as_str), Some("0"));
        assert!(tree.has_gradient);
        assert!(tree.children(tree.root.expect("root")).is_empty());
    }

    #[test]
    fn use_elements_are_pending_with_offsets() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 10 10">
  <use xlink:href="#shape" x="3" y="4"/>
</svg>"##,
        );
        let (_, reference) = tree.pending_use.first().expect("pending use");
        assert_eq!(reference.target.as_deref(), Some("shape"));
        assert_eq!((reference.x, reference.y), (3.0, 4.0));
    }

    #[test]
    fn classes_register_tag_and_class_selectors() {
        let tree = extract(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <path class="a b" d="M0 0L1 1"/>
  <g class="grp"/>
</svg>"##,
        );
        for selector in ["path.a", ".a", "path.b", ".b", "path", ".grp"] {
            assert!(
                tree.style_affected_nodes.contains_key(selector),
                "missing registration for {selector}"
            );
        }
    }
}
