use crate::color::{Rgba, is_transparent};
use crate::node::{
    Attributes, NodeId, NodeKind, SVG_CLIP_RULE, SVG_FILL, SVG_FILL_OPACITY, SVG_OPACITY,
    SVG_STROKE, SVG_STROKE_OPACITY, SVG_STROKE_WIDTH, vector_attribute_name,
};
use crate::path::format_float_value;
use crate::tree::SvgTree;

pub const INDENT_UNIT: &str = "  ";
pub const CONTINUATION_INDENT: &str = "    ";

const HEADER: &str = "<vector xmlns:android=\"http://schemas.android.com/apk/res/android\"";
const AAPT_NAMESPACE: &str = "xmlns:aapt=\"http://schemas.android.com/aapt\"";

// Checks that need the whole tree: masks must be opaque white, and a
// document without errors must have produced something to draw.
pub fn validate(tree: &mut SvgTree) {
    if let Some(root) = tree.root {
        let mut semitransparent = Vec::new();
        collect_semitransparent_masks(tree, root, &mut semitransparent);
        for line in semitransparent {
            tree.log_error(
                "Semitransparent mask cannot be represented by a vector drawable",
                line,
            );
        }
    }
    if !tree.has_leaf && !tree.has_errors() {
        tree.log_error("No vector content found", 0);
    }
}

fn collect_semitransparent_masks(tree: &SvgTree, id: NodeId, out: &mut Vec<u32>) {
    let node = tree.node(id);
    if let NodeKind::ClipPath(data) = &node.kind {
        if data.is_mask && !is_white_mask(tree, id) {
            out.push(node.line);
        }
        for affected in &data.affected {
            collect_semitransparent_masks(tree, *affected, out);
        }
    }
    for child in node.children() {
        collect_semitransparent_masks(tree, *child, out);
    }
}

// The mask's own fill decides when it has one; otherwise every shape inside
// must be filled opaque white.
fn is_white_mask(tree: &SvgTree, mask: NodeId) -> bool {
    let white = |value: &str| Rgba::parse(value).is_some_and(|c| c.is_opaque_white());
    if let Some(fill) = tree.node(mask).attribute(SVG_FILL) {
        return white(fill);
    }
    let mut leaves = Vec::new();
    collect_leaves(tree, mask, &mut leaves);
    !leaves.is_empty()
        && leaves
            .iter()
            .all(|leaf| tree.node(*leaf).attribute(SVG_FILL).is_some_and(white))
}

fn collect_leaves(tree: &SvgTree, id: NodeId, out: &mut Vec<NodeId>) {
    for child in tree.node(id).children() {
        match tree.node(*child).kind {
            NodeKind::Leaf(_) => out.push(*child),
            _ => collect_leaves(tree, *child, out),
        }
    }
}

pub fn write_xml(tree: &SvgTree) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    if tree.has_gradient {
        out.push_str(&format!("{CONTINUATION_INDENT}{AAPT_NAMESPACE}\n"));
    }
    let scale = tree.scale_factor;
    out.push_str(&format!(
        "{CONTINUATION_INDENT}android:width=\"{}dp\"\n",
        format_float_value(tree.width * scale)
    ));
    out.push_str(&format!(
        "{CONTINUATION_INDENT}android:height=\"{}dp\"\n",
        format_float_value(tree.height * scale)
    ));
    out.push_str(&format!(
        "{CONTINUATION_INDENT}android:viewportWidth=\"{}\"\n",
        format_float_value(tree.viewport_width())
    ));
    out.push_str(&format!(
        "{CONTINUATION_INDENT}android:viewportHeight=\"{}\">\n",
        format_float_value(tree.viewport_height())
    ));
    if let Some(root) = tree.root {
        write_node(tree, root, INDENT_UNIT, &mut out);
    }
    out.push_str("</vector>\n");
    out
}

fn write_node(tree: &SvgTree, id: NodeId, indent: &str, out: &mut String) {
    match &tree.node(id).kind {
        NodeKind::Group { children } => {
            for child in children {
                write_node(tree, *child, indent, out);
            }
        }
        NodeKind::Leaf(_) => write_leaf(tree, id, indent, out),
        NodeKind::ClipPath(_) => write_clip(tree, id, indent, out),
        NodeKind::Gradient(_) => {}
    }
}

fn write_leaf(tree: &SvgTree, id: NodeId, indent: &str, out: &mut String) {
    let node = tree.node(id);
    let Some(leaf) = node.as_leaf() else {
        return;
    };
    let Some(path_data) = leaf.path_data.as_deref().filter(|d| !d.trim().is_empty()) else {
        return;
    };

    let fill = node.attribute(SVG_FILL);
    let stroke = node.attribute(SVG_STROKE);
    let paints_fill = leaf.fill_gradient.is_some() || fill.is_none_or(|f| !is_transparent(f));
    let paints_stroke = leaf.stroke_gradient.is_some() || stroke.is_some_and(|s| !is_transparent(s));
    if !paints_fill && !paints_stroke {
        return;
    }

    let continuation = format!("{indent}{CONTINUATION_INDENT}");
    out.push_str(&format!("{indent}<path\n"));
    if fill.is_none() && leaf.fill_gradient.is_none() && !paints_stroke {
        out.push_str(&format!("{continuation}android:fillColor=\"#FF000000\"\n"));
    }
    if paints_stroke
        && leaf.stroke_gradient.is_none()
        && !node.attributes.contains_key(SVG_STROKE_WIDTH)
    {
        out.push_str(&format!("{continuation}android:strokeWidth=\"1\"\n"));
    }
    out.push_str(&format!("{continuation}android:pathData=\"{path_data}\""));

    for (name, value) in output_attributes(&node.attributes) {
        if value.starts_with("url(") {
            continue;
        }
        let Some(vector_name) = vector_attribute_name(&name) else {
            continue;
        };
        let value = value.strip_suffix("px").unwrap_or(&value);
        out.push_str(&format!("\n{continuation}{vector_name}=\"{value}\""));
    }

    if !leaf.has_gradient() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    let inner = format!("{indent}{INDENT_UNIT}");
    let digits = tree.coordinate_digits();
    for gradient in [&leaf.fill_gradient, &leaf.stroke_gradient].into_iter().flatten() {
        gradient.write_xml(out, &inner, digits);
    }
    out.push_str(&format!("{indent}</path>\n"));
}

// Attributes as written: `opacity` folded into the fill and stroke opacity,
// opacities of 1 dropped.
fn output_attributes(attributes: &Attributes) -> Attributes {
    let mut out = attributes.clone();
    let opacity = out
        .remove(SVG_OPACITY)
        .map(|v| parse_opacity_value(&v))
        .unwrap_or(1.0);
    for name in [SVG_FILL_OPACITY, SVG_STROKE_OPACITY] {
        let own = out.get(name).map(|v| parse_opacity_value(v)).unwrap_or(1.0);
        let combined = own * opacity;
        if combined == 1.0 {
            out.remove(name);
        } else {
            out.insert(name.to_string(), format_float_value(combined));
        }
    }
    out
}

// Accepts `0.5` and `50%`, clamps to [0, 1]; anything unparseable is opaque.
fn parse_opacity_value(raw: &str) -> f64 {
    let raw = raw.trim();
    let parsed = match raw.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().map(|v| v / 100.0),
        None => raw.parse::<f64>(),
    };
    match parsed {
        Ok(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => 1.0,
    }
}

fn write_clip(tree: &SvgTree, id: NodeId, indent: &str, out: &mut String) {
    let NodeKind::ClipPath(data) = &tree.node(id).kind else {
        return;
    };
    if data.affected.is_empty() {
        return;
    }

    let inner = format!("{indent}{INDENT_UNIT}");
    out.push_str(&format!("{indent}<group>\n"));

    let mut leaves = Vec::new();
    collect_leaves(tree, id, &mut leaves);
    let mut path_data = String::new();
    let mut even_odd = false;
    for leaf in leaves {
        let node = tree.node(leaf);
        let Some(d) = node
            .as_leaf()
            .and_then(|l| l.path_data.as_deref())
            .filter(|d| !d.trim().is_empty())
        else {
            continue;
        };
        if !path_data.is_empty() && !d.starts_with('M') {
            path_data.push_str("M 0,0");
        }
        path_data.push_str(d);
        if node.attribute(SVG_CLIP_RULE) == Some("evenOdd") {
            even_odd = true;
        }
    }

    if !path_data.is_empty() {
        out.push_str(&format!("{inner}<clip-path\n"));
        out.push_str(&format!(
            "{inner}{CONTINUATION_INDENT}android:pathData=\"{path_data}\""
        ));
        if even_odd {
            out.push_str(&format!(
                "\n{inner}{CONTINUATION_INDENT}android:fillType=\"evenOdd\""
            ));
        }
        out.push_str("/>\n");
    }

    for affected in &data.affected {
        write_node(tree, *affected, &inner, out);
    }
    out.push_str(&format!("{indent}</group>\n"));
}
