// Pushes every transform down to the leaves so the output needs no groups:
// stacked transforms, stroke width scaling, canonical colors, gradient
// placement and finally the rewritten path data.

use crate::clip::clip_reference_id;
use crate::color::Rgba;
use crate::gradient::{GradientUsage, bind};
use crate::node::{
    NodeId, NodeKind, SVG_FILL, SVG_STROKE, SVG_STROKE_WIDTH, SVG_VECTOR_EFFECT,
};
use crate::path::{self, format_float_value};
use crate::transform::{AffineTransform, compose};
use crate::tree::SvgTree;
use std::collections::HashSet;

pub fn flatten(tree: &mut SvgTree) {
    if tree.flattened {
        return;
    }
    let Some(root) = tree.root else {
        return;
    };
    let mut pass = Flattener {
        root_transform: root_transform(tree),
        digits: tree.coordinate_digits(),
        visited: HashSet::new(),
    };
    pass.node(tree, root, &AffineTransform::IDENTITY);
    tree.flattened = true;
}

fn root_transform(tree: &SvgTree) -> AffineTransform {
    match tree.view_box {
        Some([x, y, _, _]) => AffineTransform::translate(-x, -y),
        None => AffineTransform::IDENTITY,
    }
}

struct Flattener {
    root_transform: AffineTransform,
    digits: usize,
    visited: HashSet<NodeId>,
}

impl Flattener {
    fn node(&mut self, tree: &mut SvgTree, id: NodeId, incoming: &AffineTransform) {
        if !self.visited.insert(id) {
            return;
        }
        match &tree.node(id).kind {
            NodeKind::Group { .. } => {
                let stacked = compose(incoming, &tree.node(id).local_transform);
                tree.node_mut(id).stacked_transform = stacked;
                for child in tree.children(id) {
                    self.node(tree, child, &stacked);
                }
            }
            NodeKind::ClipPath(data) => {
                let affected = data.affected.clone();
                self.clip(tree, id, affected, incoming);
            }
            NodeKind::Leaf(_) => self.leaf(tree, id, incoming),
            NodeKind::Gradient(_) => {}
        }
    }

    // Clip geometry lives in the clip's space, the affected content keeps
    // the space the clip was found in.
    fn clip(
        &mut self,
        tree: &mut SvgTree,
        id: NodeId,
        affected: Vec<NodeId>,
        incoming: &AffineTransform,
    ) {
        let stacked = compose(incoming, &tree.node(id).local_transform);
        for child in tree.children(id) {
            self.node(tree, child, &stacked);
        }
        for node in affected {
            self.node(tree, node, incoming);
        }

        let clip = tree.node_mut(id);
        clip.stacked_transform = stacked;
        let scaled = stacked.is_shear_free() && (stacked.a != 1.0 || stacked.d != 1.0);
        if scaled && clip.attributes.contains_key(SVG_STROKE_WIDTH) {
            let line = clip.line;
            tree.log_warning("Scaling of the stroke width is ignored", line);
        }
    }

    fn leaf(&mut self, tree: &mut SvgTree, id: NodeId, incoming: &AffineTransform) {
        let stacked = compose(incoming, &tree.node(id).local_transform);
        tree.node_mut(id).stacked_transform = stacked;
        scale_stroke_width(tree, id, &stacked);

        let final_transform = compose(&self.root_transform, &stacked);
        let nodes = tree
            .node(id)
            .as_leaf()
            .and_then(|leaf| leaf.path_data.as_deref())
            .map(path::parse_path)
            .unwrap_or_default();
        let local_bounds = path::bounds(&nodes);

        for usage in [GradientUsage::Fill, GradientUsage::Stroke] {
            canonicalize_paint(tree, id, usage, local_bounds, &final_transform);
        }

        if nodes.is_empty() {
            return;
        }
        let rewritten = if !final_transform.is_identity() || path::has_rel_move_after_close(&nodes)
        {
            path::transform_nodes(&nodes, &final_transform)
        } else {
            nodes
        };
        let data = path::nodes_to_string(&rewritten, self.digits);
        if let Some(leaf) = tree.node_mut(id).as_leaf_mut() {
            leaf.path_data = Some(data);
        }
    }
}

fn scale_stroke_width(tree: &mut SvgTree, id: NodeId, stacked: &AffineTransform) {
    let node = tree.node(id);
    if node.attribute(SVG_VECTOR_EFFECT) == Some("non-scaling-stroke") || !stacked.is_shear_free() {
        return;
    }
    let Some(width) = node
        .attribute(SVG_STROKE_WIDTH)
        .and_then(|w| w.trim().trim_end_matches("px").parse::<f64>().ok())
    else {
        return;
    };

    let det = stacked.determinant();
    if det != 0.0 {
        let scaled = width * libm::sqrt(det.abs());
        tree.node_mut(id)
            .attributes
            .insert(SVG_STROKE_WIDTH.to_string(), format_float_value(scaled));
    }
    if !stacked.is_uniform_scale() {
        let line = tree.node(id).line;
        tree.log_warning("Scaling of stroke width is an approximation", line);
    }
}

// Rewrites a fill or stroke to canonical hex, or binds the gradient it
// references. The `url(...)` value itself stays and is never written, so a
// reference that does not lead to a gradient simply paints nothing.
fn canonicalize_paint(
    tree: &mut SvgTree,
    id: NodeId,
    usage: GradientUsage,
    bounds: Option<(f64, f64, f64, f64)>,
    transform: &AffineTransform,
) {
    let name = match usage {
        GradientUsage::Fill => SVG_FILL,
        GradientUsage::Stroke => SVG_STROKE,
    };
    let Some(value) = tree.node(id).attribute(name).map(str::to_string) else {
        return;
    };

    if value.trim_start().starts_with("url(") {
        let bound = clip_reference_id(&value)
            .and_then(|target| tree.node_by_id(target))
            .and_then(|target| match &tree.node(target).kind {
                NodeKind::Gradient(def) => Some(bind(
                    def,
                    usage,
                    id,
                    bounds,
                    transform,
                    (tree.viewport_width(), tree.viewport_height()),
                )),
                _ => None,
            });
        if let (Some(gradient), Some(leaf)) = (bound, tree.node_mut(id).as_leaf_mut()) {
            match usage {
                GradientUsage::Fill => leaf.fill_gradient = Some(gradient),
                GradientUsage::Stroke => leaf.stroke_gradient = Some(gradient),
            }
        }
        return;
    }

    let canonical = match Rgba::parse(&value) {
        Some(color) => color.to_hex(),
        None => {
            let line = tree.node(id).line;
            tree.log_error(format!("Unsupported color format \"{}\"", value.trim()), line);
            Rgba::BLACK.to_hex()
        }
    };
    tree.node_mut(id)
        .attributes
        .insert(name.to_string(), canonical);
}
