use crate::gradient::{BoundGradient, GradientDef};
use crate::transform::AffineTransform;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

pub type Attributes = BTreeMap<String, String>;

pub const SVG_CLIP: &str = "clip";
pub const SVG_CLIP_RULE: &str = "clip-rule";
pub const SVG_FILL: &str = "fill";
pub const SVG_FILL_RULE: &str = "fill-rule";
pub const SVG_FILL_OPACITY: &str = "fill-opacity";
pub const SVG_OPACITY: &str = "opacity";
pub const SVG_STROKE: &str = "stroke";
pub const SVG_STROKE_OPACITY: &str = "stroke-opacity";
pub const SVG_STROKE_LINEJOIN: &str = "stroke-linejoin";
pub const SVG_STROKE_LINECAP: &str = "stroke-linecap";
pub const SVG_STROKE_WIDTH: &str = "stroke-width";
pub const SVG_STROKE_MITERLIMIT: &str = "stroke-miterlimit";
pub const SVG_VECTOR_EFFECT: &str = "vector-effect";

pub const PRESENTATION_ATTRIBUTES: &[(&str, Option<&str>)] = &[
    (SVG_CLIP, None),
    (SVG_CLIP_RULE, None),
    (SVG_FILL, Some("android:fillColor")),
    (SVG_FILL_RULE, Some("android:fillType")),
    (SVG_FILL_OPACITY, Some("android:fillAlpha")),
    (SVG_OPACITY, None),
    (SVG_STROKE, Some("android:strokeColor")),
    (SVG_STROKE_OPACITY, Some("android:strokeAlpha")),
    (SVG_STROKE_LINEJOIN, Some("android:strokeLineJoin")),
    (SVG_STROKE_LINECAP, Some("android:strokeLineCap")),
    (SVG_STROKE_WIDTH, Some("android:strokeWidth")),
    (SVG_STROKE_MITERLIMIT, Some("android:strokeMiterLimit")),
    (SVG_VECTOR_EFFECT, None),
];

pub fn is_presentation_attribute(name: &str) -> bool {
    PRESENTATION_ATTRIBUTES.iter().any(|(svg, _)| *svg == name)
}

pub fn vector_attribute_name(name: &str) -> Option<&'static str> {
    PRESENTATION_ATTRIBUTES
        .iter()
        .find(|(svg, _)| *svg == name)
        .and_then(|(_, vd)| *vd)
}

#[derive(Debug, Clone, Default)]
pub struct LeafData {
    pub path_data: Option<String>,
    pub fill_gradient: Option<BoundGradient>,
    pub stroke_gradient: Option<BoundGradient>,
}

impl LeafData {
    pub fn has_gradient(&self) -> bool {
        self.fill_gradient.is_some() || self.stroke_gradient.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClipData {
    pub children: Vec<NodeId>,
    pub affected: Vec<NodeId>,
    pub is_mask: bool,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group { children: Vec<NodeId> },
    Leaf(LeafData),
    ClipPath(ClipData),
    Gradient(GradientDef),
}

#[derive(Debug, Clone)]
pub struct SvgNode {
    pub id: Option<String>,
    pub tag: String,
    pub line: u32,
    pub attributes: Attributes,
    pub local_transform: AffineTransform,
    pub stacked_transform: AffineTransform,
    pub kind: NodeKind,
}

impl SvgNode {
    pub fn new(tag: impl Into<String>, line: u32, kind: NodeKind) -> Self {
        Self {
            id: None,
            tag: tag.into(),
            line,
            attributes: Attributes::new(),
            local_transform: AffineTransform::IDENTITY,
            stacked_transform: AffineTransform::IDENTITY,
            kind,
        }
    }

    pub fn group(tag: impl Into<String>, line: u32) -> Self {
        Self::new(
            tag,
            line,
            NodeKind::Group {
                children: Vec::new(),
            },
        )
    }

    pub fn leaf(tag: impl Into<String>, line: u32) -> Self {
        Self::new(tag, line, NodeKind::Leaf(LeafData::default()))
    }

    pub fn clip_path(tag: impl Into<String>, line: u32, is_mask: bool) -> Self {
        Self::new(
            tag,
            line,
            NodeKind::ClipPath(ClipData {
                is_mask,
                ..ClipData::default()
            }),
        )
    }

    // Owned children: group members or clip geometry. Affected nodes of a
    // clip are not included.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children } => children,
            NodeKind::ClipPath(clip) => &clip.children,
            NodeKind::Leaf(_) | NodeKind::Gradient(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            NodeKind::Group { children } => Some(children),
            NodeKind::ClipPath(clip) => Some(&mut clip.children),
            NodeKind::Leaf(_) | NodeKind::Gradient(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. } | NodeKind::ClipPath(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafData> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafData> {
        match &mut self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
