use crate::color::Rgba;
use crate::node::{Attributes, NodeId};
use crate::path::format_number;
use crate::transform::{AffineTransform, compose, parse_transform_list};
use crate::writer::{CONTINUATION_INDENT, INDENT_UNIT};

pub const GRADIENT_ATTRIBUTES: &[(&str, &str)] = &[
    ("x1", "startX"),
    ("y1", "startY"),
    ("x2", "endX"),
    ("y2", "endY"),
    ("cx", "centerX"),
    ("cy", "centerY"),
    ("r", "gradientRadius"),
    ("spreadMethod", "tileMode"),
    ("gradientUnits", "gradientUnits"),
    ("gradientTransform", "gradientTransform"),
];

pub fn gradient_attribute_name(name: &str) -> Option<&'static str> {
    GRADIENT_ATTRIBUTES
        .iter()
        .find(|(svg, _)| *svg == name)
        .map(|(_, stored)| *stored)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

impl GradientKind {
    fn type_name(self) -> &'static str {
        match self {
            GradientKind::Linear => "linear",
            GradientKind::Radial => "radial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientUsage {
    Fill,
    Stroke,
}

impl GradientUsage {
    fn attribute_name(self) -> &'static str {
        match self {
            GradientUsage::Fill => "android:fillColor",
            GradientUsage::Stroke => "android:strokeColor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub color: Rgba,
    pub offset: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone)]
pub struct GradientDef {
    pub kind: GradientKind,
    pub attributes: Attributes,
    pub stops: Vec<GradientStop>,
}

impl GradientDef {
    pub fn new(kind: GradientKind) -> Self {
        Self {
            kind,
            attributes: Attributes::new(),
            stops: Vec::new(),
        }
    }
}

pub fn parse_offset(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok()? / 100.0,
        None => raw.parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

// Clamps to [0, 1] and never goes below an earlier stop.
pub fn normalize_offset(value: f64, greatest: f64) -> f64 {
    value.clamp(0.0, 1.0).max(greatest)
}

pub fn parse_opacity(raw: &str) -> Option<f64> {
    parse_offset(raw).map(|v| v.clamp(0.0, 1.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundGradient {
    pub usage: GradientUsage,
    pub owner: NodeId,
    pub kind: GradientKind,
    pub geometry: Vec<(&'static str, f64)>,
    pub tile_mode: Option<&'static str>,
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Units {
    ObjectBoundingBox,
    UserSpaceOnUse,
}

// Places the gradient for a leaf whose path (in its own coordinates) has
// `bounds` and which is drawn through `transform`.
pub fn bind(
    def: &GradientDef,
    usage: GradientUsage,
    owner: NodeId,
    bounds: Option<(f64, f64, f64, f64)>,
    transform: &AffineTransform,
    viewport: (f64, f64),
) -> BoundGradient {
    let units = match def.attributes.get("gradientUnits").map(|s| s.trim()) {
        Some("userSpaceOnUse") => Units::UserSpaceOnUse,
        _ => Units::ObjectBoundingBox,
    };
    let gradient_transform = def
        .attributes
        .get("gradientTransform")
        .map(|s| parse_transform_list(s))
        .unwrap_or_default();

    let unit_space = match units {
        Units::ObjectBoundingBox => {
            let (x0, y0, x1, y1) = bounds.unwrap_or((0.0, 0.0, 0.0, 0.0));
            AffineTransform::new(x1 - x0, 0.0, 0.0, y1 - y0, x0, y0)
        }
        Units::UserSpaceOnUse => AffineTransform::IDENTITY,
    };
    let m = compose(transform, &compose(&unit_space, &gradient_transform));

    let (vw, vh) = viewport;
    let coord = |name: &str, default: f64, base: f64| -> f64 {
        let Some(raw) = def.attributes.get(name) else {
            return default_for(units, default, base);
        };
        let raw = raw.trim();
        let parsed = match raw.strip_suffix('%') {
            Some(pct) => pct
                .trim()
                .parse::<f64>()
                .ok()
                .map(|v| default_for(units, v / 100.0, base)),
            None => raw.parse::<f64>().ok(),
        };
        parsed
            .filter(|v| v.is_finite())
            .unwrap_or_else(|| default_for(units, default, base))
    };

    let geometry = match def.kind {
        GradientKind::Linear => {
            let (sx, sy) = m.apply(coord("startX", 0.0, vw), coord("startY", 0.0, vh));
            let (ex, ey) = m.apply(coord("endX", 1.0, vw), coord("endY", 0.0, vh));
            vec![
                ("android:startX", sx),
                ("android:startY", sy),
                ("android:endX", ex),
                ("android:endY", ey),
            ]
        }
        GradientKind::Radial => {
            let diagonal = libm::sqrt((vw * vw + vh * vh) / 2.0);
            let (cx, cy) = m.apply(coord("centerX", 0.5, vw), coord("centerY", 0.5, vh));
            let r = coord("gradientRadius", 0.5, diagonal) * libm::sqrt(m.determinant().abs());
            vec![
                ("android:centerX", cx),
                ("android:centerY", cy),
                ("android:gradientRadius", r),
            ]
        }
    };

    let tile_mode = def
        .attributes
        .get("tileMode")
        .and_then(|s| match s.trim() {
            "pad" => Some("clamp"),
            "reflect" => Some("mirror"),
            "repeat" => Some("repeat"),
            _ => None,
        });

    BoundGradient {
        usage,
        owner,
        kind: def.kind,
        geometry,
        tile_mode,
        stops: def.stops.clone(),
    }
}

fn default_for(units: Units, fraction: f64, base: f64) -> f64 {
    match units {
        Units::ObjectBoundingBox => fraction,
        Units::UserSpaceOnUse => fraction * base,
    }
}

impl BoundGradient {
    pub fn write_xml(&self, out: &mut String, indent: &str, digits: usize) {
        let inner = format!("{indent}{INDENT_UNIT}");
        out.push_str(&format!(
            "{indent}<aapt:attr name=\"{}\">\n",
            self.usage.attribute_name()
        ));
        out.push_str(&format!("{inner}<gradient"));
        let mut attrs = vec![("android:type", self.kind.type_name().to_string())];
        for (name, value) in &self.geometry {
            attrs.push((*name, format_number(*value, digits)));
        }
        if let Some(mode) = self.tile_mode {
            attrs.push(("android:tileMode", mode.to_string()));
        }
        for (name, value) in attrs {
            out.push_str(&format!("\n{inner}{CONTINUATION_INDENT}{name}=\"{value}\""));
        }
        out.push_str(">\n");
        for stop in &self.stops {
            out.push_str(&format!(
                "{inner}{INDENT_UNIT}<item android:offset=\"{}\" android:color=\"{}\"/>\n",
                format_number(stop.offset, 6),
                stop.color.with_opacity(stop.opacity).to_argb_hex()
            ));
        }
        out.push_str(&format!("{inner}</gradient>\n"));
        out.push_str(&format!("{indent}</aapt:attr>\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(attrs: &[(&str, &str)]) -> GradientDef {
        let mut def = GradientDef::new(GradientKind::Linear);
        for (k, v) in attrs {
            def.attributes.insert(k.to_string(), v.to_string());
        }
        def.stops.push(GradientStop {
            color: Rgba::BLACK,
            offset: 0.0,
            opacity: 1.0,
        });
        def
    }

    #[test]
    fn offsets_never_decrease() {
        let mut greatest = 0.0;
        let mut out = Vec::new();
        for raw in ["0.5", "0.3", "0.9"] {
            greatest = normalize_offset(parse_offset(raw).expect("offset"), greatest);
            out.push(greatest);
        }
        assert_eq!(out, vec![0.5, 0.5, 0.9]);
        assert_eq!(parse_offset("40%"), Some(0.4));
        assert_eq!(normalize_offset(1.7, 0.0), 1.0);
        assert!(parse_offset("abc").is_none());
    }

    #[test]
    fn bounding_box_units_follow_the_path() {
        let def = linear(&[]);
        let bound = bind(
            &def,
            GradientUsage::Fill,
            NodeId(1),
            Some((10.0, 20.0, 110.0, 70.0)),
            &AffineTransform::IDENTITY,
            (200.0, 200.0),
        );
        assert_eq!(
            bound.geometry,
            vec![
                ("android:startX", 10.0),
                ("android:startY", 20.0),
                ("android:endX", 110.0),
                ("android:endY", 20.0),
            ]
        );
    }

    #[test]
    fn user_space_coordinates_map_through_the_leaf_transform() {
        let def = linear(&[
            ("gradientUnits", "userSpaceOnUse"),
            ("startX", "0"),
            ("endX", "50%"),
            ("tileMode", "reflect"),
        ]);
        let bound = bind(
            &def,
            GradientUsage::Stroke,
            NodeId(1),
            None,
            &AffineTransform::translate(5.0, 0.0),
            (40.0, 40.0),
        );
        assert_eq!(bound.geometry[0], ("android:startX", 5.0));
        assert_eq!(bound.geometry[2], ("android:endX", 25.0));
        assert_eq!(bound.tile_mode, Some("mirror"));
    }

    #[test]
    fn writes_aapt_attr_block() {
        let def = linear(&[]);
        let bound = bind(
            &def,
            GradientUsage::Fill,
            NodeId(0),
            Some((0.0, 0.0, 10.0, 10.0)),
            &AffineTransform::IDENTITY,
            (10.0, 10.0),
        );
        let mut out = String::new();
        bound.write_xml(&mut out, "    ", 3);
        assert!(out.starts_with("    <aapt:attr name=\"android:fillColor\">\n      <gradient"));
        assert!(out.contains("\n          android:type=\"linear\""));
        assert!(out.contains("android:endX=\"10\""));
        assert!(out.contains("android:endY=\"0\">\n"));
        assert!(out.contains("<item android:offset=\"0\" android:color=\"#ff000000\"/>"));
        assert!(out.ends_with("    </aapt:attr>\n"));
    }
}
