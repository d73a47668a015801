use crate::node::{
    Attributes, NodeId, SVG_CLIP_RULE, SVG_FILL, SVG_FILL_RULE, SVG_STROKE, SVG_STROKE_WIDTH,
    SvgNode,
};
use crate::path;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Error,
    Warning,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub line: u32,
    pub message: String,
}

impl LogMessage {
    pub fn formatted(&self) -> String {
        if self.line == 0 {
            format!("{}: {}", self.level.label(), self.message)
        } else {
            format!("{} @ line {}: {}", self.level.label(), self.line, self.message)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UseReference {
    pub target: Option<String>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct ClipDeferral {
    pub parent: NodeId,
    pub reference: String,
}

#[derive(Debug, Default)]
pub struct SvgTree {
    nodes: Vec<SvgNode>,
    pub root: Option<NodeId>,

    pub width: f64,
    pub height: f64,
    pub view_box: Option<[f64; 4]>,
    pub scale_factor: f64,
    pub digits_override: Option<usize>,

    pub has_leaf: bool,
    pub has_gradient: bool,
    pub flattened: bool,

    id_map: IndexMap<String, NodeId>,
    ignored_ids: HashSet<String>,
    pub pending_use: IndexMap<NodeId, UseReference>,
    pub clip_deferrals: IndexMap<NodeId, ClipDeferral>,
    pub style_affected_nodes: IndexMap<String, IndexSet<NodeId>>,
    style_class_attributes: IndexMap<String, String>,

    log: Vec<LogMessage>,

    pub use_expansions: u64,
    pub clip_substitutions: u64,
}

impl SvgTree {
    pub fn new() -> Self {
        Self {
            width: -1.0,
            height: -1.0,
            scale_factor: 1.0,
            ..Self::default()
        }
    }

    // ---- arena ----

    pub fn add_node(&mut self, node: SvgNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &SvgNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SvgNode {
        &mut self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children().to_vec()
    }

    // Appends `child` to a container; the child inherits every parent
    // attribute it does not set itself.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let inherited = self.node(parent).attributes.clone();
        if let Some(children) = self.node_mut(parent).children_mut() {
            children.push(child);
        }
        self.fill_empty_attributes(child, &inherited);
    }

    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let Some(children) = self.node_mut(parent).children_mut() else {
            return false;
        };
        match children.iter().position(|c| *c == old) {
            Some(idx) => {
                children[idx] = new;
                true
            }
            None => false,
        }
    }

    pub fn find_parent(&self, target: NodeId) -> Option<NodeId> {
        let root = self.root?;
        self.find_parent_from(root, target)
    }

    fn find_parent_from(&self, current: NodeId, target: NodeId) -> Option<NodeId> {
        for &child in self.node(current).children() {
            if child == target {
                return Some(current);
            }
            if self.node(child).is_container() {
                if let Some(found) = self.find_parent_from(child, target) {
                    return Some(found);
                }
            }
        }
        None
    }

    // Copies a subtree into fresh arena slots. Clip affected lists are
    // shared, not copied; style-class registrations follow the copy.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let mut copy = self.node(id).clone();
        let children = copy.children().to_vec();
        if let Some(list) = copy.children_mut() {
            list.clear();
        }
        let new_id = self.add_node(copy);
        self.copy_style_registrations(id, new_id);
        for child in children {
            let child_copy = self.deep_copy(child);
            self.add_child(new_id, child_copy);
        }
        new_id
    }

    fn copy_style_registrations(&mut self, from: NodeId, to: NodeId) {
        for nodes in self.style_affected_nodes.values_mut() {
            if nodes.contains(&from) {
                nodes.insert(to);
            }
        }
    }

    // ---- attributes ----

    // Sets a presentation attribute, normalizing rule keywords. Containers
    // push the value down to children that do not set it.
    pub fn fill_presentation(&mut self, id: NodeId, name: &str, value: &str) {
        let mut value = value.trim().to_string();
        if name == SVG_FILL_RULE || name == SVG_CLIP_RULE {
            match value.as_str() {
                "nonzero" => value = "nonZero".to_string(),
                "evenodd" => value = "evenOdd".to_string(),
                _ => {}
            }
        }
        if value.starts_with("url(") && name != SVG_FILL && name != SVG_STROKE {
            let line = self.node(id).line;
            self.log_error(format!("Unsupported URL value: {value}"), line);
            return;
        }

        let node = self.node_mut(id);
        if name == SVG_STROKE_WIDTH && value == "0" {
            node.attributes.remove(SVG_STROKE);
        }
        node.attributes.insert(name.to_string(), value.clone());

        for child in self.children(id) {
            if !self.node(child).attributes.contains_key(name) {
                self.fill_presentation(child, name, &value);
            }
        }
    }

    // Copies every entry of `attributes` the node lacks, through the whole
    // subtree.
    pub fn fill_empty_attributes(&mut self, id: NodeId, attributes: &Attributes) {
        let node = self.node_mut(id);
        for (name, value) in attributes {
            node.attributes
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        for child in self.children(id) {
            self.fill_empty_attributes(child, attributes);
        }
    }

    // ---- ids and references ----

    pub fn register_id(&mut self, id: &str, node: NodeId) {
        self.id_map.insert(id.to_string(), node);
    }

    pub fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_map.get(id).copied()
    }

    pub fn add_ignored_id(&mut self, id: &str) {
        self.ignored_ids.insert(id.to_string());
    }

    pub fn is_id_ignored(&self, id: &str) -> bool {
        self.ignored_ids.contains(id)
    }

    pub fn add_pending_use(&mut self, node: NodeId, reference: UseReference) {
        self.pending_use.insert(node, reference);
    }

    pub fn add_clip_deferral(&mut self, node: NodeId, parent: NodeId, reference: &str) {
        self.clip_deferrals.insert(
            node,
            ClipDeferral {
                parent,
                reference: reference.to_string(),
            },
        );
    }

    // ---- style tables ----

    pub fn add_affected_node_to_style_class(&mut self, selector: &str, node: NodeId) {
        self.style_affected_nodes
            .entry(selector.to_string())
            .or_default()
            .insert(node);
    }

    // Registers a rule body. A class declared again keeps both bodies, the
    // newer one first.
    pub fn add_style_class(&mut self, selector: &str, attributes: &str) {
        let combined = match self.style_class_attributes.get(selector) {
            Some(existing) if !existing.is_empty() => format!("{attributes};{existing}"),
            _ => attributes.to_string(),
        };
        self.style_class_attributes
            .insert(selector.to_string(), combined);
    }

    pub fn style_class_attributes(&self, selector: &str) -> Option<&str> {
        self.style_class_attributes
            .get(selector)
            .map(String::as_str)
    }

    // ---- diagnostics ----

    pub fn log_error(&mut self, message: impl Into<String>, line: u32) {
        self.log(LogLevel::Error, message, line);
    }

    pub fn log_warning(&mut self, message: impl Into<String>, line: u32) {
        self.log(LogLevel::Warning, message, line);
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>, line: u32) {
        self.log.push(LogMessage {
            level,
            line,
            message: message.into(),
        });
    }

    pub fn messages(&self) -> &[LogMessage] {
        &self.log
    }

    pub fn has_errors(&self) -> bool {
        self.log.iter().any(|m| m.level == LogLevel::Error)
    }

    pub fn error_message(&self) -> String {
        let mut sorted: Vec<&LogMessage> = self.log.iter().collect();
        sorted.sort_by_key(|m| (m.level, m.line));
        sorted
            .iter()
            .map(|m| m.formatted())
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ---- viewport ----

    pub fn parse_dimension(
        &mut self,
        width: Option<&str>,
        height: Option<&str>,
        view_box: Option<&str>,
        line: u32,
    ) {
        let mut width_percent = false;
        let mut height_percent = false;
        if let Some(raw) = width {
            match parse_length(raw) {
                Some((v, pct)) => {
                    self.width = v;
                    width_percent = pct;
                }
                None => self.log_error(invalid_value("width", raw), line),
            }
        }
        if let Some(raw) = height {
            match parse_length(raw) {
                Some((v, pct)) => {
                    self.height = v;
                    height_percent = pct;
                }
                None => self.log_error(invalid_value("height", raw), line),
            }
        }
        self.view_box = view_box.and_then(parse_view_box);

        if self.view_box.is_none() && self.width > 0.0 && self.height > 0.0 {
            self.view_box = Some([0.0, 0.0, self.width, self.height]);
        } else if let Some(vb) = self.view_box {
            if self.width <= 0.0 || self.height <= 0.0 {
                self.width = vb[2];
                self.height = vb[3];
            }
        }

        if let Some(vb) = self.view_box {
            if width_percent && self.width > 0.0 {
                self.width = vb[2] * self.width / 100.0;
            }
            if height_percent && self.height > 0.0 {
                self.height = vb[3] * self.height / 100.0;
            }
        }
    }

    pub fn viewport_width(&self) -> f64 {
        self.view_box.map_or(-1.0, |vb| vb[2])
    }

    pub fn viewport_height(&self) -> f64 {
        self.view_box.map_or(-1.0, |vb| vb[3])
    }

    pub fn coordinate_digits(&self) -> usize {
        self.digits_override.unwrap_or_else(|| {
            path::coordinate_digits(self.viewport_width().max(self.viewport_height()))
        })
    }

    pub fn parse_x_value(&self, value: &str) -> Option<f64> {
        parse_coordinate(value, self.viewport_width())
    }

    pub fn parse_y_value(&self, value: &str) -> Option<f64> {
        parse_coordinate(value, self.viewport_height())
    }
}

pub fn invalid_value(name: &str, value: &str) -> String {
    format!("Invalid attribute value: {name}=\"{value}\"")
}

const LENGTH_UNITS: [&str; 8] = ["em", "ex", "px", "in", "cm", "mm", "pt", "pc"];

// Unit suffixes are dropped without conversion; `%` is reported separately.
fn parse_length(raw: &str) -> Option<(f64, bool)> {
    let value = raw.trim();
    if let Some(number) = value.strip_suffix('%') {
        return number.trim().parse::<f64>().ok().map(|v| (v, true));
    }
    let number = LENGTH_UNITS
        .iter()
        .find_map(|unit| value.strip_suffix(unit))
        .unwrap_or(value);
    number.trim().parse::<f64>().ok().map(|v| (v, false))
}

fn parse_view_box(raw: &str) -> Option<[f64; 4]> {
    let values: Vec<f64> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let [x, y, w, h]: [f64; 4] = values.try_into().ok()?;
    if [x, y, w, h].iter().all(|v| v.is_finite()) && w > 0.0 && h > 0.0 {
        Some([x, y, w, h])
    } else {
        None
    }
}

fn parse_coordinate(value: &str, percentage_base: f64) -> Option<f64> {
    let value = value.trim();
    let parsed = match value.strip_suffix('%') {
        Some(number) => number.trim().parse::<f64>().ok()? / 100.0 * percentage_base,
        None => value
            .strip_suffix("px")
            .unwrap_or(value)
            .trim()
            .parse::<f64>()
            .ok()?,
    };
    Some(parsed)
}
