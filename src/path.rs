use crate::transform::AffineTransform;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCommand {
    Move,
    Line,
    Horizontal,
    Vertical,
    Cubic,
    SmoothCubic,
    Quadratic,
    SmoothQuadratic,
    Arc,
    Close,
}

impl PathCommand {
    fn from_letter(c: char) -> Option<(PathCommand, bool)> {
        let cmd = match c.to_ascii_uppercase() {
            'M' => PathCommand::Move,
            'L' => PathCommand::Line,
            'H' => PathCommand::Horizontal,
            'V' => PathCommand::Vertical,
            'C' => PathCommand::Cubic,
            'S' => PathCommand::SmoothCubic,
            'Q' => PathCommand::Quadratic,
            'T' => PathCommand::SmoothQuadratic,
            'A' => PathCommand::Arc,
            'Z' => PathCommand::Close,
            _ => return None,
        };
        Some((cmd, c.is_ascii_lowercase()))
    }

    fn letter(self, relative: bool) -> char {
        let upper = match self {
            PathCommand::Move => 'M',
            PathCommand::Line => 'L',
            PathCommand::Horizontal => 'H',
            PathCommand::Vertical => 'V',
            PathCommand::Cubic => 'C',
            PathCommand::SmoothCubic => 'S',
            PathCommand::Quadratic => 'Q',
            PathCommand::SmoothQuadratic => 'T',
            PathCommand::Arc => 'A',
            PathCommand::Close => 'Z',
        };
        if relative {
            upper.to_ascii_lowercase()
        } else {
            upper
        }
    }

    pub fn operand_count(self) -> usize {
        match self {
            PathCommand::Move | PathCommand::Line | PathCommand::SmoothQuadratic => 2,
            PathCommand::Horizontal | PathCommand::Vertical => 1,
            PathCommand::Cubic => 6,
            PathCommand::SmoothCubic | PathCommand::Quadratic => 4,
            PathCommand::Arc => 7,
            PathCommand::Close => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub command: PathCommand,
    pub relative: bool,
    pub params: Vec<f64>,
}

impl PathNode {
    pub fn new(command: PathCommand, relative: bool, params: Vec<f64>) -> Self {
        Self {
            command,
            relative,
            params,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    nodes: Vec<PathNode>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, command: PathCommand, relative: bool, params: Vec<f64>) -> &mut Self {
        self.nodes.push(PathNode::new(command, relative, params));
        self
    }

    pub fn absolute_move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.push(PathCommand::Move, false, vec![x, y])
    }

    pub fn relative_move_to(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.push(PathCommand::Move, true, vec![dx, dy])
    }

    pub fn absolute_line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.push(PathCommand::Line, false, vec![x, y])
    }

    pub fn relative_line_to(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.push(PathCommand::Line, true, vec![dx, dy])
    }

    pub fn absolute_horizontal_to(&mut self, x: f64) -> &mut Self {
        self.push(PathCommand::Horizontal, false, vec![x])
    }

    pub fn relative_horizontal_to(&mut self, dx: f64) -> &mut Self {
        self.push(PathCommand::Horizontal, true, vec![dx])
    }

    pub fn absolute_vertical_to(&mut self, y: f64) -> &mut Self {
        self.push(PathCommand::Vertical, false, vec![y])
    }

    pub fn relative_vertical_to(&mut self, dy: f64) -> &mut Self {
        self.push(PathCommand::Vertical, true, vec![dy])
    }

    pub fn curve_to(
        &mut self,
        relative: bool,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x: f64,
        y: f64,
    ) -> &mut Self {
        self.push(PathCommand::Cubic, relative, vec![x1, y1, x2, y2, x, y])
    }

    pub fn quad_to(&mut self, relative: bool, x1: f64, y1: f64, x: f64, y: f64) -> &mut Self {
        self.push(PathCommand::Quadratic, relative, vec![x1, y1, x, y])
    }

    #[allow(clippy::too_many_arguments)]
    pub fn arc_to(
        &mut self,
        rx: f64,
        ry: f64,
        rotation: f64,
        large_arc: bool,
        sweep: bool,
        relative: bool,
        x: f64,
        y: f64,
    ) -> &mut Self {
        let large = if large_arc { 1.0 } else { 0.0 };
        let sweep = if sweep { 1.0 } else { 0.0 };
        self.push(
            PathCommand::Arc,
            relative,
            vec![rx, ry, rotation, large, sweep, x, y],
        )
    }

    pub fn close(&mut self) -> &mut Self {
        self.push(PathCommand::Close, false, Vec::new())
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_path_string(&self) -> String {
        nodes_to_string(&self.nodes, DEFAULT_DIGITS)
    }
}

pub const DEFAULT_DIGITS: usize = 6;

// Parses SVG path data. Implicit repeats become separate nodes (extra move
// pairs become line-tos); unknown letters and stray characters are skipped.
pub fn parse_path(d: &str) -> Vec<PathNode> {
    let mut p = PathParser::new(d);
    let mut out = Vec::new();

    loop {
        p.skip_ws();
        let Some(b) = p.peek() else { break };
        p.i += 1;
        let Some((cmd, relative)) = PathCommand::from_letter(b as char) else {
            continue;
        };
        if cmd == PathCommand::Close {
            out.push(PathNode::new(PathCommand::Close, relative, Vec::new()));
            continue;
        }

        let mut current = cmd;
        while let Some(params) = p.next_operands(current) {
            out.push(PathNode::new(current, relative, params));
            if current == PathCommand::Move {
                current = PathCommand::Line;
            }
        }
    }

    out
}

struct PathParser<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl<'a> PathParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            i: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.i).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\n' || b == b'\r' || b == b'\t' || b == b',' {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    fn next_operands(&mut self, cmd: PathCommand) -> Option<Vec<f64>> {
        let start = self.i;
        let mut params = Vec::with_capacity(cmd.operand_count());
        for idx in 0..cmd.operand_count() {
            let value = if cmd == PathCommand::Arc && (idx == 3 || idx == 4) {
                self.next_flag()
            } else {
                self.next_number()
            };
            match value {
                Some(v) => params.push(v),
                None => {
                    self.i = start;
                    return None;
                }
            }
        }
        Some(params)
    }

    fn next_number(&mut self) -> Option<f64> {
        self.skip_ws();
        let start = self.i;
        let mut has = false;

        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.i += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.i += 1;
            has = true;
        }
        if self.peek() == Some(b'.') {
            self.i += 1;
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.i += 1;
                has = true;
            }
        }
        if !has {
            self.i = start;
            return None;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let before_exp = self.i;
            self.i += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.i += 1;
            }
            let mut exp_digits = false;
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.i += 1;
                exp_digits = true;
            }
            if !exp_digits {
                self.i = before_exp;
            }
        }

        let s = std::str::from_utf8(&self.bytes[start..self.i]).ok()?;
        s.parse::<f64>().ok()
    }

    // Arc flags may be packed without separators ("a5 5 0 01 20 20").
    fn next_flag(&mut self) -> Option<f64> {
        self.skip_ws();
        match self.peek()? {
            b'0' => {
                self.i += 1;
                Some(0.0)
            }
            b'1' => {
                self.i += 1;
                Some(1.0)
            }
            _ => None,
        }
    }
}

// True when a close is immediately followed by a relative move. The target
// format resolves such a move against the end of the previous subpath, so
// these moves must be rewritten as absolute ones.
pub fn has_rel_move_after_close(nodes: &[PathNode]) -> bool {
    nodes.windows(2).any(|w| {
        w[0].command == PathCommand::Close && w[1].command == PathCommand::Move && w[1].relative
    })
}

// Rewrites every coordinate, control point and arc radius by `t`.
// Relative operands only get the linear part; relative moves that follow a
// close (or open the path) become absolute.
pub fn transform_nodes(nodes: &[PathNode], t: &AffineTransform) -> Vec<PathNode> {
    let mut out = Vec::with_capacity(nodes.len());
    let (mut cur_x, mut cur_y) = (0.0, 0.0);
    let (mut start_x, mut start_y) = (0.0, 0.0);
    let mut prev: Option<PathCommand> = None;
    let shear_free = t.is_shear_free();

    for node in nodes {
        let p = &node.params;
        let rel = node.relative;
        match node.command {
            PathCommand::Move => {
                let (x, y) = if rel {
                    (cur_x + p[0], cur_y + p[1])
                } else {
                    (p[0], p[1])
                };
                let must_absolutize = prev.is_none() || prev == Some(PathCommand::Close);
                if rel && !must_absolutize {
                    let (dx, dy) = t.apply_vector(p[0], p[1]);
                    out.push(PathNode::new(PathCommand::Move, true, vec![dx, dy]));
                } else {
                    let (tx, ty) = t.apply(x, y);
                    out.push(PathNode::new(PathCommand::Move, false, vec![tx, ty]));
                }
                cur_x = x;
                cur_y = y;
                start_x = x;
                start_y = y;
            }
            PathCommand::Line | PathCommand::SmoothQuadratic => {
                out.push(map_points(node, t));
                (cur_x, cur_y) = end_point(node, cur_x, cur_y);
            }
            PathCommand::Cubic | PathCommand::SmoothCubic | PathCommand::Quadratic => {
                out.push(map_points(node, t));
                (cur_x, cur_y) = end_point(node, cur_x, cur_y);
            }
            PathCommand::Horizontal => {
                let x = if rel { cur_x + p[0] } else { p[0] };
                if shear_free {
                    let v = if rel { t.a * p[0] } else { t.a * p[0] + t.e };
                    out.push(PathNode::new(PathCommand::Horizontal, rel, vec![v]));
                } else if rel {
                    let (dx, dy) = t.apply_vector(p[0], 0.0);
                    out.push(PathNode::new(PathCommand::Line, true, vec![dx, dy]));
                } else {
                    let (tx, ty) = t.apply(x, cur_y);
                    out.push(PathNode::new(PathCommand::Line, false, vec![tx, ty]));
                }
                cur_x = x;
            }
            PathCommand::Vertical => {
                let y = if rel { cur_y + p[0] } else { p[0] };
                if shear_free {
                    let v = if rel { t.d * p[0] } else { t.d * p[0] + t.f };
                    out.push(PathNode::new(PathCommand::Vertical, rel, vec![v]));
                } else if rel {
                    let (dx, dy) = t.apply_vector(0.0, p[0]);
                    out.push(PathNode::new(PathCommand::Line, true, vec![dx, dy]));
                } else {
                    let (tx, ty) = t.apply(cur_x, y);
                    out.push(PathNode::new(PathCommand::Line, false, vec![tx, ty]));
                }
                cur_y = y;
            }
            PathCommand::Arc => {
                let (rx, ry, rotation) = transform_ellipse(p[0], p[1], p[2], t);
                let sweep = if t.determinant() < 0.0 {
                    1.0 - p[4]
                } else {
                    p[4]
                };
                let (ex, ey) = if rel {
                    t.apply_vector(p[5], p[6])
                } else {
                    t.apply(p[5], p[6])
                };
                out.push(PathNode::new(
                    PathCommand::Arc,
                    rel,
                    vec![rx, ry, rotation, p[3], sweep, ex, ey],
                ));
                (cur_x, cur_y) = end_point(node, cur_x, cur_y);
            }
            PathCommand::Close => {
                out.push(node.clone());
                cur_x = start_x;
                cur_y = start_y;
            }
        }
        prev = Some(node.command);
    }

    out
}

fn map_points(node: &PathNode, t: &AffineTransform) -> PathNode {
    let mut params = Vec::with_capacity(node.params.len());
    for pair in node.params.chunks(2) {
        let (x, y) = if node.relative {
            t.apply_vector(pair[0], pair[1])
        } else {
            t.apply(pair[0], pair[1])
        };
        params.push(x);
        params.push(y);
    }
    PathNode::new(node.command, node.relative, params)
}

fn end_point(node: &PathNode, cur_x: f64, cur_y: f64) -> (f64, f64) {
    let p = &node.params;
    let n = p.len();
    if n < 2 {
        return (cur_x, cur_y);
    }
    if node.relative {
        (cur_x + p[n - 2], cur_y + p[n - 1])
    } else {
        (p[n - 2], p[n - 1])
    }
}

// Maps the ellipse (rx, ry, rotation) through the linear part of `t` and
// returns the radii and rotation (degrees) of the resulting ellipse, using the
// closed-form singular value decomposition of a 2x2 matrix.
fn transform_ellipse(rx: f64, ry: f64, rotation_deg: f64, t: &AffineTransform) -> (f64, f64, f64) {
    let phi = rotation_deg.to_radians();
    let (s, c) = (libm::sin(phi), libm::cos(phi));
    // M = L * R(phi) * diag(rx, ry), column-major pieces.
    let m00 = (t.a * c + t.c * s) * rx;
    let m10 = (t.b * c + t.d * s) * rx;
    let m01 = (-t.a * s + t.c * c) * ry;
    let m11 = (-t.b * s + t.d * c) * ry;

    let e = (m00 + m11) / 2.0;
    let f = (m00 - m11) / 2.0;
    let g = (m10 + m01) / 2.0;
    let h = (m10 - m01) / 2.0;
    let q = libm::sqrt(e * e + h * h);
    let r = libm::sqrt(f * f + g * g);
    let sx = q + r;
    let sy = (q - r).abs();
    let a1 = libm::atan2(g, f);
    let a2 = libm::atan2(h, e);
    let angle = ((a2 + a1) / 2.0).to_degrees();
    (sx, sy, normalize_degrees(angle))
}

fn normalize_degrees(deg: f64) -> f64 {
    let mut d = deg % 360.0;
    if d < 0.0 {
        d += 360.0;
    }
    if d.abs() < 1e-9 || (d - 360.0).abs() < 1e-9 {
        0.0
    } else {
        d
    }
}

// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of a path. Curves use
// their control hull; arcs use their exact extremes.
pub fn bounds(nodes: &[PathNode]) -> Option<(f64, f64, f64, f64)> {
    let mut b = Bounds::default();
    let (mut cur_x, mut cur_y) = (0.0, 0.0);
    let (mut start_x, mut start_y) = (0.0, 0.0);

    for node in nodes {
        let p = &node.params;
        let rel = node.relative;
        match node.command {
            PathCommand::Move => {
                (cur_x, cur_y) = end_point(node, cur_x, cur_y);
                start_x = cur_x;
                start_y = cur_y;
                b.add(cur_x, cur_y);
            }
            PathCommand::Horizontal => {
                cur_x = if rel { cur_x + p[0] } else { p[0] };
                b.add(cur_x, cur_y);
            }
            PathCommand::Vertical => {
                cur_y = if rel { cur_y + p[0] } else { p[0] };
                b.add(cur_x, cur_y);
            }
            PathCommand::Line
            | PathCommand::SmoothQuadratic
            | PathCommand::Cubic
            | PathCommand::SmoothCubic
            | PathCommand::Quadratic => {
                for pair in p.chunks(2) {
                    if rel {
                        b.add(cur_x + pair[0], cur_y + pair[1]);
                    } else {
                        b.add(pair[0], pair[1]);
                    }
                }
                (cur_x, cur_y) = end_point(node, cur_x, cur_y);
            }
            PathCommand::Arc => {
                let (x1, y1) = end_point(node, cur_x, cur_y);
                b.add(x1, y1);
                if let Some(arc) = ArcCenter::from_endpoints(
                    cur_x,
                    cur_y,
                    p[0],
                    p[1],
                    p[2],
                    p[3] != 0.0,
                    p[4] != 0.0,
                    x1,
                    y1,
                ) {
                    for (x, y) in arc.extremes() {
                        b.add(x, y);
                    }
                }
                cur_x = x1;
                cur_y = y1;
            }
            PathCommand::Close => {
                cur_x = start_x;
                cur_y = start_y;
            }
        }
    }

    b.finish()
}

#[derive(Default)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    any: bool,
}

impl Bounds {
    fn add(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if !self.any {
            self.min_x = x;
            self.max_x = x;
            self.min_y = y;
            self.max_y = y;
            self.any = true;
            return;
        }
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn finish(self) -> Option<(f64, f64, f64, f64)> {
        self.any
            .then_some((self.min_x, self.min_y, self.max_x, self.max_y))
    }
}

// Center parameterization of an SVG arc (SVG 1.1 implementation notes F.6.5).
struct ArcCenter {
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    sin_phi: f64,
    cos_phi: f64,
    theta1: f64,
    dtheta: f64,
}

impl ArcCenter {
    #[allow(clippy::too_many_arguments)]
    fn from_endpoints(
        x0: f64,
        y0: f64,
        rx_in: f64,
        ry_in: f64,
        rotation_deg: f64,
        large_arc: bool,
        sweep: bool,
        x1: f64,
        y1: f64,
    ) -> Option<Self> {
        let mut rx = rx_in.abs();
        let mut ry = ry_in.abs();
        if rx == 0.0 || ry == 0.0 || (x0 == x1 && y0 == y1) {
            return None;
        }

        let phi = rotation_deg.to_radians();
        let sin_phi = libm::sin(phi);
        let cos_phi = libm::cos(phi);

        let dx2 = (x0 - x1) / 2.0;
        let dy2 = (y0 - y1) / 2.0;
        let x1p = cos_phi * dx2 + sin_phi * dy2;
        let y1p = -sin_phi * dx2 + cos_phi * dy2;

        let x1p2 = x1p * x1p;
        let y1p2 = y1p * y1p;
        let lambda = x1p2 / (rx * rx) + y1p2 / (ry * ry);
        if lambda > 1.0 {
            let s = libm::sqrt(lambda);
            rx *= s;
            ry *= s;
        }

        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let num = rx2 * ry2 - rx2 * y1p2 - ry2 * x1p2;
        let den = rx2 * y1p2 + ry2 * x1p2;
        let mut coef = 0.0;
        if den != 0.0 {
            let sign = if large_arc == sweep { -1.0 } else { 1.0 };
            coef = sign * libm::sqrt((num / den).max(0.0));
        }
        let cxp = coef * (rx * y1p / ry);
        let cyp = coef * (-ry * x1p / rx);

        let cx = cos_phi * cxp - sin_phi * cyp + (x0 + x1) / 2.0;
        let cy = sin_phi * cxp + cos_phi * cyp + (y0 + y1) / 2.0;

        fn angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
            let dot = ux * vx + uy * vy;
            let det = ux * vy - uy * vx;
            libm::atan2(det, dot)
        }

        let ux = (x1p - cxp) / rx;
        let uy = (y1p - cyp) / ry;
        let vx = (-x1p - cxp) / rx;
        let vy = (-y1p - cyp) / ry;

        let theta1 = angle(1.0, 0.0, ux, uy);
        let mut dtheta = angle(ux, uy, vx, vy);
        if !sweep && dtheta > 0.0 {
            dtheta -= 2.0 * PI;
        } else if sweep && dtheta < 0.0 {
            dtheta += 2.0 * PI;
        }

        Some(Self {
            cx,
            cy,
            rx,
            ry,
            sin_phi,
            cos_phi,
            theta1,
            dtheta,
        })
    }

    fn point_at(&self, theta: f64) -> (f64, f64) {
        let x = self.rx * libm::cos(theta);
        let y = self.ry * libm::sin(theta);
        (
            self.cx + self.cos_phi * x - self.sin_phi * y,
            self.cy + self.sin_phi * x + self.cos_phi * y,
        )
    }

    fn contains_angle(&self, theta: f64) -> bool {
        let tau = 2.0 * PI;
        let offset = if self.dtheta >= 0.0 {
            (theta - self.theta1).rem_euclid(tau)
        } else {
            (self.theta1 - theta).rem_euclid(tau)
        };
        offset <= self.dtheta.abs() + 1e-12
    }

    fn extremes(&self) -> Vec<(f64, f64)> {
        let tx = libm::atan2(-self.ry * self.sin_phi, self.rx * self.cos_phi);
        let ty = libm::atan2(self.ry * self.cos_phi, self.rx * self.sin_phi);
        [tx, tx + PI, ty, ty + PI]
            .into_iter()
            .filter(|theta| self.contains_angle(*theta))
            .map(|theta| self.point_at(theta))
            .collect()
    }
}

// Fractional digits for coordinates in a viewport whose larger side is
// `max_size`: small viewports keep more digits.
pub fn coordinate_digits(max_size: f64) -> usize {
    if !max_size.is_finite() || max_size <= 0.0 {
        return DEFAULT_DIGITS;
    }
    let exponent = libm::floor(libm::log2(max_size)) as i64;
    (6 - exponent * 3 / 10).clamp(0, 8) as usize
}

pub fn format_number(value: f64, digits: usize) -> String {
    let mut s = format!("{:.*}", digits, value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

pub fn format_float_value(value: f64) -> String {
    format_number(value, DEFAULT_DIGITS)
}

pub fn nodes_to_string(nodes: &[PathNode], digits: usize) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push(node.command.letter(node.relative));
        for (j, value) in node.params.iter().enumerate() {
            if j > 0 {
                out.push(if j % 2 == 1 { ',' } else { ' ' });
            }
            out.push_str(&format_number(*value, digits));
        }
    }
    out
}
