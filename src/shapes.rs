use crate::path::PathBuilder;

pub fn rect_to_path(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    rx: Option<f64>,
    ry: Option<f64>,
) -> Option<String> {
    if [x, y, width, height].iter().any(|v| v.is_nan()) || width <= 0.0 || height <= 0.0 {
        return None;
    }

    let rx = rx.filter(|v| v.is_finite() && *v > 0.0);
    let ry = ry.filter(|v| v.is_finite() && *v > 0.0);
    let (rx, ry) = match (rx, ry) {
        (None, None) => (0.0, 0.0),
        (Some(r), None) | (None, Some(r)) => (r, r),
        (Some(rx), Some(ry)) => (rx, ry),
    };

    let mut b = PathBuilder::new();
    if rx == 0.0 && ry == 0.0 {
        b.absolute_move_to(x, y)
            .absolute_horizontal_to(x + width)
            .absolute_vertical_to(y + height)
            .absolute_horizontal_to(x)
            .close();
        return Some(b.to_path_string());
    }

    let rx = rx.min(width / 2.0);
    let ry = ry.min(height / 2.0);
    b.absolute_move_to(x + rx, y)
        .absolute_horizontal_to(x + width - rx)
        .arc_to(rx, ry, 0.0, false, true, false, x + width, y + ry)
        .absolute_vertical_to(y + height - ry)
        .arc_to(rx, ry, 0.0, false, true, false, x + width - rx, y + height)
        .absolute_horizontal_to(x + rx)
        .arc_to(rx, ry, 0.0, false, true, false, x, y + height - ry)
        .absolute_vertical_to(y + ry)
        .arc_to(rx, ry, 0.0, false, true, false, x + rx, y)
        .close();
    Some(b.to_path_string())
}

pub fn circle_to_path(cx: f64, cy: f64, r: f64) -> Option<String> {
    if cx.is_nan() || cy.is_nan() || r.is_nan() || r <= 0.0 {
        return None;
    }
    let mut b = PathBuilder::new();
    b.absolute_move_to(cx, cy)
        .relative_move_to(-r, 0.0)
        .arc_to(r, r, 0.0, true, true, true, 2.0 * r, 0.0)
        .arc_to(r, r, 0.0, true, true, true, -2.0 * r, 0.0)
        .close();
    Some(b.to_path_string())
}

pub fn ellipse_to_path(cx: f64, cy: f64, rx: f64, ry: f64) -> Option<String> {
    if [cx, cy, rx, ry].iter().any(|v| v.is_nan()) || rx <= 0.0 || ry <= 0.0 {
        return None;
    }
    let mut b = PathBuilder::new();
    b.absolute_move_to(cx - rx, cy)
        .arc_to(rx, ry, 0.0, true, false, true, 2.0 * rx, 0.0)
        .arc_to(rx, ry, 0.0, true, false, true, -2.0 * rx, 0.0)
        .close();
    Some(b.to_path_string())
}

pub fn line_to_path(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<String> {
    if [x1, y1, x2, y2].iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut b = PathBuilder::new();
    b.absolute_move_to(x1, y1).absolute_line_to(x2, y2);
    Some(b.to_path_string())
}

pub fn poly_to_path(points: &str, close: bool) -> Option<String> {
    let points = parse_points(points)?;
    let (&(x0, y0), rest) = points.split_first()?;
    let mut b = PathBuilder::new();
    b.absolute_move_to(x0, y0);
    let (mut px, mut py) = (x0, y0);
    for &(x, y) in rest {
        b.relative_line_to(x - px, y - py);
        px = x;
        py = y;
    }
    if close {
        b.close();
    }
    Some(b.to_path_string())
}

// A trailing odd coordinate is ignored; any non-numeric token rejects the list.
fn parse_points(input: &str) -> Option<Vec<(f64, f64)>> {
    let mut nums = Vec::new();
    for token in input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
    {
        let v = token.parse::<f64>().ok()?;
        if v.is_nan() {
            return None;
        }
        nums.push(v);
    }
    let out: Vec<(f64, f64)> = nums.chunks_exact(2).map(|c| (c[0], c[1])).collect();
    if out.is_empty() { None } else { Some(out) }
}
