#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn rotate(deg: f64) -> Self {
        let rad = deg.to_radians();
        let s = libm::sin(rad);
        let c = libm::cos(rad);
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    pub fn skew_x(deg: f64) -> Self {
        Self::new(1.0, 0.0, libm::tan(deg.to_radians()), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(deg: f64) -> Self {
        Self::new(1.0, libm::tan(deg.to_radians()), 0.0, 1.0, 0.0, 0.0)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    // Linear part only; used for relative path operands.
    pub fn apply_vector(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.a * dx + self.c * dy, self.b * dx + self.d * dy)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn is_shear_free(&self) -> bool {
        self.b == 0.0 && self.c == 0.0
    }

    pub fn is_uniform_scale(&self) -> bool {
        self.a == self.d
    }

    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.a - other.a).abs() <= eps
            && (self.b - other.b).abs() <= eps
            && (self.c - other.c).abs() <= eps
            && (self.d - other.d).abs() <= eps
            && (self.e - other.e).abs() <= eps
            && (self.f - other.f).abs() <= eps
    }
}

// Matrix product `t1 * t2`: the result applies `t2` first, then `t1`.
pub fn compose(t1: &AffineTransform, t2: &AffineTransform) -> AffineTransform {
    AffineTransform {
        a: t1.a * t2.a + t1.c * t2.b,
        b: t1.b * t2.a + t1.d * t2.b,
        c: t1.a * t2.c + t1.c * t2.d,
        d: t1.b * t2.c + t1.d * t2.d,
        e: t1.a * t2.e + t1.c * t2.f + t1.e,
        f: t1.b * t2.e + t1.d * t2.f + t1.f,
    }
}

// Builds the matrix for one transform function. Returns `None` for an unknown
// keyword or a wrong argument count so the caller can skip just this function.
pub fn parse_one_transform(kind: &str, args: &[f64]) -> Option<AffineTransform> {
    let n = args.len();
    match kind.trim().to_ascii_lowercase().as_str() {
        "matrix" => {
            if n != 6 {
                return None;
            }
            Some(AffineTransform::new(
                args[0], args[1], args[2], args[3], args[4], args[5],
            ))
        }
        "translate" => match n {
            1 => Some(AffineTransform::translate(args[0], 0.0)),
            2 => Some(AffineTransform::translate(args[0], args[1])),
            _ => None,
        },
        "scale" => match n {
            1 => Some(AffineTransform::scale(args[0], args[0])),
            2 => Some(AffineTransform::scale(args[0], args[1])),
            _ => None,
        },
        "rotate" => match n {
            1 => Some(AffineTransform::rotate(args[0])),
            3 => {
                // Move the center to the origin, rotate, move it back.
                let (cx, cy) = (args[1], args[2]);
                let to_origin = AffineTransform::translate(-cx, -cy);
                let back = AffineTransform::translate(cx, cy);
                let rotated = compose(&AffineTransform::rotate(args[0]), &to_origin);
                Some(compose(&back, &rotated))
            }
            _ => None,
        },
        "skewx" => (n == 1).then(|| AffineTransform::skew_x(args[0])),
        "skewy" => (n == 1).then(|| AffineTransform::skew_y(args[0])),
        _ => None,
    }
}

// Parses a full `transform` attribute such as `translate(30) rotate(45 50 50)`.
// Functions compose left to right; malformed functions are skipped.
pub fn parse_transform_list(input: &str) -> AffineTransform {
    let mut out = AffineTransform::IDENTITY;
    let mut s = input.trim();

    while !s.is_empty() {
        let Some(open) = s.find('(') else { break };
        let Some(close) = s[open + 1..].find(')') else {
            break;
        };
        let name = s[..open].trim().trim_start_matches(',').trim();
        let args_str = &s[open + 1..open + 1 + close];
        if let Some(args) = parse_number_list(args_str) {
            if let Some(m) = parse_one_transform(name, &args) {
                out = compose(&out, &m);
            }
        }
        s = s[open + 1 + close + 1..].trim_start();
    }

    out
}

// Splits on whitespace and commas. Any token that is not a number
// invalidates the whole list.
pub fn parse_number_list(input: &str) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    for token in input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
    {
        out.push(token.parse::<f64>().ok()?);
    }
    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn sample() -> AffineTransform {
        AffineTransform::new(1.5, 0.25, -0.75, 2.0, 10.0, -4.0)
    }

    #[test]
    fn identity_is_neutral_on_both_sides() {
        let t = sample();
        assert_eq!(compose(&AffineTransform::IDENTITY, &t), t);
        assert_eq!(compose(&t, &AffineTransform::IDENTITY), t);
    }

    #[test]
    fn composition_is_associative() {
        let t1 = sample();
        let t2 = AffineTransform::rotate(33.0);
        let t3 = AffineTransform::new(0.5, 0.0, 0.3, 1.2, -7.0, 2.5);
        let left = compose(&compose(&t1, &t2), &t3);
        let right = compose(&t1, &compose(&t2, &t3));
        assert!(left.approx_eq(&right, EPS));
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let t = compose(
            &AffineTransform::translate(10.0, 0.0),
            &AffineTransform::scale(2.0, 2.0),
        );
        assert_eq!(t.apply(1.0, 1.0), (12.0, 2.0));
        let u = compose(
            &AffineTransform::scale(2.0, 2.0),
            &AffineTransform::translate(10.0, 0.0),
        );
        assert_eq!(u.apply(1.0, 1.0), (22.0, 2.0));
    }

    #[test]
    fn translate_and_scale_defaults() {
        assert_eq!(
            parse_one_transform("translate", &[5.0]),
            Some(AffineTransform::translate(5.0, 0.0))
        );
        assert_eq!(
            parse_one_transform("scale", &[3.0]),
            Some(AffineTransform::scale(3.0, 3.0))
        );
    }

    #[test]
    fn wrong_argument_counts_are_ignored() {
        assert!(parse_one_transform("matrix", &[1.0, 0.0, 0.0, 1.0, 0.0]).is_none());
        assert!(parse_one_transform("translate", &[1.0, 2.0, 3.0]).is_none());
        assert!(parse_one_transform("rotate", &[45.0, 1.0]).is_none());
        assert!(parse_one_transform("skewX", &[10.0, 10.0]).is_none());
        assert!(parse_one_transform("perspective", &[1.0]).is_none());
    }

    #[test]
    fn rotate_about_center_keeps_center_fixed() {
        let t = parse_one_transform("rotate", &[90.0, 50.0, 50.0]).expect("rotate");
        let (x, y) = t.apply(50.0, 50.0);
        assert!((x - 50.0).abs() < EPS && (y - 50.0).abs() < EPS);
        let (x, y) = t.apply(60.0, 50.0);
        assert!((x - 50.0).abs() < EPS, "x = {x}");
        assert!((y - 60.0).abs() < EPS, "y = {y}");
    }

    #[test]
    fn skew_places_tangent_in_shear_slot() {
        let t = parse_one_transform("skewX", &[45.0]).expect("skewX");
        assert!((t.c - 1.0).abs() < EPS);
        assert_eq!(t.b, 0.0);
        let t = parse_one_transform("skewY", &[45.0]).expect("skewY");
        assert!((t.b - 1.0).abs() < EPS);
        assert_eq!(t.c, 0.0);
    }

    #[test]
    fn transform_list_composes_left_to_right_and_skips_bad_functions() {
        let t = parse_transform_list("translate(10, 20) bogus(1) scale(2)");
        assert_eq!(t.apply(1.0, 1.0), (12.0, 22.0));
        let t = parse_transform_list("translate(10 20 30)");
        assert!(t.is_identity());
    }
}
