use lightningcss::traits::Parse;
use lightningcss::values::color::{CssColor, SRGB};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f64,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba {
        red: 0,
        green: 0,
        blue: 0,
        alpha: 1.0,
    };

    pub const TRANSPARENT: Rgba = Rgba {
        red: 0,
        green: 0,
        blue: 0,
        alpha: 0.0,
    };

    pub fn parse(value: &str) -> Option<Rgba> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("none") {
            return Some(Rgba::TRANSPARENT);
        }
        let color = CssColor::parse_string(value).ok()?;
        css_color_to_rgba(&color)
    }

    pub fn with_opacity(self, opacity: f64) -> Rgba {
        Rgba {
            alpha: (self.alpha * opacity).clamp(0.0, 1.0),
            ..self
        }
    }

    fn alpha_byte(&self) -> u8 {
        (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    pub fn to_hex(&self) -> String {
        if self.alpha_byte() == 255 {
            format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
        } else {
            self.to_argb_hex()
        }
    }

    pub fn to_argb_hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            self.alpha_byte(),
            self.red,
            self.green,
            self.blue
        )
    }

    pub fn is_opaque_white(&self) -> bool {
        self.red == 255 && self.green == 255 && self.blue == 255 && self.alpha_byte() == 255
    }
}

fn css_color_to_rgba(color: &CssColor) -> Option<Rgba> {
    if let CssColor::RGBA(rgba) = color {
        let alpha = (rgba.alpha as f64 / 255.0).clamp(0.0, 1.0);
        return Some(Rgba {
            red: rgba.red,
            green: rgba.green,
            blue: rgba.blue,
            alpha,
        });
    }
    if let Ok(srgb) = SRGB::try_from(color) {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        return Some(Rgba {
            red: channel(srgb.r),
            green: channel(srgb.g),
            blue: channel(srgb.b),
            alpha: f64::from(srgb.alpha).clamp(0.0, 1.0),
        });
    }
    None
}

// Eight hex digits are the canonical `#aarrggbb` form written by flatten.
pub fn is_transparent(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return true;
    }
    match value.strip_prefix('#') {
        Some(hex) if hex.len() == 8 => hex.starts_with("00"),
        _ => Rgba::parse(value).is_some_and(|c| c.alpha_byte() == 0),
    }
}
