use crate::foundation::core::Rgba8Premul;
use serde::{Deserialize, Serialize};

/// Straight-alpha color with `0..=1` channels.
///
/// Deserializes from `"#RRGGBB"`, `"#RRGGBBAA"`, `{ "r", "g", "b", "a"? }` objects with `0..=1`
/// channels, or `[r, g, b]` / `[r, g, b, a]` arrays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorDef {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ColorDef {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba8_straight(self) -> [u8; 4] {
        [
            to_u8(self.r),
            to_u8(self.g),
            to_u8(self.b),
            to_u8(self.a),
        ]
    }

    pub fn to_rgba8_premul(self) -> Rgba8Premul {
        let a = self.a.clamp(0.0, 1.0);
        let premul = |c: f64| to_u8(c.clamp(0.0, 1.0) * a);
        Rgba8Premul {
            r: premul(self.r),
            g: premul(self.g),
            b: premul(self.b),
            a: to_u8(a),
        }
    }
}

fn to_u8(x: f64) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl<'de> Deserialize<'de> for ColorDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Object {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Channels(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::Object { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            Repr::Channels(v) => match *v.as_slice() {
                [r, g, b] => Ok(Self::rgba(r, g, b, 1.0)),
                [r, g, b, a] => Ok(Self::rgba(r, g, b, a)),
                _ => Err(serde::de::Error::custom(format!(
                    "color array needs 3 or 4 channels, got {}",
                    v.len()
                ))),
            },
        }
    }
}

fn parse_hex(s: &str) -> Result<ColorDef, String> {
    let digits = s.trim().trim_start_matches('#');
    if !matches!(digits.len(), 6 | 8) || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid color \"{s}\": expected #RRGGBB or #RRGGBBAA"));
    }
    let mut channels = [1.0f64; 4];
    for (slot, i) in channels.iter_mut().zip((0..digits.len()).step_by(2)) {
        let byte = u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| e.to_string())?;
        *slot = f64::from(byte) / 255.0;
    }
    let [r, g, b, a] = channels;
    Ok(ColorDef::rgba(r, g, b, a))
}
