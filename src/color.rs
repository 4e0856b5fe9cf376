use std::fmt;
use std::str::FromStr;

use palette::{FromColor, Hsl, Srgb};

use crate::error::ColorError;

/// Fully resolved 8-bit color
pub type Rgb = Srgb<u8>;

pub const WHITE: Rgb = Rgb::new(255, 255, 255);

/// Anything a caller may hand to `set_color`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorInput {
    /// Hex string, CSS name or `rgb(...)`/`hsl(...)` function
    Text(String),
    /// Raw channel tuple, validated on resolution
    Channels(i64, i64, i64),
    /// Already resolved
    Rgb(Rgb),
}

impl fmt::Display for ColorInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorInput::Text(text) => write!(f, "{}", text),
            ColorInput::Channels(r, g, b) => write!(f, "({}, {}, {})", r, g, b),
            ColorInput::Rgb(c) => write!(f, "#{:02x}{:02x}{:02x}", c.red, c.green, c.blue),
        }
    }
}

impl From<&str> for ColorInput {
    fn from(text: &str) -> Self {
        ColorInput::Text(text.to_string())
    }
}

impl From<String> for ColorInput {
    fn from(text: String) -> Self {
        ColorInput::Text(text)
    }
}

impl From<(u8, u8, u8)> for ColorInput {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        ColorInput::Rgb(Rgb::new(r, g, b))
    }
}

impl From<(i64, i64, i64)> for ColorInput {
    fn from((r, g, b): (i64, i64, i64)) -> Self {
        ColorInput::Channels(r, g, b)
    }
}

impl From<Rgb> for ColorInput {
    fn from(color: Rgb) -> Self {
        ColorInput::Rgb(color)
    }
}

/// Turns a color-like input into RGB channels, or fails.
pub trait ColorResolver {
    fn resolve(&self, input: &ColorInput) -> Result<Rgb, ColorError>;
}

/// Accepts hex (`#f00`, `ff0000`, `0xff000080`), CSS names, `rgb()`/`rgba()` and `hsl()`/`hsla()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssColorResolver;

impl ColorResolver for CssColorResolver {
    fn resolve(&self, input: &ColorInput) -> Result<Rgb, ColorError> {
        match input {
            ColorInput::Rgb(color) => Ok(*color),
            ColorInput::Channels(r, g, b) => Ok(Rgb::new(channel(*r)?, channel(*g)?, channel(*b)?)),
            ColorInput::Text(text) => parse_color(text),
        }
    }
}

/// Parse a color string. Any alpha component is accepted and dropped.
pub fn parse_color(input: &str) -> Result<Rgb, ColorError> {
    let text = input.trim().to_ascii_lowercase();

    if let Some((name, args)) = split_function(&text) {
        let args: Vec<&str> = args.split(',').map(str::trim).collect();
        return match name {
            "rgb" | "rgba" => parse_rgb_function(&args, input),
            "hsl" | "hsla" => parse_hsl_function(&args, input),
            _ => Err(ColorError::Unrecognized(input.to_string())),
        };
    }

    if let Some(color) = palette::named::from_str(&text) {
        return Ok(color);
    }

    parse_hex(&text).ok_or_else(|| ColorError::Unrecognized(input.to_string()))
}

fn channel(value: i64) -> Result<u8, ColorError> {
    u8::try_from(value).map_err(|_| ColorError::ChannelOutOfRange(value))
}

fn parse_hex(text: &str) -> Option<Rgb> {
    let digits = text
        .strip_prefix('#')
        .or_else(|| text.strip_prefix("0x"))
        .unwrap_or(text);

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    // Drop the alpha digit(s)
    let digits = match digits.len() {
        3 | 6 => digits,
        4 => &digits[..3],
        8 => &digits[..6],
        _ => return None,
    };

    Rgb::from_str(digits).ok()
}

/// `name(args)` -> (`name`, `args`)
fn split_function(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let args = text[open + 1..].strip_suffix(')')?;
    Some((text[..open].trim_end(), args))
}

fn malformed(input: &str) -> ColorError {
    ColorError::Malformed(input.to_string())
}

/// `rgb(r, g, b[, a])`; channels are integers, floats or percentages.
fn parse_rgb_function(args: &[&str], input: &str) -> Result<Rgb, ColorError> {
    if args.len() != 3 && args.len() != 4 {
        return Err(malformed(input));
    }
    if let Some(alpha) = args.get(3) {
        check_alpha(alpha, input)?;
    }

    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(args) {
        *slot = rgb_channel(part, input)?;
    }

    Ok(Rgb::new(channels[0], channels[1], channels[2]))
}

fn rgb_channel(part: &str, input: &str) -> Result<u8, ColorError> {
    if let Some(percent) = part.strip_suffix('%') {
        let fraction = percentage(percent, input)?;
        return Ok((fraction * 255.0).round() as u8);
    }
    if let Ok(value) = part.parse::<i64>() {
        return channel(value);
    }

    let value: f64 = part.parse().map_err(|_| malformed(input))?;
    if !(0.0..=255.0).contains(&value) {
        return Err(ColorError::ChannelOutOfRange(value.round() as i64));
    }
    Ok(value.round() as u8)
}

/// `hsl(h[deg|rad|turn], s%, l%[, a])`
fn parse_hsl_function(args: &[&str], input: &str) -> Result<Rgb, ColorError> {
    if args.len() != 3 && args.len() != 4 {
        return Err(malformed(input));
    }
    if let Some(alpha) = args.get(3) {
        check_alpha(alpha, input)?;
    }

    let hue = hue_degrees(args[0], input)?;
    let saturation = args[1].strip_suffix('%').ok_or_else(|| malformed(input))?;
    let lightness = args[2].strip_suffix('%').ok_or_else(|| malformed(input))?;

    let hsl: Hsl = Hsl::new(
        hue as f32,
        percentage(saturation, input)? as f32,
        percentage(lightness, input)? as f32,
    );
    let rgb: Srgb = Srgb::from_color(hsl);
    Ok(rgb.into_format())
}

fn hue_degrees(part: &str, input: &str) -> Result<f64, ColorError> {
    let (number, scale) = if let Some(n) = part.strip_suffix("deg") {
        (n, 1.0)
    } else if let Some(n) = part.strip_suffix("rad") {
        (n, 180.0 / std::f64::consts::PI)
    } else if let Some(n) = part.strip_suffix("turn") {
        (n, 360.0)
    } else {
        (part, 1.0)
    };

    let value: f64 = number.trim().parse().map_err(|_| malformed(input))?;
    if !value.is_finite() {
        return Err(malformed(input));
    }
    Ok(value * scale)
}

/// `0..=100` (without the `%`) as a fraction
fn percentage(number: &str, input: &str) -> Result<f64, ColorError> {
    let value: f64 = number.trim().parse().map_err(|_| malformed(input))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(malformed(input));
    }
    Ok(value / 100.0)
}

/// Alpha is validated, then dropped
fn check_alpha(part: &str, input: &str) -> Result<(), ColorError> {
    let valid = match part.strip_suffix('%') {
        Some(percent) => percentage(percent, input).is_ok(),
        None => part.parse::<f64>().map_or(false, |a| (0.0..=1.0).contains(&a)),
    };
    if valid {
        Ok(())
    } else {
        Err(malformed(input))
    }
}
