use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use serde::Serialize;

use crate::data::model::DimensionValue;

/// `#rrggbb` string the charting side understands.
pub type Hex = String;

fn to_hex(rgb: Srgb) -> Hex {
    let rgb: Srgb<u8> = rgb.into_format();
    format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Hex> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_hex(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: dimension value → colour
// ---------------------------------------------------------------------------

/// Maps the values of a categorical dimension (continents, countries) to
/// distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<DimensionValue, Hex>,
    default_color: Hex,
}

impl ColorMap {
    pub fn new(values: &BTreeSet<DimensionValue>) -> Self {
        let mapping = values
            .iter()
            .cloned()
            .zip(generate_palette(values.len()))
            .collect();
        ColorMap {
            mapping,
            default_color: "#808080".to_string(),
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &DimensionValue) -> &str {
        self.mapping
            .get(value)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }

    /// Return the legend entries (value label → colour).
    pub fn legend_entries(&self) -> Vec<(String, Hex)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.to_string(), c.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Continuous scales
// ---------------------------------------------------------------------------

/// Colour stops of a continuous scale, positions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScale {
    pub name: &'static str,
    pub stops: Vec<(f64, Hex)>,
}

fn rgb(r: u8, g: u8, b: u8) -> LinSrgb {
    Srgb::new(r, g, b).into_format::<f32>().into_linear()
}

/// Interpolate `steps` stops through the given anchors in linear RGB.
fn interpolate(name: &'static str, anchors: &[LinSrgb], steps: usize) -> ColorScale {
    let steps = steps.max(2);
    let segments = (anchors.len() - 1) as f32;
    let stops = (0..steps)
        .map(|i| {
            let t = i as f32 / (steps - 1) as f32;
            let scaled = t * segments;
            let seg = (scaled.floor() as usize).min(anchors.len() - 2);
            let local = scaled - seg as f32;
            let mixed = anchors[seg].mix(anchors[seg + 1], local);
            (t as f64, to_hex(Srgb::from_linear(mixed)))
        })
        .collect();
    ColorScale { name, stops }
}

/// Green-blue ramp for health metrics.
pub fn green_blue(steps: usize) -> ColorScale {
    interpolate(
        "GnBu",
        &[rgb(247, 252, 240), rgb(123, 204, 196), rgb(8, 64, 129)],
        steps,
    )
}

/// Purple-blue ramp for economic indicators.
pub fn purple_blue(steps: usize) -> ColorScale {
    interpolate(
        "PuBu",
        &[rgb(255, 247, 251), rgb(116, 169, 207), rgb(2, 56, 88)],
        steps,
    )
}

/// Diverging red-white-blue scale for correlations, blue at -1, red at +1.
pub fn red_blue(steps: usize) -> ColorScale {
    interpolate(
        "RdBu_r",
        &[rgb(5, 48, 97), rgb(247, 247, 247), rgb(103, 0, 31)],
        steps,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_distinct() {
        let palette = generate_palette(6);
        assert_eq!(palette.len(), 6);
        let unique: BTreeSet<&Hex> = palette.iter().collect();
        assert_eq!(unique.len(), 6);
        assert!(palette.iter().all(|c| c.len() == 7 && c.starts_with('#')));
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_color_map_default() {
        let values: BTreeSet<DimensionValue> =
            ["Africa", "Europe"].into_iter().map(DimensionValue::from).collect();
        let map = ColorMap::new(&values);
        assert_ne!(map.color_for(&"Africa".into()), map.color_for(&"Europe".into()));
        assert_eq!(map.color_for(&"Oceania".into()), "#808080");
        assert_eq!(map.legend_entries().len(), 2);
    }

    #[test]
    fn test_scale_endpoints() {
        let scale = red_blue(5);
        assert_eq!(scale.stops.len(), 5);
        assert_eq!(scale.stops[0].0, 0.0);
        assert_eq!(scale.stops[4].0, 1.0);
        assert!(scale.stops[0].1.starts_with("#0"));
        assert_ne!(scale.stops[0].1, scale.stops[4].1);
        assert_eq!(green_blue(1).stops.len(), 2);
    }
}
