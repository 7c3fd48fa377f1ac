use tiny_skia::BlendMode;

/// Compositing operator used when drawing onto the surface.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Clears the destination.
    Clear,
    /// Replaces the destination.
    Source,
    /// Draws over the destination.
    #[default]
    Over,
    /// Keeps the source where the destination is.
    In,
    /// Keeps the source where the destination is not.
    Out,
    /// Draws the source on top of the destination, only where the destination is.
    Atop,
    /// Leaves the destination untouched.
    Dest,
    /// Draws the destination over the source.
    DestOver,
    /// Keeps the destination where the source is.
    DestIn,
    /// Keeps the destination where the source is not.
    DestOut,
    /// Keeps the destination where the source is, drawn over the source.
    DestAtop,
    /// Shows source and destination where they do not overlap.
    Xor,
    /// Adds source and destination.
    Add,
    /// Additive blending bounded by the destination alpha.
    Saturate,
    /// Multiplies the colors.
    Multiply,
    /// Inverse multiplication of the inverted colors.
    Screen,
    /// Multiply or screen depending on the destination.
    Overlay,
    /// Darker of source and destination.
    Darken,
    /// Lighter of source and destination.
    Lighten,
    /// Brightens the destination to reflect the source.
    ColorDodge,
    /// Darkens the destination to reflect the source.
    ColorBurn,
    /// Multiply or screen depending on the source.
    HardLight,
    /// Darken or lighten depending on the source.
    SoftLight,
    /// Absolute difference.
    Difference,
    /// Difference with lower contrast.
    Exclusion,
    /// Hue of the source with saturation and luminosity of the destination.
    HslHue,
    /// Saturation of the source with hue and luminosity of the destination.
    HslSaturation,
    /// Hue and saturation of the source with luminosity of the destination.
    HslColor,
    /// Luminosity of the source with hue and saturation of the destination.
    HslLuminosity,
}

impl Operator {
    /// Looks up an operator by its name (`"multiply"`, `"dest-over"`, `"hsl-hue"`...). Spaces
    /// are accepted in place of dashes.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace(' ', "-");
        let operator = match name.as_str() {
            "clear" => Self::Clear,
            "source" => Self::Source,
            "over" => Self::Over,
            "in" => Self::In,
            "out" => Self::Out,
            "atop" => Self::Atop,
            "dest" => Self::Dest,
            "dest-over" => Self::DestOver,
            "dest-in" => Self::DestIn,
            "dest-out" => Self::DestOut,
            "dest-atop" => Self::DestAtop,
            "xor" => Self::Xor,
            "add" => Self::Add,
            "saturate" => Self::Saturate,
            "multiply" => Self::Multiply,
            "screen" => Self::Screen,
            "overlay" => Self::Overlay,
            "darken" => Self::Darken,
            "lighten" => Self::Lighten,
            "color-dodge" => Self::ColorDodge,
            "color-burn" => Self::ColorBurn,
            "hard-light" => Self::HardLight,
            "soft-light" => Self::SoftLight,
            "difference" => Self::Difference,
            "exclusion" => Self::Exclusion,
            "hsl-hue" => Self::HslHue,
            "hsl-saturation" => Self::HslSaturation,
            "hsl-color" => Self::HslColor,
            "hsl-luminosity" => Self::HslLuminosity,
            _ => return None,
        };

        Some(operator)
    }

    /// Backend blend mode. The backend has no saturating operator, `Saturate` is drawn as `Add`.
    pub(crate) fn blend_mode(self) -> BlendMode {
        match self {
            Self::Clear => BlendMode::Clear,
            Self::Source => BlendMode::Source,
            Self::Over => BlendMode::SourceOver,
            Self::In => BlendMode::SourceIn,
            Self::Out => BlendMode::SourceOut,
            Self::Atop => BlendMode::SourceAtop,
            Self::Dest => BlendMode::Destination,
            Self::DestOver => BlendMode::DestinationOver,
            Self::DestIn => BlendMode::DestinationIn,
            Self::DestOut => BlendMode::DestinationOut,
            Self::DestAtop => BlendMode::DestinationAtop,
            Self::Xor => BlendMode::Xor,
            Self::Add | Self::Saturate => BlendMode::Plus,
            Self::Multiply => BlendMode::Multiply,
            Self::Screen => BlendMode::Screen,
            Self::Overlay => BlendMode::Overlay,
            Self::Darken => BlendMode::Darken,
            Self::Lighten => BlendMode::Lighten,
            Self::ColorDodge => BlendMode::ColorDodge,
            Self::ColorBurn => BlendMode::ColorBurn,
            Self::HardLight => BlendMode::HardLight,
            Self::SoftLight => BlendMode::SoftLight,
            Self::Difference => BlendMode::Difference,
            Self::Exclusion => BlendMode::Exclusion,
            Self::HslHue => BlendMode::Hue,
            Self::HslSaturation => BlendMode::Saturation,
            Self::HslColor => BlendMode::Color,
            Self::HslLuminosity => BlendMode::Luminosity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(Operator::from_name("multiply"), Some(Operator::Multiply));
        assert_eq!(Operator::from_name("dest-over"), Some(Operator::DestOver));
        assert_eq!(Operator::from_name("dest over"), Some(Operator::DestOver));
        assert_eq!(Operator::from_name("overlay"), Some(Operator::Overlay));
        assert_eq!(Operator::from_name("HSL-Luminosity"), Some(Operator::HslLuminosity));
        assert_eq!(Operator::from_name("normal"), None);
        assert_eq!(Operator::from_name(""), None);
    }

    #[test]
    fn saturate_is_additive() {
        assert_eq!(Operator::Saturate.blend_mode(), BlendMode::Plus);
        assert_eq!(Operator::default().blend_mode(), BlendMode::SourceOver);
    }
}
