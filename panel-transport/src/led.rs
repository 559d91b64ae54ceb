//! LED addressing and color types

use crate::protocol::Key;

/// An LED on the panel, addressed by the key it sits under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Led {
    pub key: Key,
}

impl Led {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// Wire byte addressing this LED
    pub fn byte(self) -> u8 {
        self.key.byte()
    }
}

impl From<Key> for Led {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

/// RGB color value for a panel LED
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LedColor {
    /// Create a new RGB color
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a packed `0xRRGGBB` value
    pub const fn from_rgb(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }

    /// Packed `0xRRGGBB` value
    pub fn to_rgb(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Blend towards `other`; `f = 0.0` keeps `self`, `f = 1.0` gives `other`
    pub fn mix(self, other: LedColor, f: f32) -> Self {
        let f = f.clamp(0.0, 1.0);
        let a = self.scale(1.0 - f);
        let b = other.scale(f);
        Self {
            r: a.r.saturating_add(b.r),
            g: a.g.saturating_add(b.g),
            b: a.b.saturating_add(b.b),
        }
    }

    /// Blend towards black
    pub fn dim(self, f: f32) -> Self {
        self.mix(Self::BLACK, f)
    }

    /// Blend towards white
    pub fn brighten(self, f: f32) -> Self {
        self.mix(Self::WHITE, f)
    }

    fn scale(self, f: f32) -> Self {
        Self {
            r: (f32::from(self.r) * f) as u8,
            g: (f32::from(self.g) * f) as u8,
            b: (f32::from(self.b) * f) as u8,
        }
    }

    pub const BLACK: Self = Self::from_rgb(0x000000);
    pub const WHITE: Self = Self::from_rgb(0xFFFFFF);
    pub const BLUE: Self = Self::from_rgb(0x0000FF);
    pub const GREEN: Self = Self::from_rgb(0x00FF00);
    pub const YELLOW: Self = Self::from_rgb(0x888800);
    pub const RED: Self = Self::from_rgb(0xFF0000);
}

impl From<u32> for LedColor {
    fn from(rgb: u32) -> Self {
        Self::from_rgb(rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_rgb() {
        let c = LedColor::from_rgb(0x123456);
        assert_eq!(c, LedColor::new(0x12, 0x34, 0x56));
        assert_eq!(c.to_rgb(), 0x123456);
    }

    #[test]
    fn test_mix_endpoints() {
        assert_eq!(LedColor::RED.mix(LedColor::BLUE, 0.0), LedColor::RED);
        assert_eq!(LedColor::RED.mix(LedColor::BLUE, 1.0), LedColor::BLUE);
        assert_eq!(LedColor::WHITE.dim(1.0), LedColor::BLACK);
        assert_eq!(LedColor::BLACK.brighten(1.0), LedColor::WHITE);
    }

    #[test]
    fn test_dim_halves() {
        let c = LedColor::new(200, 100, 50).dim(0.5);
        assert_eq!(c, LedColor::new(100, 50, 25));
    }

    #[test]
    fn test_led_byte_is_key_byte() {
        assert_eq!(Led::new(Key::S0).byte(), Key::S0.byte());
        assert_eq!(Led::from(Key::Shift).byte(), 0x51);
    }
}
