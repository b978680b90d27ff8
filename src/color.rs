//! 16 bit packed RGB565 colors, the only pixel format the driver puts on the wire.

/// A color packed as 5 bits red, 6 bits green and 5 bits blue, most significant bits first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb565(u16);

impl Rgb565 {
    pub const BLACK: Rgb565 = Rgb565(0x0000);
    pub const WHITE: Rgb565 = Rgb565(0xFFFF);
    pub const RED: Rgb565 = Rgb565(0xF800);
    pub const GREEN: Rgb565 = Rgb565(0x07E0);
    pub const BLUE: Rgb565 = Rgb565(0x001F);
    pub const YELLOW: Rgb565 = Rgb565(0xFFE0);
    pub const CYAN: Rgb565 = Rgb565(0x07FF);
    pub const MAGENTA: Rgb565 = Rgb565(0xF81F);

    /// Pack 8 bit channels by keeping the top 5, 6 and 5 bits of red, green and blue. The low bits
    /// are discarded, never rounded.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb565(((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3))
    }

    /// Wrap an already packed value.
    pub const fn from_raw(raw: u16) -> Self {
        Rgb565(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The 5 bit red channel.
    pub const fn r(self) -> u8 {
        (self.0 >> 11) as u8
    }

    /// The 6 bit green channel.
    pub const fn g(self) -> u8 {
        ((self.0 >> 5) & 0x3F) as u8
    }

    /// The 5 bit blue channel.
    pub const fn b(self) -> u8 {
        (self.0 & 0x1F) as u8
    }

    /// The two bytes in the order the controller expects them on the bus.
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl From<u16> for Rgb565 {
    fn from(raw: u16) -> Self {
        Rgb565(raw)
    }
}

impl From<Rgb565> for u16 {
    fn from(color: Rgb565) -> Self {
        color.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_channels() {
        assert_eq!(Rgb565::new(0xFF, 0xFF, 0xFF), Rgb565::WHITE);
        assert_eq!(Rgb565::new(0, 0, 0), Rgb565::BLACK);
        assert_eq!(Rgb565::new(0xFF, 0, 0), Rgb565::RED);
        assert_eq!(Rgb565::new(0, 0xFF, 0), Rgb565::GREEN);
        assert_eq!(Rgb565::new(0, 0, 0xFF), Rgb565::BLUE);
        // Low bits below the channel width vanish.
        assert_eq!(Rgb565::new(0x07, 0x03, 0x07), Rgb565::BLACK);
        assert_eq!(Rgb565::new(0x0F, 0x0F, 0x0F), Rgb565::from_raw(0x0861));
    }

    #[test]
    fn channels() {
        let c = Rgb565::new(0b1010_1000, 0b0101_0100, 0b1100_1000);
        assert_eq!(c.r(), 0b10101);
        assert_eq!(c.g(), 0b010101);
        assert_eq!(c.b(), 0b11001);
        assert_eq!(c.to_be_bytes(), [0b1010_1010, 0b1011_1001]);
    }
}
