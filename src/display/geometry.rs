//! Coordinates, rotation and the mapping from logical drawing coordinates to the address window
//! registers of the controller.

/// Logical orientation of the panel, clockwise from the native scan direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Decode the quarter-turn index 0-3. Other values are rejected.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Rotation::Deg0),
            1 => Some(Rotation::Deg90),
            2 => Some(Rotation::Deg180),
            3 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// Whether logical columns run along the native rows, i.e. width and height are exchanged.
    pub fn swaps_axes(self) -> bool {
        match self {
            Rotation::Deg90 | Rotation::Deg270 => true,
            Rotation::Deg0 | Rotation::Deg180 => false,
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Deg0
    }
}

/// A pixel coordinate pair of `column` and `row` in the rotated drawing space. Coordinates may
/// lie outside the panel; drawing operations clip against it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelCoord(pub i16, pub i16);

/// An inclusive rectangle of controller RAM addresses, already clamped to the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
}

impl Window {
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0) as usize + 1
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0) as usize + 1
    }

    /// Number of pixels the controller accepts before the write pointer wraps.
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

/// Clip a value between some low and high limit.
pub(crate) fn clip<T: PartialOrd>(lo: T, x: T, hi: T) -> T {
    match () {
        _ if x > hi => hi,
        _ if x < lo => lo,
        _ => x,
    }
}

/// Native panel dimensions plus the current rotation. The effective size is always derived from
/// the native one, so repeated rotations can not drift.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Geometry {
    native_width: u16,
    native_height: u16,
    rotation: Rotation,
}

impl Geometry {
    pub(crate) fn new(native_width: u16, native_height: u16, rotation: Rotation) -> Self {
        Geometry {
            native_width,
            native_height,
            rotation,
        }
    }

    pub(crate) fn native_size(&self) -> (u16, u16) {
        (self.native_width, self.native_height)
    }

    pub(crate) fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Effective `(width, height)` under the current rotation.
    pub(crate) fn size(&self) -> (u16, u16) {
        if self.rotation.swaps_axes() {
            (self.native_height, self.native_width)
        } else {
            (self.native_width, self.native_height)
        }
    }

    /// Switch rotation, returning whether the effective size changed.
    pub(crate) fn set_rotation(&mut self, rotation: Rotation) -> bool {
        let before = self.size();
        self.rotation = rotation;
        before != self.size()
    }

    /// Clamp each corner coordinate into the panel independently. The corners are not reordered.
    pub(crate) fn clamp_window(&self, upper_left: PixelCoord, lower_right: PixelCoord) -> Window {
        let (w, h) = self.size();
        let max_x = w as i32 - 1;
        let max_y = h as i32 - 1;
        Window {
            x0: clip(0, upper_left.0 as i32, max_x) as u16,
            y0: clip(0, upper_left.1 as i32, max_y) as u16,
            x1: clip(0, lower_right.0 as i32, max_x) as u16,
            y1: clip(0, lower_right.1 as i32, max_y) as u16,
        }
    }

    pub(crate) fn full_window(&self) -> Window {
        let (w, h) = self.size();
        Window {
            x0: 0,
            y0: 0,
            x1: w - 1,
            y1: h - 1,
        }
    }
}
