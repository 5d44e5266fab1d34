//! Integer geometry used by layout, scrolling and paint invalidation.

use core::ops::{Add, Neg, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IntPoint {
    pub x: i32,
    pub y: i32,
}

impl IntPoint {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair, also used for offsets and scroll deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IntSize {
    pub width: i32,
    pub height: i32,
}

impl IntSize {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub const fn is_zero(self) -> bool {
        self.width == 0 && self.height == 0
    }

    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl Add<IntSize> for IntPoint {
    type Output = Self;

    fn add(self, offset: IntSize) -> Self {
        Self::new(self.x + offset.width, self.y + offset.height)
    }
}

impl Sub<IntSize> for IntPoint {
    type Output = Self;

    fn sub(self, offset: IntSize) -> Self {
        Self::new(self.x - offset.width, self.y - offset.height)
    }
}

impl Sub for IntPoint {
    type Output = IntSize;

    fn sub(self, other: Self) -> IntSize {
        IntSize::new(self.x - other.x, self.y - other.y)
    }
}

impl Neg for IntSize {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.width, -self.height)
    }
}

/// A simple rectangle for layout geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayoutRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl LayoutRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_location_and_size(location: IntPoint, size: IntSize) -> Self {
        Self::new(location.x, location.y, size.width, size.height)
    }

    pub const fn location(&self) -> IntPoint {
        IntPoint::new(self.x, self.y)
    }

    pub const fn size(&self) -> IntSize {
        IntSize::new(self.width, self.height)
    }

    pub const fn max_x(&self) -> i32 {
        self.x + self.width
    }

    pub const fn max_y(&self) -> i32 {
        self.y + self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[must_use]
    pub const fn translated(&self, offset: IntSize) -> Self {
        Self::new(
            self.x + offset.width,
            self.y + offset.height,
            self.width,
            self.height,
        )
    }

    /// Bounding box of both rects; an empty rect contributes nothing.
    #[must_use]
    pub fn united(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(
            x,
            y,
            self.max_x().max(other.max_x()) - x,
            self.max_y().max(other.max_y()) - y,
        )
    }

    /// Overlap of both rects, or an empty rect at the origin.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        if max_x <= x || max_y <= y {
            return Self::default();
        }
        Self::new(x, y, max_x - x, max_y - y)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersection(other).is_empty()
    }

    pub const fn contains_point(&self, point: IntPoint) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }
}

/// Round a float layout length to whole pixels.
pub fn snap(length: f32) -> i32 {
    length.round() as i32
}
