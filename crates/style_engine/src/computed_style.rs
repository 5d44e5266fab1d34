#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Display {
    None,
    Block,
    #[default]
    Inline,
    InlineBlock,
}

impl Display {
    /// Whether the box sits in an inline formatting context of its parent.
    pub const fn is_inline_level(self) -> bool {
        matches!(self, Self::Inline | Self::InlineBlock)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    /// Fixed and sticky boxes are positioned against the viewport.
    pub const fn is_viewport_constrained(self) -> bool {
        matches!(self, Self::Fixed | Self::Sticky)
    }

    pub const fn is_out_of_flow(self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
    Auto,
}

impl Overflow {
    pub const fn clips(self) -> bool {
        !matches!(self, Self::Visible)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// `-webkit-app-region`, collected into the frame's annotated regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AppRegion {
    #[default]
    None,
    Drag,
    NoDrag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRGBA {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl ColorRGBA {
    pub const BLACK: Self = Self {
        red: 0,
        green: 0,
        blue: 0,
        alpha: 255,
    };
    pub const WHITE: Self = Self {
        red: 255,
        green: 255,
        blue: 255,
        alpha: 255,
    };
    pub const TRANSPARENT: Self = Self {
        red: 0,
        green: 0,
        blue: 0,
        alpha: 0,
    };

    pub const fn is_opaque(self) -> bool {
        self.alpha == 255
    }
}

impl Default for ColorRGBA {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// `top`/`right`/`bottom`/`left`; `None` is `auto`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offsets {
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SizeSpecified {
    #[default]
    Auto,
    Px(f32),
    Percent(f32), // 0.0..=1.0
}

impl SizeSpecified {
    /// Resolve against a containing block dimension; `None` for `auto`.
    pub fn resolve(self, containing: f32) -> Option<f32> {
        match self {
            Self::Auto => None,
            Self::Px(px) => Some(px),
            Self::Percent(fraction) => Some(containing * fraction),
        }
    }

    pub const fn is_fixed(self) -> bool {
        matches!(self, Self::Px(_))
    }
}

/// A resolved style snapshot. Shared between nodes through `Arc` once
/// interned and replaced wholesale on recalc.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub position: Position,
    pub overflow_x: Overflow,
    pub overflow_y: Overflow,
    pub visibility: Visibility,
    pub width: SizeSpecified,
    pub height: SizeSpecified,
    pub margin: Edges,
    pub padding: Edges,
    pub inset: Offsets,
    pub color: ColorRGBA,
    pub background_color: ColorRGBA,
    pub font_size: f32,   // px
    pub line_height: f32, // unitless multiplier of font-size
    pub opacity: f32,
    /// Any `filter` other than `none`.
    pub has_filter: bool,
    /// `will-change: transform`; such boxes paint into their own composited layer.
    pub composited: bool,
    pub app_region: AppRegion,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::default(),
            position: Position::default(),
            overflow_x: Overflow::default(),
            overflow_y: Overflow::default(),
            visibility: Visibility::default(),
            width: SizeSpecified::default(),
            height: SizeSpecified::default(),
            margin: Edges::default(),
            padding: Edges::default(),
            inset: Offsets::default(),
            color: ColorRGBA::default(),
            background_color: ColorRGBA::TRANSPARENT,
            font_size: 16.0,
            line_height: 1.2,
            opacity: 1.0,
            has_filter: false,
            composited: false,
            app_region: AppRegion::default(),
        }
    }
}

impl ComputedStyle {
    /// The style given to nodes styled while render-blocking sheets load.
    pub fn placeholder() -> Self {
        Self {
            display: Display::None,
            ..Self::default()
        }
    }

    /// A fresh style carrying only the inherited properties of `parent`.
    pub fn inherit_from(parent: &Self) -> Self {
        Self {
            visibility: parent.visibility,
            color: parent.color,
            font_size: parent.font_size,
            line_height: parent.line_height,
            ..Self::default()
        }
    }

    pub const fn is_visible(&self) -> bool {
        matches!(self.visibility, Visibility::Visible)
    }

    /// Overflow clip on either axis.
    pub const fn has_overflow_clip(&self) -> bool {
        self.overflow_x.clips() || self.overflow_y.clips()
    }

    pub const fn is_viewport_constrained(&self) -> bool {
        self.position.is_viewport_constrained()
    }

    /// Line box height in px.
    pub fn computed_line_height(&self) -> f32 {
        self.font_size * self.line_height
    }
}
