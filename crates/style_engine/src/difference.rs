use crate::computed_style::ComputedStyle;

/// What a style change requires of the layout tree, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StyleDifference {
    Equal,
    Repaint,
    Layout,
    /// The layout object must be rebuilt: its kind, or whether it is
    /// viewport constrained, may change.
    Reattach,
}

impl StyleDifference {
    pub fn compute(old: Option<&ComputedStyle>, new: &ComputedStyle) -> Self {
        let Some(old) = old else {
            return Self::Reattach;
        };
        if old.display != new.display || old.position != new.position {
            return Self::Reattach;
        }
        if old.width != new.width
            || old.height != new.height
            || old.margin != new.margin
            || old.padding != new.padding
            || old.inset != new.inset
            || old.overflow_x != new.overflow_x
            || old.overflow_y != new.overflow_y
            || old.font_size.to_bits() != new.font_size.to_bits()
            || old.line_height.to_bits() != new.line_height.to_bits()
        {
            return Self::Layout;
        }
        if old != new {
            return Self::Repaint;
        }
        Self::Equal
    }

    pub const fn needs_layout(self) -> bool {
        matches!(self, Self::Layout | Self::Reattach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed_style::{ColorRGBA, Display, Position, SizeSpecified};

    /// Each property class maps to the expected difference.
    ///
    /// # Panics
    /// Panics if a difference is misclassified.
    #[test]
    fn classifies_changes() {
        let base = ComputedStyle::default();
        assert_eq!(StyleDifference::compute(None, &base), StyleDifference::Reattach);
        assert_eq!(StyleDifference::compute(Some(&base), &base.clone()), StyleDifference::Equal);

        let recolored = ComputedStyle {
            color: ColorRGBA::TRANSPARENT,
            ..base.clone()
        };
        assert_eq!(StyleDifference::compute(Some(&base), &recolored), StyleDifference::Repaint);

        let resized = ComputedStyle {
            width: SizeSpecified::Px(4.0),
            ..base.clone()
        };
        assert_eq!(StyleDifference::compute(Some(&base), &resized), StyleDifference::Layout);

        let fixed = ComputedStyle {
            position: Position::Fixed,
            ..base.clone()
        };
        assert_eq!(StyleDifference::compute(Some(&base), &fixed), StyleDifference::Reattach);

        let hidden = ComputedStyle {
            display: Display::None,
            ..base.clone()
        };
        assert!(StyleDifference::compute(Some(&base), &hidden).needs_layout());
    }
}
