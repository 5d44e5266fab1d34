//! Declaration blocks: `property: value; ...` as found in rules and `style` attributes.

use crate::computed_style::{
    AppRegion, ColorRGBA, ComputedStyle, Display, Edges, Overflow, Position, SizeSpecified,
    Visibility,
};
use log::debug;

/// A single declaration with a lowercased property name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    /// Raw value trimmed of surrounding ASCII whitespace.
    pub value: String,
}

/// ASCII whitespace per CSS Syntax (TAB, LF, FF, CR, SPACE).
const fn is_ascii_whitespace(character: char) -> bool {
    matches!(
        character,
        '\u{0009}' | '\u{000A}' | '\u{000C}' | '\u{000D}' | '\u{0020}'
    )
}

/// Parse a declaration block. Items without a colon or with an empty
/// property or value are skipped.
pub fn parse_declarations(input: &str) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = Vec::new();
    for raw_item in input.split(';') {
        let item = raw_item.trim_matches(is_ascii_whitespace);
        let Some((raw_prop, raw_value)) = item.split_once(':') else {
            continue;
        };
        let property = raw_prop.trim_matches(is_ascii_whitespace);
        let value = raw_value.trim_matches(is_ascii_whitespace);
        if property.is_empty() || value.is_empty() {
            continue;
        }
        out.push(Declaration {
            property: property.to_ascii_lowercase(),
            value: value.to_owned(),
        });
    }
    out
}

/// Parse a `px` length or a bare number; `0` needs no unit.
pub fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    value
        .strip_suffix("px")
        .unwrap_or(value)
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|px| px.is_finite())
}

fn parse_size(value: &str) -> Option<SizeSpecified> {
    if value.eq_ignore_ascii_case("auto") {
        return Some(SizeSpecified::Auto);
    }
    if let Some(percent) = value.strip_suffix('%') {
        return percent
            .trim()
            .parse::<f32>()
            .ok()
            .map(|percent| SizeSpecified::Percent(percent / 100.0));
    }
    parse_px(value).map(SizeSpecified::Px)
}

fn parse_offset(value: &str) -> Option<Option<f32>> {
    if value.eq_ignore_ascii_case("auto") {
        return Some(None);
    }
    parse_px(value).map(Some)
}

/// One to four px lengths, expanded the usual CSS way.
fn parse_edges(value: &str) -> Option<Edges> {
    let parts: Option<Vec<f32>> = value.split_ascii_whitespace().map(parse_px).collect();
    match parts?.as_slice() {
        [all] => Some(Edges::uniform(*all)),
        [vertical, horizontal] => Some(Edges {
            top: *vertical,
            right: *horizontal,
            bottom: *vertical,
            left: *horizontal,
        }),
        [top, horizontal, bottom] => Some(Edges {
            top: *top,
            right: *horizontal,
            bottom: *bottom,
            left: *horizontal,
        }),
        [top, right, bottom, left] => Some(Edges {
            top: *top,
            right: *right,
            bottom: *bottom,
            left: *left,
        }),
        _ => None,
    }
}

fn parse_color(value: &str) -> Option<ColorRGBA> {
    let color = csscolorparser::parse(value).ok()?;
    let [red, green, blue, alpha] = color.to_rgba8();
    Some(ColorRGBA {
        red,
        green,
        blue,
        alpha,
    })
}

fn parse_overflow(value: &str) -> Option<Overflow> {
    match value.to_ascii_lowercase().as_str() {
        "visible" => Some(Overflow::Visible),
        "hidden" | "clip" => Some(Overflow::Hidden),
        "scroll" => Some(Overflow::Scroll),
        "auto" => Some(Overflow::Auto),
        _ => None,
    }
}

fn parse_display(keyword: &str) -> Option<Display> {
    match keyword {
        "none" => Some(Display::None),
        "block" => Some(Display::Block),
        "inline" => Some(Display::Inline),
        "inline-block" => Some(Display::InlineBlock),
        _ => None,
    }
}

fn parse_position(keyword: &str) -> Option<Position> {
    match keyword {
        "static" => Some(Position::Static),
        "relative" => Some(Position::Relative),
        "absolute" => Some(Position::Absolute),
        "fixed" => Some(Position::Fixed),
        "sticky" | "-webkit-sticky" => Some(Position::Sticky),
        _ => None,
    }
}

fn set_edge(edges: &mut Edges, side: &str, value: &str) -> bool {
    let Some(px) = parse_px(value) else {
        return false;
    };
    match side {
        "top" => edges.top = px,
        "right" => edges.right = px,
        "bottom" => edges.bottom = px,
        "left" => edges.left = px,
        _ => return false,
    }
    true
}

/// Apply one declaration to `style`. Returns false for unknown properties or
/// unparsable values, which leave `style` untouched.
pub fn apply_declaration(style: &mut ComputedStyle, declaration: &Declaration) -> bool {
    let value = declaration.value.as_str();
    let keyword = value.to_ascii_lowercase();
    let applied = match declaration.property.as_str() {
        "display" => parse_display(&keyword).map(|display| style.display = display),
        "position" => parse_position(&keyword).map(|position| style.position = position),
        "overflow" => parse_overflow(&keyword).map(|overflow| {
            style.overflow_x = overflow;
            style.overflow_y = overflow;
        }),
        "overflow-x" => parse_overflow(&keyword).map(|overflow| style.overflow_x = overflow),
        "overflow-y" => parse_overflow(&keyword).map(|overflow| style.overflow_y = overflow),
        "visibility" => match keyword.as_str() {
            "visible" => Some(Visibility::Visible),
            "hidden" | "collapse" => Some(Visibility::Hidden),
            _ => None,
        }
        .map(|visibility| style.visibility = visibility),
        "width" => parse_size(value).map(|size| style.width = size),
        "height" => parse_size(value).map(|size| style.height = size),
        "margin" => parse_edges(value).map(|edges| style.margin = edges),
        "padding" => parse_edges(value).map(|edges| style.padding = edges),
        "top" => parse_offset(value).map(|offset| style.inset.top = offset),
        "right" => parse_offset(value).map(|offset| style.inset.right = offset),
        "bottom" => parse_offset(value).map(|offset| style.inset.bottom = offset),
        "left" => parse_offset(value).map(|offset| style.inset.left = offset),
        "color" => parse_color(value).map(|color| style.color = color),
        "background-color" | "background" => {
            parse_color(value).map(|color| style.background_color = color)
        }
        "font-size" => parse_px(value)
            .filter(|px| *px > 0.0)
            .map(|px| style.font_size = px),
        "line-height" => value
            .trim()
            .parse::<f32>()
            .ok()
            .or_else(|| parse_px(value).map(|px| px / style.font_size))
            .map(|multiplier| style.line_height = multiplier),
        "opacity" => value
            .trim()
            .parse::<f32>()
            .ok()
            .map(|opacity| style.opacity = opacity.clamp(0.0, 1.0)),
        "filter" => {
            style.has_filter = keyword != "none";
            Some(())
        }
        "will-change" => {
            style.composited = keyword.contains("transform");
            Some(())
        }
        "-webkit-app-region" | "app-region" => match keyword.as_str() {
            "drag" => Some(AppRegion::Drag),
            "no-drag" => Some(AppRegion::NoDrag),
            "none" => Some(AppRegion::None),
            _ => None,
        }
        .map(|region| style.app_region = region),
        property => {
            let edge = property
                .strip_prefix("margin-")
                .map(|side| set_edge(&mut style.margin, side, value))
                .or_else(|| {
                    property
                        .strip_prefix("padding-")
                        .map(|side| set_edge(&mut style.padding, side, value))
                });
            edge.filter(|applied| *applied).map(|_| ())
        }
    };
    if applied.is_none() {
        debug!(
            "ignoring declaration {}: {}",
            declaration.property, declaration.value
        );
    }
    applied.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invalid items are skipped and property names lowercased.
    ///
    /// # Panics
    /// Panics if the parsed declarations differ.
    #[test]
    fn parse_skips_invalid_items() {
        let declarations = parse_declarations(" WIDTH : 10px ;; nocolon; :x; height: ; color: red ");
        assert_eq!(
            declarations,
            vec![
                Declaration {
                    property: "width".to_owned(),
                    value: "10px".to_owned(),
                },
                Declaration {
                    property: "color".to_owned(),
                    value: "red".to_owned(),
                },
            ]
        );
    }

    /// Shorthands and longhands land in the right fields.
    ///
    /// # Panics
    /// Panics if a value is applied incorrectly.
    #[test]
    fn apply_box_properties() {
        let mut style = ComputedStyle::default();
        for declaration in parse_declarations(
            "display:block; margin: 1px 2px; padding-left: 5px; width: 50%; top: 4px; \
             position: fixed; overflow: hidden; background: #ff0000; filter: blur(2px)",
        ) {
            assert!(apply_declaration(&mut style, &declaration));
        }
        assert_eq!(style.display, Display::Block);
        assert_eq!(style.margin, Edges {
            top: 1.0,
            right: 2.0,
            bottom: 1.0,
            left: 2.0,
        });
        assert!((style.padding.left - 5.0).abs() < f32::EPSILON);
        assert_eq!(style.width, SizeSpecified::Percent(0.5));
        assert_eq!(style.inset.top, Some(4.0));
        assert!(style.is_viewport_constrained());
        assert!(style.has_overflow_clip());
        assert_eq!(style.background_color, ColorRGBA {
            red: 255,
            green: 0,
            blue: 0,
            alpha: 255,
        });
        assert!(style.has_filter);
    }

    /// Unknown properties and bad values leave the style untouched.
    ///
    /// # Panics
    /// Panics if an invalid declaration changes the style.
    #[test]
    fn invalid_values_are_ignored() {
        let mut style = ComputedStyle::default();
        for declaration in parse_declarations("display: grid; width: wide; frobnicate: 1") {
            assert!(!apply_declaration(&mut style, &declaration));
        }
        assert_eq!(style, ComputedStyle::default());
    }
}
