//! Patterns and Lookup Tables
//!
//! Regexes for variable references and the static tables the
//! tree compiler consults when choosing constructors and
//! attribute setters.
//!

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

// ------------------------------------------------------------- Public Consts

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// The one attribute routed through the namespaced setter.
///
pub const XLINK_HREF: &str = "xlink:href";

// ------------------------------------------------------------- Public Statics

/// A `{{ ... }}` reference. Group 1 holds the untrimmed path.
///
pub static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").unwrap());

/// A dotted path of identifier segments.
///
pub static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap()
});

// ------------------------------------------------------------- Private Statics

static SVG_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "svg", "rect", "circle", "ellipse", "line", "polyline", "polygon", "path", "text",
        "g", "use", "defs", "animate", "animateMotion", "animateTransform", "clipPath",
        "desc", "discard", "feBlend", "feColorMatrix", "feComponentTransfer", "feComposite",
        "feConvolveMatrix", "feDiffuseLighting", "feDisplacementMap", "feDistantLight",
        "feDropShadow", "feFlood", "feFuncA", "feFuncB", "feFuncG", "feFuncR",
        "feGaussianBlur", "feImage", "feMerge", "feMergeNode", "feMorphology", "feOffset",
        "fePointLight", "feSpecularLighting", "feSpotLight", "feTile", "feTurbulence",
        "filter", "foreignObject", "image", "linearGradient", "marker", "mask", "metadata",
        "mpath", "pattern", "radialGradient", "set", "stop", "switch", "symbol",
        "textPath", "tspan", "view",
    ]
    .into_iter()
    .collect()
});

/// Direct-property pairs. `*` matches any tag.
///
const DIRECT_ATTRIBUTES: &[(&str, &str)] = &[
    ("*", "id"),
    ("*", "title"),
    ("input", "name"),
    ("input", "value"),
    ("input", "type"),
    ("input", "checked"),
    ("input", "selected"),
    ("a", "href"),
    ("a", "target"),
    ("form", "method"),
    ("form", "action"),
    ("img", "src"),
    ("img", "srcset"),
    ("img", "alt"),
    ("img", "width"),
    ("img", "height"),
];

// ------------------------------------------------------------- Public Functions

/// Checks whether a tag always lives in the vector-graphics
/// namespace. Tags shared with ordinary markup (`a`, `title`,
/// `script`, `style`) are absent and only become vector-graphics
/// through their parent.
///
pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(tag)
}

/// Looks up `(tag, attribute)` first, then `(*, attribute)`.
///
pub fn is_direct_attribute(tag: &str, attribute: &str) -> bool {
    DIRECT_ATTRIBUTES
        .iter()
        .any(|&(t, a)| a == attribute && (t == tag || t == "*"))
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_direct_attribute() {
        assert!(is_direct_attribute("span", "title"));
        assert!(is_direct_attribute("input", "checked"));
        assert!(is_direct_attribute("a", "href"));
        assert!(!is_direct_attribute("link", "href"));
        assert!(!is_direct_attribute("span", "class"));
    }

    #[test]
    fn test_is_svg_tag() {
        assert!(is_svg_tag("circle"));
        assert!(is_svg_tag("foreignObject"));
        assert!(!is_svg_tag("a"));
        assert!(!is_svg_tag("div"));
    }

    #[test]
    fn test_token_pattern() {
        let found: Vec<_> = TOKEN
            .captures_iter("{{a}} and {{ b.c }}")
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(found, vec!["a", " b.c "]);
    }

    #[test]
    fn test_path_pattern() {
        assert!(PATH.is_match("user.name.first"));
        assert!(PATH.is_match("$index"));
        assert!(!PATH.is_match("user..name"));
        assert!(!PATH.is_match("a b"));
        assert!(!PATH.is_match("0.label"));
    }
}
