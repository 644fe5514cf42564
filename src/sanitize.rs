//! Colour-space normalization before rasterization.
//!
//! The rasterizer reads only sRGB values. Styling may compute to perceptual or
//! wide-gamut encodings (`oklch()`, `oklab()`, `lab()`, `lch()`, `color()`),
//! which would come out blank. [`sanitize_tree`] rewrites the foreground,
//! background and border colour of every element into a safe value. It runs on
//! the capture snapshot, so live styling is never touched.

use serde::Deserialize;

use crate::rendering::color::{convert_to_srgb, unsupported_space, Rgba};
use crate::rendering::dom::{ElementContent, Node};

/// How an unsupported colour is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFallback {
    /// Flat black, regardless of the original value
    #[default]
    Black,
    /// Equivalent sRGB for `oklab`/`oklch`, black for everything else
    Convert,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub elements: usize,
    pub rewritten: usize,
}

/// Walk the whole subtree and rewrite unsupported colours in place. Every node
/// stays in the tree.
pub fn sanitize_tree(root: &mut Node, fallback: ColorFallback) -> SanitizeReport {
    let mut report = SanitizeReport::default();
    walk(root, fallback, &mut report);
    if report.rewritten > 0 {
        log::warn!(
            "rewrote {} unsupported colour value(s) across {} element(s) before capture",
            report.rewritten,
            report.elements
        );
    }
    report
}

fn walk(node: &mut Node, fallback: ColorFallback, report: &mut SanitizeReport) {
    let Node::Element(el) = node else { return };
    report.elements += 1;
    let style = &mut el.style;
    for value in [&mut style.color, &mut style.background_color, &mut style.border_color] {
        if rewrite(value, fallback) {
            report.rewritten += 1;
        }
    }
    if let ElementContent::Children(children) = &mut el.content {
        for child in children {
            walk(child, fallback, report);
        }
    }
}

/// Per-node entry point for rasterizers that expose a node filter hook.
/// Sanitizes this node only and always includes it.
pub fn sanitize_node(node: &mut Node, fallback: ColorFallback) -> bool {
    if let Node::Element(el) = node {
        let style = &mut el.style;
        for value in [&mut style.color, &mut style.background_color, &mut style.border_color] {
            rewrite(value, fallback);
        }
    }
    true
}

fn rewrite(value: &mut String, fallback: ColorFallback) -> bool {
    if unsupported_space(value.as_str()).is_none() {
        return false;
    }
    let replacement = match fallback {
        ColorFallback::Black => Rgba::BLACK,
        ColorFallback::Convert => convert_to_srgb(value.as_str()).unwrap_or(Rgba::BLACK),
    };
    log::debug!("colour {} -> {}", value, replacement.to_css());
    *value = replacement.to_css();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::dom::Surface;
    use crate::Viewport;

    fn tree() -> Node {
        let html = r#"<div style="color: oklch(0.5 0.2 20); background-color: #fafafa; border-color: lab(40% 10 10)">
            text<!-- comment --><p style="background-color: color(display-p3 1 0 0)">x</p>
            <span style="color: rgb(1, 2, 3)">ok</span></div>"#;
        Surface::from_html(html, Viewport { width: 100, height: 100 }).unwrap().root
    }

    fn colors(node: &Node, out: &mut Vec<String>) {
        if let Node::Element(el) = node {
            out.extend([el.style.color.clone(), el.style.background_color.clone(), el.style.border_color.clone()]);
            for c in el.children() {
                colors(c, out);
            }
        }
    }

    #[test]
    fn rewrites_unsupported_colours_to_black() {
        let mut root = tree();
        let report = sanitize_tree(&mut root, ColorFallback::Black);
        assert_eq!(report.elements, 3);
        // div color + border, p inherited color + border + background
        assert_eq!(report.rewritten, 5);
        let mut all = Vec::new();
        colors(&root, &mut all);
        assert!(all.iter().all(|c| unsupported_space(c).is_none()));
        let div = root.as_element().unwrap();
        assert_eq!(div.style.color, "rgb(0, 0, 0)");
        assert_eq!(div.style.background_color, "#fafafa");
    }

    #[test]
    fn keeps_every_node() {
        let mut root = tree();
        let before = root.as_element().unwrap().children().len();
        sanitize_tree(&mut root, ColorFallback::Black);
        assert_eq!(before, root.as_element().unwrap().children().len());
        assert!(root.as_element().unwrap().children().iter().any(|n| matches!(n, Node::Comment(_))));
    }

    #[test]
    fn sanitizing_twice_equals_sanitizing_once() {
        for fallback in [ColorFallback::Black, ColorFallback::Convert] {
            let mut once = tree();
            sanitize_tree(&mut once, fallback);
            let mut twice = once.clone();
            let report = sanitize_tree(&mut twice, fallback);
            assert_eq!(report.rewritten, 0);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn convert_fallback_keeps_hue() {
        let mut root = tree();
        sanitize_tree(&mut root, ColorFallback::Convert);
        let div = root.as_element().unwrap();
        assert_ne!(div.style.color, "rgb(0, 0, 0)");
        // lab() has no conversion and falls back to black
        assert_eq!(div.style.border_color, "rgb(0, 0, 0)");
    }

    #[test]
    fn node_hook_always_includes() {
        let mut text = Node::Text("hi".into());
        assert!(sanitize_node(&mut text, ColorFallback::Black));
        let mut root = tree();
        assert!(sanitize_node(&mut root, ColorFallback::Black));
        assert_eq!(root.as_element().unwrap().style.color, "rgb(0, 0, 0)");
    }
}
