//! Capture surface tree.
//!
//! A [`Surface`] is a small styled DOM: elements with computed style, text
//! and comment nodes, images referenced by asset name, and canvases holding a
//! bitmap. It is parsed from HTML with `scraper`; only inline `style`
//! attributes are honoured.

use image::RgbaImage;
use scraper::{Html, Node as HtmlNode};
use std::sync::Arc;

use crate::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
}

/// Computed style of an element. Colour properties keep their raw computed
/// text so the sanitizer can inspect the encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub color: String,
    pub background_color: String,
    pub border_color: String,
    pub border_width: u32,
    pub padding: u32,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub overflow: Overflow,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: "rgb(0, 0, 0)".to_string(),
            background_color: "rgba(0, 0, 0, 0)".to_string(),
            border_color: "rgb(0, 0, 0)".to_string(),
            border_width: 0,
            padding: 0,
            width: None,
            height: None,
            overflow: Overflow::Visible,
        }
    }
}

impl Style {
    /// Build a computed style from an inline declaration block. `color`
    /// inherits from the parent, everything else starts from the initial
    /// value.
    pub fn from_inline(decls: &str, parent: Option<&Style>) -> Self {
        let mut style = Style::default();
        if let Some(p) = parent {
            style.color = p.color.clone();
        }
        let mut border_color_set = false;
        for decl in decls.split(';') {
            let Some((name, value)) = decl.split_once(':') else { continue };
            let value = value.trim().to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "color" => style.color = value,
                "background-color" | "background" => style.background_color = value,
                "border-color" => {
                    style.border_color = value;
                    border_color_set = true;
                }
                "border-width" => style.border_width = parse_px(&value).unwrap_or(0),
                "padding" => style.padding = parse_px(&value).unwrap_or(0),
                "width" => style.width = parse_px(&value),
                "height" => style.height = parse_px(&value),
                "overflow" => {
                    style.overflow = if value.eq_ignore_ascii_case("hidden") {
                        Overflow::Hidden
                    } else {
                        Overflow::Visible
                    }
                }
                _ => {}
            }
        }
        // border-color defaults to currentcolor
        if !border_color_set {
            style.border_color = style.color.clone();
        }
        style
    }
}

fn parse_px(v: &str) -> Option<u32> {
    v.trim().trim_end_matches("px").trim().parse::<f32>().ok().map(|f| f.max(0.0).round() as u32)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    Children(Vec<Node>),
    /// `<img src=...>`: resolved through the asset provider at raster time
    Image { src: String },
    /// `<canvas>`: bitmap drawn by the code renderer
    Canvas { bitmap: Option<Arc<RgbaImage>> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub style: Style,
    pub content: ElementContent,
}

impl Element {
    pub fn children(&self) -> &[Node] {
        match &self.content {
            ElementContent::Children(c) => c,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        let el = self.as_element()?;
        if el.id.as_deref() == Some(id) {
            return Some(el);
        }
        el.children().iter().find_map(|c| c.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        let Node::Element(el) = self else { return None };
        if el.id.as_deref() == Some(id) {
            return Some(el);
        }
        match &mut el.content {
            ElementContent::Children(children) => children.iter_mut().find_map(|c| c.find_by_id_mut(id)),
            _ => None,
        }
    }

    /// Concatenated text of this subtree.
    pub fn text(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Comment(_) => String::new(),
            Node::Element(e) => e.children().iter().map(Node::text).collect(),
        }
    }
}

/// The mounted certificate surface.
///
/// `generation` changes whenever the tree is replaced, which lets the code
/// renderer detect a remount.
#[derive(Debug, Clone)]
pub struct Surface {
    pub root: Node,
    pub viewport: Viewport,
    pub generation: u64,
}

impl Surface {
    /// Parse an HTML fragment and use its first element as the surface root.
    pub fn from_html(html: &str, viewport: Viewport) -> Option<Self> {
        let fragment = Html::parse_fragment(html);
        let root = fragment
            .root_element()
            .children()
            .find_map(|child| convert(child, None).filter(|n| matches!(n, Node::Element(_))))?;
        Some(Self { root, viewport, generation: next_generation() })
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.root.find_by_id(id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.root.find_by_id_mut(id)
    }
}

fn next_generation() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static GENERATION: AtomicU64 = AtomicU64::new(1);
    GENERATION.fetch_add(1, Ordering::Relaxed)
}

fn convert(node: ego_tree::NodeRef<'_, HtmlNode>, parent: Option<&Style>) -> Option<Node> {
    match node.value() {
        HtmlNode::Text(t) => {
            let collapsed = t.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                None
            } else {
                Some(Node::Text(collapsed))
            }
        }
        HtmlNode::Comment(c) => Some(Node::Comment((**c).to_string())),
        HtmlNode::Element(el) => {
            let tag = el.name().to_ascii_lowercase();
            if matches!(tag.as_str(), "script" | "style" | "head") {
                return None;
            }
            let style = Style::from_inline(el.attr("style").unwrap_or(""), parent);
            let content = match tag.as_str() {
                "img" => ElementContent::Image { src: el.attr("src").unwrap_or("").to_string() },
                "canvas" => ElementContent::Canvas { bitmap: None },
                _ => ElementContent::Children(node.children().filter_map(|c| convert(c, Some(&style))).collect()),
            };
            Some(Node::Element(Element {
                tag,
                id: el.attr("id").map(|s| s.to_string()),
                style,
                content,
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport { width: 200, height: 100 }
    }

    #[test]
    fn parses_elements_text_and_comments() {
        let html = r#"<div id="root" style="width: 200px; overflow: hidden"><!-- art --><h1>Hello   world</h1><img id="logo" src="logo.png"><canvas id="qr-code"></canvas></div>"#;
        let surface = Surface::from_html(html, viewport()).unwrap();
        let root = surface.root.as_element().unwrap();
        assert_eq!(root.id.as_deref(), Some("root"));
        assert_eq!(root.style.width, Some(200));
        assert_eq!(root.style.overflow, Overflow::Hidden);
        assert!(matches!(root.children()[0], Node::Comment(_)));
        assert_eq!(root.children()[1].text(), "Hello world");
        assert!(matches!(
            surface.find_by_id("logo").unwrap().content,
            ElementContent::Image { ref src } if src == "logo.png"
        ));
        assert!(matches!(surface.find_by_id("qr-code").unwrap().content, ElementContent::Canvas { bitmap: None }));
    }

    #[test]
    fn color_inherits_and_border_defaults_to_current_color() {
        let html = r#"<div style="color: oklch(0.5 0.1 10)"><p style="background-color: #fff">x</p></div>"#;
        let surface = Surface::from_html(html, viewport()).unwrap();
        let p = surface.root.as_element().unwrap().children()[0].as_element().unwrap();
        assert_eq!(p.style.color, "oklch(0.5 0.1 10)");
        assert_eq!(p.style.border_color, "oklch(0.5 0.1 10)");
        assert_eq!(p.style.background_color, "#fff");
    }

    #[test]
    fn reparsing_bumps_generation() {
        let a = Surface::from_html("<div></div>", viewport()).unwrap();
        let b = Surface::from_html("<div></div>", viewport()).unwrap();
        assert_ne!(a.generation, b.generation);
    }
}
