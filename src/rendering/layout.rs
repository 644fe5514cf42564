//! Block layout for capture surfaces.
//!
//! Boxes stack vertically inside their parent's content box. Text wraps on a
//! fixed 8px character grid (headings at scale 2), images and canvases are
//! replaced boxes. `overflow: hidden` clips descendants unless the layout is
//! computed for a capture pass.

use std::sync::Arc;

use image::RgbaImage;

use crate::rendering::dom::{Element, ElementContent, Node, Overflow, Surface};

pub const CHAR_WIDTH: u32 = 8;
pub const LINE_HEIGHT: u32 = 10;
const DEFAULT_IMAGE_WIDTH: u32 = 120;
const DEFAULT_IMAGE_HEIGHT: u32 = 48;
const DEFAULT_CANVAS_SIZE: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        Rect {
            x,
            y,
            width: (r - x).max(0) as u32,
            height: (b - y).max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxKind {
    Block {
        background_color: String,
        border_color: String,
        border_width: u32,
    },
    Text {
        text: String,
        color: String,
        scale: u32,
    },
    Image {
        src: String,
    },
    Canvas {
        bitmap: Option<Arc<RgbaImage>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub rect: Rect,
    pub clip: Option<Rect>,
    pub kind: BoxKind,
}

#[derive(Debug, Clone)]
pub struct LayoutTree {
    /// Boxes in paint order
    pub boxes: Vec<LayoutBox>,
    /// Border box of the root element
    pub root_rect: Rect,
    /// Region a rasterizer should cover: the root box when clipping, the
    /// union of every box otherwise
    pub bounds: Rect,
}

/// Lay out a surface. With `clip == false` (capture pass) overflow clipping
/// is disabled and `bounds` grows to include overflowing content.
pub fn layout_surface(surface: &Surface, clip: bool) -> LayoutTree {
    let mut boxes = Vec::new();
    let avail = surface.viewport.width;
    let root_rect = match &surface.root {
        Node::Element(el) => layout_element(el, 0, 0, avail, None, clip, &mut boxes),
        _ => Rect { x: 0, y: 0, width: surface.viewport.width, height: surface.viewport.height },
    };

    let bounds = if clip {
        root_rect
    } else {
        let right = boxes.iter().map(|b| b.rect.right()).fold(root_rect.right(), i32::max);
        let bottom = boxes.iter().map(|b| b.rect.bottom()).fold(root_rect.bottom(), i32::max);
        Rect { x: 0, y: 0, width: right.max(0) as u32, height: bottom.max(0) as u32 }
    };

    LayoutTree { boxes, root_rect, bounds }
}

fn layout_element(
    el: &Element,
    x: i32,
    y: i32,
    avail_width: u32,
    clip: Option<Rect>,
    clipping: bool,
    out: &mut Vec<LayoutBox>,
) -> Rect {
    let style = &el.style;
    match &el.content {
        ElementContent::Image { src } => {
            let rect = Rect {
                x,
                y,
                width: style.width.unwrap_or(DEFAULT_IMAGE_WIDTH),
                height: style.height.unwrap_or(DEFAULT_IMAGE_HEIGHT),
            };
            out.push(LayoutBox { rect, clip, kind: BoxKind::Image { src: src.clone() } });
            return rect;
        }
        ElementContent::Canvas { bitmap } => {
            let rect = Rect {
                x,
                y,
                width: style.width.unwrap_or(DEFAULT_CANVAS_SIZE),
                height: style.height.unwrap_or(DEFAULT_CANVAS_SIZE),
            };
            out.push(LayoutBox { rect, clip, kind: BoxKind::Canvas { bitmap: bitmap.clone() } });
            return rect;
        }
        ElementContent::Children(_) => {}
    }

    let width = style.width.unwrap_or(avail_width);
    let inset = style.border_width + style.padding;
    let content_width = width.saturating_sub(inset * 2);

    // reserve the block slot so the background paints beneath children
    let slot = out.len();
    out.push(LayoutBox {
        rect: Rect { x, y, width, height: 0 },
        clip,
        kind: BoxKind::Block {
            background_color: style.background_color.clone(),
            border_color: style.border_color.clone(),
            border_width: style.border_width,
        },
    });

    let scale = if matches!(el.tag.as_str(), "h1" | "h2") { 2 } else { 1 };
    let cx = x + inset as i32;
    let mut cursor = y + inset as i32;
    let mut child_clip = clip;

    let own_height = style.height;
    if clipping && style.overflow == Overflow::Hidden {
        let own = Rect {
            x,
            y,
            width,
            height: own_height.unwrap_or(u32::MAX / 4),
        };
        child_clip = Some(match clip {
            Some(c) => c.intersect(&own),
            None => own,
        });
    }

    for child in el.children() {
        match child {
            Node::Text(text) => {
                let lines = wrap_text(text, content_width, scale);
                let height = lines.len() as u32 * LINE_HEIGHT * scale;
                // an unbreakable word overflows the content box
                let longest = lines.iter().map(|l| l.chars().count() as u32).max().unwrap_or(0);
                let width = content_width.max(longest * CHAR_WIDTH * scale);
                out.push(LayoutBox {
                    rect: Rect { x: cx, y: cursor, width, height },
                    clip: child_clip,
                    kind: BoxKind::Text { text: lines.join("\n"), color: style.color.clone(), scale },
                });
                cursor += height as i32;
            }
            Node::Element(child_el) => {
                let r = layout_element(child_el, cx, cursor, content_width, child_clip, clipping, out);
                cursor = r.bottom();
            }
            Node::Comment(_) => {}
        }
    }

    let height = own_height.unwrap_or(((cursor - y).max(0) as u32) + inset);
    out[slot].rect.height = height;
    out[slot].rect
}

/// Greedy word wrap on the fixed character grid.
pub fn wrap_text(text: &str, content_width: u32, scale: u32) -> Vec<String> {
    let cell = (CHAR_WIDTH * scale.max(1)).max(1);
    let per_line = (content_width / cell).max(1) as usize;
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let cur_len = cur.chars().count();
        if cur_len + word.chars().count() + 1 > per_line && !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
