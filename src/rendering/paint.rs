//! Display list built from a layout tree

use std::sync::Arc;

use image::RgbaImage;

use crate::rendering::layout::{BoxKind, LayoutTree, Rect};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        color: String,
        clip: Option<Rect>,
    },
    Border {
        rect: Rect,
        width: u32,
        color: String,
        clip: Option<Rect>,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        color: String,
        scale: u32,
        clip: Option<Rect>,
    },
    Image {
        rect: Rect,
        src: String,
        clip: Option<Rect>,
    },
    Bitmap {
        rect: Rect,
        bitmap: Arc<RgbaImage>,
        clip: Option<Rect>,
    },
}

pub fn build_display_list(tree: &LayoutTree) -> Vec<PaintCommand> {
    let mut list = Vec::with_capacity(tree.boxes.len());
    for b in &tree.boxes {
        match &b.kind {
            BoxKind::Block { background_color, border_color, border_width } => {
                list.push(PaintCommand::SolidRect { rect: b.rect, color: background_color.clone(), clip: b.clip });
                if *border_width > 0 {
                    list.push(PaintCommand::Border {
                        rect: b.rect,
                        width: *border_width,
                        color: border_color.clone(),
                        clip: b.clip,
                    });
                }
            }
            BoxKind::Text { text, color, scale } => list.push(PaintCommand::Text {
                x: b.rect.x,
                y: b.rect.y,
                text: text.clone(),
                color: color.clone(),
                scale: *scale,
                clip: b.clip,
            }),
            BoxKind::Image { src } => list.push(PaintCommand::Image { rect: b.rect, src: src.clone(), clip: b.clip }),
            // an empty canvas paints nothing
            BoxKind::Canvas { bitmap: Some(bitmap) } => {
                list.push(PaintCommand::Bitmap { rect: b.rect, bitmap: bitmap.clone(), clip: b.clip })
            }
            BoxKind::Canvas { bitmap: None } => {}
        }
    }
    list
}
