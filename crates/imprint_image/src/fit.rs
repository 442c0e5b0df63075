//! Placement of the base image inside the composite

use serde::{Deserialize, Serialize};

/// How the image fits its box (CSS `object-fit` equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectFit {
    /// Fit entirely within the box, keeping the aspect ratio
    #[default]
    Contain,
    /// Fill the box, cropping the image, keeping the aspect ratio
    Cover,
    /// Stretch to the box
    Fill,
    /// Like `Contain`, but never scale up
    ScaleDown,
}

/// Alignment inside the box (0.0 = start, 0.5 = center, 1.0 = end)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPosition {
    pub x: f32,
    pub y: f32,
}

impl ObjectPosition {
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };
    pub const TOP_CENTER: Self = Self { x: 0.5, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Default for ObjectPosition {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Source and destination rectangles (`[x, y, width, height]`) for drawing
/// an `image_width` x `image_height` image into a box.
pub fn calculate_fit_rects(
    image_width: u32,
    image_height: u32,
    box_width: f32,
    box_height: f32,
    fit: ObjectFit,
    position: ObjectPosition,
) -> ([f32; 4], [f32; 4]) {
    let img_w = image_width as f32;
    let img_h = image_height as f32;

    match fit {
        ObjectFit::Fill => ([0.0, 0.0, img_w, img_h], [0.0, 0.0, box_width, box_height]),

        ObjectFit::Contain | ObjectFit::ScaleDown => {
            let mut scale = (box_width / img_w).min(box_height / img_h);
            if fit == ObjectFit::ScaleDown {
                scale = scale.min(1.0);
            }
            let dst_w = img_w * scale;
            let dst_h = img_h * scale;
            let dst_x = (box_width - dst_w) * position.x;
            let dst_y = (box_height - dst_h) * position.y;

            ([0.0, 0.0, img_w, img_h], [dst_x, dst_y, dst_w, dst_h])
        }

        ObjectFit::Cover => {
            let scale = (box_width / img_w).max(box_height / img_h);
            let src_w = box_width / scale;
            let src_h = box_height / scale;
            let src_x = (img_w - src_w) * position.x;
            let src_y = (img_h - src_h) * position.y;

            ([src_x, src_y, src_w, src_h], [0.0, 0.0, box_width, box_height])
        }
    }
}

/// Box the base image occupies in a composite `width` logical pixels wide:
/// full width up to `max_width`, horizontally centered. Without an explicit
/// `height` the box follows the image's aspect ratio.
pub fn image_box(
    image_width: u32,
    image_height: u32,
    width: f32,
    max_width: f32,
    height: Option<f32>,
) -> [f32; 4] {
    let box_w = width.min(max_width).max(0.0);
    let box_h = height.unwrap_or_else(|| {
        if image_width == 0 {
            0.0
        } else {
            box_w * image_height as f32 / image_width as f32
        }
    });
    [(width - box_w) / 2.0, 0.0, box_w, box_h]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contain_letterboxes() {
        let (src, dst) =
            calculate_fit_rects(100, 50, 200.0, 200.0, ObjectFit::Contain, ObjectPosition::CENTER);
        assert_eq!(src, [0.0, 0.0, 100.0, 50.0]);
        assert_eq!(dst, [0.0, 50.0, 200.0, 100.0]);
    }

    #[test]
    fn test_cover_crops() {
        let (src, dst) =
            calculate_fit_rects(100, 50, 200.0, 200.0, ObjectFit::Cover, ObjectPosition::CENTER);
        assert_eq!(src, [25.0, 0.0, 50.0, 50.0]);
        assert_eq!(dst, [0.0, 0.0, 200.0, 200.0]);
    }

    #[test]
    fn test_scale_down_never_enlarges() {
        let (_, dst) = calculate_fit_rects(
            100,
            50,
            400.0,
            400.0,
            ObjectFit::ScaleDown,
            ObjectPosition::TOP_CENTER,
        );
        assert_eq!(dst, [150.0, 0.0, 100.0, 50.0]);
    }

    #[test]
    fn test_image_box_caps_width_and_centers() {
        assert_eq!(image_box(1000, 1200, 800.0, 500.0, None), [150.0, 0.0, 500.0, 600.0]);
        assert_eq!(image_box(100, 50, 300.0, 500.0, None), [0.0, 0.0, 300.0, 150.0]);
        assert_eq!(image_box(100, 50, 300.0, 500.0, Some(90.0)), [0.0, 0.0, 300.0, 90.0]);
    }

    #[test]
    fn test_fit_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            fit: ObjectFit,
        }
        let w: Wrapper = serde_json::from_str(r#"{"fit":"scale-down"}"#).unwrap();
        assert_eq!(w.fit, ObjectFit::ScaleDown);
    }
}
