use std::collections::{BTreeSet, HashMap};

use image::{imageops, DynamicImage, ImageBuffer, Rgba};
use imageproc::{
    drawing::{
        draw_filled_rect_mut, draw_hollow_rect_mut, draw_polygon_mut, draw_text_mut, text_size,
    },
    point::Point,
    rect::Rect,
};
use rusttype::{Font, Scale};
use tracing::warn;

use crate::{
    cfg::Cfg,
    coco_io::{Category, CocoSegmentation, ObjectAnnotation},
    cverr,
    domain::{ring_points, BbF},
    result::{CvError, CvResult},
    types::ViewImage,
};

const LABEL_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Truetype font for category labels. Label text needs a font file which is
/// not guaranteed to exist, without one label plates are skipped and a warning
/// is traced once at load.
#[derive(Clone, Debug)]
pub struct LabelFont {
    font: Option<Font<'static>>,
}
impl LabelFont {
    pub fn from_bytes(bytes: Vec<u8>) -> CvResult<Self> {
        let font = Font::try_from_vec(bytes).ok_or_else(|| cverr!("invalid truetype data"))?;
        Ok(Self { font: Some(font) })
    }
    pub fn none() -> Self {
        Self { font: None }
    }
    /// Probes the configured path first, common system locations after.
    pub fn load(cfg: &Cfg) -> Self {
        let configured = cfg.label_font_path.as_deref();
        for path in configured.into_iter().chain(FONT_CANDIDATES) {
            if let Ok(bytes) = std::fs::read(path) {
                match Self::from_bytes(bytes) {
                    Ok(font) => return font,
                    Err(e) => warn!("cannot use font {path}, {e}"),
                }
            }
        }
        warn!("no label font found, category labels will not be rendered");
        Self::none()
    }
    pub fn is_available(&self) -> bool {
        self.font.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct OverlayOptions {
    pub show_boxes: bool,
    pub show_labels: bool,
    pub show_masks: bool,
    /// object list positions excluded from this frame
    pub ignore_indices: BTreeSet<usize>,
    pub box_line_width: u32,
    pub mask_alpha: u8,
    pub label_font_size: u32,
}
impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            show_boxes: true,
            show_labels: true,
            show_masks: true,
            ignore_indices: BTreeSet::new(),
            box_line_width: 3,
            mask_alpha: 128,
            label_font_size: 15,
        }
    }
}

struct Cats<'a> {
    categories: &'a HashMap<u32, Category>,
}
impl<'a> Cats<'a> {
    fn of_object(&self, obj: &ObjectAnnotation) -> Option<&'a Category> {
        let cat = self.categories.get(&obj.category_id);
        if cat.is_none() {
            warn!(
                "skipping object of image {} with unknown category {}",
                obj.image_id, obj.category_id
            );
        }
        cat
    }
}

/// Draws masks, boxes and labels of all non-ignored objects onto a transparent
/// layer and alpha-composites the layer over the source. The source is never
/// mutated, malformed objects are skipped.
pub fn compose(
    im_src: &DynamicImage,
    objects: &[&ObjectAnnotation],
    categories: &HashMap<u32, Category>,
    font: &LabelFont,
    opts: &OverlayOptions,
) -> ViewImage {
    let mut composed = im_src.to_rgba8();
    let mut layer: ViewImage = ImageBuffer::from_pixel(
        composed.width(),
        composed.height(),
        Rgba([255, 255, 255, 0]),
    );
    let cats = Cats { categories };
    if opts.show_masks {
        draw_masks(&mut layer, objects, &cats, opts);
    }
    if opts.show_boxes {
        draw_boxes(&mut layer, objects, &cats, font, opts);
    }
    imageops::overlay(&mut composed, &layer, 0, 0);
    composed
}

fn draw_masks(layer: &mut ViewImage, objects: &[&ObjectAnnotation], cats: &Cats, opts: &OverlayOptions) {
    let mut n_rle_skipped = 0usize;
    for (obj_idx, &obj) in objects.iter().enumerate() {
        if opts.ignore_indices.contains(&obj_idx) {
            continue;
        }
        let Some(cat) = cats.of_object(obj) else {
            continue;
        };
        match &obj.segmentation {
            CocoSegmentation::Polygon(rings) => {
                let [r, g, b] = cat.color;
                let fill = Rgba([r, g, b, opts.mask_alpha]);
                for ring in rings {
                    draw_ring(layer, ring, fill);
                }
            }
            CocoSegmentation::Rle(_) => {
                n_rle_skipped += 1;
            }
        }
    }
    if n_rle_skipped > 0 {
        let e = CvError::unsupported_mask(&format!(
            "skipped {n_rle_skipped} run-length encoded masks"
        ));
        warn!("{e}");
    }
}

fn draw_ring(layer: &mut ViewImage, ring: &[f64], fill: Rgba<u8>) {
    let mut points = ring_points(ring)
        .map(|(x, y)| Point::new(x.round() as i32, y.round() as i32))
        .collect::<Vec<_>>();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    // empty and degenerate rings are skipped
    if points.len() < 3 {
        return;
    }
    draw_polygon_mut(layer, &points, fill);
}

fn draw_boxes(
    layer: &mut ViewImage,
    objects: &[&ObjectAnnotation],
    cats: &Cats,
    font: &LabelFont,
    opts: &OverlayOptions,
) {
    let drawable = || {
        objects
            .iter()
            .enumerate()
            .filter(|(obj_idx, _)| !opts.ignore_indices.contains(obj_idx))
    };
    for (_, &obj) in drawable() {
        let (Some(cat), Some(rect)) = (cats.of_object(obj), bb_rect(&obj.bbox)) else {
            continue;
        };
        if opts.box_line_width > 0 {
            let [r, g, b] = cat.color;
            draw_thick_rect(layer, rect, opts.box_line_width, Rgba([r, g, b, 255]));
        }
    }
    // labels go on top of all outlines
    if opts.show_labels {
        if let Some(font) = &font.font {
            for (_, &obj) in drawable() {
                let Some(cat) = cats.of_object(obj) else {
                    continue;
                };
                if !cat.display_name.is_empty() {
                    draw_label(layer, obj, cat, font, opts.label_font_size);
                }
            }
        }
    }
}

fn bb_rect(bb: &BbF) -> Option<Rect> {
    if !bb.has_area() {
        return None;
    }
    Some(
        Rect::at(bb.x.round() as i32, bb.y.round() as i32)
            .of_size(bb.w.round() as u32, bb.h.round() as u32),
    )
}

fn draw_thick_rect(layer: &mut ViewImage, rect: Rect, line_width: u32, color: Rgba<u8>) {
    // thickness grows inward so the box never leaks beyond its corners
    for i in 0..line_width {
        let w = rect.width() as i64 - 2 * i as i64;
        let h = rect.height() as i64 - 2 * i as i64;
        if w < 1 || h < 1 {
            break;
        }
        let inset = Rect::at(rect.left() + i as i32, rect.top() + i as i32)
            .of_size(w as u32, h as u32);
        draw_hollow_rect_mut(layer, inset, color);
    }
}

/// Top left corner of the label plate for a box and a measured text extent.
/// The plate sits directly above the box top edge, moves down to the box top
/// edge when it would leave the canvas, shifts left by any overflow beyond the
/// box's right edge and never starts left of the canvas. The left clamp wins
/// when both edges conflict, text is not truncated.
pub fn label_anchor(bb: &BbF, text_w: i32, text_h: i32) -> (i32, i32) {
    let x0 = bb.x.round() as i32;
    let y0 = bb.y.round() as i32;
    let x1 = bb.x_max().round() as i32;
    let mut tx0 = x0;
    let ty0 = if y0 - text_h < 0 {
        y0.max(0)
    } else {
        y0 - text_h
    };
    if tx0 + text_w > x1 {
        tx0 -= tx0 + text_w - x1;
    }
    (tx0.max(0), ty0)
}

fn draw_label(
    layer: &mut ViewImage,
    obj: &ObjectAnnotation,
    cat: &Category,
    font: &Font<'static>,
    font_size: u32,
) {
    let scale = Scale {
        x: font_size as f32,
        y: font_size as f32,
    };
    let (text_w, text_h) = text_size(scale, font, &cat.display_name);
    if text_w < 1 || text_h < 1 {
        return;
    }
    let (tx0, ty0) = label_anchor(&obj.bbox, text_w, text_h);
    let [r, g, b] = cat.color;
    draw_filled_rect_mut(
        layer,
        Rect::at(tx0, ty0).of_size(text_w as u32, text_h as u32),
        Rgba([r, g, b, 255]),
    );
    draw_text_mut(
        layer,
        LABEL_TEXT_COLOR,
        tx0,
        ty0,
        scale,
        font,
        &cat.display_name,
    );
}

#[cfg(test)]
use crate::coco_io::{CocoRle, RleCounts};
#[cfg(test)]
use image::Rgb;

#[cfg(test)]
fn make_test_image() -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(40, 30, Rgb([40, 40, 40])))
}

#[cfg(test)]
fn make_test_categories() -> HashMap<u32, Category> {
    [
        (
            1,
            Category {
                id: 1,
                display_name: "person (living)".to_string(),
                color: [200, 0, 0],
            },
        ),
        (
            2,
            Category {
                id: 2,
                display_name: "car (vehicle)".to_string(),
                color: [0, 200, 0],
            },
        ),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
fn make_object(category_id: u32, bbox: [f64; 4], segmentation: CocoSegmentation) -> ObjectAnnotation {
    ObjectAnnotation {
        image_id: 7,
        category_id,
        bbox: BbF::from_arr(&bbox),
        segmentation,
    }
}

#[cfg(test)]
fn square_ring(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<f64> {
    vec![x0, y0, x1, y0, x1, y1, x0, y1]
}

#[test]
fn test_compose_preserves_dims() {
    let im = make_test_image();
    let composed = compose(
        &im,
        &[],
        &make_test_categories(),
        &LabelFont::none(),
        &OverlayOptions::default(),
    );
    assert_eq!(composed.width(), 40);
    assert_eq!(composed.height(), 30);
}

#[test]
fn test_mask_fill() {
    let im = make_test_image();
    let obj = make_object(
        1,
        [2.0, 3.0, 10.0, 5.0],
        CocoSegmentation::Polygon(vec![square_ring(2.0, 3.0, 12.0, 8.0)]),
    );
    let opts = OverlayOptions {
        show_boxes: false,
        show_labels: false,
        mask_alpha: 255,
        ..Default::default()
    };
    let composed = compose(
        &im,
        &[&obj],
        &make_test_categories(),
        &LabelFont::none(),
        &opts,
    );
    // inside the ring the category color replaces the source at full alpha
    assert_eq!(composed.get_pixel(7, 5), &Rgba([200, 0, 0, 255]));
    // far away the source shines through
    assert_eq!(composed.get_pixel(30, 20), &Rgba([40, 40, 40, 255]));
}

#[test]
fn test_empty_ring_equals_masks_off() {
    let im = make_test_image();
    let obj = make_object(
        1,
        [2.0, 3.0, 10.0, 5.0],
        CocoSegmentation::Polygon(vec![vec![]]),
    );
    let opts_on = OverlayOptions {
        show_boxes: false,
        show_labels: false,
        ..Default::default()
    };
    let opts_off = OverlayOptions {
        show_masks: false,
        ..opts_on.clone()
    };
    let cats = make_test_categories();
    let font = LabelFont::none();
    let composed_on = compose(&im, &[&obj], &cats, &font, &opts_on);
    let composed_off = compose(&im, &[&obj], &cats, &font, &opts_off);
    assert_eq!(composed_on, composed_off);
}

#[test]
fn test_rle_mask_is_skipped_not_crashed() {
    let im = make_test_image();
    let obj = make_object(
        2,
        [1.0, 1.0, 6.0, 6.0],
        CocoSegmentation::Rle(CocoRle {
            counts: RleCounts::Raw(vec![0, 9, 21]),
            size: (30, 40),
        }),
    );
    let opts = OverlayOptions {
        show_boxes: false,
        show_labels: false,
        ..Default::default()
    };
    let composed = compose(
        &im,
        &[&obj],
        &make_test_categories(),
        &LabelFont::none(),
        &opts,
    );
    assert_eq!(composed.get_pixel(3, 3), &Rgba([40, 40, 40, 255]));
}

#[test]
fn test_box_outline() {
    let im = make_test_image();
    let obj = make_object(
        2,
        [2.0, 3.0, 10.0, 5.0],
        CocoSegmentation::Polygon(vec![]),
    );
    let opts = OverlayOptions {
        show_masks: false,
        show_labels: false,
        box_line_width: 1,
        ..Default::default()
    };
    let composed = compose(
        &im,
        &[&obj],
        &make_test_categories(),
        &LabelFont::none(),
        &opts,
    );
    // corner and edges carry the category color, the interior does not
    assert_eq!(composed.get_pixel(2, 3), &Rgba([0, 200, 0, 255]));
    assert_eq!(composed.get_pixel(11, 7), &Rgba([0, 200, 0, 255]));
    assert_eq!(composed.get_pixel(6, 5), &Rgba([40, 40, 40, 255]));
}

#[test]
fn test_ignored_objects_leave_source_untouched() {
    let im = make_test_image();
    let obj = make_object(
        1,
        [2.0, 3.0, 10.0, 5.0],
        CocoSegmentation::Polygon(vec![square_ring(2.0, 3.0, 12.0, 8.0)]),
    );
    let opts = OverlayOptions {
        ignore_indices: BTreeSet::from_iter([0usize]),
        ..Default::default()
    };
    let composed = compose(
        &im,
        &[&obj],
        &make_test_categories(),
        &LabelFont::none(),
        &opts,
    );
    assert_eq!(composed, im.to_rgba8());
}

#[test]
fn test_unknown_category_is_skipped() {
    let im = make_test_image();
    let obj = make_object(
        77,
        [2.0, 3.0, 10.0, 5.0],
        CocoSegmentation::Polygon(vec![square_ring(2.0, 3.0, 12.0, 8.0)]),
    );
    let composed = compose(
        &im,
        &[&obj],
        &make_test_categories(),
        &LabelFont::none(),
        &OverlayOptions::default(),
    );
    assert_eq!(composed, im.to_rgba8());
}

#[test]
fn test_label_anchor_clamps() {
    // enough room above, label sits on top of the box
    let bb = BbF::from_arr(&[10.0, 20.0, 30.0, 10.0]);
    assert_eq!(label_anchor(&bb, 20, 8), (10, 12));
    // sticking out above the canvas moves the plate to the box top edge
    let bb = BbF::from_arr(&[10.0, 4.0, 30.0, 10.0]);
    assert_eq!(label_anchor(&bb, 20, 8), (10, 4));
    // wider than the box shifts left by the overflow
    let bb = BbF::from_arr(&[10.0, 20.0, 12.0, 10.0]);
    assert_eq!(label_anchor(&bb, 20, 8), (2, 12));
    // conflict of both clamps, the left canvas edge wins
    let bb = BbF::from_arr(&[2.0, 20.0, 5.0, 10.0]);
    assert_eq!(label_anchor(&bb, 40, 8), (0, 12));
}

#[test]
fn test_label_font_from_invalid_bytes() {
    assert!(LabelFont::from_bytes(vec![1, 2, 3]).is_err());
    assert!(!LabelFont::none().is_available());
}
