pub mod cfg;
mod coco_io;
mod control;
mod domain;
pub mod file_util;
mod image_list;
mod image_reader;
mod overlay;
mod palette;
pub mod result;
mod selection;
pub mod tracing_setup;
mod types;
mod util;

pub use coco_io::{
    read_annotation_file, AnnotationStore, Caption, Category, CocoRle, CocoSegmentation, ImageRef,
    ObjectAnnotation, RleCounts,
};
pub use control::{
    Frame, NavDirection, ParamKind, RenderParams, SelectionRequest, Status, ToggleKind, Toggles,
    ViewSession,
};
pub use domain::{ring_points, BbF, ShapeI};
pub use image_list::ImageList;
pub use image_reader::{fetch_pixels, HttpPixelReader, LocalPixelReader, ReadPixels};
pub use overlay::{compose, label_anchor, LabelFont, OverlayOptions};
pub use palette::{assign_colors, make_palette, PALETTE_SIZE};
pub use result::{CvError, CvErrorKind, CvResult};
pub use selection::{categories_of_objects, objects_of_categories, Selection};
pub use types::{ResultImage, ViewImage};
pub use util::{false_indices, true_indices, Defer};
