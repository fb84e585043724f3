use std::{fmt::Debug, path::Path, time::Duration};

use image::DynamicImage;
use tracing::info;

use crate::{
    cfg::{self, Cfg},
    coco_io::{read_annotation_file, AnnotationStore, ObjectAnnotation},
    cverr,
    domain::ShapeI,
    image_list::ImageList,
    image_reader::fetch_pixels,
    overlay::{compose, LabelFont, OverlayOptions},
    result::{trace_ok_warn, CvResult},
    selection::Selection,
    types::ViewImage,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavDirection {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleKind {
    Boxes,
    Labels,
    Masks,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    BoxLineWidth,
    MaskAlpha,
    LabelFontSize,
}

/// One set of overlay visibility flags. The session holds two of these, the
/// user's standing preference and a per-image override that is reset from the
/// preference on every navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Toggles {
    pub boxes: bool,
    pub labels: bool,
    pub masks: bool,
}
impl Default for Toggles {
    fn default() -> Self {
        Self {
            boxes: true,
            labels: true,
            masks: true,
        }
    }
}
impl Toggles {
    fn set(&mut self, kind: ToggleKind, on: bool) {
        match kind {
            ToggleKind::Boxes => self.boxes = on,
            ToggleKind::Labels => self.labels = on,
            ToggleKind::Masks => self.masks = on,
        }
    }
    fn get(&self, kind: ToggleKind) -> bool {
        match kind {
            ToggleKind::Boxes => self.boxes,
            ToggleKind::Labels => self.labels,
            ToggleKind::Masks => self.masks,
        }
    }
    fn any_on(&self) -> bool {
        self.boxes || self.labels || self.masks
    }
    fn set_all(&mut self, on: bool) {
        *self = Self {
            boxes: on,
            labels: on,
            masks: on,
        };
    }
}

/// Slider backed drawing parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderParams {
    pub box_line_width: u32,
    pub mask_alpha: u8,
    pub label_font_size: u32,
}
impl Default for RenderParams {
    fn default() -> Self {
        Self {
            box_line_width: 3,
            mask_alpha: 128,
            label_font_size: 15,
        }
    }
}

/// Display metadata of the last rendered frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    /// zero based position within the image list
    pub position: usize,
    pub count: usize,
    pub source_ref: String,
    pub shape: ShapeI,
    pub description: String,
    pub n_objects: usize,
    pub n_categories: usize,
    pub captions: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: ViewImage,
    pub status: Status,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionRequest {
    /// positions within the current image's sorted unique category list
    Categories(Vec<usize>),
    /// positions within the current image's object list
    Objects(Vec<usize>),
}

struct ViewState<'a> {
    objects: Vec<&'a ObjectAnnotation>,
    obj_cat_ids: Vec<u32>,
    img_cat_ids: Vec<u32>,
    captions: Vec<String>,
}

/// Owns the loaded annotation data and all per-session view state and exposes
/// the render operation the presentation layer calls after every change.
#[derive(Debug)]
pub struct ViewSession {
    store: AnnotationStore,
    images: ImageList,
    globals: Toggles,
    locals: Toggles,
    params: RenderParams,
    selection: Selection,
    font: LabelFont,
    http_timeout: Duration,
    last_composed: Option<ViewImage>,
}

impl ViewSession {
    pub fn load<P>(path: P) -> CvResult<Self>
    where
        P: AsRef<Path> + Debug,
    {
        let store = read_annotation_file(path)?;
        let cfg = trace_ok_warn(cfg::get_cfg()).unwrap_or_default();
        Ok(Self::new(store, &cfg))
    }

    pub fn new(store: AnnotationStore, cfg: &Cfg) -> Self {
        let images = ImageList::new(store.images().to_vec());
        Self {
            store,
            images,
            globals: Toggles::default(),
            locals: Toggles::default(),
            params: RenderParams::default(),
            selection: Selection::default(),
            font: LabelFont::load(cfg),
            http_timeout: cfg.http_timeout(),
            last_composed: None,
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }
    pub fn globals(&self) -> Toggles {
        self.globals
    }
    pub fn locals(&self) -> Toggles {
        self.locals
    }
    pub fn params(&self) -> RenderParams {
        self.params
    }
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Moves the cursor, resets the per-image toggles from the standing
    /// preference, clears the selection and renders the new current image.
    pub fn advance(&mut self, direction: NavDirection) -> CvResult<Frame> {
        match direction {
            NavDirection::Forward => self.images.next()?,
            NavDirection::Backward => self.images.prev()?,
        };
        self.reset_locals_from_globals();
        self.selection.clear();
        self.render_current()
    }

    pub fn reset_locals_from_globals(&mut self) {
        self.locals = self.globals;
    }

    /// Menu semantics, the standing preference changes and the current image
    /// follows immediately.
    pub fn set_global_toggle(&mut self, kind: ToggleKind, on: bool) {
        self.globals.set(kind, on);
        self.locals.set(kind, on);
    }

    /// Keybinding semantics, only the current image diverges until the next
    /// navigation.
    pub fn toggle_local(&mut self, kind: ToggleKind) {
        let on = self.locals.get(kind);
        self.locals.set(kind, !on);
    }

    /// If any overlay is on, all go off, otherwise all go on.
    pub fn toggle_all(&mut self) {
        let on = !self.locals.any_on();
        self.locals.set_all(on);
    }

    pub fn set_param(&mut self, kind: ParamKind, value: u32) {
        match kind {
            ParamKind::BoxLineWidth => self.params.box_line_width = value,
            ParamKind::MaskAlpha => self.params.mask_alpha = value.min(255) as u8,
            ParamKind::LabelFontSize => self.params.label_font_size = value,
        }
    }

    pub fn set_selection(&mut self, request: SelectionRequest) {
        let Some(current) = self.images.current() else {
            return;
        };
        let state = view_state(&self.store, current.id);
        match request {
            SelectionRequest::Categories(cat_positions) => self.selection.select_categories(
                cat_positions,
                &state.obj_cat_ids,
                &state.img_cat_ids,
            ),
            SelectionRequest::Objects(obj_indices) => self.selection.select_objects(
                obj_indices,
                &state.obj_cat_ids,
                &state.img_cat_ids,
            ),
        }
    }

    /// Fetches the current image, rebuilds its object and caption lists,
    /// derives the ignore set from the selection and returns the composited
    /// pixels with display metadata. On a fetch failure the session stays
    /// positioned on the same image so the caller can retry.
    pub fn render_current(&mut self) -> CvResult<Frame> {
        if self.images.current().is_none() {
            self.images.next()?;
        }
        let current = self
            .images
            .current()
            .cloned()
            .ok_or_else(|| cverr!("no current image"))?;
        let im_src: DynamicImage = fetch_pixels(&current.source_ref, self.http_timeout)?;

        let state = view_state(&self.store, current.id);
        let opts = OverlayOptions {
            show_boxes: self.locals.boxes,
            show_labels: self.locals.labels,
            show_masks: self.locals.masks,
            ignore_indices: self.selection.ignore_indices(state.objects.len()),
            box_line_width: self.params.box_line_width,
            mask_alpha: self.params.mask_alpha,
            label_font_size: self.params.label_font_size,
        };
        let composed = compose(
            &im_src,
            &state.objects,
            self.store.categories(),
            &self.font,
            &opts,
        );
        let status = Status {
            position: self.images.pos().unwrap_or(0),
            count: self.images.len(),
            source_ref: current.source_ref,
            shape: ShapeI::new(composed.width(), composed.height()),
            description: self.store.description().to_string(),
            n_objects: state.objects.len(),
            n_categories: state.img_cat_ids.len(),
            captions: state.captions,
        };
        self.last_composed = Some(composed.clone());
        Ok(Frame {
            pixels: composed,
            status,
        })
    }

    /// Writes the last composited frame, the format follows the extension.
    /// JPEG cannot carry alpha, those targets are converted first.
    pub fn export_current<P>(&self, path: P) -> CvResult<()>
    where
        P: AsRef<Path> + Debug,
    {
        let composed = self
            .last_composed
            .as_ref()
            .ok_or_else(|| cverr!("nothing rendered yet, cannot export"))?;
        let is_jpg = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
        let save_result = if is_jpg {
            DynamicImage::ImageRgba8(composed.clone())
                .to_rgb8()
                .save(path.as_ref())
        } else {
            composed.save(path.as_ref())
        };
        save_result.map_err(|e| cverr!("could not export to {:?} due to {:?}", path, e))?;
        info!("exported composed image to {path:?}");
        Ok(())
    }
}

fn view_state(store: &AnnotationStore, image_id: u32) -> ViewState<'_> {
    let objects = store.objects_of_image(image_id);
    let obj_cat_ids = objects.iter().map(|obj| obj.category_id).collect::<Vec<_>>();
    let mut img_cat_ids = obj_cat_ids.clone();
    img_cat_ids.sort_unstable();
    img_cat_ids.dedup();
    let captions = store
        .captions_of_image(image_id)
        .into_iter()
        .map(|text| text.to_string())
        .collect();
    ViewState {
        objects,
        obj_cat_ids,
        img_cat_ids,
        captions,
    }
}

#[cfg(test)]
use {
    crate::{defer_file_removal, file_util::DEFAULT_TMPDIR, result::CvErrorKind},
    image::{ImageBuffer, Rgb},
    std::collections::BTreeSet,
    std::fs,
    std::path::PathBuf,
};

#[cfg(test)]
fn write_test_image(name: &str) -> PathBuf {
    fs::create_dir_all(DEFAULT_TMPDIR.clone()).unwrap();
    let path = DEFAULT_TMPDIR.join(name);
    let im = ImageBuffer::from_pixel(40, 30, Rgb::<u8>([40, 40, 40]));
    im.save(&path).unwrap();
    path
}

#[cfg(test)]
fn make_test_session(im_a: &Path, im_b: &Path) -> ViewSession {
    let doc = format!(
        r#"{{
        "info": {{"description": "session test"}},
        "images": [
            {{"id": 7, "file_name": {im_a:?}}},
            {{"id": 8, "file_name": {im_b:?}}}
        ],
        "annotations": [
            {{"image_id": 7, "category_id": 1, "bbox": [2.0, 3.0, 10.0, 5.0],
              "segmentation": [[2.0, 3.0, 12.0, 3.0, 12.0, 8.0, 2.0, 8.0]]}},
            {{"image_id": 7, "category_id": 2, "bbox": [20.0, 10.0, 8.0, 8.0],
              "segmentation": [[20.0, 10.0, 28.0, 10.0, 28.0, 18.0, 20.0, 18.0]]}},
            {{"image_id": 7, "caption": "two things"}}
        ],
        "categories": [
            {{"id": 1, "name": "person", "supercategory": "living"}},
            {{"id": 2, "name": "car", "supercategory": "vehicle"}}
        ]
    }}"#
    );
    let store = AnnotationStore::parse(&doc).unwrap();
    ViewSession::new(store, &Cfg::default())
}

#[test]
fn test_first_render_and_selection() {
    let im_a = write_test_image("ctrl-a.png");
    let im_b = write_test_image("ctrl-b.png");
    defer_file_removal!(&im_a);
    defer_file_removal!(&im_b);
    let mut session = make_test_session(&im_a, &im_b);

    // first render positions on the first image
    let frame = session.render_current().unwrap();
    assert_eq!(frame.status.position, 0);
    assert_eq!(frame.status.count, 2);
    assert_eq!(frame.status.n_objects, 2);
    assert_eq!(frame.status.n_categories, 2);
    assert_eq!(frame.status.captions, vec!["two things".to_string()]);
    assert_eq!(frame.status.description, "session test");
    assert_eq!(frame.status.shape, ShapeI::new(40, 30));
    assert_eq!(frame.pixels.width(), 40);
    assert_eq!(frame.pixels.height(), 30);
    assert!(session.selection().ignore_indices(2).is_empty());

    // selecting only the second category suppresses the first object
    session.set_selection(SelectionRequest::Categories(vec![1]));
    assert_eq!(
        session.selection().ignore_indices(2),
        BTreeSet::from_iter([0usize])
    );
    let frame = session.render_current().unwrap();
    assert_eq!(frame.status.n_objects, 2);
}

#[test]
fn test_advance_resets_locals_and_selection() {
    let im_a = write_test_image("ctrl-reset-a.png");
    let im_b = write_test_image("ctrl-reset-b.png");
    defer_file_removal!(&im_a);
    defer_file_removal!(&im_b);
    let mut session = make_test_session(&im_a, &im_b);

    let frame = session.advance(NavDirection::Forward).unwrap();
    assert_eq!(frame.status.position, 0);
    session.toggle_local(ToggleKind::Masks);
    session.set_selection(SelectionRequest::Objects(vec![0]));
    assert!(!session.locals().masks);
    assert!(session.globals().masks);
    assert!(session.selection().is_explicit());

    let frame = session.advance(NavDirection::Forward).unwrap();
    assert_eq!(frame.status.position, 1);
    assert_eq!(frame.status.n_objects, 0);
    assert!(session.locals().masks);
    assert!(!session.selection().is_explicit());

    // wrap around to the first image again
    let frame = session.advance(NavDirection::Forward).unwrap();
    assert_eq!(frame.status.position, 0);
    let frame = session.advance(NavDirection::Backward).unwrap();
    assert_eq!(frame.status.position, 1);
}

#[test]
fn test_toggle_semantics() {
    let im_a = write_test_image("ctrl-toggle-a.png");
    let im_b = write_test_image("ctrl-toggle-b.png");
    defer_file_removal!(&im_a);
    defer_file_removal!(&im_b);
    let mut session = make_test_session(&im_a, &im_b);

    session.set_global_toggle(ToggleKind::Labels, false);
    assert!(!session.globals().labels);
    assert!(!session.locals().labels);

    session.toggle_all();
    assert!(!session.locals().any_on());
    session.toggle_all();
    assert!(session.locals().boxes && session.locals().labels && session.locals().masks);

    session.set_param(ParamKind::MaskAlpha, 300);
    assert_eq!(session.params().mask_alpha, 255);
    session.set_param(ParamKind::BoxLineWidth, 5);
    assert_eq!(session.params().box_line_width, 5);
}

#[test]
fn test_source_unavailable_keeps_position() {
    let im_a = write_test_image("ctrl-missing-a.png");
    defer_file_removal!(&im_a);
    let missing = DEFAULT_TMPDIR.join("ctrl-missing-b.png");
    let mut session = make_test_session(&im_a, &missing);

    session.render_current().unwrap();
    let err = session.advance(NavDirection::Forward).unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::SourceUnavailable);
    // the session stays on the broken image for a retry
    let err = session.render_current().unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::SourceUnavailable);
    // and navigating back recovers
    let frame = session.advance(NavDirection::Backward).unwrap();
    assert_eq!(frame.status.position, 0);
}

#[test]
fn test_export_roundtrip() {
    let im_a = write_test_image("ctrl-export-a.png");
    let im_b = write_test_image("ctrl-export-b.png");
    defer_file_removal!(&im_a);
    defer_file_removal!(&im_b);
    let mut session = make_test_session(&im_a, &im_b);

    let export_path = DEFAULT_TMPDIR.join("ctrl-export-out.png");
    assert!(session.export_current(&export_path).is_err());

    session.render_current().unwrap();
    defer_file_removal!(&export_path);
    session.export_current(&export_path).unwrap();
    let reloaded = image::open(&export_path).unwrap();
    assert_eq!(reloaded.width(), 40);
    assert_eq!(reloaded.height(), 30);
}
