#[cfg(test)]
use std::fs;

#[cfg(test)]
use cvlib::{
    defer_file_removal, file_util::DEFAULT_TMPDIR, tracing_setup::init_tracing_for_tests,
    CvErrorKind, NavDirection, SelectionRequest, ViewSession,
};
#[cfg(test)]
use image::{ImageBuffer, Rgb};

#[cfg(test)]
fn write_image(name: &str, w: u32, h: u32) -> std::path::PathBuf {
    fs::create_dir_all(DEFAULT_TMPDIR.clone()).unwrap();
    let path = DEFAULT_TMPDIR.join(name);
    let im = ImageBuffer::from_pixel(w, h, Rgb::<u8>([25, 35, 45]));
    im.save(&path).unwrap();
    path
}

#[test]
fn test_session() {
    init_tracing_for_tests();
    let im_a = write_image("session-a.png", 64, 48);
    let im_b = write_image("session-b.png", 32, 24);
    defer_file_removal!(&im_a);
    defer_file_removal!(&im_b);

    let doc = format!(
        r#"{{
        "info": {{"description": "integration"}},
        "images": [
            {{"id": 1, "file_name": {im_a:?}}},
            {{"id": 2, "file_name": {im_b:?}}}
        ],
        "annotations": [
            {{"image_id": 1, "category_id": 1, "bbox": [4.0, 6.0, 20.0, 10.0],
              "segmentation": [[4.0, 6.0, 24.0, 6.0, 24.0, 16.0, 4.0, 16.0]]}},
            {{"image_id": 1, "category_id": 2, "bbox": [30.0, 20.0, 16.0, 16.0],
              "segmentation": [[30.0, 20.0, 46.0, 20.0, 46.0, 36.0, 30.0, 36.0]]}},
            {{"image_id": 1, "caption": "a person next to a car"}}
        ],
        "categories": [
            {{"id": 1, "name": "person", "supercategory": "living"}},
            {{"id": 2, "name": "car", "supercategory": "vehicle"}}
        ]
    }}"#
    );
    let anno_path = DEFAULT_TMPDIR.join("session-annos.json");
    fs::write(&anno_path, doc).unwrap();
    defer_file_removal!(&anno_path);

    let mut session = ViewSession::load(&anno_path).unwrap();

    // the very first advance lands on the first image of the document
    let frame = session.advance(NavDirection::Forward).unwrap();
    assert_eq!(frame.status.position, 0);
    assert_eq!(frame.status.count, 2);
    assert_eq!(frame.status.n_objects, 2);
    assert_eq!(frame.status.n_categories, 2);
    assert_eq!(
        frame.status.captions,
        vec!["a person next to a car".to_string()]
    );
    assert_eq!(frame.pixels.width(), 64);
    assert_eq!(frame.pixels.height(), 48);
    assert!(session.selection().ignore_indices(2).is_empty());

    // category selection translates into the ignore set
    session.set_selection(SelectionRequest::Categories(vec![1]));
    assert_eq!(
        session.selection().ignore_indices(2).into_iter().collect::<Vec<_>>(),
        vec![0]
    );
    session.render_current().unwrap();

    // exporting reproduces the source dimensions
    let export_path = DEFAULT_TMPDIR.join("session-export.png");
    defer_file_removal!(&export_path);
    session.export_current(&export_path).unwrap();
    let reloaded = image::open(&export_path).unwrap();
    assert_eq!(reloaded.width(), 64);
    assert_eq!(reloaded.height(), 48);

    // navigation wraps in both directions and clears the selection
    let frame = session.advance(NavDirection::Forward).unwrap();
    assert_eq!(frame.status.position, 1);
    assert_eq!(frame.status.n_objects, 0);
    assert_eq!(frame.pixels.width(), 32);
    assert!(!session.selection().is_explicit());
    let frame = session.advance(NavDirection::Forward).unwrap();
    assert_eq!(frame.status.position, 0);
    let frame = session.advance(NavDirection::Backward).unwrap();
    assert_eq!(frame.status.position, 1);
}

#[test]
fn test_load_failures() {
    init_tracing_for_tests();
    fs::create_dir_all(DEFAULT_TMPDIR.clone()).unwrap();

    let broken_path = DEFAULT_TMPDIR.join("session-broken.json");
    fs::write(&broken_path, r#"{"images": []}"#).unwrap();
    defer_file_removal!(&broken_path);
    let err = ViewSession::load(&broken_path).unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::Parse);

    let empty_path = DEFAULT_TMPDIR.join("session-empty.json");
    fs::write(
        &empty_path,
        r#"{"images": [], "annotations": [], "categories": []}"#,
    )
    .unwrap();
    defer_file_removal!(&empty_path);
    let err = ViewSession::load(&empty_path).unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::EmptyCollection);
}
