use std::{collections::HashMap, fmt::Debug, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    domain::BbF,
    file_util,
    palette::assign_colors,
    result::{CvError, CvResult},
};

#[derive(Serialize, Deserialize, Debug)]
struct CocoInfo {
    description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct CocoImage {
    id: u32,
    coco_url: Option<String>,
    file_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct CocoCategory {
    id: u32,
    name: String,
    supercategory: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RleCounts {
    Raw(Vec<u32>),
    Compressed(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CocoRle {
    pub counts: RleCounts,
    pub size: (u32, u32),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CocoSegmentation {
    Polygon(Vec<Vec<f64>>),
    Rle(CocoRle),
}

/// One entry of the `annotations` collection. Which fields are present decides
/// whether the entry is a detection object or a caption.
#[derive(Serialize, Deserialize, Debug)]
struct CocoAnnotationEntry {
    image_id: u32,
    category_id: Option<u32>,
    bbox: Option<[f64; 4]>,
    segmentation: Option<CocoSegmentation>,
    caption: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct CocoInstanceData {
    info: Option<CocoInfo>,
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotationEntry>,
    categories: Vec<CocoCategory>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: u32,
    pub display_name: String,
    pub color: [u8; 3],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    pub id: u32,
    pub source_ref: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectAnnotation {
    pub image_id: u32,
    pub category_id: u32,
    pub bbox: BbF,
    pub segmentation: CocoSegmentation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caption {
    pub image_id: u32,
    pub text: String,
}

/// Typed collections of one annotation file. Built once at load, write-once,
/// image order is the order of appearance in the file.
#[derive(Clone, Debug, Default)]
pub struct AnnotationStore {
    images: Vec<ImageRef>,
    categories: HashMap<u32, Category>,
    objects: Vec<ObjectAnnotation>,
    captions: Vec<Caption>,
    description: String,
}

impl AnnotationStore {
    pub fn parse(s: &str) -> CvResult<Self> {
        let data: CocoInstanceData = serde_json::from_str(s)
            .map_err(|e| CvError::parse(&format!("invalid annotation document, {e}")))?;
        Self::from_instances(data)
    }

    fn from_instances(data: CocoInstanceData) -> CvResult<Self> {
        let images = data
            .images
            .iter()
            .map(|im| {
                let source_ref = im
                    .coco_url
                    .as_ref()
                    .or(im.file_name.as_ref())
                    .ok_or_else(|| {
                        CvError::parse(&format!(
                            "image {} has neither coco_url nor file_name",
                            im.id
                        ))
                    })?;
                Ok(ImageRef {
                    id: im.id,
                    source_ref: source_ref.clone(),
                })
            })
            .collect::<CvResult<Vec<_>>>()?;
        if images.is_empty() {
            return Err(CvError::empty_collection(
                "annotation document references no images",
            ));
        }

        let cat_ids = data.categories.iter().map(|c| c.id).collect::<Vec<_>>();
        let colors = assign_colors(&cat_ids);
        let categories = data
            .categories
            .into_iter()
            .map(|c| {
                let display_name = match &c.supercategory {
                    Some(sup) => format!("{} ({})", c.name, sup),
                    None => c.name.clone(),
                };
                (
                    c.id,
                    Category {
                        id: c.id,
                        display_name,
                        color: colors[&c.id],
                    },
                )
            })
            .collect::<HashMap<_, _>>();

        let mut objects = vec![];
        let mut captions = vec![];
        for entry in data.annotations {
            if let Some(segmentation) = entry.segmentation {
                match (entry.category_id, entry.bbox) {
                    (Some(category_id), Some(bbox)) => objects.push(ObjectAnnotation {
                        image_id: entry.image_id,
                        category_id,
                        bbox: BbF::from_arr(&bbox),
                        segmentation,
                    }),
                    _ => debug!(
                        "dropping segmented entry of image {} without category or bbox",
                        entry.image_id
                    ),
                }
            } else if let Some(text) = entry.caption {
                captions.push(Caption {
                    image_id: entry.image_id,
                    text,
                });
            } else {
                debug!(
                    "dropping entry of image {} that is neither object nor caption",
                    entry.image_id
                );
            }
        }

        Ok(AnnotationStore {
            images,
            categories,
            objects,
            captions,
            description: data
                .info
                .and_then(|info| info.description)
                .unwrap_or_default(),
        })
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }
    pub fn category(&self, id: u32) -> Option<&Category> {
        self.categories.get(&id)
    }
    pub fn categories(&self) -> &HashMap<u32, Category> {
        &self.categories
    }
    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn objects_of_image(&self, image_id: u32) -> Vec<&ObjectAnnotation> {
        self.objects
            .iter()
            .filter(|obj| obj.image_id == image_id)
            .collect()
    }
    pub fn captions_of_image(&self, image_id: u32) -> Vec<&str> {
        self.captions
            .iter()
            .filter(|cap| cap.image_id == image_id)
            .map(|cap| cap.text.as_str())
            .collect()
    }
}

pub fn read_annotation_file<P>(path: P) -> CvResult<AnnotationStore>
where
    P: AsRef<Path> + Debug,
{
    info!("parsing {path:?}");
    let s = file_util::read_to_string(&path)
        .map_err(|e| CvError::parse(&format!("cannot load annotation file, {e}")))?;
    AnnotationStore::parse(&s)
        .map_err(|e| CvError::with_kind(e.kind(), &format!("{:?}: {}", path, e.msg())))
}

#[cfg(test)]
use crate::result::CvErrorKind;

#[cfg(test)]
const TEST_DOC: &str = r#"
{
    "info": {"description": "test dataset"},
    "images": [
        {"id": 7, "coco_url": "http://images.local/7.jpg", "width": 40, "height": 30},
        {"id": 8, "file_name": "8.png"}
    ],
    "annotations": [
        {"image_id": 7, "category_id": 1, "bbox": [2.0, 3.0, 10.0, 5.0],
         "segmentation": [[2.0, 3.0, 12.0, 3.0, 12.0, 8.0, 2.0, 8.0]]},
        {"image_id": 7, "category_id": 2, "bbox": [20.0, 10.0, 8.0, 8.0],
         "segmentation": {"counts": [0, 12, 4], "size": [30, 40]}},
        {"image_id": 7, "caption": "two things"},
        {"image_id": 8, "score": 0.5}
    ],
    "categories": [
        {"id": 1, "name": "person", "supercategory": "living"},
        {"id": 2, "name": "car", "supercategory": "vehicle"}
    ]
}
"#;

#[test]
fn test_parse_splits_objects_and_captions() {
    let store = AnnotationStore::parse(TEST_DOC).unwrap();
    assert_eq!(store.images().len(), 2);
    assert_eq!(store.images()[0].source_ref, "http://images.local/7.jpg");
    assert_eq!(store.images()[1].source_ref, "8.png");
    assert_eq!(store.description(), "test dataset");

    let objects = store.objects_of_image(7);
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].category_id, 1);
    assert!(matches!(
        objects[0].segmentation,
        CocoSegmentation::Polygon(_)
    ));
    assert!(matches!(objects[1].segmentation, CocoSegmentation::Rle(_)));
    assert_eq!(store.captions_of_image(7), vec!["two things"]);
    // the scored entry is neither object nor caption and silently dropped
    assert!(store.objects_of_image(8).is_empty());
    assert!(store.captions_of_image(8).is_empty());
}

#[test]
fn test_parse_categories() {
    let store = AnnotationStore::parse(TEST_DOC).unwrap();
    assert_eq!(store.n_categories(), 2);
    assert_eq!(store.category(1).unwrap().display_name, "person (living)");
    assert_eq!(store.category(2).unwrap().display_name, "car (vehicle)");
    assert_ne!(
        store.category(1).unwrap().color,
        store.category(2).unwrap().color
    );
    // colors are stable across loads
    let store2 = AnnotationStore::parse(TEST_DOC).unwrap();
    assert_eq!(
        store.category(1).unwrap().color,
        store2.category(1).unwrap().color
    );
    assert!(store.category(77).is_none());
}

#[test]
fn test_parse_missing_key() {
    let err = AnnotationStore::parse(r#"{"images": [], "annotations": []}"#).unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::Parse);
    assert!(err.msg().contains("categories"), "{}", err.msg());
    let err = AnnotationStore::parse("no json at all").unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::Parse);
}

#[test]
fn test_parse_no_images() {
    let doc = r#"{"images": [], "annotations": [], "categories": []}"#;
    let err = AnnotationStore::parse(doc).unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::EmptyCollection);
}

#[test]
fn test_read_annotation_file_missing() {
    let err = read_annotation_file("/definitely/not/here.json").unwrap_err();
    assert_eq!(err.kind(), CvErrorKind::Parse);
    assert!(err.msg().contains("not/here.json"));
}
