use crate::{
    coco_io::ImageRef,
    result::{CvError, CvResult},
};

/// Ordered list of the annotation file's images with a cursor that wraps
/// around in both directions. The cursor starts before the first element, the
/// first `next` returns the first element and `prev` from the start returns
/// the last one.
#[derive(Clone, Debug, Default)]
pub struct ImageList {
    images: Vec<ImageRef>,
    pos: Option<usize>,
}

impl ImageList {
    pub fn new(images: Vec<ImageRef>) -> Self {
        Self { images, pos: None }
    }
    pub fn len(&self) -> usize {
        self.images.len()
    }
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
    pub fn pos(&self) -> Option<usize> {
        self.pos
    }
    pub fn current(&self) -> Option<&ImageRef> {
        self.pos.and_then(|p| self.images.get(p))
    }
    pub fn next(&mut self) -> CvResult<&ImageRef> {
        if self.images.is_empty() {
            return Err(CvError::empty_collection("no images to navigate"));
        }
        let next_pos = match self.pos {
            Some(p) if p + 1 < self.images.len() => p + 1,
            Some(_) => 0,
            None => 0,
        };
        self.pos = Some(next_pos);
        Ok(&self.images[next_pos])
    }
    pub fn prev(&mut self) -> CvResult<&ImageRef> {
        if self.images.is_empty() {
            return Err(CvError::empty_collection("no images to navigate"));
        }
        let prev_pos = match self.pos {
            Some(p) if p > 0 => p - 1,
            _ => self.images.len() - 1,
        };
        self.pos = Some(prev_pos);
        Ok(&self.images[prev_pos])
    }
}

#[cfg(test)]
use crate::result::CvErrorKind;

#[cfg(test)]
fn make_test_list(n: u32) -> ImageList {
    ImageList::new(
        (0..n)
            .map(|i| ImageRef {
                id: i,
                source_ref: format!("{i}.png"),
            })
            .collect(),
    )
}

#[test]
fn test_next_cycles_in_order() {
    let mut list = make_test_list(3);
    assert!(list.current().is_none());
    let visited = (0..3).map(|_| list.next().unwrap().id).collect::<Vec<_>>();
    assert_eq!(visited, vec![0, 1, 2]);
    // the 4th call wraps to the first element
    assert_eq!(list.next().unwrap().id, 0);
    assert_eq!(list.pos(), Some(0));
}

#[test]
fn test_prev_wraps() {
    let mut list = make_test_list(3);
    // before any next, prev returns the last element
    assert_eq!(list.prev().unwrap().id, 2);
    assert_eq!(list.prev().unwrap().id, 1);
    assert_eq!(list.prev().unwrap().id, 0);
    assert_eq!(list.prev().unwrap().id, 2);
}

#[test]
fn test_empty_list() {
    let mut list = make_test_list(0);
    assert_eq!(list.next().unwrap_err().kind(), CvErrorKind::EmptyCollection);
    assert_eq!(list.prev().unwrap_err().kind(), CvErrorKind::EmptyCollection);
    assert!(list.current().is_none());
}

#[test]
fn test_single_element() {
    let mut list = make_test_list(1);
    assert_eq!(list.next().unwrap().id, 0);
    assert_eq!(list.next().unwrap().id, 0);
    assert_eq!(list.prev().unwrap().id, 0);
}
