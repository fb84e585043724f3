use std::collections::BTreeSet;

use crate::util::false_indices;

/// Objects implied by selected category list positions. `img_cat_ids` is the
/// sorted unique list of category ids of the current image, `obj_cat_ids` the
/// per-object category id in object order.
pub fn objects_of_categories(
    cat_positions: &[usize],
    obj_cat_ids: &[u32],
    img_cat_ids: &[u32],
) -> Vec<usize> {
    let mut obj_indices = vec![];
    for cat_pos in cat_positions {
        if let Some(cat_id) = img_cat_ids.get(*cat_pos) {
            obj_indices.extend(
                obj_cat_ids
                    .iter()
                    .enumerate()
                    .filter(|(_, obj_cat_id)| *obj_cat_id == cat_id)
                    .map(|(obj_idx, _)| obj_idx),
            );
        }
    }
    obj_indices.sort_unstable();
    obj_indices.dedup();
    obj_indices
}

/// Category list positions implied by selected object indices, the reciprocal
/// of [`objects_of_categories`](objects_of_categories).
pub fn categories_of_objects(
    obj_indices: &[usize],
    obj_cat_ids: &[u32],
    img_cat_ids: &[u32],
) -> Vec<usize> {
    let mut cat_positions = vec![];
    for obj_idx in obj_indices {
        if let Some(obj_cat_id) = obj_cat_ids.get(*obj_idx) {
            cat_positions.extend(
                img_cat_ids
                    .iter()
                    .enumerate()
                    .filter(|(_, cat_id)| *cat_id == obj_cat_id)
                    .map(|(cat_pos, _)| cat_pos),
            );
        }
    }
    cat_positions.sort_unstable();
    cat_positions.dedup();
    cat_positions
}

/// User selection on the two axes, category list positions and object list
/// indices. `None` means no explicit selection yet, i.e. everything is
/// selected. Both axes are kept consistent by construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    cat_positions: Option<Vec<usize>>,
    obj_indices: Option<Vec<usize>>,
}

impl Selection {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
    pub fn is_explicit(&self) -> bool {
        self.obj_indices.is_some()
    }
    pub fn cat_positions(&self) -> Option<&[usize]> {
        self.cat_positions.as_deref()
    }
    pub fn obj_indices(&self) -> Option<&[usize]> {
        self.obj_indices.as_deref()
    }
    pub fn select_categories(
        &mut self,
        cat_positions: Vec<usize>,
        obj_cat_ids: &[u32],
        img_cat_ids: &[u32],
    ) {
        self.obj_indices = Some(objects_of_categories(
            &cat_positions,
            obj_cat_ids,
            img_cat_ids,
        ));
        self.cat_positions = Some(cat_positions);
    }
    pub fn select_objects(
        &mut self,
        obj_indices: Vec<usize>,
        obj_cat_ids: &[u32],
        img_cat_ids: &[u32],
    ) {
        self.cat_positions = Some(categories_of_objects(&obj_indices, obj_cat_ids, img_cat_ids));
        self.obj_indices = Some(obj_indices);
    }
    /// Complement of the selected objects within `0..n_objects`.
    pub fn ignore_indices(&self, n_objects: usize) -> BTreeSet<usize> {
        match &self.obj_indices {
            None => BTreeSet::new(),
            Some(selected) => {
                let mut selected_mask = vec![false; n_objects];
                for obj_idx in selected {
                    if let Some(is_selected) = selected_mask.get_mut(*obj_idx) {
                        *is_selected = true;
                    }
                }
                false_indices(&selected_mask).collect()
            }
        }
    }
}

#[test]
fn test_objects_of_categories() {
    let obj_cat_ids = [1, 2, 1, 3];
    let img_cat_ids = [1, 2, 3];
    assert_eq!(
        objects_of_categories(&[0], &obj_cat_ids, &img_cat_ids),
        vec![0, 2]
    );
    assert_eq!(
        objects_of_categories(&[1, 2], &obj_cat_ids, &img_cat_ids),
        vec![1, 3]
    );
    assert!(objects_of_categories(&[], &obj_cat_ids, &img_cat_ids).is_empty());
    // out of range positions are ignored
    assert!(objects_of_categories(&[9], &obj_cat_ids, &img_cat_ids).is_empty());
}

#[test]
fn test_categories_of_objects() {
    let obj_cat_ids = [1, 2, 1, 3];
    let img_cat_ids = [1, 2, 3];
    assert_eq!(
        categories_of_objects(&[0, 2], &obj_cat_ids, &img_cat_ids),
        vec![0]
    );
    assert_eq!(
        categories_of_objects(&[1, 3], &obj_cat_ids, &img_cat_ids),
        vec![1, 2]
    );
    assert!(categories_of_objects(&[], &obj_cat_ids, &img_cat_ids).is_empty());
}

#[test]
fn test_ignore_complementarity() {
    let obj_cat_ids = [1, 2, 1, 3];
    let img_cat_ids = [1, 2, 3];
    let mut selection = Selection::default();
    // no explicit selection means nothing is ignored
    assert!(selection.ignore_indices(4).is_empty());

    for cat_positions in [vec![], vec![0], vec![1], vec![0, 2], vec![0, 1, 2]] {
        selection.select_categories(cat_positions, &obj_cat_ids, &img_cat_ids);
        let selected = selection.obj_indices().unwrap().to_vec();
        let ignored = selection.ignore_indices(4);
        for obj_idx in 0..4 {
            assert_ne!(selected.contains(&obj_idx), ignored.contains(&obj_idx));
        }
    }
}

#[test]
fn test_empty_selection_suppresses_everything() {
    let mut selection = Selection::default();
    selection.select_categories(vec![], &[1, 2], &[1, 2]);
    assert_eq!(
        selection.ignore_indices(2),
        BTreeSet::from_iter([0usize, 1])
    );
}

#[test]
fn test_axes_stay_consistent() {
    let obj_cat_ids = [1, 2, 1];
    let img_cat_ids = [1, 2];
    let mut selection = Selection::default();
    selection.select_objects(vec![1], &obj_cat_ids, &img_cat_ids);
    assert_eq!(selection.cat_positions().unwrap(), &[1]);
    selection.select_categories(vec![0], &obj_cat_ids, &img_cat_ids);
    assert_eq!(selection.obj_indices().unwrap(), &[0, 2]);
}
