//! Portfolio ordering and cover selection.
//!
//! Positions are zero-based array indices. Callers persist the returned
//! changes one row at a time; only rows whose value actually changes are
//! returned so a small drag touches few rows.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::models::PortfolioImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub image_id: Uuid,
    pub position: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverChange {
    pub image_id: Uuid,
    pub is_cover: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("Image {0} appears more than once")]
    Duplicate(Uuid),

    #[error("Image {0} is not part of this portfolio")]
    Unknown(Uuid),

    #[error("Reorder is missing {0} image(s)")]
    Missing(usize),
}

/// Turn a dragged sequence into per-image position updates
///
/// `ordered_ids` must be a permutation of the current portfolio.
pub fn plan_reorder(
    current: &[PortfolioImage],
    ordered_ids: &[Uuid],
) -> Result<Vec<PositionUpdate>, ReorderError> {
    let positions: HashMap<Uuid, i32> = current.iter().map(|img| (img.id, img.position)).collect();
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    let mut updates = Vec::new();

    for (index, id) in ordered_ids.iter().enumerate() {
        if !seen.insert(*id) {
            return Err(ReorderError::Duplicate(*id));
        }
        let old = positions.get(id).ok_or(ReorderError::Unknown(*id))?;
        let new = index as i32;
        if *old != new {
            updates.push(PositionUpdate {
                image_id: *id,
                position: new,
            });
        }
    }

    if seen.len() < positions.len() {
        return Err(ReorderError::Missing(positions.len() - seen.len()));
    }

    Ok(updates)
}

/// Position for an image appended to the end
pub fn next_position(current: &[PortfolioImage]) -> i32 {
    current.iter().map(|img| img.position + 1).max().unwrap_or(0)
}

/// Close gaps left by deletions, keeping relative order
pub fn compact_positions(remaining: &[PortfolioImage]) -> Vec<PositionUpdate> {
    let mut sorted: Vec<&PortfolioImage> = remaining.iter().collect();
    sorted.sort_by_key(|img| img.position);

    sorted
        .into_iter()
        .enumerate()
        .filter(|(index, img)| img.position != *index as i32)
        .map(|(index, img)| PositionUpdate {
            image_id: img.id,
            position: index as i32,
        })
        .collect()
}

/// Changes needed so exactly one image is the cover
///
/// With `new_cover` set, that image becomes the cover. Otherwise the
/// existing cover with the lowest position is kept, or the first image by
/// position is promoted when there is none. Unsets come before the set so a
/// unique-cover constraint never sees two covers.
pub fn cover_changes(images: &[PortfolioImage], new_cover: Option<Uuid>) -> Vec<CoverChange> {
    let by_position = |a: &&PortfolioImage, b: &&PortfolioImage| a.position.cmp(&b.position);

    let target = new_cover
        .or_else(|| images.iter().filter(|img| img.is_cover).min_by(by_position).map(|img| img.id))
        .or_else(|| images.iter().min_by(by_position).map(|img| img.id));

    let mut changes: Vec<CoverChange> = images
        .iter()
        .filter_map(|img| {
            let want = Some(img.id) == target;
            (img.is_cover != want).then_some(CoverChange {
                image_id: img.id,
                is_cover: want,
            })
        })
        .collect();

    changes.sort_by_key(|c| c.is_cover);
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(position: i32, is_cover: bool) -> PortfolioImage {
        PortfolioImage {
            id: Uuid::new_v4(),
            model_id: Uuid::nil(),
            url: format!("https://cdn.test/{}.jpg", position),
            caption: None,
            position,
            is_cover,
            created_at: None,
        }
    }

    #[test]
    fn test_swap_touches_two_rows() {
        let imgs = vec![image(0, true), image(1, false), image(2, false)];
        let order = vec![imgs[0].id, imgs[2].id, imgs[1].id];

        let updates = plan_reorder(&imgs, &order).unwrap();
        assert_eq!(
            updates,
            vec![
                PositionUpdate { image_id: imgs[2].id, position: 1 },
                PositionUpdate { image_id: imgs[1].id, position: 2 },
            ]
        );
    }

    #[test]
    fn test_reorder_rejects_bad_input() {
        let imgs = vec![image(0, true), image(1, false)];
        let stranger = Uuid::new_v4();

        assert_eq!(plan_reorder(&imgs, &[imgs[0].id, imgs[0].id]), Err(ReorderError::Duplicate(imgs[0].id)));
        assert_eq!(plan_reorder(&imgs, &[imgs[0].id, stranger]), Err(ReorderError::Unknown(stranger)));
        assert_eq!(plan_reorder(&imgs, &[imgs[1].id]), Err(ReorderError::Missing(1)));
    }

    #[test]
    fn test_compact_after_delete() {
        let imgs = vec![image(0, true), image(2, false), image(5, false)];
        let updates = compact_positions(&imgs);
        assert_eq!(
            updates,
            vec![
                PositionUpdate { image_id: imgs[1].id, position: 1 },
                PositionUpdate { image_id: imgs[2].id, position: 2 },
            ]
        );
        assert_eq!(next_position(&imgs), 6);
        assert_eq!(next_position(&[]), 0);
    }

    #[test]
    fn test_cover_switch_unsets_first() {
        let imgs = vec![image(0, true), image(1, false)];
        let changes = cover_changes(&imgs, Some(imgs[1].id));
        assert_eq!(
            changes,
            vec![
                CoverChange { image_id: imgs[0].id, is_cover: false },
                CoverChange { image_id: imgs[1].id, is_cover: true },
            ]
        );
    }

    #[test]
    fn test_cover_promoted_when_missing() {
        let imgs = vec![image(3, false), image(1, false)];
        let changes = cover_changes(&imgs, None);
        assert_eq!(changes, vec![CoverChange { image_id: imgs[1].id, is_cover: true }]);

        let fine = vec![image(0, false), image(1, true)];
        assert!(cover_changes(&fine, None).is_empty());
    }
}
