use crate::scene::{MarkerArena, MarkerHandle, MarkerPartKind, MARKER_PARTS};
use glam::Vec3;

/// What a ray struck: a marker's own body or one of the parts attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneObject {
    Marker(MarkerHandle),
    Part { owner: MarkerHandle, kind: MarkerPartKind },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    pub object: SceneObject,
    pub distance: f32,
}

pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    let origin_arr = origin.to_array();
    let dir_arr = dir.to_array();
    let min_arr = min.to_array();
    let max_arr = max.to_array();
    for i in 0..3 {
        let o = origin_arr[i];
        let d = dir_arr[i];
        if d.abs() < 1e-6 {
            if o < min_arr[i] || o > max_arr[i] {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min_arr[i] - o) * inv_d;
            let mut t2 = (max_arr[i] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    let t_hit = if t_min >= 0.0 { t_min } else { t_max };
    Some((t_hit, origin + dir * t_hit))
}

/// Every marker part pierced by the ray, nearest first. Equal distances keep arena order.
pub fn intersect_markers(arena: &MarkerArena, origin: Vec3, dir: Vec3) -> Vec<SceneHit> {
    if dir.length_squared() <= f32::EPSILON {
        return Vec::new();
    }
    let dir = dir.normalize();
    let mut hits = Vec::new();
    for (handle, marker) in arena.iter() {
        for part in MARKER_PARTS.iter() {
            let (min, max) = part.world_bounds(marker.position(), marker.placement.height_scale);
            if let Some((distance, _)) = ray_aabb_intersection(origin, dir, min, max) {
                let object = match part.kind {
                    MarkerPartKind::Body => SceneObject::Marker(handle),
                    kind => SceneObject::Part { owner: handle, kind },
                };
                hits.push(SceneHit { object, distance });
            }
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Resolves the first hit to its owning marker. A part walks up to its owner;
/// anything no longer live in the arena resolves to nothing.
pub fn resolve_marker(hits: &[SceneHit], arena: &MarkerArena) -> Option<MarkerHandle> {
    let first = hits.first()?;
    let handle = match first.object {
        SceneObject::Part { owner, .. } => owner,
        SceneObject::Marker(handle) => handle,
    };
    arena.contains(handle).then_some(handle)
}

pub fn pick_marker(arena: &MarkerArena, origin: Vec3, dir: Vec3) -> Option<MarkerHandle> {
    resolve_marker(&intersect_markers(arena, origin, dir), arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Placement;
    use crate::record::Record;
    use crate::scene::{Marker, MarkerVisual};

    fn arena_with(positions: &[Vec3]) -> (MarkerArena, Vec<MarkerHandle>) {
        let mut arena = MarkerArena::new();
        let handles = positions
            .iter()
            .enumerate()
            .map(|(i, pos)| {
                arena.insert(Marker {
                    record: Record::new(format!("m{i}"), format!("M{i}"), ""),
                    placement: Placement { index: i, row: 0, col: i, position: *pos, height_scale: 2.0 },
                    visual: MarkerVisual(i as u64),
                })
            })
            .collect();
        (arena, handles)
    }

    #[test]
    fn aabb_hit_and_miss() {
        let hit = ray_aabb_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::splat(-1.0), Vec3::ONE);
        let (t, point) = hit.expect("ray should hit box");
        assert!((t - 4.0).abs() < 1e-5);
        assert!((point.z - 1.0).abs() < 1e-5);
        assert!(ray_aabb_intersection(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::splat(-1.0), Vec3::ONE)
            .is_none());
        assert!(ray_aabb_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, Vec3::splat(-1.0), Vec3::ONE).is_none());
    }

    #[test]
    fn nearest_marker_along_ray_wins() {
        let (arena, handles) = arena_with(&[Vec3::new(0.0, 1.9, -6.0), Vec3::new(0.0, 1.9, -2.0)]);
        let picked = pick_marker(&arena, Vec3::new(0.0, 1.0, 5.0), Vec3::NEG_Z);
        assert_eq!(picked, Some(handles[1]));
    }

    #[test]
    fn name_plate_hit_resolves_to_owner() {
        let (arena, handles) = arena_with(&[Vec3::new(0.0, 1.9, 0.0)]);
        // between the top of the body and the cap, only the plate is in the way
        let origin = Vec3::new(0.0, 3.85, 5.0);
        let hits = intersect_markers(&arena, origin, Vec3::NEG_Z);
        assert!(matches!(hits[0].object, SceneObject::Part { kind: MarkerPartKind::NamePlate, .. }));
        assert_eq!(resolve_marker(&hits, &arena), Some(handles[0]));
    }

    #[test]
    fn stale_hits_resolve_to_nothing() {
        let (mut arena, _) = arena_with(&[Vec3::new(0.0, 1.9, 0.0)]);
        let hits = intersect_markers(&arena, Vec3::new(0.0, 1.0, 5.0), Vec3::NEG_Z);
        assert!(!hits.is_empty());
        arena.drain();
        assert_eq!(resolve_marker(&hits, &arena), None);
    }
}
