//! In-memory reference scene
//!
//! A self-contained [`BakeHost`]: objects are meshes with world transforms,
//! ray queries run against per-object BVHs, and baked colors land in named
//! per-object corner attributes. Hosts with their own geometry backend
//! implement the traits in [`crate::host`] instead.
//!
//! # Thread safety
//!
//! The object table sits behind an `RwLock`. Ray queries take the read side
//! and run concurrently from the bake workers; adding and removing objects
//! or committing colors take the write side.

use glam::Vec3;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::color::{ColorAttribute, ColorBuffer, ColorTarget};
use crate::error::{BakeError, BakeResult};
use crate::host::{BakeHost, OccluderHost, RayCaster, RayHit};
use crate::mesh::{BvhHit, Mesh, MeshBvh};

/// Identifier of an object in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Raw numeric id
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mesh with acceleration structures in local and world space
///
/// Used directly as the local-space [`RayCaster`] of an object.
#[derive(Debug)]
pub struct MeshObject {
    name: String,
    mesh: Arc<Mesh>,
    local_bvh: MeshBvh,
    world_bvh: MeshBvh,
}

impl MeshObject {
    /// Build both BVHs for `mesh`
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        let (indices, face_ids) = mesh.triangulate();
        let local_bvh = MeshBvh::build(&mesh.positions(), &indices, &face_ids, MeshBvh::DEFAULT_LEAF_SIZE);
        let world_bvh = MeshBvh::build(
            &mesh.world_positions(),
            &indices,
            &face_ids,
            MeshBvh::DEFAULT_LEAF_SIZE,
        );
        MeshObject {
            name: name.into(),
            mesh: Arc::new(mesh),
            local_bvh,
            world_bvh,
        }
    }

    /// Object name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared mesh snapshot
    #[inline]
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// BVH over local-space triangles
    #[inline]
    pub fn local_bvh(&self) -> &MeshBvh {
        &self.local_bvh
    }

    /// BVH over world-space triangles
    #[inline]
    pub fn world_bvh(&self) -> &MeshBvh {
        &self.world_bvh
    }
}

fn to_ray_hit(hit: BvhHit) -> RayHit {
    RayHit {
        distance: hit.distance,
        position: hit.point,
        normal: hit.normal,
        face: hit.face,
    }
}

impl RayCaster for MeshObject {
    fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<Option<RayHit>> {
        Ok(self.local_bvh.raycast(origin, direction, max_distance).map(to_ray_hit))
    }

    fn occludes(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<bool> {
        Ok(self.local_bvh.occluded(origin, direction, max_distance))
    }
}

struct SceneEntry {
    object: Arc<MeshObject>,
    visible: bool,
    attributes: HashMap<String, ColorAttribute>,
}

/// Collection of mesh objects answering world-space ray queries
pub struct Scene {
    next_id: AtomicU64,
    entries: RwLock<BTreeMap<ObjectId, SceneEntry>>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene").field("objects", &self.len()).finish()
    }
}

impl Scene {
    /// Empty scene
    pub fn new() -> Self {
        Scene {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    // Writers never leave the map half-updated, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ObjectId, SceneEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ObjectId, SceneEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a visible object and return its id
    pub fn add_object(&self, name: impl Into<String>, mesh: Mesh) -> ObjectId {
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let object = Arc::new(MeshObject::new(name, mesh));
        log::debug!(
            "scene: added {} '{}' ({} triangles)",
            id,
            object.name(),
            object.local_bvh().triangle_count()
        );
        self.write().insert(
            id,
            SceneEntry {
                object,
                visible: true,
                attributes: HashMap::new(),
            },
        );
        id
    }

    /// Remove an object and its attributes
    pub fn remove_object(&self, id: ObjectId) -> BakeResult<()> {
        self.write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BakeError::UnknownObject(id.to_string()))
    }

    /// Hidden objects neither occlude nor get hit by scene queries
    pub fn set_visible(&self, id: ObjectId, visible: bool) -> BakeResult<()> {
        let mut entries = self.write();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| BakeError::UnknownObject(id.to_string()))?;
        entry.visible = visible;
        Ok(())
    }

    /// Object by id
    pub fn object(&self, id: ObjectId) -> Option<Arc<MeshObject>> {
        self.read().get(&id).map(|e| Arc::clone(&e.object))
    }

    /// First object with the given name
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.read()
            .iter()
            .find(|(_, e)| e.object.name() == name)
            .map(|(&id, _)| id)
    }

    /// True if the id is live
    pub fn contains(&self, id: ObjectId) -> bool {
        self.read().contains_key(&id)
    }

    /// All live ids in insertion order
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.read().keys().copied().collect()
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if the scene has no objects
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of a named corner attribute of an object
    pub fn attribute(&self, id: ObjectId, name: &str) -> Option<ColorAttribute> {
        self.read().get(&id)?.attributes.get(name).cloned()
    }

    /// Names of all attributes on an object
    pub fn attribute_names(&self, id: ObjectId) -> Vec<String> {
        let entries = self.read();
        let mut names: Vec<String> = entries
            .get(&id)
            .map(|e| e.attributes.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl RayCaster for Scene {
    fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<Option<RayHit>> {
        let entries = self.read();
        let mut best: Option<BvhHit> = None;
        for entry in entries.values().filter(|e| e.visible) {
            let limit = best.as_ref().map_or(max_distance, |h| h.distance);
            if let Some(hit) = entry.object.world_bvh().raycast(origin, direction, limit) {
                best = Some(hit);
            }
        }
        Ok(best.map(to_ray_hit))
    }

    fn occludes(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<bool> {
        Ok(self
            .read()
            .values()
            .filter(|e| e.visible)
            .any(|e| e.object.world_bvh().occluded(origin, direction, max_distance)))
    }
}

impl OccluderHost for Scene {
    type Handle = ObjectId;

    fn add_occluder(&self, name: &str, mesh: Mesh) -> BakeResult<ObjectId> {
        mesh.validate()?;
        Ok(self.add_object(name, mesh))
    }

    fn remove_occluder(&self, handle: ObjectId) -> BakeResult<()> {
        self.remove_object(handle)
    }
}

impl BakeHost for Scene {
    type ObjectId = ObjectId;
    type LocalCaster = Arc<MeshObject>;

    fn object_mesh(&self, id: ObjectId) -> BakeResult<Arc<Mesh>> {
        self.object(id)
            .map(|o| Arc::clone(o.mesh()))
            .ok_or_else(|| BakeError::UnknownObject(id.to_string()))
    }

    fn local_caster(&self, id: ObjectId) -> BakeResult<Arc<MeshObject>> {
        self.object(id).ok_or_else(|| BakeError::UnknownObject(id.to_string()))
    }

    fn object_name(&self, id: ObjectId) -> String {
        self.object(id)
            .map(|o| o.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    fn commit_colors(&self, id: ObjectId, target: ColorTarget, colors: &ColorBuffer) -> BakeResult<()> {
        let mut entries = self.write();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| BakeError::UnknownObject(id.to_string()))?;
        let name = target.attribute_name();
        let corner_count = entry.object.mesh().corner_count();
        let attribute = entry
            .attributes
            .entry(name.to_string())
            .or_insert_with(|| ColorAttribute::new(name, corner_count));
        colors.commit(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn test_add_find_remove() {
        let scene = Scene::new();
        let a = scene.add_object("a", Mesh::cube(1.0));
        let b = scene.add_object("b", Mesh::cube(1.0));
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.find("b"), Some(b));
        assert_eq!(scene.object_ids(), vec![a, b]);

        scene.remove_object(a).unwrap();
        assert!(!scene.contains(a));
        assert_eq!(
            scene.remove_object(a),
            Err(BakeError::UnknownObject(a.to_string()))
        );
    }

    #[test]
    fn test_world_query_uses_transform() {
        let scene = Scene::new();
        let moved = Mesh::grid_plane(2.0, 1).with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)));
        let id = scene.add_object("plane", moved);

        let origin = Vec3::new(0.3, -0.2, 0.0);
        let hit = scene.ray_cast(origin, Vec3::Z, 100.0).unwrap().unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!(scene.occludes(origin, Vec3::Z, 100.0).unwrap());
        assert!(!scene.occludes(origin, Vec3::Z, 4.0).unwrap());

        // Local space ignores the transform
        let local = scene.local_caster(id).unwrap();
        let hit = local.ray_cast(Vec3::new(0.3, -0.2, -1.0), Vec3::Z, 100.0).unwrap().unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_nearest_object_wins() {
        let scene = Scene::new();
        let at = |z: f32| Mesh::grid_plane(2.0, 1).with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, z)));
        scene.add_object("far", at(9.0));
        scene.add_object("near", at(3.0));

        let hit = scene.ray_cast(Vec3::new(0.3, -0.2, 0.0), Vec3::Z, 100.0).unwrap().unwrap();
        assert!((hit.distance - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_hidden_objects_do_not_occlude() {
        let scene = Scene::new();
        let id = scene.add_object("roof", Mesh::grid_plane(2.0, 1).with_transform(Mat4::from_translation(Vec3::Z)));
        let origin = Vec3::new(0.3, -0.2, 0.0);
        assert!(scene.occludes(origin, Vec3::Z, 10.0).unwrap());

        scene.set_visible(id, false).unwrap();
        assert!(!scene.occludes(origin, Vec3::Z, 10.0).unwrap());
        assert!(scene.ray_cast(origin, Vec3::Z, 10.0).unwrap().is_none());
    }

    #[test]
    fn test_commit_creates_attribute() {
        let scene = Scene::new();
        let mesh = Mesh::grid_plane(1.0, 1);
        let id = scene.add_object("plane", mesh);

        let colors = ColorBuffer::filled(4, [0.25, 0.5, 0.75]);
        scene.commit_colors(id, ColorTarget::TintColor, &colors).unwrap();

        let name = ColorTarget::TintColor.attribute_name();
        let attribute = scene.attribute(id, name).unwrap();
        assert_eq!(attribute.data(), colors.as_slice());
        assert_eq!(scene.attribute_names(id), vec![name.to_string()]);
    }

    #[test]
    fn test_commit_wrong_length_is_rejected() {
        let scene = Scene::new();
        let id = scene.add_object("plane", Mesh::grid_plane(1.0, 1));
        let colors = ColorBuffer::filled(3, [1.0, 1.0, 1.0]);
        assert!(matches!(
            scene.commit_colors(id, ColorTarget::TintColor, &colors),
            Err(BakeError::TopologyMismatch { .. })
        ));
    }

    #[test]
    fn test_occluder_round_trip() {
        let scene = Scene::new();
        let handle = scene.add_occluder("ground", Mesh::grid_plane(1.0, 1)).unwrap();
        assert_eq!(scene.object_name(handle), "ground");
        scene.remove_occluder(handle).unwrap();
        assert!(scene.is_empty());
    }
}
