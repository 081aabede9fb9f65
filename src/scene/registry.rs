use glam::{Mat4, Vec3};

use super::entity::{DynamicSphereId, MeshEntity, MeshId};
use crate::core::accumulation::AccumulationController;
use crate::types::{MeshObjectData, SphereData, VertexData};

/// Buffer-ready pools derived from the registered mesh entities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedScene {
    pub vertices: Vec<VertexData>,
    pub indices: Vec<u32>,
    pub mesh_objects: Vec<MeshObjectData>,
}

impl FlattenedScene {
    fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.mesh_objects.clear();
    }
}

/// Registered scene content and its flattened form
///
/// Registration changes set a rebuild flag; `rebuild` recomputes the pools
/// from scratch in registration order.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    meshes: Vec<(MeshId, MeshEntity)>,
    next_mesh_id: u64,
    static_spheres: Vec<SphereData>,
    dynamic_spheres: Vec<SphereData>,
    generation: u32,
    flattened: FlattenedScene,
    needs_rebuild: bool,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_mesh(&mut self, entity: MeshEntity) -> MeshId {
        let id = MeshId(self.next_mesh_id);
        self.next_mesh_id += 1;
        log::debug!("Registered mesh '{}' as {:?}", entity.name, id);
        self.meshes.push((id, entity));
        self.needs_rebuild = true;
        id
    }

    pub fn unregister_mesh(&mut self, id: MeshId) -> Option<MeshEntity> {
        let index = self.meshes.iter().position(|(mesh_id, _)| *mesh_id == id)?;
        self.needs_rebuild = true;
        Some(self.meshes.remove(index).1)
    }

    /// Replace the static sphere set
    pub fn register_static_spheres(&mut self, spheres: Vec<SphereData>) {
        self.static_spheres = spheres;
        self.needs_rebuild = true;
    }

    pub fn register_dynamic_sphere(&mut self, sphere: SphereData) -> DynamicSphereId {
        self.dynamic_spheres.push(sphere);
        self.needs_rebuild = true;
        DynamicSphereId {
            index: self.dynamic_spheres.len() - 1,
            generation: self.generation,
        }
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshEntity> {
        self.meshes
            .iter()
            .find(|(mesh_id, _)| *mesh_id == id)
            .map(|(_, entity)| entity)
    }

    pub fn set_mesh_transform(&mut self, id: MeshId, transform: Mat4) -> bool {
        match self.meshes.iter_mut().find(|(mesh_id, _)| *mesh_id == id) {
            Some((_, entity)) => {
                entity.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn dynamic_sphere(&self, id: DynamicSphereId) -> Option<&SphereData> {
        if id.generation != self.generation {
            return None;
        }
        self.dynamic_spheres.get(id.index)
    }

    pub fn set_dynamic_sphere_position(&mut self, id: DynamicSphereId, position: Vec3) -> bool {
        if id.generation != self.generation {
            return false;
        }
        match self.dynamic_spheres.get_mut(id.index) {
            Some(sphere) => {
                sphere.set_center(position);
                true
            }
            None => false,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.needs_rebuild = true;
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Recompute the flattened pools if anything changed
    ///
    /// Returns false when the registry was clean. A rebuild restarts
    /// accumulation.
    pub fn rebuild<T>(&mut self, accumulation: &mut AccumulationController<T>) -> bool {
        if !self.needs_rebuild {
            return false;
        }

        self.flattened.clear();
        for (_, entity) in &self.meshes {
            let first_vertex = self.flattened.vertices.len() as u32;
            let indices_offset = self.flattened.indices.len() as u32;

            self.flattened
                .vertices
                .extend(entity.vertices.iter().map(|v| v.to_array()));
            self.flattened
                .indices
                .extend(entity.indices.iter().map(|&i| i + first_vertex));
            self.flattened.mesh_objects.push(MeshObjectData::new(
                entity.transform,
                indices_offset,
                entity.indices.len() as u32,
            ));
        }

        self.needs_rebuild = false;
        accumulation.invalidate();
        log::debug!(
            "Rebuilt scene: {} mesh objects, {} vertices, {} indices",
            self.flattened.mesh_objects.len(),
            self.flattened.vertices.len(),
            self.flattened.indices.len()
        );
        true
    }

    /// Static spheres followed by dynamic spheres
    pub fn spheres(&self) -> Vec<SphereData> {
        let mut spheres = Vec::with_capacity(self.sphere_count());
        spheres.extend_from_slice(&self.static_spheres);
        spheres.extend_from_slice(&self.dynamic_spheres);
        spheres
    }

    pub fn sphere_count(&self) -> usize {
        self.static_spheres.len() + self.dynamic_spheres.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn flattened(&self) -> &FlattenedScene {
        &self.flattened
    }

    /// Drop every registered entity
    ///
    /// Dynamic sphere ids issued before the clear stop resolving, so stale
    /// animators become no-ops instead of moving newer spheres.
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.static_spheres.clear();
        self.dynamic_spheres.clear();
        self.generation = self.generation.wrapping_add(1);
        self.flattened.clear();
        self.needs_rebuild = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshEntity {
        MeshEntity::new(
            "Quad",
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn rebuild_is_noop_when_clean() {
        let mut registry = SceneRegistry::new();
        let mut accumulation = AccumulationController::<()>::new(true);
        assert!(!registry.rebuild(&mut accumulation));
    }

    #[test]
    fn indices_are_offset_by_first_vertex() {
        let mut registry = SceneRegistry::new();
        let mut accumulation = AccumulationController::<()>::new(true);
        registry.register_mesh(quad());
        registry.register_mesh(MeshEntity::cube(1.0));

        assert!(registry.rebuild(&mut accumulation));
        let flat = registry.flattened();

        assert_eq!(flat.vertices.len(), 12);
        assert_eq!(flat.indices.len(), 42);
        assert_eq!(flat.mesh_objects[0].indices_offset, 0);
        assert_eq!(flat.mesh_objects[0].indices_count, 6);
        assert_eq!(flat.mesh_objects[1].indices_offset, 6);
        assert_eq!(flat.mesh_objects[1].indices_count, 36);
        assert_eq!(flat.indices[6], 4);
        assert!(flat.indices[6..].iter().all(|&i| (4..12).contains(&i)));
        assert!(!registry.needs_rebuild());
    }

    #[test]
    fn rebuild_twice_yields_identical_pools() {
        let mut registry = SceneRegistry::new();
        let mut accumulation = AccumulationController::<()>::new(true);
        registry.register_mesh(quad().with_transform(Mat4::from_translation(Vec3::Z)));
        registry.register_mesh(MeshEntity::cube(2.0));

        registry.rebuild(&mut accumulation);
        let first = registry.flattened().clone();
        registry.mark_dirty();
        registry.rebuild(&mut accumulation);

        assert_eq!(&first, registry.flattened());
    }

    #[test]
    fn transform_updates_do_not_dirty_but_reach_next_rebuild() {
        let mut registry = SceneRegistry::new();
        let mut accumulation = AccumulationController::<()>::new(true);
        let id = registry.register_mesh(quad());
        registry.rebuild(&mut accumulation);

        let moved = Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
        assert!(registry.set_mesh_transform(id, moved));
        assert!(!registry.needs_rebuild());

        registry.mark_dirty();
        registry.rebuild(&mut accumulation);
        assert_eq!(registry.flattened().mesh_objects[0].transform(), moved);
    }

    #[test]
    fn unregister_removes_mesh_from_pools() {
        let mut registry = SceneRegistry::new();
        let mut accumulation = AccumulationController::<()>::new(true);
        let first = registry.register_mesh(quad());
        let second = registry.register_mesh(MeshEntity::cube(1.0));
        registry.rebuild(&mut accumulation);

        let removed = registry.unregister_mesh(first).unwrap();
        assert_eq!(removed.name, "Quad");
        assert!(registry.unregister_mesh(first).is_none());
        assert!(registry.rebuild(&mut accumulation));

        let flat = registry.flattened();
        assert_eq!(flat.mesh_objects.len(), 1);
        assert_eq!(flat.mesh_objects[0].indices_offset, 0);
        assert_eq!(flat.vertices.len(), 8);
        assert!(registry.mesh(second).is_some());
    }

    #[test]
    fn spheres_list_static_before_dynamic() {
        let mut registry = SceneRegistry::new();
        let dynamic = registry.register_dynamic_sphere(SphereData::new(Vec3::new(0.0, 9.0, 0.0), 2.0));
        registry.register_static_spheres(vec![
            SphereData::new(Vec3::X, 1.0),
            SphereData::new(Vec3::Z, 1.0),
        ]);

        assert!(registry.set_dynamic_sphere_position(dynamic, Vec3::new(5.0, 9.0, 0.0)));
        let spheres = registry.spheres();

        assert_eq!(spheres.len(), 3);
        assert_eq!(spheres[0].center(), Vec3::X);
        assert_eq!(spheres[2].center(), Vec3::new(5.0, 9.0, 0.0));
        assert!(!registry.set_dynamic_sphere_position(
            DynamicSphereId {
                index: 7,
                generation: 0,
            },
            Vec3::ZERO
        ));
    }

    #[test]
    fn clear_empties_everything_and_dirties() {
        let mut registry = SceneRegistry::new();
        let mut accumulation = AccumulationController::<()>::new(true);
        registry.register_mesh(quad());
        registry.register_static_spheres(vec![SphereData::new(Vec3::ZERO, 1.0)]);
        registry.rebuild(&mut accumulation);

        registry.clear();

        assert!(registry.needs_rebuild());
        assert_eq!(registry.sphere_count(), 0);
        assert_eq!(registry.mesh_count(), 0);
        assert!(registry.flattened().vertices.is_empty());
    }

    #[test]
    fn dynamic_ids_from_before_clear_do_not_resolve() {
        let mut registry = SceneRegistry::new();
        let stale = registry.register_dynamic_sphere(SphereData::new(Vec3::new(1.0, 2.0, 0.0), 1.0));

        registry.clear();
        let fresh = registry.register_dynamic_sphere(SphereData::new(Vec3::new(9.0, 2.0, 0.0), 1.0));

        assert_eq!(stale.index(), fresh.index());
        assert!(registry.dynamic_sphere(stale).is_none());
        assert!(!registry.set_dynamic_sphere_position(stale, Vec3::ZERO));
        assert_eq!(
            registry.dynamic_sphere(fresh).map(|s| s.center()),
            Some(Vec3::new(9.0, 2.0, 0.0))
        );
    }
}
