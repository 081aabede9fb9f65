use glam::{Mat4, Vec3};
use std::path::Path;

use crate::error::{Result, TracerError};
use crate::scene::MeshEntity;

/// Loads every mesh in a glTF file into a single mesh entity
///
/// Node transforms are baked into the vertices, so the entity starts with an
/// identity transform.
pub fn load_gltf_mesh(path: impl AsRef<Path>) -> Result<MeshEntity> {
    let path = path.as_ref();
    log::info!("Loading glTF file: {:?}", path);

    let (gltf, buffers, _images) = gltf::import(path)
        .map_err(|e| TracerError::MeshLoad(format!("failed to import {:?}: {}", path, e)))?;

    log::debug!(
        "glTF loaded: {} scenes, {} nodes, {} meshes",
        gltf.scenes().count(),
        gltf.nodes().count(),
        gltf.meshes().count()
    );

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for scene in gltf.scenes() {
        for node in scene.nodes() {
            process_node(&node, &buffers, &Mat4::IDENTITY, &mut vertices, &mut indices)?;
        }
    }

    if indices.is_empty() {
        return Err(TracerError::MeshLoad(format!(
            "no triangle geometry found in {:?}",
            path
        )));
    }

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Mesh".to_string());

    log::info!(
        "Extracted {} vertices and {} triangles from glTF",
        vertices.len(),
        indices.len() / 3
    );
    Ok(MeshEntity::new(name, vertices, indices))
}

/// Recursively processes glTF nodes
fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    parent_transform: &Mat4,
    vertices: &mut Vec<Vec3>,
    indices: &mut Vec<u32>,
) -> Result<()> {
    let local_transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    let global_transform = *parent_transform * local_transform;

    if let Some(mesh) = node.mesh() {
        process_mesh(&mesh, buffers, &global_transform, vertices, indices)?;
    }

    for child in node.children() {
        process_node(&child, buffers, &global_transform, vertices, indices)?;
    }

    Ok(())
}

/// Appends the triangle primitives of a mesh
fn process_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    transform: &Mat4,
    vertices: &mut Vec<Vec3>,
    indices: &mut Vec<u32>,
) -> Result<()> {
    log::debug!("  Processing mesh: {:?}", mesh.name());

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping non-triangle primitive in mesh {:?}", mesh.name());
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let positions = reader.read_positions().ok_or_else(|| {
            TracerError::MeshLoad(format!("mesh {:?} has a primitive without positions", mesh.name()))
        })?;

        let base = vertices.len() as u32;
        vertices.extend(positions.map(|pos| transform.transform_point3(Vec3::from_array(pos))));
        let added = vertices.len() as u32 - base;

        match reader.read_indices() {
            Some(read) => indices.extend(read.into_u32().map(|i| base + i)),
            // No indices: treat the positions as a triangle list
            None => indices.extend(base..base + added - added % 3),
        }
    }

    Ok(())
}
