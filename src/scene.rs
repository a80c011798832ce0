//! The retained scene: helpers plus at most one point cloud mesh.
//!
//! Geometries and materials are registered in a [ResourceRegistry] when
//! created and released when disposed, so leaks show up as a non-zero
//! [Scene::live_resources] count.

use crate::data::PointCloudGeometry;
use nalgebra::Point3;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    next: u64,
    live: HashSet<ResourceId>,
}

impl ResourceRegistry {
    fn allocate(&mut self) -> ResourceId {
        let id = ResourceId(self.next);
        self.next += 1;
        self.live.insert(id);
        id
    }

    fn release(&mut self, id: ResourceId) -> bool {
        self.live.remove(&id)
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.live.contains(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[derive(Debug)]
pub struct Geometry {
    id: ResourceId,
    data: PointCloudGeometry,
}

/// Display style of a point cloud.
#[derive(Debug)]
pub struct PointsMaterial {
    id: ResourceId,
    pub size: f32,
}

#[derive(Debug)]
pub struct PointCloudMesh {
    frame: usize,
    geometry: Geometry,
    material: PointsMaterial,
}

impl PointCloudMesh {
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn geometry(&self) -> &PointCloudGeometry {
        &self.geometry.data
    }

    pub fn point_size(&self) -> f32 {
        self.material.size
    }

    pub fn resource_ids(&self) -> [ResourceId; 2] {
        [self.geometry.id, self.material.id]
    }

    /// Releases geometry and material. Consumes the mesh so nothing can
    /// keep drawing it afterwards.
    fn dispose(self, registry: &mut ResourceRegistry) {
        registry.release(self.geometry.id);
        registry.release(self.material.id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Helper {
    Axes { size: f32 },
}

/// Drawing target for a [Scene].
pub trait RenderSurface {
    /// Applies size-independent settings such as point size and lighting.
    fn configure(&mut self, config: &SurfaceConfig);
    fn draw_axes(&mut self, origin: Point3<f32>, size: f32);
    fn draw_points(&mut self, mesh: &PointCloudMesh);
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub point_size: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            point_size: 1.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    registry: ResourceRegistry,
    helpers: Vec<Helper>,
    mesh: Option<PointCloudMesh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_helper(&mut self, helper: Helper) {
        self.helpers.push(helper);
    }

    /// Builds a mesh whose resources belong to this scene. The mesh is not
    /// attached yet.
    pub fn create_mesh(
        &mut self,
        frame: usize,
        data: PointCloudGeometry,
        point_size: f32,
    ) -> PointCloudMesh {
        let geometry = Geometry {
            id: self.registry.allocate(),
            data,
        };
        let material = PointsMaterial {
            id: self.registry.allocate(),
            size: point_size,
        };
        PointCloudMesh {
            frame,
            geometry,
            material,
        }
    }

    /// Attaches `mesh`, disposing the one it replaces first. Returns the
    /// frame of the replaced mesh.
    pub fn replace_mesh(&mut self, mesh: PointCloudMesh) -> Option<usize> {
        let previous = self.mesh.take().map(|old| {
            let frame = old.frame;
            old.dispose(&mut self.registry);
            frame
        });
        self.mesh = Some(mesh);
        previous
    }

    pub fn mesh(&self) -> Option<&PointCloudMesh> {
        self.mesh.as_ref()
    }

    /// Detaches and disposes everything.
    pub fn dispose(&mut self) {
        if let Some(mesh) = self.mesh.take() {
            mesh.dispose(&mut self.registry);
        }
        self.helpers.clear();
    }

    /// Number of attached helpers and meshes.
    pub fn drawable_count(&self) -> usize {
        self.helpers.len() + usize::from(self.mesh.is_some())
    }

    pub fn live_resources(&self) -> usize {
        self.registry.live_count()
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.registry.is_live(id)
    }

    pub fn render<S>(&self, surface: &mut S)
    where
        S: RenderSurface + ?Sized,
    {
        for helper in &self.helpers {
            match *helper {
                Helper::Axes { size } => surface.draw_axes(Point3::origin(), size),
            }
        }
        if let Some(mesh) = &self.mesh {
            surface.draw_points(mesh);
        }
    }
}
