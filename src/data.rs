use nalgebra::Point3;
use palette::{FromColor, Hsv, Srgb};

/// Decoded points of one frame, ready to be wrapped in a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudGeometry {
    pub positions: Vec<Point3<f32>>,
    pub colors: Vec<Point3<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl PointCloudGeometry {
    /// Every point white.
    pub fn uniform(positions: Vec<Point3<f32>>) -> Self {
        let colors = vec![Point3::from([1.0; 3]); positions.len()];
        Self { positions, colors }
    }

    /// Colors points by height, blue at the lowest z to red at the highest.
    pub fn height_colored(positions: Vec<Point3<f32>>) -> Self {
        let Some(bounds) = Bounds::of(&positions) else {
            return Self::uniform(positions);
        };
        let span = bounds.max.z - bounds.min.z;
        let colors = positions
            .iter()
            .map(|point| {
                let ratio = if span > f32::EPSILON {
                    (point.z - bounds.min.z) / span
                } else {
                    0.0
                };
                height_color(ratio)
            })
            .collect();
        Self { positions, colors }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(&self.positions)
    }

    pub fn points(&self) -> impl Iterator<Item = (&Point3<f32>, &Point3<f32>)> {
        self.positions.iter().zip(&self.colors)
    }
}

impl Bounds {
    pub fn of(points: &[Point3<f32>]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let bounds = rest.iter().fold(
            Self {
                min: *first,
                max: *first,
            },
            |bounds, point| Self {
                min: bounds.min.inf(point),
                max: bounds.max.sup(point),
            },
        );
        Some(bounds)
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }
}

fn height_color(ratio: f32) -> Point3<f32> {
    let hue = 240.0 * (1.0 - ratio.clamp(0.0, 1.0));
    let (r, g, b) = Srgb::from_color(Hsv::new(hue, 1.0, 1.0)).into_components();
    Point3::from([r, g, b])
}
