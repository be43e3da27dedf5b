//! Screen-point raycasting against tracked planes.
//!
//! A screen point is mapped to a camera pixel, unprojected to a camera-space
//! ray (+Z forward), rotated into world space by the camera pose and
//! intersected with every tracked plane. The nearest hit in front of the
//! camera wins.
//!
//! # Example
//!
//! ```
//! use ar_measure::{TrackedPlane, TrackingFrame, Viewport};
//! use nalgebra::{Point3, Vector3};
//! use sensor_types::{CameraIntrinsics, Pose3d};
//!
//! let frame = TrackingFrame::new(
//!     Pose3d::identity(),
//!     CameraIntrinsics::ideal(500.0, 640, 480),
//!     Viewport::new(640.0, 480.0),
//! )
//! .with_plane(TrackedPlane::new(Point3::new(0.0, 0.0, 0.5), -Vector3::z()));
//!
//! let hit = frame.raycast(frame.viewport.center()).unwrap();
//! assert!((hit.z - 0.5).abs() < 1e-12);
//! ```

use nalgebra::{Point3, Vector3};
use sensor_types::{CameraIntrinsics, Pose3d};

/// A ray defined by an origin point and a direction vector.
///
/// The direction does not need to be normalized, but must be non-zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin of the ray.
    pub origin: Point3<f64>,
    /// The direction of the ray (not necessarily normalized).
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Creates a new ray with the given origin and direction.
    #[must_use]
    pub const fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    /// Returns the point `origin + t * direction`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }

    /// Ray parameter of the intersection with `plane`.
    ///
    /// Returns `None` when the ray is parallel to the plane or the plane
    /// lies behind the origin.
    ///
    /// ```
    /// use ar_measure::{Ray, TrackedPlane};
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), -Vector3::y());
    /// let floor = TrackedPlane::new(Point3::origin(), Vector3::y());
    /// assert_eq!(ray.intersect_plane(&floor), Some(1.0));
    /// ```
    #[must_use]
    pub fn intersect_plane(&self, plane: &TrackedPlane) -> Option<f64> {
        let denom = self.direction.dot(&plane.normal);
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let t = (plane.anchor - self.origin).dot(&plane.normal) / denom;
        (t > 0.0).then_some(t)
    }
}

/// A tracked plane, treated as infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPlane {
    /// Any point on the plane, in world coordinates.
    pub anchor: Point3<f64>,
    /// Plane normal (not necessarily normalized).
    pub normal: Vector3<f64>,
}

impl TrackedPlane {
    /// Creates a plane through `anchor` with the given normal.
    #[must_use]
    pub const fn new(anchor: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { anchor, normal }
    }

    /// A horizontal plane at height `y`.
    #[must_use]
    pub fn horizontal(y: f64) -> Self {
        Self::new(Point3::new(0.0, y, 0.0), Vector3::y())
    }
}

/// Size of the view in screen points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// The center of the view, where the ruler crosshair sits.
    #[must_use]
    pub fn center(&self) -> [f64; 2] {
        [self.width / 2.0, self.height / 2.0]
    }
}

/// Snapshot of plane tracking for one displayed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingFrame {
    /// Camera-to-world pose.
    pub camera: Pose3d,
    /// Camera intrinsics at their reference resolution.
    pub intrinsics: CameraIntrinsics,
    /// The view the screen points refer to.
    pub viewport: Viewport,
    /// Planes tracked so far.
    pub planes: Vec<TrackedPlane>,
}

impl TrackingFrame {
    /// Creates a frame with no tracked planes.
    #[must_use]
    pub const fn new(camera: Pose3d, intrinsics: CameraIntrinsics, viewport: Viewport) -> Self {
        Self {
            camera,
            intrinsics,
            viewport,
            planes: Vec::new(),
        }
    }

    /// Adds a tracked plane.
    #[must_use]
    pub fn with_plane(mut self, plane: TrackedPlane) -> Self {
        self.planes.push(plane);
        self
    }

    /// True once at least one plane is tracked.
    #[must_use]
    pub fn has_surface(&self) -> bool {
        !self.planes.is_empty()
    }

    /// World-space ray through a screen point.
    #[must_use]
    pub fn ray_through(&self, screen: [f64; 2]) -> Ray {
        let sx = f64::from(self.intrinsics.width) / self.viewport.width.max(f64::EPSILON);
        let sy = f64::from(self.intrinsics.height) / self.viewport.height.max(f64::EPSILON);
        let local = self.intrinsics.unproject([screen[0] * sx, screen[1] * sy]);
        let [dx, dy, dz] = self.camera.rotate_vector(local);
        let [ox, oy, oz] = self.camera.position;
        Ray::new(Point3::new(ox, oy, oz), Vector3::new(dx, dy, dz))
    }

    /// Nearest plane hit in front of the camera.
    #[must_use]
    pub fn raycast(&self, screen: [f64; 2]) -> Option<Point3<f64>> {
        let ray = self.ray_through(screen);
        self.planes
            .iter()
            .filter_map(|plane| ray.intersect_plane(plane))
            .min_by(f64::total_cmp)
            .map(|t| ray.point_at(t))
    }
}
