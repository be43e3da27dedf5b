//! Camera pose.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid pose: position in meters plus a unit quaternion `[w, x, y, z]`.
///
/// As a camera pose it maps camera space to world space; [`Pose3d::view_matrix`]
/// gives the inverse used by renderers and the texturing engine.
///
/// # Example
///
/// ```
/// use sensor_types::Pose3d;
///
/// let pose = Pose3d::from_translation([0.0, 1.5, 0.0]);
/// assert_eq!(pose.transform_point([0.0, 0.0, 0.0]), [0.0, 1.5, 0.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose3d {
    /// Position in meters: `[x, y, z]`.
    pub position: [f64; 3],
    /// Orientation as unit quaternion: `[w, x, y, z]`.
    pub orientation: [f64; 4],
}

impl Pose3d {
    /// Creates a pose from position and orientation.
    #[must_use]
    pub const fn new(position: [f64; 3], orientation: [f64; 4]) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The identity pose.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new([0.0; 3], [1.0, 0.0, 0.0, 0.0])
    }

    /// A pose with translation only.
    #[must_use]
    pub const fn from_translation(position: [f64; 3]) -> Self {
        Self::new(position, [1.0, 0.0, 0.0, 0.0])
    }

    /// Returns the pose with a unit quaternion, or `None` for a zero quaternion.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let [w, x, y, z] = self.orientation;
        let norm = w.mul_add(w, x.mul_add(x, y.mul_add(y, z * z))).sqrt();
        if norm < 1e-10 {
            return None;
        }
        Some(Self::new(
            self.position,
            [w / norm, x / norm, y / norm, z / norm],
        ))
    }

    /// Rotates a vector by the orientation.
    #[must_use]
    pub fn rotate_vector(&self, v: [f64; 3]) -> [f64; 3] {
        let [w, x, y, z] = self.orientation;
        let [vx, vy, vz] = v;
        // v' = v + 2w (q x v) + 2 q x (q x v)
        let cx = y.mul_add(vz, -(z * vy));
        let cy = z.mul_add(vx, -(x * vz));
        let cz = x.mul_add(vy, -(y * vx));
        let ccx = y.mul_add(cz, -(z * cy));
        let ccy = z.mul_add(cx, -(x * cz));
        let ccz = x.mul_add(cy, -(y * cx));
        [
            2.0f64.mul_add(w.mul_add(cx, ccx), vx),
            2.0f64.mul_add(w.mul_add(cy, ccy), vy),
            2.0f64.mul_add(w.mul_add(cz, ccz), vz),
        ]
    }

    /// Maps a point from the pose's local space into the parent space.
    #[must_use]
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let r = self.rotate_vector(p);
        [
            r[0] + self.position[0],
            r[1] + self.position[1],
            r[2] + self.position[2],
        ]
    }

    /// The inverse pose.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let [w, x, y, z] = self.orientation;
        let conj = Self::new([0.0; 3], [w, -x, -y, -z]);
        let t = conj.rotate_vector(self.position);
        Self::new([-t[0], -t[1], -t[2]], conj.orientation)
    }

    /// Homogeneous 4x4 matrix of this pose, row-major.
    #[must_use]
    pub fn to_matrix(&self) -> [[f64; 4]; 4] {
        let ex = self.rotate_vector([1.0, 0.0, 0.0]);
        let ey = self.rotate_vector([0.0, 1.0, 0.0]);
        let ez = self.rotate_vector([0.0, 0.0, 1.0]);
        let [tx, ty, tz] = self.position;
        [
            [ex[0], ey[0], ez[0], tx],
            [ex[1], ey[1], ez[1], ty],
            [ex[2], ey[2], ez[2], tz],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    /// World-to-camera matrix for a camera pose, row-major.
    #[must_use]
    pub fn view_matrix(&self) -> [[f64; 4]; 4] {
        self.inverse().to_matrix()
    }
}

impl Default for Pose3d {
    fn default() -> Self {
        Self::identity()
    }
}
