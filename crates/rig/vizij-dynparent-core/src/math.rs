//! 4x4 matrix helpers shared by the evaluator, the offset solver and baking.
//!
//! Matrices are column-major `nalgebra::Matrix4<f32>` acting on column vectors,
//! so `a * b` applies `b` first.

use log::warn;
use nalgebra::{Matrix3, Matrix4, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::interp::{lerp_vec3, nlerp_quat};

pub type Mat4 = Matrix4<f32>;

pub const IDENTITY_ROT: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

fn identity_rot() -> [f32; 4] {
    IDENTITY_ROT
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

pub fn identity() -> Mat4 {
    Mat4::identity()
}

/// Translation / rotation / scale split of an affine matrix.
/// Rotation is a quaternion stored as (x, y, z, w).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trs {
    #[serde(default)]
    pub pos: [f32; 3],
    #[serde(default = "identity_rot")]
    pub rot: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            pos: [0.0; 3],
            rot: IDENTITY_ROT,
            scale: unit_scale(),
        }
    }
}

impl Trs {
    pub fn new(pos: [f32; 3], rot: [f32; 4], scale: [f32; 3]) -> Self {
        Self { pos, rot, scale }
    }

    pub fn from_translation(pos: [f32; 3]) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    /// Compose T * R * S.
    pub fn to_matrix(&self) -> Mat4 {
        compose(self.pos, quat_from_xyzw(self.rot), self.scale)
    }

    /// Split an affine matrix into TRS. Shear is dropped; a negative determinant
    /// is folded into the X scale.
    pub fn from_matrix(m: &Mat4) -> Self {
        let pos = [m[(0, 3)], m[(1, 3)], m[(2, 3)]];
        let basis: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let mut scale = [
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        ];
        if basis.determinant() < 0.0 {
            scale[0] = -scale[0];
        }
        let mut cols = [
            basis.column(0).into_owned(),
            basis.column(1).into_owned(),
            basis.column(2).into_owned(),
        ];
        for (col, s) in cols.iter_mut().zip(scale.iter()) {
            if s.abs() > f32::EPSILON {
                *col /= *s;
            }
        }
        let rot_m = Matrix3::from_columns(&cols);
        let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot_m));
        Self {
            pos,
            rot: quat_to_xyzw(&q),
            scale,
        }
    }
}

pub fn compose(pos: [f32; 3], rot: UnitQuaternion<f32>, scale: [f32; 3]) -> Mat4 {
    let t = Mat4::new_translation(&Vector3::from(pos));
    let r = rot.to_homogeneous();
    let s = Mat4::new_nonuniform_scaling(&Vector3::from(scale));
    t * r * s
}

/// Build a unit quaternion from (x, y, z, w); a zero quaternion maps to identity.
pub fn quat_from_xyzw(q: [f32; 4]) -> UnitQuaternion<f32> {
    let raw = Quaternion::new(q[3], q[0], q[1], q[2]);
    if raw.norm_squared() <= f32::EPSILON {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::from_quaternion(raw)
}

pub fn quat_to_xyzw(q: &UnitQuaternion<f32>) -> [f32; 4] {
    [q.i, q.j, q.k, q.w]
}

/// Inverse of `m`; singular matrices invert to identity.
pub fn invert(m: &Mat4) -> Mat4 {
    m.try_inverse().unwrap_or_else(|| {
        warn!("singular matrix in inverse; using identity");
        Mat4::identity()
    })
}

/// Blend two transforms by decomposing them: translation and scale lerp,
/// rotation nlerps along the shortest arc. `t` is clamped to [0,1].
pub fn blend(a: &Mat4, b: &Mat4, t: f32) -> Mat4 {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }
    let ta = Trs::from_matrix(a);
    let tb = Trs::from_matrix(b);
    Trs {
        pos: lerp_vec3(ta.pos, tb.pos, t),
        rot: nlerp_quat(ta.rot, tb.rot, t),
        scale: lerp_vec3(ta.scale, tb.scale, t),
    }
    .to_matrix()
}

/// Column-major flattening (16 floats), the layout used by the wasm adapter.
pub fn to_cols_array(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Largest absolute component difference between two matrices.
pub fn max_abs_diff(a: &Mat4, b: &Mat4) -> f32 {
    (a - b).iter().fold(0.0f32, |acc, v| acc.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_trs() -> Trs {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.7, 1.1);
        Trs::new([1.0, -2.0, 3.5], quat_to_xyzw(&q), [1.5, 0.5, 2.0])
    }

    #[test]
    fn trs_matrix_roundtrip_preserves_matrix() {
        let m = sample_trs().to_matrix();
        let back = Trs::from_matrix(&m).to_matrix();
        assert_relative_eq!(m, back, epsilon = 1e-5);
    }

    #[test]
    fn negative_determinant_folds_into_x_scale() {
        let trs = Trs::new([0.0; 3], IDENTITY_ROT, [-1.0, 1.0, 1.0]);
        let split = Trs::from_matrix(&trs.to_matrix());
        assert!(split.scale[0] < 0.0);
        assert_relative_eq!(split.to_matrix(), trs.to_matrix(), epsilon = 1e-6);
    }

    #[test]
    fn singular_inverse_falls_back_to_identity() {
        let zero = Mat4::zeros();
        assert_eq!(invert(&zero), Mat4::identity());
    }

    #[test]
    fn blend_endpoints_are_exact() {
        let a = Trs::from_translation([1.0, 0.0, 0.0]).to_matrix();
        let b = sample_trs().to_matrix();
        assert_eq!(blend(&a, &b, 0.0), a);
        assert_eq!(blend(&a, &b, 1.0), b);
        let mid = Trs::from_matrix(&blend(&a, &b, 0.5));
        assert_relative_eq!(mid.pos[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(mid.pos[2], 1.75, epsilon = 1e-5);
    }

    #[test]
    fn zero_quaternion_is_identity() {
        assert_eq!(quat_from_xyzw([0.0; 4]), UnitQuaternion::identity());
    }
}
