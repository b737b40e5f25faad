//! Local transform channels (location / rotation / scale) of an object or bone.

use std::f32::consts::TAU;

use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::interp::dot4;
use crate::math::{compose, quat_from_xyzw, quat_to_xyzw, Mat4, Trs, IDENTITY_ROT};

/// Which rotation representation drives the channel set (and gets keyed).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// XYZ Euler angles in radians.
    #[default]
    Euler,
    Quaternion,
    AxisAngle,
}

impl RotationMode {
    pub fn property(self) -> TransformProperty {
        match self {
            RotationMode::Euler => TransformProperty::RotationEuler,
            RotationMode::Quaternion => TransformProperty::RotationQuaternion,
            RotationMode::AxisAngle => TransformProperty::RotationAxisAngle,
        }
    }
}

/// Animatable transform property names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformProperty {
    Location,
    RotationEuler,
    RotationQuaternion,
    RotationAxisAngle,
    Scale,
}

impl TransformProperty {
    pub const ALL: [TransformProperty; 5] = [
        TransformProperty::Location,
        TransformProperty::RotationEuler,
        TransformProperty::RotationQuaternion,
        TransformProperty::RotationAxisAngle,
        TransformProperty::Scale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransformProperty::Location => "location",
            TransformProperty::RotationEuler => "rotation_euler",
            TransformProperty::RotationQuaternion => "rotation_quaternion",
            TransformProperty::RotationAxisAngle => "rotation_axis_angle",
            TransformProperty::Scale => "scale",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Number of array components.
    pub fn component_count(self) -> usize {
        match self {
            TransformProperty::Location
            | TransformProperty::RotationEuler
            | TransformProperty::Scale => 3,
            TransformProperty::RotationQuaternion | TransformProperty::RotationAxisAngle => 4,
        }
    }
}

/// Local transform channels.
///
/// `rotation_quaternion` is (x, y, z, w); `rotation_axis_angle` is
/// (axis x, axis y, axis z, angle).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSet {
    pub location: [f32; 3],
    pub rotation_mode: RotationMode,
    pub rotation_euler: [f32; 3],
    pub rotation_quaternion: [f32; 4],
    pub rotation_axis_angle: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation_mode: RotationMode::Euler,
            rotation_euler: [0.0; 3],
            rotation_quaternion: IDENTITY_ROT,
            rotation_axis_angle: [0.0, 1.0, 0.0, 0.0],
            scale: [1.0; 3],
        }
    }
}

impl ChannelSet {
    /// Properties keyed for this channel set: location, the active rotation, scale.
    pub fn keyed_properties(&self) -> [TransformProperty; 3] {
        [
            TransformProperty::Location,
            self.rotation_mode.property(),
            TransformProperty::Scale,
        ]
    }

    pub fn get(&self, property: TransformProperty) -> &[f32] {
        match property {
            TransformProperty::Location => &self.location,
            TransformProperty::RotationEuler => &self.rotation_euler,
            TransformProperty::RotationQuaternion => &self.rotation_quaternion,
            TransformProperty::RotationAxisAngle => &self.rotation_axis_angle,
            TransformProperty::Scale => &self.scale,
        }
    }

    pub fn get_mut(&mut self, property: TransformProperty) -> &mut [f32] {
        match property {
            TransformProperty::Location => &mut self.location,
            TransformProperty::RotationEuler => &mut self.rotation_euler,
            TransformProperty::RotationQuaternion => &mut self.rotation_quaternion,
            TransformProperty::RotationAxisAngle => &mut self.rotation_axis_angle,
            TransformProperty::Scale => &mut self.scale,
        }
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        match self.rotation_mode {
            RotationMode::Euler => {
                let [x, y, z] = self.rotation_euler;
                UnitQuaternion::from_euler_angles(x, y, z)
            }
            RotationMode::Quaternion => quat_from_xyzw(self.rotation_quaternion),
            RotationMode::AxisAngle => {
                let [x, y, z, angle] = self.rotation_axis_angle;
                let axis = Vector3::new(x, y, z);
                if axis.norm_squared() <= f32::EPSILON {
                    return UnitQuaternion::identity();
                }
                UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), angle)
            }
        }
    }

    /// Basis matrix T * R * S.
    pub fn to_matrix(&self) -> Mat4 {
        compose(self.location, self.rotation(), self.scale)
    }

    /// Overwrite the channels so that `to_matrix()` reproduces `m`.
    /// Only the active rotation representation is written.
    pub fn set_matrix(&mut self, m: &Mat4) {
        let trs = Trs::from_matrix(m);
        self.location = trs.pos;
        self.scale = trs.scale;
        let q = quat_from_xyzw(trs.rot);
        match self.rotation_mode {
            RotationMode::Euler => {
                let (x, y, z) = q.euler_angles();
                let [px, py, pz] = self.rotation_euler;
                self.rotation_euler = [
                    compatible_angle(x, px),
                    compatible_angle(y, py),
                    compatible_angle(z, pz),
                ];
            }
            RotationMode::Quaternion => {
                let mut next = quat_to_xyzw(&q);
                // keep sign continuity with the previous value so keyed curves do not flip
                if dot4(next, self.rotation_quaternion) < 0.0 {
                    next = [-next[0], -next[1], -next[2], -next[3]];
                }
                self.rotation_quaternion = next;
            }
            RotationMode::AxisAngle => {
                self.rotation_axis_angle = match q.axis_angle() {
                    Some((axis, angle)) => [axis.x, axis.y, axis.z, angle],
                    None => [0.0, 1.0, 0.0, 0.0],
                };
            }
        }
    }
}

/// `angle` shifted by whole turns to lie closest to `previous`, so forced
/// Euler channels do not jump by 2π against their neighbouring keys.
fn compatible_angle(angle: f32, previous: f32) -> f32 {
    let turns = ((previous - angle) / TAU).round();
    angle + turns * TAU
}
