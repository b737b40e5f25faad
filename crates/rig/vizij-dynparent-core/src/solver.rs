//! Offset solver: the inverse matrix stored on a new relationship so that the
//! child's pose is unchanged at the instant the relationship reaches full influence.
//!
//! The evaluator applies `T * inverse * M`, where `T` is the parent as seen from
//! the child (see `eval`). Solving `inverse = T^-1` against the current pose makes
//! the product collapse to `M` at creation; afterwards parent motion moves the
//! child through the fixed offset.

use crate::error::Result;
use crate::eval::Evaluator;
use crate::math::{invert, Mat4};
use crate::scene::Scene;
use crate::subject::Subject;

/// Inverse offset for `child` following `parent`, from the scene's current pose.
pub fn compute_inverse_offset(scene: &Scene, parent: &Subject, child: &Subject) -> Result<Mat4> {
    let mut eval = Evaluator::new(scene);
    match parent {
        Subject::Object { object } => Ok(invert(&eval.object_world(object)?)),
        Subject::Bone { armature, bone } => {
            let pose = eval.bone_pose(armature, bone)?;
            let candidate = match child {
                // Same armature: both poses already live in armature space.
                Subject::Bone {
                    armature: child_armature,
                    ..
                } if child_armature == armature => pose,
                Subject::Bone {
                    armature: child_armature,
                    ..
                } => {
                    let child_world = eval.object_world(child_armature)?;
                    invert(&child_world) * eval.object_world(armature)? * pose
                }
                Subject::Object { .. } => eval.object_world(armature)? * pose,
            };
            Ok(invert(&candidate))
        }
    }
}
