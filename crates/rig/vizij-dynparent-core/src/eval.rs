//! Constraint-stack evaluator for the scene document.
//!
//! Spaces:
//! - Objects are evaluated in world space: `world = basis`, then constraints.
//! - Bones are evaluated in armature space:
//!   `pose = parent_pose * parent_rest^-1 * rest * basis`, then constraints.
//!
//! A relationship maps the owner matrix `M` to `T * inverse * M`, blended with
//! `M` by influence. `T` is the target expressed for the owner:
//! - object target: the target's world matrix;
//! - bone target, object owner: armature world * bone pose;
//! - bone target, bone owner in the same armature: the target bone's pose;
//! - bone target, bone owner in another armature:
//!   owner_armature_world^-1 * target_armature_world * bone pose.
//!
//! Dependency cycles are broken by evaluating the re-entered subject without
//! its constraints.

use log::warn;

use crate::constraint::{ConstraintStack, Relationship};
use crate::error::Result;
use crate::math::{blend, invert, Mat4};
use crate::scene::Scene;
use crate::subject::Subject;

pub struct Evaluator<'a> {
    scene: &'a Scene,
    visiting: Vec<Subject>,
}

impl<'a> Evaluator<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self {
            scene,
            visiting: Vec::new(),
        }
    }

    pub fn world(&mut self, subject: &Subject) -> Result<Mat4> {
        match subject {
            Subject::Object { object } => self.object_world(object),
            Subject::Bone { armature, bone } => {
                let pose = self.bone_pose(armature, bone)?;
                Ok(self.object_world(armature)? * pose)
            }
        }
    }

    /// World matrix for objects, armature-space pose for bones.
    pub fn local(&mut self, subject: &Subject) -> Result<Mat4> {
        match subject {
            Subject::Object { object } => self.object_world(object),
            Subject::Bone { armature, bone } => self.bone_pose(armature, bone),
        }
    }

    pub fn object_world(&mut self, name: &str) -> Result<Mat4> {
        let scene = self.scene;
        let object = scene.object(name)?;
        let basis = object.channels.to_matrix();
        Ok(self.constrain(Subject::object(name), &object.constraints, basis))
    }

    /// Pose of the bone's parent chain with the bone's rest applied, i.e. the
    /// pose the bone would have with identity channels and no constraints.
    pub fn bone_parent_basis(&mut self, armature: &str, bone: &str) -> Result<Mat4> {
        let scene = self.scene;
        let b = scene.bone(armature, bone)?;
        let rest = b.rest.to_matrix();
        match &b.parent {
            Some(parent_name) => {
                let parent = scene.bone(armature, parent_name)?;
                let parent_pose = self.bone_pose(armature, parent_name)?;
                Ok(parent_pose * invert(&parent.rest.to_matrix()) * rest)
            }
            None => Ok(rest),
        }
    }

    pub fn bone_pose(&mut self, armature: &str, bone: &str) -> Result<Mat4> {
        let scene = self.scene;
        let b = scene.bone(armature, bone)?;
        let unconstrained = self.bone_parent_basis(armature, bone)? * b.channels.to_matrix();
        Ok(self.constrain(Subject::bone(armature, bone), &b.constraints, unconstrained))
    }

    fn constrain(&mut self, owner: Subject, stack: &ConstraintStack, mut m: Mat4) -> Mat4 {
        if stack.is_empty() {
            return m;
        }
        if self.visiting.contains(&owner) {
            warn!("dependency cycle through {owner}; evaluating it without constraints");
            return m;
        }
        self.visiting.push(owner.clone());
        for rel in stack {
            if rel.influence <= 0.0 {
                continue;
            }
            let target = match self.target_matrix(&owner, rel) {
                Ok(t) => t,
                Err(e) => {
                    warn!("{owner}: relationship {} skipped: {e}", rel.name);
                    continue;
                }
            };
            let result = target * rel.inverse_matrix * m;
            m = blend(&m, &result, rel.influence);
        }
        self.visiting.pop();
        m
    }

    fn target_matrix(&mut self, owner: &Subject, rel: &Relationship) -> Result<Mat4> {
        let Some(bone) = &rel.subtarget else {
            return self.object_world(&rel.target);
        };
        let pose = self.bone_pose(&rel.target, bone)?;
        match owner {
            Subject::Object { .. } => Ok(self.object_world(&rel.target)? * pose),
            Subject::Bone { armature, .. } if *armature == rel.target => Ok(pose),
            Subject::Bone { armature, .. } => {
                let owner_world = self.object_world(armature)?;
                let target_world = self.object_world(&rel.target)?;
                Ok(invert(&owner_world) * target_world * pose)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Relationship;
    use crate::math::{max_abs_diff, Trs};
    use crate::scene::{Armature, Bone, SceneObject};

    fn translated(x: f32, y: f32, z: f32) -> Mat4 {
        Trs::from_translation([x, y, z]).to_matrix()
    }

    #[test]
    fn bone_chain_follows_parent_pose() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("Rig").with_armature(Armature {
            bones: vec![
                Bone::new("root", None, Trs::default()),
                Bone::new("tip", Some("root"), Trs::from_translation([0.0, 2.0, 0.0])),
            ],
        }));
        scene.object_mut("Rig").unwrap().channels.location = [10.0, 0.0, 0.0];
        scene.bone_mut("Rig", "root").unwrap().channels.location = [1.0, 0.0, 0.0];

        let tip = Subject::bone("Rig", "tip");
        let pose = scene.local_matrix(&tip).unwrap();
        assert!(max_abs_diff(&pose, &translated(1.0, 2.0, 0.0)) < 1e-6);
        let world = scene.world_matrix(&tip).unwrap();
        assert!(max_abs_diff(&world, &translated(11.0, 2.0, 0.0)) < 1e-6);
    }

    #[test]
    fn relationship_blends_by_influence() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("Parent"));
        scene.add_object(SceneObject::new("Child"));
        scene.object_mut("Parent").unwrap().channels.location = [4.0, 0.0, 0.0];
        let mut rel =
            Relationship::following("DP_Parent", &Subject::object("Parent"), Mat4::identity());
        rel.influence = 0.5;
        scene.object_mut("Child").unwrap().constraints.push(rel);

        let world = scene.world_matrix(&Subject::object("Child")).unwrap();
        assert!(max_abs_diff(&world, &translated(2.0, 0.0, 0.0)) < 1e-5);
    }

    #[test]
    fn cycles_terminate() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("A"));
        scene.add_object(SceneObject::new("B"));
        let mut a_to_b = Relationship::following("DP_B", &Subject::object("B"), Mat4::identity());
        a_to_b.influence = 1.0;
        let mut b_to_a = Relationship::following("DP_A", &Subject::object("A"), Mat4::identity());
        b_to_a.influence = 1.0;
        scene.object_mut("A").unwrap().constraints.push(a_to_b);
        scene.object_mut("B").unwrap().constraints.push(b_to_a);
        scene.object_mut("B").unwrap().channels.location = [1.0, 0.0, 0.0];

        let world = scene.world_matrix(&Subject::object("A")).unwrap();
        assert!(world.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn missing_target_is_skipped() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("Child"));
        scene.object_mut("Child").unwrap().channels.location = [0.0, 3.0, 0.0];
        let mut rel =
            Relationship::following("DP_Gone", &Subject::object("Gone"), Mat4::identity());
        rel.influence = 1.0;
        scene.object_mut("Child").unwrap().constraints.push(rel);
        let world = scene.world_matrix(&Subject::object("Child")).unwrap();
        assert!(max_abs_diff(&world, &translated(0.0, 3.0, 0.0)) < 1e-6);
    }
}
