//! Visual-transform baking: burn the evaluated pose of subjects into dense
//! transform keys so constraints can be removed without changing the motion.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{DynParentError, Result};
use crate::eval::Evaluator;
use crate::fcurve::Interpolation;
use crate::math::{invert, Mat4};
use crate::scene::Scene;
use crate::subject::Subject;

/// Frame window and subjects for one bake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakeRequest {
    pub frame_start: i32,
    /// Inclusive.
    pub frame_end: i32,
    pub step: u32,
    pub subjects: Vec<Subject>,
    pub interpolation: Interpolation,
}

impl BakeRequest {
    pub fn frames(&self) -> Result<Vec<i32>> {
        if self.step == 0 {
            return Err(DynParentError::Bake {
                reason: "bake step must be at least 1".to_string(),
            });
        }
        if self.frame_end < self.frame_start {
            return Err(DynParentError::Bake {
                reason: format!(
                    "empty frame range {}..={}",
                    self.frame_start, self.frame_end
                ),
            });
        }
        Ok((self.frame_start..=self.frame_end)
            .step_by(self.step as usize)
            .collect())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeReport {
    pub frames: usize,
    pub subjects: usize,
    pub keys_written: usize,
}

/// Host bake operator.
pub trait BakeService {
    fn bake(&mut self, scene: &mut Scene, request: &BakeRequest) -> Result<BakeReport>;
}

/// Samples every requested frame first, then writes the channel values that
/// reproduce each sampled pose without constraints. The scene is returned to
/// its original frame afterwards.
#[derive(Clone, Debug, Default)]
pub struct VisualKeyingBake;

impl VisualKeyingBake {
    pub fn new() -> Self {
        Self
    }

    /// Channel basis that yields the subject's evaluated pose once its
    /// constraints are gone.
    fn sample_basis(scene: &Scene, subject: &Subject) -> Result<Mat4> {
        let mut eval = Evaluator::new(scene);
        match subject {
            Subject::Object { object } => eval.object_world(object),
            Subject::Bone { armature, bone } => {
                let pose = eval.bone_pose(armature, bone)?;
                Ok(invert(&eval.bone_parent_basis(armature, bone)?) * pose)
            }
        }
    }
}

impl BakeService for VisualKeyingBake {
    fn bake(&mut self, scene: &mut Scene, request: &BakeRequest) -> Result<BakeReport> {
        let frames = request.frames()?;
        for subject in &request.subjects {
            scene.validate(subject)?;
        }
        let original_frame = scene.frame_current;

        let mut samples: Vec<(i32, Vec<Mat4>)> = Vec::with_capacity(frames.len());
        for &frame in &frames {
            scene.set_frame(frame);
            let per_subject = request
                .subjects
                .iter()
                .map(|s| Self::sample_basis(scene, s))
                .collect::<Result<Vec<_>>>()?;
            samples.push((frame, per_subject));
        }

        let mut keys_written = 0;
        for (frame, bases) in &samples {
            for (subject, basis) in request.subjects.iter().zip(bases) {
                let channels = scene.channels_mut(subject)?;
                channels.set_matrix(basis);
                let values: Vec<_> = channels
                    .keyed_properties()
                    .into_iter()
                    .map(|p| (subject.transform_path(p), channels.get(p).to_vec()))
                    .collect();
                for (path, components) in values {
                    for (index, value) in components.into_iter().enumerate() {
                        scene.insert_keyframe(
                            subject,
                            &path,
                            index,
                            *frame,
                            value,
                            request.interpolation,
                        )?;
                        keys_written += 1;
                    }
                }
            }
            debug!("baked frame {frame}");
        }

        scene.set_frame(original_frame);
        let report = BakeReport {
            frames: frames.len(),
            subjects: request.subjects.len(),
            keys_written,
        };
        info!(
            "baked {} subject(s) over {} frame(s), {} key(s)",
            report.subjects, report.frames, report.keys_written
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::max_abs_diff;
    use crate::scene::SceneObject;

    fn request(subjects: Vec<Subject>, start: i32, end: i32, step: u32) -> BakeRequest {
        BakeRequest {
            frame_start: start,
            frame_end: end,
            step,
            subjects,
            interpolation: Interpolation::Linear,
        }
    }

    #[test]
    fn frames_respect_step_and_reject_bad_ranges() {
        assert_eq!(request(vec![], 1, 7, 3).frames().unwrap(), vec![1, 4, 7]);
        assert!(request(vec![], 1, 7, 0).frames().is_err());
        assert!(request(vec![], 5, 1, 1).frames().is_err());
    }

    #[test]
    fn dense_keys_cover_every_frame() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("Cube"));
        scene.frame_current = 3;
        let cube = Subject::object("Cube");
        let mut baker = VisualKeyingBake::new();
        let report = baker
            .bake(&mut scene, &request(vec![cube.clone()], 1, 5, 1))
            .unwrap();
        assert_eq!(report.frames, 5);
        // location(3) + euler(3) + scale(3) per frame
        assert_eq!(report.keys_written, 45);
        assert_eq!(scene.frame_current, 3);
        let action = scene.action(&cube).unwrap().unwrap();
        assert_eq!(action.fcurves.len(), 9);
        assert!(action.fcurves.iter().all(|c| c.keyframes.len() == 5));
        let world = scene.world_matrix(&cube).unwrap();
        assert!(max_abs_diff(&world, &Mat4::identity()) < 1e-6);
    }
}
