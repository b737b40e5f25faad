//! Scene document: objects, armatures, constraint stacks, actions, and the
//! frame/mode/selection state commands read on every invocation.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::channels::ChannelSet;
use crate::constraint::ConstraintStack;
use crate::datapath::DataPath;
use crate::error::{DynParentError, Result};
use crate::eval::Evaluator;
use crate::fcurve::{Action, Interpolation};
use crate::math::{invert, Mat4, Trs};
use crate::subject::Subject;

/// A bone of an armature. `rest` is the bone's rest transform in armature space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub rest: Trs,
    #[serde(default)]
    pub channels: ChannelSet,
    #[serde(default)]
    pub constraints: ConstraintStack,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<&str>, rest: Trs) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            rest,
            channels: ChannelSet::default(),
            constraints: ConstraintStack::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    #[serde(default)]
    pub bones: Vec<Bone>,
}

impl Armature {
    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        self.bones.iter_mut().find(|b| b.name == name)
    }

    /// Every parent must exist and no parent chain may loop back on itself.
    pub fn validate_hierarchy(&self, armature: &str) -> Result<()> {
        let invalid = |reason: String| DynParentError::InvalidHierarchy {
            armature: armature.to_string(),
            reason,
        };
        for bone in &self.bones {
            let mut current = bone;
            let mut steps = 0;
            while let Some(parent) = &current.parent {
                current = self.bone(parent).ok_or_else(|| {
                    invalid(format!("bone {} has unknown parent {parent}", current.name))
                })?;
                steps += 1;
                if steps > self.bones.len() {
                    return Err(invalid(format!("parent cycle through bone {}", bone.name)));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default)]
    pub channels: ChannelSet,
    #[serde(default)]
    pub constraints: ConstraintStack,
    #[serde(default)]
    pub armature: Option<Armature>,
    /// Animation of the object and, for armatures, of its bones.
    #[serde(default)]
    pub action: Option<Action>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: ChannelSet::default(),
            constraints: ConstraintStack::default(),
            armature: None,
            action: None,
        }
    }

    pub fn with_channels(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_armature(mut self, armature: Armature) -> Self {
        self.armature = Some(armature);
        self
    }

    /// Property slot animated by (path, index), if it resolves on this object.
    fn animated_property_mut(&mut self, path: &DataPath, index: usize) -> Option<&mut f32> {
        match path {
            DataPath::Transform { bone: None, property } => {
                self.channels.get_mut(*property).get_mut(index)
            }
            DataPath::Transform {
                bone: Some(bone),
                property,
            } => self
                .armature
                .as_mut()?
                .bone_mut(bone)?
                .channels
                .get_mut(*property)
                .get_mut(index),
            DataPath::Influence { bone, constraint } => {
                let stack = match bone {
                    None => &mut self.constraints,
                    Some(bone) => &mut self.armature.as_mut()?.bone_mut(bone)?.constraints,
                };
                stack.get_mut(constraint).map(|r| &mut r.influence)
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    Object,
    Pose,
    Edit,
}

/// Raw selection state as the host stores it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub active: Option<Subject>,
    #[serde(default)]
    pub selected: Vec<Subject>,
}

fn default_frame_start() -> i32 {
    1
}

fn default_frame_end() -> i32 {
    250
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default = "default_frame_start")]
    pub frame_current: i32,
    #[serde(default = "default_frame_start")]
    pub frame_start: i32,
    #[serde(default = "default_frame_end")]
    pub frame_end: i32,
    #[serde(default)]
    pub mode: InteractionMode,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            frame_current: default_frame_start(),
            frame_start: default_frame_start(),
            frame_end: default_frame_end(),
            mode: InteractionMode::Object,
            selection: Selection::default(),
            objects: Vec::new(),
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a scene document, check its bone hierarchies, and apply its
    /// animation at `frame_current`.
    pub fn from_json(s: &str) -> Result<Self> {
        let mut scene: Scene = serde_json::from_str(s)?;
        for object in &scene.objects {
            if let Some(armature) = &object.armature {
                armature.validate_hierarchy(&object.name)?;
            }
        }
        scene.apply_animation();
        Ok(scene)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn add_object(&mut self, object: SceneObject) -> &mut SceneObject {
        self.objects.push(object);
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    pub fn object(&self, name: &str) -> Result<&SceneObject> {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| DynParentError::ObjectNotFound {
                name: name.to_string(),
            })
    }

    pub fn object_mut(&mut self, name: &str) -> Result<&mut SceneObject> {
        self.objects
            .iter_mut()
            .find(|o| o.name == name)
            .ok_or_else(|| DynParentError::ObjectNotFound {
                name: name.to_string(),
            })
    }

    pub fn armature(&self, name: &str) -> Result<&Armature> {
        self.object(name)?
            .armature
            .as_ref()
            .ok_or_else(|| DynParentError::NotAnArmature {
                name: name.to_string(),
            })
    }

    pub fn bone(&self, armature: &str, bone: &str) -> Result<&Bone> {
        self.armature(armature)?
            .bone(bone)
            .ok_or_else(|| bone_not_found(armature, bone))
    }

    pub fn bone_mut(&mut self, armature: &str, bone: &str) -> Result<&mut Bone> {
        self.object_mut(armature)?
            .armature
            .as_mut()
            .ok_or_else(|| DynParentError::NotAnArmature {
                name: armature.to_string(),
            })?
            .bone_mut(bone)
            .ok_or_else(|| bone_not_found(armature, bone))
    }

    /// Fails unless the subject resolves in this scene.
    pub fn validate(&self, subject: &Subject) -> Result<()> {
        match subject {
            Subject::Object { object } => self.object(object).map(|_| ()),
            Subject::Bone { armature, bone } => self.bone(armature, bone).map(|_| ()),
        }
    }

    pub fn channels(&self, subject: &Subject) -> Result<&ChannelSet> {
        match subject {
            Subject::Object { object } => Ok(&self.object(object)?.channels),
            Subject::Bone { armature, bone } => Ok(&self.bone(armature, bone)?.channels),
        }
    }

    pub fn channels_mut(&mut self, subject: &Subject) -> Result<&mut ChannelSet> {
        match subject {
            Subject::Object { object } => Ok(&mut self.object_mut(object)?.channels),
            Subject::Bone { armature, bone } => Ok(&mut self.bone_mut(armature, bone)?.channels),
        }
    }

    pub fn constraints(&self, subject: &Subject) -> Result<&ConstraintStack> {
        match subject {
            Subject::Object { object } => Ok(&self.object(object)?.constraints),
            Subject::Bone { armature, bone } => Ok(&self.bone(armature, bone)?.constraints),
        }
    }

    pub fn constraints_mut(&mut self, subject: &Subject) -> Result<&mut ConstraintStack> {
        match subject {
            Subject::Object { object } => Ok(&mut self.object_mut(object)?.constraints),
            Subject::Bone { armature, bone } => {
                Ok(&mut self.bone_mut(armature, bone)?.constraints)
            }
        }
    }

    /// Action holding the subject's curves (the armature's action for bones).
    pub fn action(&self, subject: &Subject) -> Result<Option<&Action>> {
        Ok(self.object(subject.owner_object())?.action.as_ref())
    }

    pub fn action_mut(&mut self, subject: &Subject) -> Result<Option<&mut Action>> {
        Ok(self.object_mut(subject.owner_object())?.action.as_mut())
    }

    /// Insert a key on the subject owner's action, creating action and curve lazily.
    pub fn insert_keyframe(
        &mut self,
        subject: &Subject,
        path: &DataPath,
        array_index: usize,
        frame: i32,
        value: f32,
        interpolation: Interpolation,
    ) -> Result<()> {
        let owner = self.object_mut(subject.owner_object())?;
        owner
            .action
            .get_or_insert_with(Action::new)
            .ensure(path, array_index)
            .insert(frame, value, interpolation);
        Ok(())
    }

    /// Value the animation produces for (path, index) at `frame`, if that channel is animated.
    pub fn animated_value(
        &self,
        subject: &Subject,
        path: &DataPath,
        array_index: usize,
        frame: i32,
    ) -> Result<Option<f32>> {
        Ok(self
            .action(subject)?
            .and_then(|a| a.find(path, array_index))
            .and_then(|c| c.evaluate(frame as f32)))
    }

    /// Move to `frame` and re-read every animated property.
    pub fn set_frame(&mut self, frame: i32) {
        self.frame_current = frame;
        self.apply_animation();
    }

    /// Write animated values at `frame_current` into their properties.
    pub fn apply_animation(&mut self) {
        let frame = self.frame_current as f32;
        for object in &mut self.objects {
            let Some(action) = &object.action else {
                continue;
            };
            let samples: Vec<(DataPath, usize, f32)> = action
                .fcurves
                .iter()
                .filter_map(|c| {
                    c.evaluate(frame)
                        .map(|v| (c.data_path.clone(), c.array_index, v))
                })
                .collect();
            for (path, index, value) in samples {
                let is_influence = matches!(path, DataPath::Influence { .. });
                match object.animated_property_mut(&path, index) {
                    Some(slot) if is_influence => *slot = value.clamp(0.0, 1.0),
                    Some(slot) => *slot = value,
                    None => warn!(
                        "fcurve {path}[{index}] on {} does not resolve; skipped",
                        object.name
                    ),
                }
            }
        }
    }

    /// Evaluated world matrix (constraints applied).
    pub fn world_matrix(&self, subject: &Subject) -> Result<Mat4> {
        Evaluator::new(self).world(subject)
    }

    /// Evaluated local matrix: world for objects, armature-space pose for bones.
    pub fn local_matrix(&self, subject: &Subject) -> Result<Mat4> {
        Evaluator::new(self).local(subject)
    }

    /// Armature a bone subject is posed in; `None` for free objects.
    pub fn owning_skeleton<'s>(&self, subject: &'s Subject) -> Option<&'s str> {
        subject.owning_skeleton()
    }

    /// Data paths keyed for the subject: location, active rotation, scale.
    pub fn transform_channel_paths(&self, subject: &Subject) -> Result<Vec<DataPath>> {
        Ok(self
            .channels(subject)?
            .keyed_properties()
            .into_iter()
            .map(|p| subject.transform_path(p))
            .collect())
    }

    /// Force the subject's channels so its unconstrained local matrix equals `m`
    /// (world for objects, armature-space pose for bones).
    pub fn apply_local_matrix(&mut self, subject: &Subject, m: &Mat4) -> Result<()> {
        let basis = match subject {
            Subject::Object { .. } => *m,
            Subject::Bone { armature, bone } => {
                let parent = Evaluator::new(self).bone_parent_basis(armature, bone)?;
                invert(&parent) * m
            }
        };
        self.channels_mut(subject)?.set_matrix(&basis);
        Ok(())
    }
}

fn bone_not_found(armature: &str, bone: &str) -> DynParentError {
    DynParentError::BoneNotFound {
        armature: armature.to_string(),
        bone: bone.to_string(),
    }
}
