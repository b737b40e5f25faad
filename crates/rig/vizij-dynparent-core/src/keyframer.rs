//! Transition keyframer.
//!
//! Every influence switch is written as a pair of keys: `frame - 1` holds the
//! state before the switch and `frame` the state after it, on the subject's
//! transform channels and on the relationship's influence. The pair confines
//! interpolation to a single frame regardless of neighbouring keys.
//!
//! "Before" values come from the animation when a channel is already animated
//! (its value at `frame - 1`), otherwise from the current property.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::datapath::DataPath;
use crate::error::{DynParentError, Result};
use crate::scene::Scene;
use crate::subject::Subject;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Influence 0 -> 1 on a freshly created relationship.
    Activate,
    /// Influence 1 -> 0, re-applying the pose the relationship produced.
    Deactivate,
}

impl Transition {
    pub fn target_influence(self) -> f32 {
        match self {
            Transition::Activate => 1.0,
            Transition::Deactivate => 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Sample {
    /// Animated value at the key frame when available, else the property.
    Before,
    /// Current property value.
    Current,
}

/// Key the subject's transform channels (and the relationship's influence) around `frame`.
///
/// Deactivation captures the subject's evaluated matrix first and forces it back
/// onto the channels once influence is zero. That assumes no other active
/// relationship on the same stack changes the output afterwards.
pub fn record_transition(
    scene: &mut Scene,
    subject: &Subject,
    relationship: Option<&str>,
    transition: Transition,
    frame: i32,
    cfg: &Config,
) -> Result<()> {
    let before = frame - 1;
    debug!(
        "{subject}: {transition:?} {} at {before}/{frame}",
        relationship.unwrap_or("<none>")
    );
    match transition {
        Transition::Activate => {
            if let Some(name) = relationship {
                set_influence(scene, subject, name, 0.0)?;
            }
            key_state(scene, subject, relationship, before, Sample::Before, cfg)?;
            if let Some(name) = relationship {
                set_influence(scene, subject, name, transition.target_influence())?;
            }
            key_state(scene, subject, relationship, frame, Sample::Current, cfg)?;
        }
        Transition::Deactivate => {
            let captured = scene.local_matrix(subject)?;
            key_state(scene, subject, relationship, before, Sample::Before, cfg)?;
            if let Some(name) = relationship {
                set_influence(scene, subject, name, transition.target_influence())?;
            }
            scene.apply_local_matrix(subject, &captured)?;
            key_state(scene, subject, relationship, frame, Sample::Current, cfg)?;
        }
    }
    Ok(())
}

fn key_state(
    scene: &mut Scene,
    subject: &Subject,
    relationship: Option<&str>,
    frame: i32,
    sample: Sample,
    cfg: &Config,
) -> Result<()> {
    key_transforms(scene, subject, frame, sample, cfg)?;
    if let Some(name) = relationship {
        key_influence(scene, subject, name, frame, sample, cfg)?;
    }
    Ok(())
}

fn key_transforms(
    scene: &mut Scene,
    subject: &Subject,
    frame: i32,
    sample: Sample,
    cfg: &Config,
) -> Result<usize> {
    let channels = scene.channels(subject)?;
    let mut writes: Vec<(DataPath, usize, f32)> = Vec::new();
    for property in channels.keyed_properties() {
        let path = subject.transform_path(property);
        for (index, current) in channels.get(property).iter().enumerate() {
            writes.push((path.clone(), index, *current));
        }
    }
    let count = writes.len();
    for (path, index, current) in writes {
        let value = sampled(scene, subject, &path, index, frame, sample, current)?;
        scene.insert_keyframe(subject, &path, index, frame, value, cfg.interpolation)?;
    }
    Ok(count)
}

fn key_influence(
    scene: &mut Scene,
    subject: &Subject,
    relationship: &str,
    frame: i32,
    sample: Sample,
    cfg: &Config,
) -> Result<()> {
    let current = scene
        .constraints(subject)?
        .get(relationship)
        .map(|r| r.influence)
        .ok_or_else(|| constraint_not_found(subject, relationship))?;
    let path = subject.influence_path(relationship);
    let value = sampled(scene, subject, &path, 0, frame, sample, current)?;
    scene.insert_keyframe(subject, &path, 0, frame, value, cfg.interpolation)
}

fn sampled(
    scene: &Scene,
    subject: &Subject,
    path: &DataPath,
    index: usize,
    frame: i32,
    sample: Sample,
    current: f32,
) -> Result<f32> {
    Ok(match sample {
        Sample::Current => current,
        Sample::Before => scene
            .animated_value(subject, path, index, frame)?
            .unwrap_or(current),
    })
}

fn set_influence(scene: &mut Scene, subject: &Subject, name: &str, value: f32) -> Result<()> {
    let rel = scene
        .constraints_mut(subject)?
        .get_mut(name)
        .ok_or_else(|| constraint_not_found(subject, name))?;
    rel.influence = value;
    Ok(())
}

fn constraint_not_found(subject: &Subject, name: &str) -> DynParentError {
    DynParentError::ConstraintNotFound {
        owner: subject.to_string(),
        name: name.to_string(),
    }
}
