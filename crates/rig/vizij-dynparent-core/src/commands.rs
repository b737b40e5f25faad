//! The four user-facing commands: Create, Disable, Clear, Bake-and-clear.
//!
//! Every command reads the frame and selection from the scene when invoked,
//! validates all selected subjects before mutating anything, and reports how
//! many entities it affected. Per-entity "nothing to do" cases are skipped.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::baking::{BakeRequest, BakeService};
use crate::config::Config;
use crate::constraint::Relationship;
use crate::error::Result;
use crate::fcurve::FCurve;
use crate::keyframer::{record_transition, Transition};
use crate::scene::Scene;
use crate::solver::compute_inverse_offset;
use crate::subject::Subject;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Create,
    Disable,
    Clear,
    BakeAndClear,
}

/// Outcome reported back to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    pub command: Command,
    pub affected: usize,
    pub message: String,
}

impl CommandReport {
    fn new(command: Command, affected: usize) -> Self {
        let message = match command {
            Command::Create => format!("{affected} constraint(s) created."),
            Command::Disable => format!("{affected} constraint(s) disabled."),
            Command::Clear => format!("{affected} subject(s) cleared."),
            Command::BakeAndClear => format!("{affected} subject(s) baked."),
        };
        info!("{message}");
        Self {
            command,
            affected,
            message,
        }
    }
}

/// `<prefix><object>` for object parents, `<prefix><armature>_<bone>` for bones.
pub fn relationship_name(prefix: &str, parent: &Subject) -> String {
    match parent {
        Subject::Object { object } => format!("{prefix}{object}"),
        Subject::Bone { armature, bone } => format!("{prefix}{armature}_{bone}"),
    }
}

/// Names of the subject's managed relationships, in stack order.
pub fn managed_relationships(scene: &Scene, subject: &Subject, cfg: &Config) -> Result<Vec<String>> {
    Ok(scene
        .constraints(subject)?
        .managed(&cfg.tag_prefix)
        .map(|r| r.name.clone())
        .collect())
}

/// Parent every selected non-active subject to the active one at the current frame.
pub fn create(scene: &mut Scene, cfg: &Config) -> Result<CommandReport> {
    let selection = scene.selected_subjects()?;
    let (parent, children) = selection.parent_and_children()?;
    scene.validate(parent)?;
    for child in children {
        scene.validate(child)?;
    }
    let frame = scene.frame_current;
    let mut created = 0;
    for child in children {
        create_link(scene, parent, child, frame, cfg)?;
        created += 1;
    }
    Ok(CommandReport::new(Command::Create, created))
}

/// Supersede the child's active managed relationship (if any) with a new one
/// following `parent`, keyed to switch at `frame`. Returns the new relationship's name.
pub fn create_link(
    scene: &mut Scene,
    parent: &Subject,
    child: &Subject,
    frame: i32,
    cfg: &Config,
) -> Result<String> {
    disable_link(scene, child, frame, cfg)?;

    let inverse = compute_inverse_offset(scene, parent, child)?;
    let name = scene
        .constraints(child)?
        .unique_name(&relationship_name(&cfg.tag_prefix, parent));
    scene
        .constraints_mut(child)?
        .push(Relationship::following(name.clone(), parent, inverse));
    record_transition(scene, child, Some(&name), Transition::Activate, frame, cfg)?;
    debug!("{child}: now follows {parent} through {name} from frame {frame}");
    Ok(name)
}

/// Turn off the active managed relationship of every selected subject.
pub fn disable(scene: &mut Scene, cfg: &Config) -> Result<CommandReport> {
    let subjects = scene.selected_subjects()?.all();
    for subject in &subjects {
        scene.validate(subject)?;
    }
    let frame = scene.frame_current;
    let mut disabled = 0;
    for subject in &subjects {
        if disable_link(scene, subject, frame, cfg)? {
            disabled += 1;
        }
    }
    Ok(CommandReport::new(Command::Disable, disabled))
}

/// Deactivate the subject's active managed relationship at `frame`, keeping
/// its pose. Returns false when nothing was active.
pub fn disable_link(scene: &mut Scene, subject: &Subject, frame: i32, cfg: &Config) -> Result<bool> {
    let Some(active) = scene
        .constraints(subject)?
        .active_managed(&cfg.tag_prefix)
        .map(|r| r.name.clone())
    else {
        debug!("{subject}: no active managed relationship");
        return Ok(false);
    };
    record_transition(
        scene,
        subject,
        Some(&active),
        Transition::Deactivate,
        frame,
        cfg,
    )?;
    Ok(true)
}

/// Remove managed relationships and the keys they introduced from every selected subject.
pub fn clear(scene: &mut Scene, cfg: &Config) -> Result<CommandReport> {
    let subjects = scene.selected_subjects()?.all();
    for subject in &subjects {
        scene.validate(subject)?;
    }
    let mut cleared = 0;
    for subject in &subjects {
        if clear_subject(scene, subject, cfg)? {
            cleared += 1;
        }
    }
    Ok(CommandReport::new(Command::Clear, cleared))
}

/// Drop the subject's managed influence curves, the transform keys at the
/// frames those curves were keyed on, and its managed relationships.
/// Returns false when there was nothing to clear.
pub fn clear_subject(scene: &mut Scene, subject: &Subject, cfg: &Config) -> Result<bool> {
    let removed_curves = remove_influence_curves(scene, subject, cfg)?;
    let mut frames: Vec<i32> = removed_curves.iter().flat_map(|c| c.frames()).collect();
    frames.sort_unstable();
    frames.dedup();

    if !frames.is_empty() {
        let bone = subject.bone_name();
        if let Some(action) = scene.action_mut(subject)? {
            let mut emptied = Vec::new();
            for curve in action
                .fcurves
                .iter_mut()
                .filter(|c| c.data_path.constraint().is_none() && c.data_path.bone() == bone)
            {
                if curve.remove_frames(&frames) > 0 && curve.is_empty() {
                    emptied.push((curve.data_path.clone(), curve.array_index));
                }
            }
            action.remove_where(|c| {
                emptied
                    .iter()
                    .any(|(path, index)| *path == c.data_path && *index == c.array_index)
            });
        }
    }

    let removed = scene
        .constraints_mut(subject)?
        .remove_managed(&cfg.tag_prefix);
    if removed_curves.is_empty() && removed.is_empty() {
        debug!("{subject}: nothing to clear");
        return Ok(false);
    }
    debug!(
        "{subject}: cleared {} relationship(s), keys at {} frame(s)",
        removed.len(),
        frames.len()
    );
    Ok(true)
}

/// Bake the selected subjects over the scene frame range, then strip their
/// managed relationships.
pub fn bake_and_clear(
    scene: &mut Scene,
    cfg: &Config,
    baker: &mut dyn BakeService,
) -> Result<CommandReport> {
    let subjects = scene.selected_subjects()?.all();
    for subject in &subjects {
        scene.validate(subject)?;
    }
    let request = BakeRequest {
        frame_start: scene.frame_start,
        frame_end: scene.frame_end,
        step: cfg.bake_step,
        subjects,
        interpolation: cfg.interpolation,
    };
    let report = baker.bake(scene, &request)?;
    for subject in &request.subjects {
        strip_managed(scene, subject, cfg)?;
    }
    Ok(CommandReport::new(Command::BakeAndClear, report.subjects))
}

/// Remove the subject's managed relationships and their influence curves,
/// leaving transform animation untouched. Returns how many relationships went.
pub fn strip_managed(scene: &mut Scene, subject: &Subject, cfg: &Config) -> Result<usize> {
    remove_influence_curves(scene, subject, cfg)?;
    Ok(scene
        .constraints_mut(subject)?
        .remove_managed(&cfg.tag_prefix)
        .len())
}

fn remove_influence_curves(scene: &mut Scene, subject: &Subject, cfg: &Config) -> Result<Vec<FCurve>> {
    let bone = subject.bone_name();
    let prefix = cfg.tag_prefix.as_str();
    Ok(match scene.action_mut(subject)? {
        Some(action) => action
            .remove_where(|c| c.data_path.is_tagged_influence(prefix) && c.data_path.bone() == bone),
        None => Vec::new(),
    })
}
