//! Mode-scoped selection provider.

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;
use crate::scene::{InteractionMode, Scene};
use crate::subject::Subject;

/// Selected subjects split into the active one and the rest, in selection order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionSet {
    pub others: Vec<Subject>,
    pub active: Option<Subject>,
}

impl SelectionSet {
    /// Every subject, `others` first and the active one last.
    pub fn all(&self) -> Vec<Subject> {
        self.others.iter().chain(self.active.iter()).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.others.is_empty() && self.active.is_none()
    }

    /// The active subject as parent and the others as its children.
    pub fn parent_and_children(&self) -> Result<(&Subject, &[Subject]), SelectionError> {
        if self.is_empty() {
            return Err(SelectionError::NothingSelected);
        }
        let parent = self.active.as_ref().ok_or(SelectionError::NoActiveParent)?;
        if self.others.is_empty() {
            return Err(SelectionError::TooFewSelected);
        }
        Ok((parent, &self.others))
    }
}

fn in_mode(mode: InteractionMode, subject: &Subject) -> bool {
    match mode {
        InteractionMode::Object => !subject.is_bone(),
        InteractionMode::Pose => subject.is_bone(),
        InteractionMode::Edit => false,
    }
}

impl Scene {
    /// Selection scoped to the interaction mode: objects in object mode, bones
    /// in pose mode. Duplicates collapse to their first occurrence.
    pub fn selected_subjects(&self) -> Result<SelectionSet, SelectionError> {
        let mode = self.mode;
        if mode == InteractionMode::Edit {
            return Err(SelectionError::UnsupportedMode { mode });
        }
        let active = self
            .selection
            .active
            .as_ref()
            .filter(|s| in_mode(mode, s))
            .cloned();
        let mut others: Vec<Subject> = Vec::new();
        for subject in &self.selection.selected {
            if !in_mode(mode, subject) || active.as_ref() == Some(subject) || others.contains(subject)
            {
                continue;
            }
            others.push(subject.clone());
        }
        let set = SelectionSet { others, active };
        if set.is_empty() {
            return Err(SelectionError::NothingSelected);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Selection;

    fn scene_with(mode: InteractionMode, active: Option<Subject>, selected: Vec<Subject>) -> Scene {
        let mut scene = Scene::new();
        scene.mode = mode;
        scene.selection = Selection { active, selected };
        scene
    }

    #[test]
    fn object_mode_drops_bones() {
        let scene = scene_with(
            InteractionMode::Object,
            Some(Subject::object("Parent")),
            vec![
                Subject::object("Child"),
                Subject::bone("Rig", "hand"),
                Subject::object("Parent"),
                Subject::object("Child"),
            ],
        );
        let set = scene.selected_subjects().unwrap();
        assert_eq!(set.others, vec![Subject::object("Child")]);
        assert_eq!(set.active, Some(Subject::object("Parent")));
        let (parent, children) = set.parent_and_children().unwrap();
        assert_eq!(parent, &Subject::object("Parent"));
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn pose_mode_ignores_active_object() {
        let scene = scene_with(
            InteractionMode::Pose,
            Some(Subject::object("Rig")),
            vec![Subject::bone("Rig", "a"), Subject::bone("Rig", "b")],
        );
        let set = scene.selected_subjects().unwrap();
        assert_eq!(set.active, None);
        assert_eq!(set.all().len(), 2);
        assert_eq!(
            set.parent_and_children().unwrap_err(),
            SelectionError::NoActiveParent
        );
    }

    #[test]
    fn edit_mode_is_unsupported() {
        let scene = scene_with(InteractionMode::Edit, None, vec![Subject::object("A")]);
        assert_eq!(
            scene.selected_subjects().unwrap_err(),
            SelectionError::UnsupportedMode {
                mode: InteractionMode::Edit
            }
        );
    }

    #[test]
    fn single_subject_is_too_few_for_parenting() {
        let scene = scene_with(
            InteractionMode::Object,
            Some(Subject::object("A")),
            vec![Subject::object("A")],
        );
        let set = scene.selected_subjects().unwrap();
        assert_eq!(
            set.parent_and_children().unwrap_err(),
            SelectionError::TooFewSelected
        );
        let empty = scene_with(InteractionMode::Object, None, vec![]);
        assert_eq!(
            empty.selected_subjects().unwrap_err(),
            SelectionError::NothingSelected
        );
    }
}
