//! Offset-preserving parent relationships and the per-subject constraint stack.

use serde::{Deserialize, Serialize};

use crate::math::{identity, Mat4};
use crate::subject::Subject;

fn full_influence() -> f32 {
    1.0
}

/// A "child of" relationship: the owner follows `target` (or the bone
/// `subtarget` of the armature `target`) through a fixed inverse offset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    /// Target object (the armature object for bone targets).
    pub target: String,
    #[serde(default)]
    pub subtarget: Option<String>,
    /// Set once when the relationship is created; never re-solved.
    #[serde(default = "identity")]
    pub inverse_matrix: Mat4,
    #[serde(default = "full_influence")]
    pub influence: f32,
}

impl Relationship {
    /// Relationship following `parent`.
    pub fn following(name: impl Into<String>, parent: &Subject, inverse_matrix: Mat4) -> Self {
        let (target, subtarget) = match parent {
            Subject::Object { object } => (object.clone(), None),
            Subject::Bone { armature, bone } => (armature.clone(), Some(bone.clone())),
        };
        Self {
            name: name.into(),
            target,
            subtarget,
            inverse_matrix,
            influence: 0.0,
        }
    }

    pub fn target_subject(&self) -> Subject {
        match &self.subtarget {
            Some(bone) => Subject::bone(self.target.clone(), bone.clone()),
            None => Subject::object(self.target.clone()),
        }
    }

    pub fn is_managed(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
    }

    pub fn is_fully_on(&self) -> bool {
        (self.influence - 1.0).abs() <= f32::EPSILON
    }
}

/// Ordered constraint list; later entries are evaluated after earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintStack(Vec<Relationship>);

impl ConstraintStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.0.iter()
    }

    pub fn push(&mut self, relationship: Relationship) {
        self.0.push(relationship);
    }

    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.0.iter().find(|r| r.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Relationship> {
        self.0.iter_mut().find(|r| r.name == name)
    }

    /// The active managed relationship: the top of the stack, if it carries
    /// the tag prefix and is at full influence.
    pub fn active_managed(&self, prefix: &str) -> Option<&Relationship> {
        self.0
            .last()
            .filter(|r| r.is_managed(prefix) && r.is_fully_on())
    }

    pub fn managed<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Relationship> {
        self.0.iter().filter(move |r| r.is_managed(prefix))
    }

    /// `base`, or `base.001`, `base.002`, ... if the name is taken.
    pub fn unique_name(&self, base: &str) -> String {
        if self.get(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}.{n:03}"))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Remove every managed relationship; returns the removed ones in stack order.
    pub fn remove_managed(&mut self, prefix: &str) -> Vec<Relationship> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.0.drain(..).partition(|r| r.is_managed(prefix));
        self.0 = kept;
        removed
    }
}

impl<'a> IntoIterator for &'a ConstraintStack {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(name: &str, influence: f32) -> Relationship {
        Relationship {
            name: name.into(),
            target: "Parent".into(),
            subtarget: None,
            inverse_matrix: Mat4::identity(),
            influence,
        }
    }

    #[test]
    fn active_managed_is_top_of_stack_only() {
        let mut stack = ConstraintStack::new();
        assert!(stack.active_managed("DP_").is_none());
        stack.push(rel("DP_A", 1.0));
        assert_eq!(stack.active_managed("DP_").unwrap().name, "DP_A");
        stack.push(rel("Track", 1.0));
        assert!(stack.active_managed("DP_").is_none());
        stack.push(rel("DP_B", 0.0));
        assert!(stack.active_managed("DP_").is_none());
    }

    #[test]
    fn unique_name_appends_counter() {
        let mut stack = ConstraintStack::new();
        assert_eq!(stack.unique_name("DP_P"), "DP_P");
        stack.push(rel("DP_P", 0.0));
        assert_eq!(stack.unique_name("DP_P"), "DP_P.001");
        stack.push(rel("DP_P.001", 0.0));
        assert_eq!(stack.unique_name("DP_P"), "DP_P.002");
    }

    #[test]
    fn remove_managed_keeps_foreign_constraints_in_order() {
        let mut stack = ConstraintStack::new();
        stack.push(rel("Copy", 1.0));
        stack.push(rel("DP_A", 0.0));
        stack.push(rel("Limit", 1.0));
        stack.push(rel("DP_B", 1.0));
        let removed = stack.remove_managed("DP_");
        assert_eq!(removed.len(), 2);
        let names: Vec<_> = stack.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Copy", "Limit"]);
    }

    #[test]
    fn following_bone_sets_subtarget() {
        let r = Relationship::following("DP_Rig_hand", &Subject::bone("Rig", "hand"), identity());
        assert_eq!(r.target, "Rig");
        assert_eq!(r.subtarget.as_deref(), Some("hand"));
        assert_eq!(r.influence, 0.0);
        assert_eq!(r.target_subject(), Subject::bone("Rig", "hand"));
    }
}
