//! Transformable subjects: a free object or a bone of an armature object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::channels::TransformProperty;
use crate::datapath::DataPath;

/// A free object or a bone, addressed by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    Object { object: String },
    Bone { armature: String, bone: String },
}

impl Subject {
    pub fn object(name: impl Into<String>) -> Self {
        Subject::Object {
            object: name.into(),
        }
    }

    pub fn bone(armature: impl Into<String>, bone: impl Into<String>) -> Self {
        Subject::Bone {
            armature: armature.into(),
            bone: bone.into(),
        }
    }

    /// Object that owns the subject's constraint-free data and animation
    /// (the armature object for bones).
    pub fn owner_object(&self) -> &str {
        match self {
            Subject::Object { object } => object,
            Subject::Bone { armature, .. } => armature,
        }
    }

    pub fn bone_name(&self) -> Option<&str> {
        match self {
            Subject::Object { .. } => None,
            Subject::Bone { bone, .. } => Some(bone),
        }
    }

    pub fn is_bone(&self) -> bool {
        matches!(self, Subject::Bone { .. })
    }

    /// Armature the subject is posed in; `None` for free objects.
    pub fn owning_skeleton(&self) -> Option<&str> {
        match self {
            Subject::Object { .. } => None,
            Subject::Bone { armature, .. } => Some(armature),
        }
    }

    pub fn transform_path(&self, property: TransformProperty) -> DataPath {
        DataPath::Transform {
            bone: self.bone_name().map(str::to_string),
            property,
        }
    }

    pub fn influence_path(&self, constraint: &str) -> DataPath {
        DataPath::Influence {
            bone: self.bone_name().map(str::to_string),
            constraint: constraint.to_string(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Object { object } => f.write_str(object),
            Subject::Bone { armature, bone } => write!(f, "{armature}:{bone}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_kind_tag() {
        let s = Subject::bone("Rig", "hand.L");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "bone", "armature": "Rig", "bone": "hand.L"})
        );
        let back: Subject = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn bone_paths_are_scoped_to_pose_bone() {
        let s = Subject::bone("Rig", "A");
        assert_eq!(
            s.influence_path("DP_Rig_B").to_string(),
            r#"pose.bones["A"].constraints["DP_Rig_B"].influence"#
        );
        assert_eq!(Subject::object("Cube").owning_skeleton(), None);
        assert_eq!(s.owning_skeleton(), Some("Rig"));
    }
}
