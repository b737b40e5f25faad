//! Animation data paths.
//!
//! Grammar:
//!   [pose.bones["<bone>"].]<property>
//!   [pose.bones["<bone>"].]constraints["<name>"].influence
//! where `<property>` is one of location, rotation_euler, rotation_quaternion,
//! rotation_axis_angle, scale. Paths live on the owning object's action, so
//! bone paths belong to the armature object.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::channels::TransformProperty;
use crate::error::DynParentError;

const BONE_PREFIX: &str = "pose.bones[\"";
const CONSTRAINT_PREFIX: &str = "constraints[\"";
const INFLUENCE_SUFFIX: &str = "\"].influence";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataPath {
    Transform {
        bone: Option<String>,
        property: TransformProperty,
    },
    Influence {
        bone: Option<String>,
        constraint: String,
    },
}

impl DataPath {
    pub fn bone(&self) -> Option<&str> {
        match self {
            DataPath::Transform { bone, .. } | DataPath::Influence { bone, .. } => bone.as_deref(),
        }
    }

    /// Constraint name for influence paths.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DataPath::Influence { constraint, .. } => Some(constraint),
            DataPath::Transform { .. } => None,
        }
    }

    /// True for influence paths of constraints whose name starts with `prefix`.
    pub fn is_tagged_influence(&self, prefix: &str) -> bool {
        self.constraint().is_some_and(|c| c.starts_with(prefix))
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        if s.is_empty() {
            return Err("empty data path".to_string());
        }
        let (bone, rest) = match s.strip_prefix(BONE_PREFIX) {
            Some(tail) => {
                let end = tail
                    .find("\"].")
                    .ok_or_else(|| format!("unterminated bone name in '{s}'"))?;
                let name = &tail[..end];
                if name.is_empty() {
                    return Err(format!("empty bone name in '{s}'"));
                }
                (Some(name.to_string()), &tail[end + 3..])
            }
            None => (None, s),
        };

        if let Some(tail) = rest.strip_prefix(CONSTRAINT_PREFIX) {
            let name = tail
                .strip_suffix(INFLUENCE_SUFFIX)
                .ok_or_else(|| format!("unsupported constraint property in '{s}'"))?;
            if name.is_empty() || name.contains('"') {
                return Err(format!("invalid constraint name in '{s}'"));
            }
            return Ok(DataPath::Influence {
                bone,
                constraint: name.to_string(),
            });
        }

        let property = TransformProperty::from_name(rest)
            .ok_or_else(|| format!("unknown property '{rest}' in '{s}'"))?;
        Ok(DataPath::Transform { bone, property })
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(bone) = self.bone() {
            write!(f, "{BONE_PREFIX}{bone}\"].")?;
        }
        match self {
            DataPath::Transform { property, .. } => f.write_str(property.as_str()),
            DataPath::Influence { constraint, .. } => {
                write!(f, "{CONSTRAINT_PREFIX}{constraint}{INFLUENCE_SUFFIX}")
            }
        }
    }
}

impl FromStr for DataPath {
    type Err = DynParentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataPath::parse(s).map_err(|reason| DynParentError::InvalidDataPath { reason })
    }
}

impl Serialize for DataPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DataPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DataPath::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_reports_invalid_paths() {
        let err = "pose.bones[\"A".parse::<DataPath>().unwrap_err();
        assert!(matches!(err, DynParentError::InvalidDataPath { .. }));
        assert_eq!(err.category(), "animation");
    }

    #[test]
    fn parses_object_and_bone_paths() {
        assert_eq!(
            DataPath::parse("location").unwrap(),
            DataPath::Transform {
                bone: None,
                property: TransformProperty::Location
            }
        );
        let p = DataPath::parse(r#"pose.bones["forearm.L"].rotation_quaternion"#).unwrap();
        assert_eq!(p.bone(), Some("forearm.L"));
        let c = DataPath::parse(r#"pose.bones["A"].constraints["DP_Rig_B"].influence"#).unwrap();
        assert_eq!(c.constraint(), Some("DP_Rig_B"));
        assert!(c.is_tagged_influence("DP_"));
        assert!(!c.is_tagged_influence("IK"));
    }

    #[test]
    fn display_roundtrips() {
        for s in [
            "scale",
            r#"constraints["DP_Empty"].influence"#,
            r#"pose.bones["spine.001"].rotation_euler"#,
            r#"pose.bones["B"].constraints["DP_Rig_C.001"].influence"#,
        ] {
            assert_eq!(DataPath::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(DataPath::parse("").is_err());
        assert!(DataPath::parse("location.x").is_err());
        assert!(DataPath::parse(r#"pose.bones["A"location"#).is_err());
        assert!(DataPath::parse(r#"constraints["X"].mute"#).is_err());
        assert!(DataPath::parse(r#"pose.bones[""].scale"#).is_err());
    }

    #[test]
    fn serde_as_string() {
        let p = DataPath::parse(r#"constraints["DP_A"].influence"#).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#""constraints[\"DP_A\"].influence""#);
        let back: DataPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
