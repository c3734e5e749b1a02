//! Identifier types.

use ulid::Ulid;

use crate::{typed_id, IdError};

typed_id!(
    /// Identifies a service, the unit an update is keyed by.
    ServiceId => "svc"
);

typed_id!(
    /// Identifies one task (a single instance of a service).
    TaskId => "task"
);

typed_id!(
    /// Identifies a cluster node.
    NodeId => "node"
);

#[doc(hidden)]
pub fn parse_prefixed(s: &str, expected: &'static str) -> Result<Ulid, IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }

    let (prefix, raw) = s.split_once('_').ok_or(IdError::MissingSeparator)?;
    if prefix != expected {
        return Err(IdError::WrongPrefix {
            expected,
            actual: prefix.to_string(),
        });
    }

    raw.parse::<Ulid>().map_err(|e| IdError::Ulid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_uses_prefix() {
        let id = TaskId::new();
        assert!(id.to_string().starts_with("task_"));
    }

    #[test]
    fn test_parse_rejects_other_kind() {
        let svc = ServiceId::new().to_string();
        let err = svc.parse::<TaskId>().unwrap_err();
        assert!(err.is_wrong_kind());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<NodeId>(), Err(IdError::Empty));
        assert_eq!("node".parse::<NodeId>(), Err(IdError::MissingSeparator));
        assert!(matches!(
            "node_not-a-ulid".parse::<NodeId>(),
            Err(IdError::Ulid(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let id = ServiceId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let back: ServiceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let wrong = format!("\"{}\"", TaskId::new());
        assert!(serde_json::from_str::<ServiceId>(&wrong).is_err());
    }

    proptest! {
        #[test]
        fn prop_parse_inverts_display(raw in any::<u128>()) {
            let id = TaskId::from_ulid(Ulid::from(raw));
            prop_assert_eq!(id.to_string().parse::<TaskId>(), Ok(id));
        }
    }
}
