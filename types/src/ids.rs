use std::fmt;

use uuid::Uuid;

/// Opaque identifier for a tracked task.
///
/// Generated once at `start` time and never reused within a process
/// lifetime. All registry operations reference tasks by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let ids: Vec<TaskId> = (0..64).map(|_| TaskId::generate()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn serde_transparent_roundtrip() {
        let id = TaskId::generate();
        let json = serde_json::to_string(&id).unwrap();
        // Transparent newtype: serializes as a bare uuid string.
        assert!(json.starts_with('"'));
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
