//! Outputs: stably indexed evaluation targets inside an animation resource.

use serde::{Deserialize, Serialize};

use crate::ids::OutputIndex;

/// A named target a binding selects. `stable_index` is the durable identity;
/// `name` is display only and may collide with other outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
    stable_index: OutputIndex,
    pub name: String,
    /// Two-letter kind tag of the data-block animated through this output ("OB", "CA", ...).
    #[serde(default)]
    pub id_type: Option<String>,
}

impl Output {
    pub(crate) fn new(stable_index: OutputIndex, name: String) -> Self {
        Self {
            stable_index,
            name,
            id_type: None,
        }
    }

    #[inline]
    pub fn stable_index(&self) -> OutputIndex {
        self.stable_index
    }

    /// Whether an owner of kind `id_type` may use this output.
    /// Untagged outputs accept any owner; tagged ones only their own kind.
    pub fn accepts(&self, id_type: Option<&str>) -> bool {
        match (self.id_type.as_deref(), id_type) {
            (None, _) => true,
            (Some(tag), Some(kind)) => tag == kind,
            (Some(_), None) => false,
        }
    }

    /// Name this output after the data-block it animates.
    ///
    /// Returns false (and leaves the output untouched) when the output is already
    /// tagged for a different kind of data-block.
    pub fn assign_id(&mut self, name: &str, id_type: &str) -> bool {
        if let Some(existing) = &self.id_type {
            if existing != id_type {
                return false;
            }
        }
        self.id_type = Some(id_type.to_string());
        self.name = name.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_id_sets_name_and_type() {
        let mut out = Output::new(OutputIndex(1), String::new());
        assert!(out.assign_id("Cube", "OB"));
        assert_eq!(out.name, "Cube");
        assert_eq!(out.id_type.as_deref(), Some("OB"));
        assert_eq!(out.stable_index(), OutputIndex(1));
    }

    #[test]
    fn assign_id_rejects_other_kind() {
        let mut out = Output::new(OutputIndex(3), String::new());
        assert!(out.assign_id("Cube", "OB"));
        assert!(!out.assign_id("Camera", "CA"));
        assert_eq!(out.name, "Cube");
    }

    #[test]
    fn tagged_output_accepts_only_its_kind() {
        let mut out = Output::new(OutputIndex(1), "Cube".into());
        assert!(out.accepts(None));
        assert!(out.accepts(Some("CA")));
        out.assign_id("Cube", "CA");
        assert!(out.accepts(Some("CA")));
        assert!(!out.accepts(Some("OB")));
        assert!(!out.accepts(None));
    }
}
