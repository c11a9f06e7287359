//! Declarative capability table for generated wrapper classes.
//!
//! Language runtimes layered on top of a binding want to know, per class,
//! whether it can be stringified, indexed, or must be initialized
//! asynchronously. Rather than probing generated classes at runtime, the
//! table is inferred from the binding's header declarations and then
//! overridden entry-wise from configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::definitions::DefinitionSet;

/// What a wrapper class supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Has a string-conversion method.
    #[serde(default)]
    pub to_string: bool,
    /// Has both `get` and `size` methods.
    #[serde(default)]
    pub indexable: bool,
    /// Implements asynchronous initialization.
    #[serde(default)]
    pub async_initable: bool,
}

/// Class name → capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityTable {
    classes: BTreeMap<String, Capabilities>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Infer capabilities from function declarations.
    ///
    /// A function's class is the type of its first parameter with qualifiers
    /// and pointers removed. `*_to_string` marks string conversion; `*_get`
    /// together with `*_size` on the same class marks indexability.
    pub fn infer(definitions: &DefinitionSet) -> Self {
        let mut methods: BTreeMap<String, BTreeSet<&'static str>> = BTreeMap::new();

        for def in definitions.iter() {
            let Some(class) = def.receiver.as_deref().and_then(class_name) else {
                continue;
            };
            let Some(method) = method_kind(&def.ident) else {
                continue;
            };
            methods.entry(class).or_default().insert(method);
        }

        let classes = methods
            .into_iter()
            .map(|(class, found)| {
                let caps = Capabilities {
                    to_string: found.contains("to_string"),
                    indexable: found.contains("get") && found.contains("size"),
                    async_initable: false,
                };
                (class, caps)
            })
            .filter(|(_, caps)| *caps != Capabilities::default())
            .collect();

        Self { classes }
    }

    /// Replace inferred entries with configured ones.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, Capabilities>) {
        for (class, caps) in overrides {
            self.classes.insert(class.clone(), *caps);
        }
    }

    /// Capabilities of `class`; unknown classes have none.
    pub fn get(&self, class: &str) -> Capabilities {
        self.classes.get(class).copied().unwrap_or_default()
    }

    pub fn has_to_string(&self, class: &str) -> bool {
        self.get(class).to_string
    }

    pub fn is_indexable(&self, class: &str) -> bool {
        self.get(class).indexable
    }

    pub fn is_async_initable(&self, class: &str) -> bool {
        self.get(class).async_initable
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Capabilities)> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Serialize for CapabilityTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.classes.serialize(serializer)
    }
}

/// `const GgitDiffLine *` → `GgitDiffLine`.
fn class_name(param_type: &str) -> Option<String> {
    let name = param_type
        .split(|c: char| c.is_whitespace() || c == '*')
        .filter(|token| !token.is_empty())
        .filter(|token| !matches!(*token, "const" | "volatile" | "struct" | "restrict"))
        .last()?;
    Some(name.to_string())
}

fn method_kind(ident: &str) -> Option<&'static str> {
    if ident.ends_with("_to_string") {
        Some("to_string")
    } else if ident.ends_with("_get") {
        Some("get")
    } else if ident.ends_with("_size") {
        Some("size")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::definitions::Definition;
    use std::path::PathBuf;

    fn method(ident: &str, receiver: &str) -> Definition {
        Definition {
            ident: ident.to_string(),
            display: format!("{}({})", ident, receiver),
            file: PathBuf::from("/src/ggit.h"),
            span: Span::default(),
            receiver: Some(receiver.to_string()),
        }
    }

    #[test]
    fn test_class_name_strips_qualifiers() {
        assert_eq!(class_name("const GgitOId *"), Some("GgitOId".to_string()));
        assert_eq!(class_name("struct git_tree*"), Some("git_tree".to_string()));
        assert_eq!(class_name("GgitIndexEntries"), Some("GgitIndexEntries".to_string()));
        assert_eq!(class_name(" * const "), None);
    }

    #[test]
    fn test_infer_from_declarations() {
        let defs: DefinitionSet = vec![
            method("ggit_oid_to_string", "const GgitOId *"),
            method("ggit_oid_equal", "GgitOId *"),
            method("ggit_index_entries_get", "GgitIndexEntries *"),
            method("ggit_index_entries_size", "GgitIndexEntries *"),
            method("ggit_tree_get", "GgitTree *"),
            method("ggit_blob_get_raw_content", "GgitBlob *"),
        ]
        .into_iter()
        .collect();

        let table = CapabilityTable::infer(&defs);

        assert!(table.has_to_string("GgitOId"));
        assert!(!table.is_indexable("GgitOId"));
        assert!(table.is_indexable("GgitIndexEntries"));
        // get without size is not enough.
        assert!(!table.is_indexable("GgitTree"));
        assert!(!table.has_to_string("GgitBlob"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_functions_without_receiver_are_ignored() {
        let mut free = method("ggit_init_to_string", "void");
        free.receiver = None;
        let table = CapabilityTable::infer(&vec![free].into_iter().collect());
        assert!(table.is_empty());
    }

    #[test]
    fn test_overrides_replace_entries() {
        let defs: DefinitionSet = vec![method("ggit_oid_to_string", "GgitOId *")]
            .into_iter()
            .collect();
        let mut table = CapabilityTable::infer(&defs);

        let mut overrides = BTreeMap::new();
        overrides.insert(
            "GgitRevisionWalker".to_string(),
            Capabilities {
                async_initable: true,
                ..Capabilities::default()
            },
        );
        overrides.insert("GgitOId".to_string(), Capabilities::default());
        table.apply_overrides(&overrides);

        assert!(table.is_async_initable("GgitRevisionWalker"));
        assert!(!table.has_to_string("GgitOId"));
        assert_eq!(table.get("Unknown"), Capabilities::default());
    }

    #[test]
    fn test_deserialize_partial_entry() {
        let caps: Capabilities = serde_yaml::from_str("async_initable: true").unwrap();
        assert!(caps.async_initable);
        assert!(!caps.to_string);
    }
}
