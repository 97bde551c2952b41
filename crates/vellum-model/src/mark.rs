//! Inline formatting marks and mark-set algebra.
//!
//! A mark set is a plain sorted vector: canonical rank order, no duplicate
//! type+attrs pairs, at most one mark per mutually-excluding group. The set
//! operations never mutate their input; they hand back a fresh vector.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::schema::{Attrs, MarkType, Schema};

/// An inline annotation (emphasis, link, ...) attached to inline nodes.
#[derive(Clone)]
pub struct Mark {
    mark_type: MarkType,
    attrs: Arc<Attrs>,
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.mark_type == other.mark_type && self.attrs == other.attrs
    }
}

impl Eq for Mark {}

impl std::fmt::Debug for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mark({})", self.mark_type.name())
    }
}

impl Mark {
    pub(crate) fn new(mark_type: MarkType, attrs: Arc<Attrs>) -> Mark {
        Mark { mark_type, attrs }
    }

    pub fn mark_type(&self) -> &MarkType {
        &self.mark_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Add this mark to a set, keeping rank order and exclusion rules.
    /// Returns the input unchanged (as a copy) when the mark is already
    /// present or excluded by a member of the set.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.mark_type.excludes(&other.mark_type) {
                if copy.is_none() {
                    copy = Some(set[..i].to_vec());
                }
            } else if other.mark_type.excludes(&self.mark_type) {
                return set.to_vec();
            } else {
                if !placed && other.mark_type.rank() > self.mark_type.rank() {
                    let target = copy.get_or_insert_with(|| set[..i].to_vec());
                    target.push(self.clone());
                    placed = true;
                }
                if let Some(target) = &mut copy {
                    target.push(other.clone());
                }
            }
        }
        let mut result = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            result.push(self.clone());
        }
        result
    }

    /// Remove this mark from a set (by equality).
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }

    /// Structural equality of two whole sets.
    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a == b
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.mark_type.name().to_string()));
        if !self.attrs.is_empty() {
            obj.insert(
                "attrs".into(),
                Value::Object(self.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            );
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Mark, ModelError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ModelError::InvalidJson("mark must be an object".into()))?;
        let name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::InvalidJson("mark is missing its type".into()))?;
        let attrs = match obj.get("attrs") {
            Some(Value::Object(map)) => {
                Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Attrs>())
            }
            Some(_) => return Err(ModelError::InvalidJson("mark attrs must be an object".into())),
            None => None,
        };
        schema.mark(name, attrs.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic;

    fn em() -> Mark {
        basic::schema().mark("em", None).unwrap()
    }

    fn strong() -> Mark {
        basic::schema().mark("strong", None).unwrap()
    }

    fn code() -> Mark {
        basic::schema().mark("code", None).unwrap()
    }

    #[test]
    fn add_keeps_rank_order() {
        let set = strong().add_to_set(&[]);
        let set = em().add_to_set(&set);
        let names: Vec<&str> = set.iter().map(|m| m.mark_type().name()).collect();
        assert_eq!(names, ["em", "strong"]);
    }

    #[test]
    fn add_is_idempotent() {
        let set = em().add_to_set(&[]);
        let again = em().add_to_set(&set);
        assert!(Mark::same_set(&set, &again));
    }

    #[test]
    fn self_exclusion_replaces_same_type() {
        let schema = basic::schema();
        let a = schema
            .mark("link", Some(&crate::attrs! {"href" => "https://a.example"}))
            .unwrap();
        let b = schema
            .mark("link", Some(&crate::attrs! {"href" => "https://b.example"}))
            .unwrap();
        let set = a.add_to_set(&[]);
        let set = b.add_to_set(&set);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0], b);
    }

    #[test]
    fn remove_leaves_others() {
        let set = em().add_to_set(&strong().add_to_set(&code().add_to_set(&[])));
        let removed = strong().remove_from_set(&set);
        assert_eq!(removed.len(), 2);
        assert!(!strong().is_in_set(&removed));
        assert!(em().is_in_set(&removed));
    }
}
