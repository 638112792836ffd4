use crate::relationships::parents_of;
use crate::{EntityKind, Validate};

/// A foreign-key value carried by a write model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub target: EntityKind,
    pub column: &'static str,
    pub id: i64,
}

/// A write model for one entity kind.
///
/// The gateway uses [`Record::references`] to check that every foreign key
/// resolves before the row is written.
pub trait Record: Validate {
    const KIND: EntityKind;

    /// Value of a foreign-key column, if this model has one by that name.
    fn column_value(&self, _column: &str) -> Option<i64> {
        None
    }

    fn references(&self) -> Vec<Reference> {
        parents_of(Self::KIND)
            .filter_map(|rel| {
                self.column_value(rel.column).map(|id| Reference {
                    target: rel.parent,
                    column: rel.column,
                    id,
                })
            })
            .collect()
    }
}
