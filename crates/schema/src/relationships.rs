//! Foreign-key relationships and their delete policies.
//!
//! The gateway's delete path walks [`RELATIONSHIPS`] instead of carrying
//! per-entity delete logic, and the create/update path uses the same table to
//! find which columns of a write model must resolve to an existing row.

use crate::EntityKind;

/// What happens to dependents when their parent row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Dependents are deleted together with the parent.
    Cascade,
    /// The delete is rejected while any dependent exists.
    Restrict,
}

impl DeletePolicy {
    /// SQL `ON DELETE` clause for this policy.
    pub fn sql(&self) -> &'static str {
        match self {
            DeletePolicy::Cascade => "CASCADE",
            DeletePolicy::Restrict => "RESTRICT",
        }
    }
}

/// A foreign key from `child.column` to `parent.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub parent: EntityKind,
    pub child: EntityKind,
    pub column: &'static str,
    pub policy: DeletePolicy,
}

pub const RELATIONSHIPS: &[Relationship] = &[
    Relationship {
        parent: EntityKind::Item,
        child: EntityKind::Menu,
        column: "item_id",
        policy: DeletePolicy::Restrict,
    },
    Relationship {
        parent: EntityKind::Customer,
        child: EntityKind::Order,
        column: "customer_id",
        policy: DeletePolicy::Restrict,
    },
    Relationship {
        parent: EntityKind::Order,
        child: EntityKind::OrderDetail,
        column: "order_id",
        policy: DeletePolicy::Cascade,
    },
    Relationship {
        parent: EntityKind::Customer,
        child: EntityKind::OrderDetail,
        column: "customer_id",
        policy: DeletePolicy::Restrict,
    },
    Relationship {
        parent: EntityKind::Item,
        child: EntityKind::OrderDetail,
        column: "item_id",
        policy: DeletePolicy::Restrict,
    },
];

/// Relationships in which `parent` is the referenced side.
pub fn dependents_of(parent: EntityKind) -> impl Iterator<Item = &'static Relationship> {
    RELATIONSHIPS.iter().filter(move |r| r.parent == parent)
}

/// Relationships in which `child` holds the foreign key.
pub fn parents_of(child: EntityKind) -> impl Iterator<Item = &'static Relationship> {
    RELATIONSHIPS.iter().filter(move |r| r.child == child)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_details_cascade_from_order_only() {
        let cascades: Vec<_> = RELATIONSHIPS
            .iter()
            .filter(|r| r.policy == DeletePolicy::Cascade)
            .collect();
        assert_eq!(cascades.len(), 1);
        assert_eq!(cascades[0].parent, EntityKind::Order);
        assert_eq!(cascades[0].child, EntityKind::OrderDetail);
    }

    #[test]
    fn shared_reference_data_is_restricted() {
        for parent in [EntityKind::Customer, EntityKind::Item] {
            assert!(dependents_of(parent).all(|r| r.policy == DeletePolicy::Restrict));
        }
        assert_eq!(dependents_of(EntityKind::Customer).count(), 2);
        assert_eq!(dependents_of(EntityKind::Item).count(), 2);
    }

    #[test]
    fn migration_constraints_match_relationships() {
        let migration = include_str!("../../../migrations/001_create_store_tables.sql");
        for rel in RELATIONSHIPS {
            let header = format!("CREATE TABLE IF NOT EXISTS {} (", rel.child.table());
            let start = migration
                .find(&header)
                .unwrap_or_else(|| panic!("no table for {}", rel.child));
            let body = &migration[start..];
            let body = &body[..body.find(");").unwrap()];
            let clause = format!(
                "{} BIGINT NOT NULL REFERENCES {} (id) ON DELETE {}",
                rel.column,
                rel.parent.table(),
                rel.policy.sql()
            );
            assert!(body.contains(&clause), "missing `{clause}`");
        }
    }

    #[test]
    fn order_detail_has_three_parents() {
        let parents: Vec<_> = parents_of(EntityKind::OrderDetail)
            .map(|r| r.parent)
            .collect();
        assert_eq!(
            parents,
            vec![EntityKind::Order, EntityKind::Customer, EntityKind::Item]
        );
        assert_eq!(dependents_of(EntityKind::OrderDetail).count(), 0);
    }
}
