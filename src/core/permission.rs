// =============================================================================
// PERMISSION — Drapeaux de capacité et résolution sur l'arbre des groupes
// =============================================================================
//
// Une PermissionDefinition attache quatre drapeaux indépendants
// {read, write, delete, administration} à un couple (sujet, groupe).
// Le sujet est une Classe, une Association ou un Objet.
//
// Pas de refus explicite : une permission absente vaut `false`, et les
// permissions s'ADDITIONNENT (OU logique, drapeau par drapeau).
//
// SENS DE PROPAGATION :
//
//   public            ← permission accordée ici...
//     └── admin       ← ...vaut aussi pour les membres d'admin
//           └── ops   ← ...et pour ceux d'ops
//
//   Un utilisateur membre de `ops` hérite des permissions de `admin` et de
//   `public`. Un membre de `public` n'hérite RIEN de `admin`.
//
// L'ensemble des groupes effectifs est donc l'union des arbres
// généalogiques (racine → groupe) des groupes directement assignés.
// Le résultat ne dépend pas de l'ordre de parcours : le OU est commutatif
// et associatif.
//
// =============================================================================

use std::collections::BTreeSet;
use std::fmt;

use super::hierarchy::family_tree;
use super::metamodel::{AssociationId, ClassId, Group, GroupId};
use super::object::ObjectId;
use crate::error::MetaResult;

/// Les quatre capacités.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionFlags {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub administration: bool,
}

impl PermissionFlags {
    pub fn new(read: bool, write: bool, delete: bool, administration: bool) -> Self {
        PermissionFlags {
            read,
            write,
            delete,
            administration,
        }
    }

    /// Toutes les capacités
    pub fn all() -> Self {
        PermissionFlags::new(true, true, true, true)
    }

    /// OU logique, drapeau par drapeau
    pub fn union(self, other: PermissionFlags) -> Self {
        PermissionFlags {
            read: self.read || other.read,
            write: self.write || other.write,
            delete: self.delete || other.delete,
            administration: self.administration || other.administration,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.read || self.write || self.delete || self.administration)
    }
}

impl fmt::Display for PermissionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.read, 'r'),
            flag(self.write, 'w'),
            flag(self.delete, 'd'),
            flag(self.administration, 'a'),
        )
    }
}

/// Ce sur quoi porte une permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Class(ClassId),
    Association(AssociationId),
    Object(ObjectId),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Class(id) => write!(f, "class {}", id),
            Subject::Association(id) => write!(f, "association {}", id),
            Subject::Object(id) => write!(f, "object {}", id),
        }
    }
}

/// Une permission accordée : au plus une par (sujet, groupe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDefinition<S> {
    pub subject: S,
    pub group_id: GroupId,
    pub flags: PermissionFlags,
}

impl<S> PermissionDefinition<S> {
    pub fn new(subject: S, group_id: GroupId, flags: PermissionFlags) -> Self {
        PermissionDefinition {
            subject,
            group_id,
            flags,
        }
    }
}

/// Groupes dont les permissions s'appliquent à un utilisateur.
///
/// `assigned` : groupes auxquels l'utilisateur est directement assigné.
/// `lookup` : résolution d'un groupe par id (cache puis stockage).
pub fn effective_groups<F>(assigned: &[Group], mut lookup: F) -> MetaResult<BTreeSet<GroupId>>
where
    F: FnMut(GroupId) -> MetaResult<Group>,
{
    let mut closure = BTreeSet::new();
    for group in assigned {
        // Un ancêtre déjà vu implique que toute sa lignée l'est aussi
        if closure.contains(&group.id) {
            continue;
        }
        for ancestor in family_tree(group, &mut lookup)? {
            closure.insert(ancestor.id);
        }
    }
    Ok(closure)
}

/// Combine les permissions collectées. Aucune permission → tout à `false`.
pub fn combine<I>(grants: I) -> PermissionFlags
where
    I: IntoIterator<Item = PermissionFlags>,
{
    grants
        .into_iter()
        .fold(PermissionFlags::default(), PermissionFlags::union)
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EntityKind, MetaError};
    use std::collections::HashMap;

    /// public → admin → ops, et un arbre séparé guests
    fn groups() -> HashMap<GroupId, Group> {
        HashMap::from([
            (GroupId(1), Group::new(GroupId(1), "public", None)),
            (GroupId(2), Group::new(GroupId(2), "admin", Some(GroupId(1)))),
            (GroupId(3), Group::new(GroupId(3), "ops", Some(GroupId(2)))),
            (GroupId(4), Group::new(GroupId(4), "guests", None)),
        ])
    }

    fn lookup(registry: &HashMap<GroupId, Group>) -> impl FnMut(GroupId) -> MetaResult<Group> + '_ {
        move |id| {
            registry
                .get(&id)
                .cloned()
                .ok_or_else(|| MetaError::not_found(EntityKind::Group, id))
        }
    }

    #[test]
    fn test_closure_goes_up_to_root() {
        let registry = groups();
        let ops = registry[&GroupId(3)].clone();
        let closure = effective_groups(&[ops], lookup(&registry)).unwrap();
        assert_eq!(closure, BTreeSet::from([GroupId(1), GroupId(2), GroupId(3)]));
    }

    #[test]
    fn test_closure_never_goes_down() {
        let registry = groups();
        let public = registry[&GroupId(1)].clone();
        let closure = effective_groups(&[public], lookup(&registry)).unwrap();
        assert_eq!(closure, BTreeSet::from([GroupId(1)]));
    }

    #[test]
    fn test_closure_of_several_trees() {
        let registry = groups();
        let assigned = vec![registry[&GroupId(2)].clone(), registry[&GroupId(4)].clone()];
        let closure = effective_groups(&assigned, lookup(&registry)).unwrap();
        assert_eq!(closure, BTreeSet::from([GroupId(1), GroupId(2), GroupId(4)]));
    }

    #[test]
    fn test_combine_is_or() {
        let read = PermissionFlags::new(true, false, false, false);
        let write = PermissionFlags::new(false, true, false, false);
        let combined = combine([read, write]);
        assert_eq!(combined, PermissionFlags::new(true, true, false, false));
        assert_eq!(combine([write, read]), combined);
    }

    #[test]
    fn test_no_grant_means_nothing() {
        assert!(combine(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_flags_display() {
        assert_eq!(PermissionFlags::new(true, true, false, false).to_string(), "rw--");
        assert_eq!(PermissionFlags::all().to_string(), "rwda");
    }
}
