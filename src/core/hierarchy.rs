// =============================================================================
// HIERARCHY — Arbres généalogiques et héritage multi-tables
// =============================================================================
//
// Classes et groupes forment des arbres : chaque nœud a au plus un parent.
// L'ARBRE GÉNÉALOGIQUE d'un nœud est la chaîne racine → ... → nœud.
//
//   object ── person ── employee
//
//   family_tree(employee) = [object, person, employee]
//
// HÉRITAGE MULTI-TABLES : chaque classe a SA table, qui ne contient que
// les colonnes des attributs assignés à CE niveau. Un objet `employee` a
// donc une ligne dans data.object, une dans data.person et une dans
// data.employee, toutes avec le même id.
//
//   data.object   (id, tag)
//   data.person   (id → object.id, first_name)
//   data.employee (id → person.id, salary)
//
// Deux opérations en découlent :
//   1. La VUE : jointure de toutes les tables de l'arbre sur l'id, la
//      racine servant d'ancre → une ligne dénormalisée par objet.
//   2. La RÉPARTITION : découper une map d'attributs par niveau, pour
//      savoir quoi insérer / mettre à jour dans chaque table.
//
// Ce module reste pur : il calcule des plans, le backend les traduit en SQL.
//
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use super::metamodel::{Class, ClassId, Group, GroupId};
use super::value::Value;
use crate::error::{MetaError, MetaResult};

/// Un nœud d'arbre : identifiant et parent optionnel.
pub trait TreeNode: Clone {
    type Id: Copy + Eq + Hash + Debug;

    fn node_id(&self) -> Self::Id;
    fn parent_node(&self) -> Option<Self::Id>;
}

impl TreeNode for Class {
    type Id = ClassId;

    fn node_id(&self) -> ClassId {
        self.id
    }

    fn parent_node(&self) -> Option<ClassId> {
        self.parent_id
    }
}

impl TreeNode for Group {
    type Id = GroupId;

    fn node_id(&self) -> GroupId {
        self.id
    }

    fn parent_node(&self) -> Option<GroupId> {
        self.parent_id
    }
}

/// Chaîne des ancêtres, racine en tête, `node` en dernier.
///
/// `lookup` résout un parent par id. Un cycle (qui ne peut apparaître
/// que si le stockage a été modifié hors du moteur) est rejeté.
pub fn family_tree<N, F>(node: &N, mut lookup: F) -> MetaResult<Vec<N>>
where
    N: TreeNode,
    F: FnMut(N::Id) -> MetaResult<N>,
{
    let mut chain = vec![node.clone()];
    let mut seen = HashSet::from([node.node_id()]);
    let mut current = node.parent_node();

    while let Some(parent_id) = current {
        if !seen.insert(parent_id) {
            return Err(MetaError::ConstraintViolation(format!(
                "cycle in parent chain at {:?}",
                parent_id
            )));
        }
        let parent = lookup(parent_id)?;
        current = parent.parent_node();
        chain.push(parent);
    }

    chain.reverse();
    Ok(chain)
}

// ─── Vues ────────────────────────────────────────────────────────────────────

/// Un niveau de la vue : la table d'une classe et ses colonnes propres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLevel {
    pub class_name: String,
    pub columns: Vec<String>,
}

/// Plan de la vue de lecture d'une classe.
///
/// `levels[0]` est la racine : sa table sert d'ancre à la jointure,
/// et son `id` est la seule colonne d'identité projetée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPlan {
    pub view_name: String,
    pub levels: Vec<ViewLevel>,
}

impl ViewPlan {
    /// Construit le plan à partir de l'arbre généalogique (racine en tête).
    ///
    /// `columns_of` donne les noms des attributs assignés à un niveau.
    pub fn build<F>(view_name: &str, tree: &[Class], mut columns_of: F) -> MetaResult<Self>
    where
        F: FnMut(&Class) -> MetaResult<Vec<String>>,
    {
        if tree.is_empty() {
            return Err(MetaError::ConstraintViolation(format!(
                "view '{}' needs at least one class",
                view_name
            )));
        }
        let levels = tree
            .iter()
            .map(|class| {
                Ok(ViewLevel {
                    class_name: class.name.clone(),
                    columns: columns_of(class)?,
                })
            })
            .collect::<MetaResult<Vec<_>>>()?;
        Ok(ViewPlan {
            view_name: view_name.to_string(),
            levels,
        })
    }

    /// La table racine (ancre de la jointure)
    pub fn anchor(&self) -> &str {
        &self.levels[0].class_name
    }

    /// Toutes les colonnes projetées, dans l'ordre de l'arbre
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.levels.iter().flat_map(|level| {
            level
                .columns
                .iter()
                .map(move |column| (level.class_name.as_str(), column.as_str()))
        })
    }
}

// ─── Répartition des attributs ───────────────────────────────────────────────

/// Les valeurs destinées à la table d'un niveau.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSlice {
    pub class_name: String,
    pub values: Vec<(String, Value)>,
}

impl LevelSlice {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Résultat de la répartition : un slice par niveau (même vides, dans
/// l'ordre de l'arbre) et les clés qu'aucun niveau ne possède.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub levels: Vec<LevelSlice>,
    pub dropped: Vec<String>,
}

impl Dispatch {
    /// Découpe `attributes` selon les colonnes de chaque niveau.
    ///
    /// `levels` : (nom de classe, attributs assignés à ce niveau), racine en
    /// tête. Un niveau sans valeur fournie produit un slice vide : l'insertion
    /// a besoin d'une ligne de liaison à chaque niveau.
    pub fn split(levels: &[(String, Vec<String>)], attributes: &HashMap<String, Value>) -> Self {
        let mut claimed: HashSet<&str> = HashSet::new();
        let slices: Vec<LevelSlice> = levels
            .iter()
            .map(|(class_name, columns)| {
                let values = columns
                    .iter()
                    .filter_map(|column| {
                        attributes.get(column).map(|value| {
                            claimed.insert(column.as_str());
                            (column.clone(), value.clone())
                        })
                    })
                    .collect();
                LevelSlice {
                    class_name: class_name.clone(),
                    values,
                }
            })
            .collect();

        let mut dropped: Vec<String> = attributes
            .keys()
            .filter(|key| !claimed.contains(key.as_str()))
            .cloned()
            .collect();
        dropped.sort();

        Dispatch {
            levels: slices,
            dropped,
        }
    }

    /// Toutes les valeurs retenues, tous niveaux confondus
    pub fn kept(&self) -> impl Iterator<Item = &(String, Value)> {
        self.levels.iter().flat_map(|level| level.values.iter())
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntityKind;

    /// A0 → A1 → ... → A4
    fn chain(depth: i64) -> HashMap<ClassId, Class> {
        (0..=depth)
            .map(|i| {
                let parent = if i == 0 { None } else { Some(ClassId(i - 1)) };
                (ClassId(i), Class::new(ClassId(i), &format!("a{}", i), parent))
            })
            .collect()
    }

    fn lookup(registry: &HashMap<ClassId, Class>) -> impl FnMut(ClassId) -> MetaResult<Class> + '_ {
        move |id| {
            registry
                .get(&id)
                .cloned()
                .ok_or_else(|| MetaError::not_found(EntityKind::Class, id))
        }
    }

    #[test]
    fn test_family_tree_root_first() {
        let registry = chain(4);
        let tree = family_tree(&registry[&ClassId(4)], lookup(&registry)).unwrap();
        let names: Vec<_> = tree.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a0", "a1", "a2", "a3", "a4"]);
    }

    #[test]
    fn test_family_tree_of_root() {
        let registry = chain(2);
        let tree = family_tree(&registry[&ClassId(0)], lookup(&registry)).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, ClassId(0));
    }

    #[test]
    fn test_family_tree_detects_cycle() {
        let registry = HashMap::from([
            (ClassId(1), Class::new(ClassId(1), "a", Some(ClassId(2)))),
            (ClassId(2), Class::new(ClassId(2), "b", Some(ClassId(1)))),
        ]);
        let result = family_tree(&registry[&ClassId(1)], lookup(&registry));
        assert!(matches!(result, Err(MetaError::ConstraintViolation(_))));
    }

    #[test]
    fn test_family_tree_missing_parent() {
        let registry = HashMap::from([(ClassId(1), Class::new(ClassId(1), "a", Some(ClassId(9))))]);
        let result = family_tree(&registry[&ClassId(1)], lookup(&registry));
        assert!(matches!(result, Err(MetaError::NotFound { .. })));
    }

    #[test]
    fn test_view_plan_anchor_and_columns() {
        let registry = chain(2);
        let tree = family_tree(&registry[&ClassId(2)], lookup(&registry)).unwrap();
        let plan = ViewPlan::build("v_a2", &tree, |class| {
            Ok(match class.name.as_str() {
                "a0" => vec!["tag".to_string()],
                "a1" => vec![],
                _ => vec!["first_name".to_string(), "last_name".to_string()],
            })
        })
        .unwrap();

        assert_eq!(plan.anchor(), "a0");
        let columns: Vec<_> = plan.columns().collect();
        assert_eq!(
            columns,
            vec![("a0", "tag"), ("a2", "first_name"), ("a2", "last_name")]
        );
    }

    #[test]
    fn test_split_keeps_empty_levels_and_drops_unknown() {
        let levels = vec![
            ("object".to_string(), vec!["tag".to_string()]),
            ("person".to_string(), vec!["name".to_string()]),
        ];
        let attributes = HashMap::from([
            ("name".to_string(), Value::from("Fred")),
            ("shoe_size".to_string(), Value::from(44_i64)),
        ]);

        let dispatch = Dispatch::split(&levels, &attributes);

        assert_eq!(dispatch.levels.len(), 2);
        assert!(dispatch.levels[0].is_empty());
        assert_eq!(
            dispatch.levels[1].values,
            vec![("name".to_string(), Value::from("Fred"))]
        );
        assert_eq!(dispatch.dropped, vec!["shoe_size".to_string()]);
        assert_eq!(dispatch.kept().count(), 1);
    }
}
