// =============================================================================
// CORE — Le cœur du métamodèle
// =============================================================================
//
// Ce module regroupe la logique pure :
// pas de SQL, pas de session — des entités, des arbres et des caches.
//
// Architecture :
//   value      → types de stockage et valeurs
//   metamodel  → classes, attributs, assignations, associations, groupes
//   object     → objets matérialisés (vues transitoires)
//   cache      → registres en mémoire (structure + permissions)
//   hierarchy  → arbres généalogiques, plans de vues, répartition par niveau
//   permission → drapeaux et résolution sur l'arbre des groupes
//   validate   → contrôle des noms avant écriture
//
// =============================================================================

pub mod value;
pub mod metamodel;
pub mod object;
pub mod cache;
pub mod hierarchy;
pub mod permission;
pub mod validate;
