// =============================================================================
// METARUST — Moteur de métamodèle au-dessus d'une base relationnelle
// =============================================================================
//
// Metarust laisse une application hôte définir une hiérarchie extensible de
// CLASSES, leur attacher des ATTRIBUTS typés (hérités vers le bas), relier
// les objets par des ASSOCIATIONS orientées, et protéger le tout par des
// permissions de GROUPES.
//
// Architecture :
//   core/      → Le métamodèle pur : entités, caches, arbres, permissions
//   backend/   → Traduction vers le SQL réel (PostgreSQL, SQLite) + session
//   interface/ → UserInterface : les opérations d'un utilisateur
//   config     → Paramètres TOML
//   logging    → Initialisation de tracing
//
// Concepts fondamentaux :
//   Class       = un nœud de la hiérarchie = une table physique
//   Family tree = la chaîne racine → ... → classe
//   View        = la jointure de toutes les tables de l'arbre sur l'id
//   Association = un type d'arête orientée, avec sa table d'arêtes
//   Group       = un nœud de l'arbre des permissions
//
// =============================================================================

pub mod core;
pub mod backend;
pub mod interface;
pub mod config;
pub mod logging;
pub mod error;

pub use error::{MetaError, MetaResult};
pub use interface::{provision, UserInterface};
