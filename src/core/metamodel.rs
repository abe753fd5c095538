// =============================================================================
// METAMODEL — Les entités structurelles : classes, attributs, associations
// =============================================================================
//
// Le métamodèle décrit la structure que l'application hôte se donne :
//   - Les CLASSES forment un arbre (un parent au plus, racine sans parent).
//     Chaque classe possède UNE table physique.
//   - Les ATTRIBUTS sont des champs typés, créés une fois puis ASSIGNÉS
//     à exactement une classe : celle qui porte la colonne.
//   - Les ASSOCIATIONS sont des types d'arêtes orientées et nommées
//     entre deux classes, chacune avec sa table d'arêtes.
//   - Les GROUPES forment un second arbre, pour les permissions.
//
// EXEMPLE :
//
//   object ──┬── person   (first_name, last_name)
//   (tag)    └── address  (street, city)
//
//   person ──person_to_address──▶ address
//
// Les références vers d'autres entités (parent, classe d'origine...) sont
// des IDENTIFIANTS, résolus à la demande via le registre. Aucune entité ne
// possède ses ancêtres.
//
// =============================================================================

use std::fmt;

use super::value::{BaseType, Value};

/// Préfixe par défaut des vues de lecture (`v_person`)
pub const DEFAULT_VIEW_PREFIX: &str = "v_";

macro_rules! catalog_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Value {
            fn from(id: $name) -> Self {
                Value::Integer(id.0)
            }
        }
    };
}

catalog_id!(
    /// Identifiant de classe, généré par le catalogue
    ClassId
);
catalog_id!(
    /// Identifiant d'attribut
    AttributeId
);
catalog_id!(
    /// Identifiant d'association
    AssociationId
);
catalog_id!(
    /// Identifiant de groupe
    GroupId
);
catalog_id!(
    /// Identifiant d'utilisateur (l'authentification est externe)
    UserId
);

/// Une classe = un nœud de la hiérarchie = une table physique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub parent_id: Option<ClassId>,
}

impl Class {
    pub fn new(id: ClassId, name: &str, parent_id: Option<ClassId>) -> Self {
        Class {
            id,
            name: name.to_string(),
            parent_id,
        }
    }

    /// Une classe racine n'a pas d'ancêtre
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Nom de la vue qui présente une ligne dénormalisée par objet
    pub fn view_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Un attribut typé. Immuable après création.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    pub storage_type: BaseType,
    pub indexed: bool,
}

impl Attribute {
    pub fn new(id: AttributeId, name: &str, storage_type: BaseType, indexed: bool) -> Self {
        Attribute {
            id,
            name: name.to_string(),
            storage_type,
            indexed,
        }
    }
}

/// Lien entre un attribut et LA classe qui porte sa colonne.
///
/// L'attribut est visible depuis cette classe et tous ses descendants,
/// jamais depuis ses ancêtres ni ses sœurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeAssignment {
    pub class_id: ClassId,
    pub attribute_id: AttributeId,
    pub nullable: bool,
    /// Expression évaluée par le moteur à l'insertion (ex: `CURRENT_TIMESTAMP`)
    pub default: Option<String>,
}

/// Type d'arête orientée entre deux classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub id: AssociationId,
    pub name: String,
    pub origin_class_id: ClassId,
    pub target_class_id: ClassId,
}

impl Association {
    pub fn new(id: AssociationId, name: &str, origin: ClassId, target: ClassId) -> Self {
        Association {
            id,
            name: name.to_string(),
            origin_class_id: origin,
            target_class_id: target,
        }
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Groupe d'utilisateurs. Même forme d'arbre que les classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub parent_id: Option<GroupId>,
}

impl Group {
    pub fn new(id: GroupId, name: &str, parent_id: Option<GroupId>) -> Self {
        Group {
            id,
            name: name.to_string(),
            parent_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Référence vers une association : l'entité elle-même ou son nom.
#[derive(Debug, Clone, Copy)]
pub enum AssociationRef<'a> {
    Entity(&'a Association),
    Name(&'a str),
}

impl<'a> From<&'a Association> for AssociationRef<'a> {
    fn from(association: &'a Association) -> Self {
        AssociationRef::Entity(association)
    }
}

impl<'a> From<&'a str> for AssociationRef<'a> {
    fn from(name: &'a str) -> Self {
        AssociationRef::Name(name)
    }
}
