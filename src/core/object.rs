// =============================================================================
// OBJECT — Une vue transitoire sur un objet stocké
// =============================================================================
//
// Un Objet appartient à UNE classe, fixée à la création. Ses attributs
// sont répartis dans les tables de tous les niveaux de l'arbre généalogique
// de sa classe, et réunis à la lecture par la vue synthétisée.
//
//   person (id=7f3c...)
//     data.object  : id, tag
//     data.person  : id, first_name, last_name
//     v_person     : id, tag, first_name, last_name   ← lecture
//
// Les objets ne sont PAS mis en cache : ils sont matérialisés à chaque
// lecture puis abandonnés.
//
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use super::metamodel::ClassId;
use super::value::Value;

/// Identité partagée par toutes les lignes d'un objet, à tous les niveaux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Nouvelle identité aléatoire (UUID v4)
    pub fn generate() -> Self {
        ObjectId(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(ObjectId)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::String(id.0.to_string())
    }
}

/// Un objet matérialisé : identité, classe, et attributs connus.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub id: ObjectId,
    pub class_id: ClassId,
    /// nom d'attribut → valeur (trié, pour un affichage stable)
    pub attributes: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(id: ObjectId, class_id: ClassId, attributes: BTreeMap<String, Value>) -> Self {
        Object { id, class_id, attributes }
    }

    /// Lit la valeur d'un attribut
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Affiche l'objet de manière lisible (pour le debug)
    pub fn dump(&self, class_name: &str) -> String {
        let lines: Vec<String> = self
            .attributes
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect();
        format!("{} {}:\n  {}", class_name, self.id, lines.join("\n  "))
    }
}
