// =============================================================================
// OBJETS — Répartition des écritures sur les tables de l'arbre généalogique
// =============================================================================
//
// Création d'un `employee` (arbre object → person → employee) :
//
//   INSERT data.meta     (id, class_id, creator_id)
//   INSERT data.object   (id, <attributs de object fournis>)
//   INSERT data.person   (id, <attributs de person fournis>)
//   INSERT data.employee (id, <attributs de employee fournis>)
//
// Une ligne est insérée à CHAQUE niveau, même sans valeur : les tables sont
// chaînées par clé étrangère sur l'id et la vue les joint toutes.
//
// La lecture passe par la vue de la classe demandée ; la modification ne
// touche que les niveaux qui possèdent au moins un des attributs fournis.
//
// Les valeurs sont ramenées au type déclaré de leur attribut à l'écriture
// comme à la lecture, pour que ce qui est relu soit ce qui a été créé.
//
// =============================================================================

use std::collections::HashMap;

use tracing::{debug, warn};

use super::UserInterface;
use crate::backend::sql::SqlDialect;
use crate::backend::Session;
use crate::core::hierarchy::Dispatch;
use crate::core::metamodel::{Class, ClassId};
use crate::core::object::{Object, ObjectId};
use crate::core::validate::IDENTITY_COLUMN;
use crate::core::value::{BaseType, Value};
use crate::error::{EntityKind, MetaError, MetaResult};

fn collect_attributes<I, K, V>(attributes: I) -> HashMap<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    attributes
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

impl<S: Session, D: SqlDialect> UserInterface<S, D> {
    /// nom d'attribut → type déclaré, pour tout l'arbre de `class`
    fn storage_types(&mut self, class: &Class) -> MetaResult<HashMap<String, BaseType>> {
        Ok(self
            .get_assigned_attributes(class)?
            .into_iter()
            .map(|attribute| (attribute.name, attribute.storage_type))
            .collect())
    }

    fn coerce_all(
        &mut self,
        class: &Class,
        attributes: HashMap<String, Value>,
    ) -> MetaResult<HashMap<String, Value>> {
        let types = self.storage_types(class)?;
        Ok(attributes
            .into_iter()
            .map(|(name, value)| match types.get(&name) {
                Some(storage_type) => (name, value.coerce(storage_type)),
                None => (name, value),
            })
            .collect())
    }

    /// Classe fixée à la création, lue dans `data.meta`
    fn owning_class_id(&mut self, id: ObjectId) -> MetaResult<ClassId> {
        let row = self
            .run(&self.backend.select_object_class(id))?
            .into_iter()
            .next()
            .ok_or_else(|| MetaError::not_found(EntityKind::Object, id))?;
        Ok(ClassId(row.get_i64("class_id")?))
    }

    /// Crée un objet de `class`.
    ///
    /// Les clés qui ne correspondent à aucun attribut de l'arbre
    /// généalogique sont ignorées (et signalées dans les logs).
    pub fn create_object<I, K, V>(&mut self, class: &Class, attributes: I) -> MetaResult<Object>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let attributes = collect_attributes(attributes);
        let attributes = self.coerce_all(class, attributes)?;
        let levels = self.level_columns(class)?;
        let dispatch = Dispatch::split(&levels, &attributes);
        if !dispatch.dropped.is_empty() {
            warn!(class = %class.name, dropped = ?dispatch.dropped, "unknown attributes ignored on create");
        }

        let id = ObjectId::generate();
        self.run(&self.backend.insert_meta(id, class.id, self.user))?;
        for level in &dispatch.levels {
            self.run(&self.backend.insert_level(&level.class_name, id, &level.values))?;
        }

        debug!(class = %class.name, object = %id, levels = dispatch.levels.len(), "object created");
        let attributes = dispatch
            .kept()
            .filter(|(_, value)| !value.is_null())
            .cloned()
            .collect();
        Ok(Object::new(id, class.id, attributes))
    }

    /// Lit un objet à travers la vue de `class`.
    ///
    /// Les colonnes NULL sont omises : un attribut absent et un attribut
    /// NULL se lisent de la même façon (`Object::get` → `None`).
    ///
    /// Lu à travers un ancêtre, l'objet garde sa propre classe : seuls les
    /// attributs visibles depuis `class` sont remplis.
    pub fn get_object(&mut self, id: ObjectId, class: &Class) -> MetaResult<Object> {
        let view_name = self.view_name(class);
        let row = self
            .run(&self.backend.select_object(&view_name, id))?
            .into_iter()
            .next()
            .ok_or_else(|| MetaError::not_found(EntityKind::Object, id))?;

        let types = self.storage_types(class)?;
        let attributes = row
            .into_pairs_except(&[IDENTITY_COLUMN])
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| match types.get(&name) {
                Some(storage_type) => (name, value.coerce(storage_type)),
                None => (name, value),
            })
            .collect();
        let owner = self.owning_class_id(id)?;
        Ok(Object::new(id, owner, attributes))
    }

    /// Met à jour les attributs fournis, niveau par niveau.
    ///
    /// Seuls les niveaux concernés reçoivent un UPDATE. `object` est mis à
    /// jour en mémoire avec les valeurs retenues.
    pub fn modify<I, K, V>(&mut self, object: &mut Object, attributes: I) -> MetaResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let attributes = collect_attributes(attributes);
        let class = self.get_class_by_id(object.class_id)?;
        let attributes = self.coerce_all(&class, attributes)?;
        let levels = self.level_columns(&class)?;
        let dispatch = Dispatch::split(&levels, &attributes);
        if !dispatch.dropped.is_empty() {
            warn!(class = %class.name, dropped = ?dispatch.dropped, "unknown attributes ignored on modify");
        }

        for level in dispatch.levels.iter().filter(|level| !level.is_empty()) {
            self.run(&self.backend.update_level(&level.class_name, object.id, &level.values))?;
        }
        for (name, value) in dispatch.kept() {
            if value.is_null() {
                object.attributes.remove(name);
            } else {
                object.attributes.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}
