// =============================================================================
// ASSOCIATIONS — Types d'arêtes orientées et leur parcours
// =============================================================================
//
//   bind(origin, target, R)         → INSERT association.R (origin, target)
//   bind(origin, target, R, rebind) → DELETE les arêtes sortantes, puis INSERT
//   unbind(origin, target, R)       → DELETE exactement cette arête
//   hop(origin, R)                  → cibles, lues via la classe cible de R
//
// Une association peut être désignée par son entité ou par son nom.
//
// =============================================================================

use tracing::info;

use super::UserInterface;
use crate::backend::sql::dml::{association_from_row, object_id_from_value, returned_id};
use crate::backend::sql::SqlDialect;
use crate::backend::{SchemaManager, Session, StorageError};
use crate::core::cache::Key;
use crate::core::metamodel::{Association, AssociationId, AssociationRef, Class};
use crate::core::object::Object;
use crate::core::validate::validate_association_name;
use crate::error::{EntityKind, MetaError, MetaResult};

impl<S: Session, D: SqlDialect> UserInterface<S, D> {
    pub fn create_association(
        &mut self,
        name: &str,
        origin: &Class,
        target: &Class,
    ) -> MetaResult<Association> {
        validate_association_name(name)?;
        if self.find_association(Key::Name(name))?.is_some() {
            return Err(MetaError::ConstraintViolation(format!(
                "association '{}' already exists",
                name
            )));
        }
        let rows = self.run(&self.backend.insert_association(name, origin.id, target.id))?;
        let association = Association::new(AssociationId(returned_id(&rows)?), name, origin.id, target.id);

        let ddl = self.backend.create_edge_table(&association, origin, target);
        self.run_all(ddl)?;
        self.structure.store_association(association.clone());

        info!(association = %association.name, origin = %origin.name, target = %target.name, "association created");
        Ok(association)
    }

    pub fn get_association_by_id(&mut self, id: AssociationId) -> MetaResult<Association> {
        self.find_association(Key::Id(id))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Association, id))
    }

    pub fn get_association_by_name(&mut self, name: &str) -> MetaResult<Association> {
        self.find_association(Key::Name(name))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Association, name))
    }

    fn find_association(&mut self, key: Key<'_, AssociationId>) -> MetaResult<Option<Association>> {
        if let Some(association) = self.structure.get_association(key) {
            return Ok(Some(association.clone()));
        }
        let found = self.fetch_one(&self.backend.select_association(key), association_from_row)?;
        if let Some(association) = &found {
            self.structure.store_association(association.clone());
        }
        Ok(found)
    }

    fn resolve_association(&mut self, association: AssociationRef<'_>) -> MetaResult<Association> {
        match association {
            AssociationRef::Entity(association) => Ok(association.clone()),
            AssociationRef::Name(name) => self.get_association_by_name(name),
        }
    }

    /// Lie `origin` à `target`.
    ///
    /// Avec `rebind`, les arêtes sortantes existantes de `origin` sont
    /// d'abord supprimées ; `target = None` vide alors simplement le lien.
    pub fn bind<'a>(
        &mut self,
        origin: &Object,
        target: Option<&Object>,
        association: impl Into<AssociationRef<'a>>,
        rebind: bool,
    ) -> MetaResult<()> {
        let association = self.resolve_association(association.into())?;
        if rebind {
            self.run(&self.backend.delete_edges_from(&association, origin.id))?;
        }
        if let Some(target) = target {
            self.run(&self.backend.insert_edge(&association, origin.id, target.id))?;
        }
        Ok(())
    }

    /// Supprime l'arête (origin, target) ; sans effet si elle n'existe pas
    pub fn unbind<'a>(
        &mut self,
        origin: &Object,
        target: &Object,
        association: impl Into<AssociationRef<'a>>,
    ) -> MetaResult<()> {
        let association = self.resolve_association(association.into())?;
        self.run(&self.backend.delete_edge(&association, origin.id, target.id))?;
        Ok(())
    }

    /// Tous les objets atteints depuis `object` par `association`
    pub fn hop<'a>(
        &mut self,
        object: &Object,
        association: impl Into<AssociationRef<'a>>,
    ) -> MetaResult<Vec<Object>> {
        let association = self.resolve_association(association.into())?;
        let target_class = self.get_class_by_id(association.target_class_id)?;
        let target_ids = self
            .run(&self.backend.select_targets(&association, object.id))?
            .iter()
            .map(|row| {
                row.get("target_id")
                    .ok_or_else(|| StorageError::Decode("missing column 'target_id'".to_string()))
                    .and_then(object_id_from_value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        target_ids
            .into_iter()
            .map(|id| self.get_object(id, &target_class))
            .collect()
    }

    /// La première cible ; EmptyTraversal s'il n'y en a aucune
    pub fn hop1<'a>(
        &mut self,
        object: &Object,
        association: impl Into<AssociationRef<'a>>,
    ) -> MetaResult<Object> {
        let association = self.resolve_association(association.into())?;
        self.hop(object, &association)?
            .into_iter()
            .next()
            .ok_or(MetaError::EmptyTraversal {
                association: association.name,
            })
    }
}
