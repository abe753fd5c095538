// =============================================================================
// CLASSES — Définition de la hiérarchie, des attributs et des vues
// =============================================================================
//
// Créer une classe :        INSERT catalogue + CREATE TABLE + vue
// Assigner un attribut :    INSERT assignation + ADD COLUMN (+ INDEX)
//                           puis rafraîchissement des vues de la classe
//                           et de TOUTES ses descendantes
//
// Toute recherche passe par le cache structurel, puis par le stockage.
// NotFound n'est levée que si les deux échouent.
//
// =============================================================================

use tracing::info;

use super::UserInterface;
use crate::backend::sql::dml::{assignment_from_row, attribute_from_row, class_from_row, returned_id};
use crate::backend::sql::SqlDialect;
use crate::backend::{SchemaManager, Session};
use crate::core::cache::Key;
use crate::core::hierarchy::{self, ViewPlan};
use crate::core::metamodel::{Attribute, AttributeAssignment, AttributeId, Class, ClassId};
use crate::core::validate::{validate_attribute_name, validate_class_name};
use crate::core::value::BaseType;
use crate::error::{EntityKind, MetaError, MetaResult};

impl<S: Session, D: SqlDialect> UserInterface<S, D> {
    // ─── Classes ─────────────────────────────────────────────────────────────

    /// Crée une classe, sa table et sa vue.
    ///
    /// `parent` doit être une classe déjà enregistrée ; `None` crée une racine.
    pub fn create_class(&mut self, name: &str, parent: Option<&Class>) -> MetaResult<Class> {
        validate_class_name(name)?;
        if self.find_class(Key::Name(name))?.is_some() {
            return Err(MetaError::ConstraintViolation(format!("class '{}' already exists", name)));
        }
        let parent = match parent {
            Some(parent) => match self.find_class(Key::Id(parent.id))? {
                Some(stored) if stored.name == parent.name => Some(stored),
                _ => {
                    return Err(MetaError::ConstraintViolation(format!(
                        "parent class '{}' ({}) is not registered",
                        parent.name, parent.id
                    )))
                }
            },
            None => None,
        };

        let parent_id = parent.as_ref().map(|p| p.id);
        let rows = self.run(&self.backend.insert_class(name, parent_id))?;
        let class = Class::new(ClassId(returned_id(&rows)?), name, parent_id);

        let ddl = self.backend.create_table(&class, parent.as_ref());
        self.run_all(ddl)?;
        self.structure.store_class(class.clone());
        self.structure.store_assignments(class.id, Vec::new());
        self.update_class_view(&class)?;

        let parent_name = parent.map(|p| p.name);
        info!(class = %class.name, id = %class.id, parent = ?parent_name, "class created");
        Ok(class)
    }

    pub fn get_class_by_id(&mut self, id: ClassId) -> MetaResult<Class> {
        self.find_class(Key::Id(id))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Class, id))
    }

    pub fn get_class_by_name(&mut self, name: &str) -> MetaResult<Class> {
        self.find_class(Key::Name(name))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Class, name))
    }

    fn find_class(&mut self, key: Key<'_, ClassId>) -> MetaResult<Option<Class>> {
        if let Some(class) = self.structure.get_class(key) {
            return Ok(Some(class.clone()));
        }
        let found = self.fetch_one(&self.backend.select_class(key), class_from_row)?;
        if let Some(class) = &found {
            self.structure.store_class(class.clone());
        }
        Ok(found)
    }

    /// Chaîne racine → ... → `class`
    pub fn family_tree(&mut self, class: &Class) -> MetaResult<Vec<Class>> {
        hierarchy::family_tree(class, |id| self.get_class_by_id(id))
    }

    /// Sous-classes directes, lues dans le stockage
    pub fn get_child_classes(&mut self, class: &Class) -> MetaResult<Vec<Class>> {
        let rows = self.run(&self.backend.select_child_classes(class.id))?;
        let children = rows
            .iter()
            .map(class_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        for child in &children {
            self.structure.store_class(child.clone());
        }
        Ok(children)
    }

    // ─── Attributs ───────────────────────────────────────────────────────────

    pub fn create_attribute(
        &mut self,
        name: &str,
        storage_type: BaseType,
        indexed: bool,
    ) -> MetaResult<Attribute> {
        validate_attribute_name(name)?;
        if self.find_attribute(Key::Name(name))?.is_some() {
            return Err(MetaError::ConstraintViolation(format!(
                "attribute '{}' already exists",
                name
            )));
        }
        let rows = self.run(&self.backend.insert_attribute(name, &storage_type, indexed))?;
        let attribute = Attribute::new(AttributeId(returned_id(&rows)?), name, storage_type, indexed);
        self.structure.store_attribute(attribute.clone());

        info!(attribute = %attribute.name, storage_type = %attribute.storage_type, indexed, "attribute created");
        Ok(attribute)
    }

    pub fn get_attribute_by_id(&mut self, id: AttributeId) -> MetaResult<Attribute> {
        self.find_attribute(Key::Id(id))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Attribute, id))
    }

    pub fn get_attribute_by_name(&mut self, name: &str) -> MetaResult<Attribute> {
        self.find_attribute(Key::Name(name))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Attribute, name))
    }

    fn find_attribute(&mut self, key: Key<'_, AttributeId>) -> MetaResult<Option<Attribute>> {
        if let Some(attribute) = self.structure.get_attribute(key) {
            return Ok(Some(attribute.clone()));
        }
        let found = self.fetch_one(&self.backend.select_attribute(key), attribute_from_row)?;
        if let Some(attribute) = &found {
            self.structure.store_attribute(attribute.clone());
        }
        Ok(found)
    }

    /// Assigne un attribut à une classe : la colonne va dans la table de
    /// CETTE classe, visible de ses descendantes.
    ///
    /// `default` est une expression SQL évaluée par le moteur à l'insertion.
    pub fn assign_attribute(
        &mut self,
        attribute: &Attribute,
        class: &Class,
        nullable: bool,
        default: Option<&str>,
    ) -> MetaResult<AttributeAssignment> {
        if let Some(existing) =
            self.fetch_one(&self.backend.select_assignment_of(attribute.id), assignment_from_row)?
        {
            return Err(MetaError::ConstraintViolation(format!(
                "attribute '{}' is already assigned to class {}",
                attribute.name, existing.class_id
            )));
        }

        let assignment = AttributeAssignment {
            class_id: class.id,
            attribute_id: attribute.id,
            nullable,
            default: default.map(str::to_string),
        };
        self.run(&self.backend.insert_assignment(&assignment))?;
        let mut ddl = self.backend.add_column(class, attribute, &assignment);
        if attribute.indexed {
            ddl.extend(self.backend.create_index(class, attribute));
        }
        self.run_all(ddl)?;
        self.structure.push_assignment(assignment.clone());
        self.refresh_views(class)?;

        info!(attribute = %attribute.name, class = %class.name, nullable, "attribute assigned");
        Ok(assignment)
    }

    /// Assignations propres à `class` (pas celles héritées)
    pub fn get_assignments(&mut self, class: &Class) -> MetaResult<Vec<AttributeAssignment>> {
        if let Some(assignments) = self.structure.get_assignments(class.id) {
            return Ok(assignments.to_vec());
        }
        let rows = self.run(&self.backend.select_assignments(class.id))?;
        let assignments = rows
            .iter()
            .map(assignment_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.structure.store_assignments(class.id, assignments.clone());
        Ok(assignments)
    }

    /// Attributs visibles depuis `class` : ceux de chaque niveau de son
    /// arbre généalogique, racine en tête.
    pub fn get_assigned_attributes(&mut self, class: &Class) -> MetaResult<Vec<Attribute>> {
        let mut attributes = Vec::new();
        for level in self.family_tree(class)? {
            attributes.extend(self.level_attributes(&level)?);
        }
        Ok(attributes)
    }

    fn level_attributes(&mut self, class: &Class) -> MetaResult<Vec<Attribute>> {
        self.get_assignments(class)?
            .into_iter()
            .map(|assignment| self.get_attribute_by_id(assignment.attribute_id))
            .collect()
    }

    /// (nom de classe, noms des attributs du niveau) pour chaque niveau
    pub(crate) fn level_columns(&mut self, class: &Class) -> MetaResult<Vec<(String, Vec<String>)>> {
        let mut levels = Vec::new();
        for level in self.family_tree(class)? {
            let columns = self
                .level_attributes(&level)?
                .into_iter()
                .map(|attribute| attribute.name)
                .collect();
            levels.push((level.name, columns));
        }
        Ok(levels)
    }

    // ─── Vues ────────────────────────────────────────────────────────────────

    pub fn view_name(&self, class: &Class) -> String {
        class.view_name(&self.view_prefix)
    }

    /// (Re)crée la vue de lecture de `class`
    pub fn update_class_view(&mut self, class: &Class) -> MetaResult<()> {
        let tree = self.family_tree(class)?;
        let view_name = self.view_name(class);
        let plan = ViewPlan::build(&view_name, &tree, |level| {
            Ok(self
                .level_attributes(level)?
                .into_iter()
                .map(|attribute| attribute.name)
                .collect())
        })?;
        let ddl = self.backend.create_or_replace_view(&plan);
        self.run_all(ddl)
    }

    /// Vue de `class` puis celles de toutes ses descendantes
    fn refresh_views(&mut self, class: &Class) -> MetaResult<()> {
        let mut pending = vec![class.clone()];
        while let Some(current) = pending.pop() {
            self.update_class_view(&current)?;
            pending.extend(self.get_child_classes(&current)?);
        }
        Ok(())
    }
}
