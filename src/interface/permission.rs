// =============================================================================
// PERMISSIONS — Utilisateurs, groupes, droits accordés et droits effectifs
// =============================================================================
//
// Résolution des droits d'un utilisateur sur un sujet :
//   1. groupes directement assignés à l'utilisateur
//   2. fermeture : l'arbre généalogique de chacun (racine → groupe)
//   3. permissions enregistrées pour (sujet, groupe) sur cette fermeture
//   4. OU logique, drapeau par drapeau
//
// =============================================================================

use tracing::{debug, info};

use super::UserInterface;
use crate::backend::sql::dml::{flags_from_row, group_from_row, returned_id};
use crate::backend::sql::SqlDialect;
use crate::backend::Session;
use crate::core::cache::Key;
use crate::core::metamodel::{Association, Class, Group, GroupId, UserId};
use crate::core::object::Object;
use crate::core::permission::{combine, effective_groups, PermissionFlags, Subject};
use crate::core::validate::validate_group_name;
use crate::error::{EntityKind, MetaError, MetaResult};

impl<S: Session, D: SqlDialect> UserInterface<S, D> {
    // ─── Utilisateurs et groupes ─────────────────────────────────────────────

    /// Enregistre un utilisateur. L'authentification reste à la charge de l'hôte.
    pub fn create_user(&mut self, name: &str) -> MetaResult<UserId> {
        let rows = self.run(&self.backend.insert_user(name))?;
        let user = UserId(returned_id(&rows)?);
        info!(user = %name, id = %user, "user created");
        Ok(user)
    }

    pub fn create_group(&mut self, name: &str, parent: Option<&Group>) -> MetaResult<Group> {
        validate_group_name(name)?;
        if self.find_group(Key::Name(name))?.is_some() {
            return Err(MetaError::ConstraintViolation(format!("group '{}' already exists", name)));
        }
        if let Some(parent) = parent {
            if self.find_group(Key::Id(parent.id))?.is_none() {
                return Err(MetaError::ConstraintViolation(format!(
                    "parent group '{}' ({}) is not registered",
                    parent.name, parent.id
                )));
            }
        }

        let parent_id = parent.map(|p| p.id);
        let rows = self.run(&self.backend.insert_group(name, parent_id))?;
        let group = Group::new(GroupId(returned_id(&rows)?), name, parent_id);
        self.permissions.store_group(group.clone());

        info!(group = %group.name, id = %group.id, "group created");
        Ok(group)
    }

    pub fn get_group_by_id(&mut self, id: GroupId) -> MetaResult<Group> {
        self.find_group(Key::Id(id))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Group, id))
    }

    pub fn get_group_by_name(&mut self, name: &str) -> MetaResult<Group> {
        self.find_group(Key::Name(name))?
            .ok_or_else(|| MetaError::not_found(EntityKind::Group, name))
    }

    fn find_group(&mut self, key: Key<'_, GroupId>) -> MetaResult<Option<Group>> {
        if let Some(group) = self.permissions.get_group(key) {
            return Ok(Some(group.clone()));
        }
        let found = self.fetch_one(&self.backend.select_group(key), group_from_row)?;
        if let Some(group) = &found {
            self.permissions.store_group(group.clone());
        }
        Ok(found)
    }

    pub fn assign_user_to_group(&mut self, user: UserId, group: &Group) -> MetaResult<()> {
        self.run(&self.backend.insert_user_assignment(user, group.id))?;
        debug!(user = %user, group = %group.name, "user assigned to group");
        Ok(())
    }

    /// Groupes auxquels `user` est directement assigné
    pub fn get_user_groups(&mut self, user: UserId) -> MetaResult<Vec<Group>> {
        let rows = self.run(&self.backend.select_user_groups(user))?;
        let groups = rows
            .iter()
            .map(group_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        for group in &groups {
            self.permissions.store_group(group.clone());
        }
        Ok(groups)
    }

    // ─── Droits accordés ─────────────────────────────────────────────────────

    /// Enregistre les droits de `group` sur `subject`, en remplaçant ceux
    /// qui existaient pour ce couple.
    pub fn grant(&mut self, subject: Subject, group: &Group, flags: PermissionFlags) -> MetaResult<()> {
        self.run(&self.backend.delete_grant(subject, group.id))?;
        self.run(&self.backend.insert_grant(subject, group.id, flags))?;
        self.permissions.store_grant(subject, group.id, flags);
        debug!(subject = %subject, group = %group.name, flags = %flags, "permission granted");
        Ok(())
    }

    pub fn grant_class(&mut self, class: &Class, group: &Group, flags: PermissionFlags) -> MetaResult<()> {
        self.grant(Subject::Class(class.id), group, flags)
    }

    pub fn grant_association(
        &mut self,
        association: &Association,
        group: &Group,
        flags: PermissionFlags,
    ) -> MetaResult<()> {
        self.grant(Subject::Association(association.id), group, flags)
    }

    pub fn grant_object(&mut self, object: &Object, group: &Group, flags: PermissionFlags) -> MetaResult<()> {
        self.grant(Subject::Object(object.id), group, flags)
    }

    /// Droits enregistrés pour (sujet, groupe), sans héritage
    pub fn get_grant(&mut self, subject: Subject, group_id: GroupId) -> MetaResult<Option<PermissionFlags>> {
        if let Some(flags) = self.permissions.get_grant(subject, group_id) {
            return Ok(Some(flags));
        }
        let found = self.fetch_one(&self.backend.select_grant(subject, group_id), flags_from_row)?;
        if let Some(flags) = found {
            self.permissions.store_grant(subject, group_id, flags);
        }
        Ok(found)
    }

    // ─── Droits effectifs ────────────────────────────────────────────────────

    /// Droits de `user` sur `subject`, hérités des groupes ancêtres.
    pub fn effective_permissions(&mut self, user: UserId, subject: Subject) -> MetaResult<PermissionFlags> {
        let assigned = self.get_user_groups(user)?;
        let closure = effective_groups(&assigned, |id| self.get_group_by_id(id))?;

        let mut grants = Vec::new();
        for group_id in closure {
            if let Some(flags) = self.get_grant(subject, group_id)? {
                grants.push(flags);
            }
        }
        let flags = combine(grants);
        debug!(user = %user, subject = %subject, flags = %flags, "permissions resolved");
        Ok(flags)
    }
}
