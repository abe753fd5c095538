// =============================================================================
// DML — Requêtes sur le catalogue, les objets, les arêtes et les permissions
// =============================================================================
//
// Chaque méthode construit UN Statement paramétré ; le décodage des lignes
// retournées est regroupé en bas du fichier (`*_from_row`).
//
// Les valeurs ne sont JAMAIS interpolées dans le texte SQL : seuls les
// identifiants (déjà validés) le sont, quotés par le dialecte.
//
// =============================================================================

use super::{Area, SqlBackend, SqlDialect};
use crate::backend::{Row, Statement, StorageError, StorageResult};
use crate::core::cache::Key;
use crate::core::metamodel::{
    Association, AssociationId, Attribute, AttributeAssignment, AttributeId, Class, ClassId, Group,
    GroupId, UserId,
};
use crate::core::object::ObjectId;
use crate::core::permission::{PermissionFlags, Subject};
use crate::core::validate::{IDENTITY_COLUMN, META_TABLE};
use crate::core::value::{BaseType, Value};

const FLAG_COLUMNS: [&str; 4] = ["read", "write", "delete", "administration"];

impl<D: SqlDialect> SqlBackend<D> {
    fn column_list(&self, columns: &[&str]) -> String {
        columns
            .iter()
            .map(|c| self.column(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn insert_returning_id(&self, table: String, columns: &[&str], params: Vec<Value>) -> Statement {
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                table,
                self.column_list(columns),
                self.placeholders(1, columns.len()).join(", "),
                self.column(IDENTITY_COLUMN)
            ),
            params,
        )
    }

    fn select_where(&self, table: String, columns: &[&str], filter: &str, value: Value) -> Statement {
        Statement::new(
            format!(
                "SELECT {} FROM {} WHERE {} = {}",
                self.column_list(columns),
                table,
                self.column(filter),
                self.dialect.placeholder(1)
            ),
            vec![value],
        )
    }

    fn select_by_key<I: Into<Value>>(&self, table: String, columns: &[&str], key: Key<'_, I>) -> Statement {
        match key {
            Key::Id(id) => self.select_where(table, columns, IDENTITY_COLUMN, id.into()),
            Key::Name(name) => self.select_where(table, columns, "name", Value::from(name)),
        }
    }

    // ─── Classes ─────────────────────────────────────────────────────────────

    const CLASS_COLUMNS: [&'static str; 3] = ["id", "name", "parent_id"];

    pub fn insert_class(&self, name: &str, parent_id: Option<ClassId>) -> Statement {
        self.insert_returning_id(
            self.table(Area::Structure, "class"),
            &["name", "parent_id"],
            vec![Value::from(name), Value::from(parent_id)],
        )
    }

    pub fn select_class(&self, key: Key<'_, ClassId>) -> Statement {
        self.select_by_key(self.table(Area::Structure, "class"), &Self::CLASS_COLUMNS, key)
    }

    /// Sous-classes directes
    pub fn select_child_classes(&self, parent_id: ClassId) -> Statement {
        self.select_where(
            self.table(Area::Structure, "class"),
            &Self::CLASS_COLUMNS,
            "parent_id",
            parent_id.into(),
        )
    }

    // ─── Attributs et assignations ───────────────────────────────────────────

    const ATTRIBUTE_COLUMNS: [&'static str; 4] = ["id", "name", "generator", "indexed"];
    const ASSIGNMENT_COLUMNS: [&'static str; 4] = ["class_id", "attribute_id", "nullable", "default"];

    pub fn insert_attribute(&self, name: &str, storage_type: &BaseType, indexed: bool) -> Statement {
        self.insert_returning_id(
            self.table(Area::Structure, "attribute"),
            &["name", "generator", "indexed"],
            vec![
                Value::from(name),
                Value::from(storage_type.to_string()),
                Value::from(indexed),
            ],
        )
    }

    pub fn select_attribute(&self, key: Key<'_, AttributeId>) -> Statement {
        self.select_by_key(self.table(Area::Structure, "attribute"), &Self::ATTRIBUTE_COLUMNS, key)
    }

    pub fn insert_assignment(&self, assignment: &AttributeAssignment) -> Statement {
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(Area::Structure, "attribute_assignment"),
                self.column_list(&Self::ASSIGNMENT_COLUMNS),
                self.placeholders(1, 4).join(", ")
            ),
            vec![
                assignment.class_id.into(),
                assignment.attribute_id.into(),
                Value::from(assignment.nullable),
                Value::from(assignment.default.clone()),
            ],
        )
    }

    /// Assignations d'une classe, dans l'ordre de création des attributs
    pub fn select_assignments(&self, class_id: ClassId) -> Statement {
        let mut stmt = self.select_where(
            self.table(Area::Structure, "attribute_assignment"),
            &Self::ASSIGNMENT_COLUMNS,
            "class_id",
            class_id.into(),
        );
        stmt.sql.push_str(&format!(" ORDER BY {}", self.column("attribute_id")));
        stmt
    }

    /// L'assignation (unique) d'un attribut, s'il en a une
    pub fn select_assignment_of(&self, attribute_id: AttributeId) -> Statement {
        self.select_where(
            self.table(Area::Structure, "attribute_assignment"),
            &Self::ASSIGNMENT_COLUMNS,
            "attribute_id",
            attribute_id.into(),
        )
    }

    // ─── Associations ────────────────────────────────────────────────────────

    const ASSOCIATION_COLUMNS: [&'static str; 4] = ["id", "name", "origin_class_id", "target_class_id"];

    pub fn insert_association(&self, name: &str, origin: ClassId, target: ClassId) -> Statement {
        self.insert_returning_id(
            self.table(Area::Structure, "association"),
            &["name", "origin_class_id", "target_class_id"],
            vec![Value::from(name), origin.into(), target.into()],
        )
    }

    pub fn select_association(&self, key: Key<'_, AssociationId>) -> Statement {
        self.select_by_key(
            self.table(Area::Structure, "association"),
            &Self::ASSOCIATION_COLUMNS,
            key,
        )
    }

    // ─── Objets ──────────────────────────────────────────────────────────────

    /// Allocation de l'identité : classe d'origine et créateur
    pub fn insert_meta(&self, id: ObjectId, class_id: ClassId, creator: UserId) -> Statement {
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(Area::Data, META_TABLE),
                self.column_list(&["id", "class_id", "creator_id"]),
                self.placeholders(1, 3).join(", ")
            ),
            vec![id.into(), class_id.into(), creator.into()],
        )
    }

    /// Classe propriétaire d'un objet, quelle que soit la vue de lecture
    pub fn select_object_class(&self, id: ObjectId) -> Statement {
        self.select_where(self.table(Area::Data, META_TABLE), &["class_id"], IDENTITY_COLUMN, id.into())
    }

    /// Ligne d'un niveau : l'identité, puis les valeurs propres au niveau
    pub fn insert_level(&self, class_name: &str, id: ObjectId, values: &[(String, Value)]) -> Statement {
        let mut columns = vec![self.column(IDENTITY_COLUMN)];
        columns.extend(values.iter().map(|(column, _)| self.column(column)));
        let mut params = vec![Value::from(id)];
        params.extend(values.iter().map(|(_, value)| value.clone()));

        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(Area::Data, class_name),
                columns.join(", "),
                self.placeholders(1, params.len()).join(", ")
            ),
            params,
        )
    }

    /// Mise à jour d'un niveau ; `values` ne doit pas être vide
    pub fn update_level(&self, class_name: &str, id: ObjectId, values: &[(String, Value)]) -> Statement {
        let assignments: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = {}", self.column(column), self.dialect.placeholder(i + 1)))
            .collect();
        let mut params: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
        params.push(id.into());

        Statement::new(
            format!(
                "UPDATE {} SET {} WHERE {} = {}",
                self.table(Area::Data, class_name),
                assignments.join(", "),
                self.column(IDENTITY_COLUMN),
                self.dialect.placeholder(params.len())
            ),
            params,
        )
    }

    /// Lecture dénormalisée d'un objet à travers la vue de sa classe
    pub fn select_object(&self, view_name: &str, id: ObjectId) -> Statement {
        Statement::new(
            format!(
                "SELECT * FROM {} WHERE {} = {}",
                self.column(view_name),
                self.column(IDENTITY_COLUMN),
                self.dialect.placeholder(1)
            ),
            vec![id.into()],
        )
    }

    // ─── Arêtes ──────────────────────────────────────────────────────────────

    pub fn insert_edge(&self, association: &Association, origin: ObjectId, target: ObjectId) -> Statement {
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(Area::Association, &association.name),
                self.column_list(&["origin_id", "target_id"]),
                self.placeholders(1, 2).join(", ")
            ),
            vec![origin.into(), target.into()],
        )
    }

    /// Toutes les arêtes sortantes d'un objet
    pub fn delete_edges_from(&self, association: &Association, origin: ObjectId) -> Statement {
        Statement::new(
            format!(
                "DELETE FROM {} WHERE {} = {}",
                self.table(Area::Association, &association.name),
                self.column("origin_id"),
                self.dialect.placeholder(1)
            ),
            vec![origin.into()],
        )
    }

    pub fn delete_edge(&self, association: &Association, origin: ObjectId, target: ObjectId) -> Statement {
        Statement::new(
            format!(
                "DELETE FROM {} WHERE {} = {} AND {} = {}",
                self.table(Area::Association, &association.name),
                self.column("origin_id"),
                self.dialect.placeholder(1),
                self.column("target_id"),
                self.dialect.placeholder(2)
            ),
            vec![origin.into(), target.into()],
        )
    }

    pub fn select_targets(&self, association: &Association, origin: ObjectId) -> Statement {
        self.select_where(
            self.table(Area::Association, &association.name),
            &["target_id"],
            "origin_id",
            origin.into(),
        )
    }

    // ─── Utilisateurs et groupes ─────────────────────────────────────────────

    const GROUP_COLUMNS: [&'static str; 3] = ["id", "name", "parent_id"];

    pub fn insert_user(&self, name: &str) -> Statement {
        self.insert_returning_id(self.table(Area::Permission, "user"), &["name"], vec![Value::from(name)])
    }

    pub fn insert_group(&self, name: &str, parent_id: Option<GroupId>) -> Statement {
        self.insert_returning_id(
            self.table(Area::Permission, "group"),
            &["name", "parent_id"],
            vec![Value::from(name), Value::from(parent_id)],
        )
    }

    pub fn select_group(&self, key: Key<'_, GroupId>) -> Statement {
        self.select_by_key(self.table(Area::Permission, "group"), &Self::GROUP_COLUMNS, key)
    }

    pub fn insert_user_assignment(&self, user: UserId, group: GroupId) -> Statement {
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(Area::Permission, "user_assignment"),
                self.column_list(&["user_id", "group_id"]),
                self.placeholders(1, 2).join(", ")
            ),
            vec![user.into(), group.into()],
        )
    }

    /// Groupes auxquels un utilisateur est DIRECTEMENT assigné
    pub fn select_user_groups(&self, user: UserId) -> Statement {
        let groups = self.table(Area::Permission, "group");
        let assignments = self.table(Area::Permission, "user_assignment");
        let projection: Vec<String> = Self::GROUP_COLUMNS
            .iter()
            .map(|c| format!("{}.{}", groups, self.column(c)))
            .collect();
        Statement::new(
            format!(
                "SELECT {} FROM {} JOIN {} ON {}.{} = {}.{} WHERE {}.{} = {} ORDER BY {}.{}",
                projection.join(", "),
                groups,
                assignments,
                assignments,
                self.column("group_id"),
                groups,
                self.column(IDENTITY_COLUMN),
                assignments,
                self.column("user_id"),
                self.dialect.placeholder(1),
                groups,
                self.column(IDENTITY_COLUMN)
            ),
            vec![user.into()],
        )
    }

    // ─── Permissions ─────────────────────────────────────────────────────────

    /// Table et colonne de sujet pour un type de sujet
    fn grant_target(&self, subject: Subject) -> (String, &'static str, Value) {
        match subject {
            Subject::Class(id) => (self.table(Area::Permission, "class_assignment"), "class_id", id.into()),
            Subject::Association(id) => (
                self.table(Area::Permission, "association_assignment"),
                "association_id",
                id.into(),
            ),
            Subject::Object(id) => (self.table(Area::Permission, "object_assignment"), "object_id", id.into()),
        }
    }

    pub fn delete_grant(&self, subject: Subject, group: GroupId) -> Statement {
        let (table, subject_column, subject_value) = self.grant_target(subject);
        Statement::new(
            format!(
                "DELETE FROM {} WHERE {} = {} AND {} = {}",
                table,
                self.column(subject_column),
                self.dialect.placeholder(1),
                self.column("group_id"),
                self.dialect.placeholder(2)
            ),
            vec![subject_value, group.into()],
        )
    }

    pub fn insert_grant(&self, subject: Subject, group: GroupId, flags: PermissionFlags) -> Statement {
        let (table, subject_column, subject_value) = self.grant_target(subject);
        let mut columns = vec![subject_column, "group_id"];
        columns.extend(FLAG_COLUMNS);
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                self.column_list(&columns),
                self.placeholders(1, columns.len()).join(", ")
            ),
            vec![
                subject_value,
                group.into(),
                Value::from(flags.read),
                Value::from(flags.write),
                Value::from(flags.delete),
                Value::from(flags.administration),
            ],
        )
    }

    pub fn select_grant(&self, subject: Subject, group: GroupId) -> Statement {
        let (table, subject_column, subject_value) = self.grant_target(subject);
        Statement::new(
            format!(
                "SELECT {} FROM {} WHERE {} = {} AND {} = {}",
                self.column_list(&FLAG_COLUMNS),
                table,
                self.column(subject_column),
                self.dialect.placeholder(1),
                self.column("group_id"),
                self.dialect.placeholder(2)
            ),
            vec![subject_value, group.into()],
        )
    }
}

// ─── Décodage des lignes ─────────────────────────────────────────────────────

/// L'identifiant retourné par un `INSERT ... RETURNING id`
pub fn returned_id(rows: &[Row]) -> StorageResult<i64> {
    rows.first()
        .ok_or_else(|| StorageError::Decode("INSERT returned no row".to_string()))?
        .get_i64(IDENTITY_COLUMN)
}

pub fn class_from_row(row: &Row) -> StorageResult<Class> {
    Ok(Class::new(
        ClassId(row.get_i64("id")?),
        row.get_str("name")?,
        row.get_opt_i64("parent_id")?.map(ClassId),
    ))
}

pub fn attribute_from_row(row: &Row) -> StorageResult<Attribute> {
    Ok(Attribute::new(
        AttributeId(row.get_i64("id")?),
        row.get_str("name")?,
        BaseType::parse(row.get_str("generator")?),
        row.get_bool("indexed")?,
    ))
}

pub fn assignment_from_row(row: &Row) -> StorageResult<AttributeAssignment> {
    Ok(AttributeAssignment {
        class_id: ClassId(row.get_i64("class_id")?),
        attribute_id: AttributeId(row.get_i64("attribute_id")?),
        nullable: row.get_bool("nullable")?,
        default: row.get_opt_str("default")?.map(str::to_string),
    })
}

pub fn association_from_row(row: &Row) -> StorageResult<Association> {
    Ok(Association::new(
        AssociationId(row.get_i64("id")?),
        row.get_str("name")?,
        ClassId(row.get_i64("origin_class_id")?),
        ClassId(row.get_i64("target_class_id")?),
    ))
}

pub fn group_from_row(row: &Row) -> StorageResult<Group> {
    Ok(Group::new(
        GroupId(row.get_i64("id")?),
        row.get_str("name")?,
        row.get_opt_i64("parent_id")?.map(GroupId),
    ))
}

pub fn flags_from_row(row: &Row) -> StorageResult<PermissionFlags> {
    Ok(PermissionFlags::new(
        row.get_bool("read")?,
        row.get_bool("write")?,
        row.get_bool("delete")?,
        row.get_bool("administration")?,
    ))
}

pub fn object_id_from_value(value: &Value) -> StorageResult<ObjectId> {
    value
        .as_str()
        .and_then(ObjectId::parse)
        .ok_or_else(|| StorageError::Decode(format!("'{}' is not an object identity", value)))
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sql::{PostgresDialect, SqliteDialect};

    #[test]
    fn test_insert_class_returning_id() {
        let backend = SqlBackend::new(PostgresDialect);
        let stmt = backend.insert_class("person", Some(ClassId(1)));
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"structure\".\"class\" (\"name\", \"parent_id\") VALUES ($1, $2) RETURNING \"id\""
        );
        assert_eq!(stmt.params, vec![Value::from("person"), Value::Integer(1)]);
    }

    #[test]
    fn test_select_by_name_or_id() {
        let backend = SqlBackend::new(SqliteDialect);
        let by_name = backend.select_class(Key::Name("person"));
        assert!(by_name.sql.ends_with("WHERE \"name\" = ?1"));
        let by_id = backend.select_attribute(Key::Id(AttributeId(4)));
        assert!(by_id.sql.contains("FROM \"structure_attribute\" WHERE \"id\" = ?1"));
        assert_eq!(by_id.params, vec![Value::Integer(4)]);
    }

    #[test]
    fn test_select_object_class_reads_meta() {
        let backend = SqlBackend::new(SqliteDialect);
        let id = ObjectId::generate();
        let statement = backend.select_object_class(id);
        assert_eq!(
            statement.sql,
            "SELECT \"class_id\" FROM \"data_meta\" WHERE \"id\" = ?1"
        );
        assert_eq!(statement.params, vec![Value::from(id)]);
    }

    #[test]
    fn test_insert_level_with_only_identity() {
        let backend = SqlBackend::new(SqliteDialect);
        let id = ObjectId::generate();
        let stmt = backend.insert_level("object", id, &[]);
        assert_eq!(stmt.sql, "INSERT INTO \"data_object\" (\"id\") VALUES (?1)");
        assert_eq!(stmt.params, vec![Value::from(id)]);
    }

    #[test]
    fn test_update_level_binds_id_last() {
        let backend = SqlBackend::new(PostgresDialect);
        let id = ObjectId::generate();
        let stmt = backend.update_level(
            "person",
            id,
            &[("name".to_string(), Value::from("Bob")), ("age".to_string(), Value::from(40_i64))],
        );
        assert_eq!(
            stmt.sql,
            "UPDATE \"data\".\"person\" SET \"name\" = $1, \"age\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(stmt.params.last(), Some(&Value::from(id)));
    }

    #[test]
    fn test_grant_tables_per_subject() {
        let backend = SqlBackend::new(SqliteDialect);
        let object = backend.insert_grant(
            Subject::Object(ObjectId::generate()),
            GroupId(2),
            PermissionFlags::new(true, true, false, false),
        );
        assert!(object.sql.starts_with("INSERT INTO \"permission_object_assignment\" (\"object_id\""));
        assert_eq!(object.params.len(), 6);

        let class = backend.delete_grant(Subject::Class(ClassId(1)), GroupId(2));
        assert!(class.sql.contains("\"permission_class_assignment\" WHERE \"class_id\" = ?1"));
    }

    #[test]
    fn test_user_groups_join() {
        let backend = SqlBackend::new(PostgresDialect);
        let stmt = backend.select_user_groups(UserId(1));
        assert!(stmt.sql.contains(
            "JOIN \"permission\".\"user_assignment\" ON \"permission\".\"user_assignment\".\"group_id\" = \"permission\".\"group\".\"id\""
        ));
    }

    #[test]
    fn test_decode_rows() {
        let row = Row::new(
            vec!["id".into(), "name".into(), "generator".into(), "indexed".into()],
            vec![Value::Integer(7), Value::from("created"), Value::from("TIMESTAMP"), Value::Integer(0)],
        );
        let attribute = attribute_from_row(&row).unwrap();
        assert_eq!(attribute.id, AttributeId(7));
        assert_eq!(attribute.storage_type, BaseType::custom("TIMESTAMP"));
        assert!(!attribute.indexed);

        assert!(returned_id(&[]).is_err());
        assert!(object_id_from_value(&Value::from("not-a-uuid")).is_err());
    }
}
