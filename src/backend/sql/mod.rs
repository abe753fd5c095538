// =============================================================================
// BACKEND SQL — Génération de SQL à partir du métamodèle
// =============================================================================
//
// Ce module traduit :
//   Class        → CREATE TABLE data.<classe> (id → parent.id)
//   Assignation  → ALTER TABLE ... ADD COLUMN (+ CREATE INDEX si indexé)
//   ViewPlan     → CREATE VIEW v_<classe> AS SELECT ... JOIN ...
//   Association  → CREATE TABLE association.<nom> (origin_id, target_id)
//   Bootstrap    → les zones catalogue / données / arêtes / permissions
//
// Le DML (catalogue, objets, arêtes, permissions) est dans `dml`.
//
// Le trait SqlDialect isole les différences entre moteurs : types,
// placeholders, et surtout le NOMMAGE des zones. PostgreSQL a de vrais
// schémas ("data"."person") ; SQLite n'en a pas, on préfixe ("data_person").
//
// =============================================================================

pub mod dml;

use crate::backend::{SchemaManager, Statement};
use crate::core::hierarchy::ViewPlan;
use crate::core::metamodel::{Association, Attribute, AttributeAssignment, Class};
use crate::core::validate::{IDENTITY_COLUMN, META_TABLE};
use crate::core::value::BaseType;

/// Les zones de la base relationnelle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    /// Catalogue : classes, attributs, assignations, associations
    Structure,
    /// Une table par classe, plus `meta`
    Data,
    /// Une table d'arêtes par association
    Association,
    /// Utilisateurs, groupes, permissions
    Permission,
}

impl Area {
    pub const ALL: [Area; 4] = [Area::Structure, Area::Data, Area::Association, Area::Permission];

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Structure => "structure",
            Area::Data => "data",
            Area::Association => "association",
            Area::Permission => "permission",
        }
    }
}

/// Dialecte SQL — les différences entre les moteurs SQL.
pub trait SqlDialect {
    /// Traduit un BaseType en type SQL natif (`Custom` passe tel quel)
    fn type_to_sql(&self, ty: &BaseType) -> String;

    /// Type pour les clés primaires auto-incrémentées du catalogue
    fn auto_id_type(&self) -> String;

    /// Type de la colonne d'identité des objets
    fn object_id_type(&self) -> String;

    /// Nom du dialecte
    fn dialect_name(&self) -> String;

    /// Nom complet d'une table dans une zone
    fn qualify(&self, area: Area, table: &str) -> String;

    /// Placeholder du n-ième paramètre (à partir de 1)
    fn placeholder(&self, index: usize) -> String;

    /// DDL qui crée une zone, si le moteur en a la notion
    fn create_area(&self, _area: Area) -> Option<String> {
        None
    }

    /// Contrainte d'une colonne non nullable ajoutée par ALTER TABLE
    fn not_null_constraint(&self, _column: &str, _has_default: bool) -> String {
        " NOT NULL".to_string()
    }

    /// Quote un identifiant (table, colonne)
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

// ─── PostgreSQL ──────────────────────────────────────────────────────────────

pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn type_to_sql(&self, ty: &BaseType) -> String {
        match ty {
            BaseType::String => "TEXT".to_string(),
            BaseType::Integer => "BIGINT".to_string(),
            BaseType::Float => "DOUBLE PRECISION".to_string(),
            BaseType::Boolean => "BOOLEAN".to_string(),
            BaseType::Custom(name) => name.clone(),
        }
    }

    fn auto_id_type(&self) -> String {
        "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY".to_string()
    }

    fn object_id_type(&self) -> String {
        "UUID".to_string()
    }

    fn dialect_name(&self) -> String {
        "PostgreSQL".to_string()
    }

    fn qualify(&self, area: Area, table: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(area.as_str()),
            self.quote_identifier(table)
        )
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn create_area(&self, area: Area) -> Option<String> {
        Some(format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            self.quote_identifier(area.as_str())
        ))
    }
}

// ─── SQLite ──────────────────────────────────────────────────────────────────
//
// Pas de schémas nommés exploitables dans une vue (une vue ne peut pas
// référencer une base attachée) : les zones deviennent des préfixes.
//

pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn type_to_sql(&self, ty: &BaseType) -> String {
        match ty {
            BaseType::String => "TEXT".to_string(),
            BaseType::Integer => "INTEGER".to_string(),
            BaseType::Float => "REAL".to_string(),
            BaseType::Boolean => "BOOLEAN".to_string(),
            BaseType::Custom(name) => name.clone(),
        }
    }

    fn auto_id_type(&self) -> String {
        "INTEGER PRIMARY KEY AUTOINCREMENT".to_string()
    }

    fn object_id_type(&self) -> String {
        "TEXT".to_string()
    }

    fn dialect_name(&self) -> String {
        "SQLite".to_string()
    }

    fn qualify(&self, area: Area, table: &str) -> String {
        self.quote_identifier(&format!("{}_{}", area.as_str(), table))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    // ADD COLUMN ... NOT NULL exige un défaut non NULL ; un CHECK, lui,
    // est vérifié sur les lignes existantes puis à chaque écriture.
    fn not_null_constraint(&self, column: &str, has_default: bool) -> String {
        if has_default {
            " NOT NULL".to_string()
        } else {
            format!(" CHECK ({} IS NOT NULL)", self.quote_identifier(column))
        }
    }
}

// ─── Backend SQL générique ───────────────────────────────────────────────────

/// Backend SQL générique, paramétré par un dialecte.
pub struct SqlBackend<D: SqlDialect> {
    pub dialect: D,
}

impl<D: SqlDialect> SqlBackend<D> {
    pub fn new(dialect: D) -> Self {
        SqlBackend { dialect }
    }

    /// Nom complet d'une table
    pub fn table(&self, area: Area, name: &str) -> String {
        self.dialect.qualify(area, name)
    }

    /// Nom de colonne quoté
    pub fn column(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    /// `n` placeholders consécutifs à partir de `start`
    pub(crate) fn placeholders(&self, start: usize, n: usize) -> Vec<String> {
        (start..start + n).map(|i| self.dialect.placeholder(i)).collect()
    }

    fn data_table(&self, class: &Class) -> String {
        self.table(Area::Data, &class.name)
    }

    fn create_table_sql(&self, table: String, columns: Vec<String>) -> Statement {
        Statement::ddl(format!("CREATE TABLE {} (\n  {}\n)", table, columns.join(",\n  ")))
    }

    /// Le DDL de provisionnement : toutes les zones et tables fixes.
    ///
    /// Ordre imposé par les clés étrangères : catalogue, utilisateurs et
    /// groupes, métadonnées d'objets, puis permissions.
    pub fn bootstrap(&self) -> Vec<Statement> {
        let id = self.column(IDENTITY_COLUMN);
        let auto_id = self.dialect.auto_id_type();
        let object_id = self.dialect.object_id_type();
        let class_table = self.table(Area::Structure, "class");
        let attribute_table = self.table(Area::Structure, "attribute");
        let association_table = self.table(Area::Structure, "association");
        let user_table = self.table(Area::Permission, "user");
        let group_table = self.table(Area::Permission, "group");
        let meta_table = self.table(Area::Data, META_TABLE);

        let mut stmts: Vec<Statement> = Area::ALL
            .iter()
            .filter_map(|area| self.dialect.create_area(*area))
            .map(Statement::ddl)
            .collect();

        stmts.push(self.create_table_sql(
            class_table.clone(),
            vec![
                format!("{} {}", id, auto_id),
                format!("{} TEXT NOT NULL UNIQUE", self.column("name")),
                format!("{} BIGINT REFERENCES {}({})", self.column("parent_id"), class_table, id),
            ],
        ));
        stmts.push(self.create_table_sql(
            attribute_table.clone(),
            vec![
                format!("{} {}", id, auto_id),
                format!("{} TEXT NOT NULL UNIQUE", self.column("name")),
                format!("{} TEXT NOT NULL", self.column("generator")),
                format!("{} BOOLEAN NOT NULL", self.column("indexed")),
            ],
        ));
        stmts.push(self.create_table_sql(
            self.table(Area::Structure, "attribute_assignment"),
            vec![
                format!("{} BIGINT NOT NULL REFERENCES {}({})", self.column("class_id"), class_table, id),
                format!(
                    "{} BIGINT NOT NULL UNIQUE REFERENCES {}({})",
                    self.column("attribute_id"),
                    attribute_table,
                    id
                ),
                format!("{} BOOLEAN NOT NULL", self.column("nullable")),
                format!("{} TEXT", self.column("default")),
                format!(
                    "PRIMARY KEY ({}, {})",
                    self.column("class_id"),
                    self.column("attribute_id")
                ),
            ],
        ));
        stmts.push(self.create_table_sql(
            association_table.clone(),
            vec![
                format!("{} {}", id, auto_id),
                format!("{} TEXT NOT NULL UNIQUE", self.column("name")),
                format!(
                    "{} BIGINT NOT NULL REFERENCES {}({})",
                    self.column("origin_class_id"),
                    class_table,
                    id
                ),
                format!(
                    "{} BIGINT NOT NULL REFERENCES {}({})",
                    self.column("target_class_id"),
                    class_table,
                    id
                ),
            ],
        ));
        stmts.push(self.create_table_sql(
            user_table.clone(),
            vec![
                format!("{} {}", id, auto_id),
                format!("{} TEXT NOT NULL UNIQUE", self.column("name")),
            ],
        ));
        stmts.push(self.create_table_sql(
            group_table.clone(),
            vec![
                format!("{} {}", id, auto_id),
                format!("{} TEXT NOT NULL UNIQUE", self.column("name")),
                format!("{} BIGINT REFERENCES {}({})", self.column("parent_id"), group_table, id),
            ],
        ));
        stmts.push(self.create_table_sql(
            self.table(Area::Permission, "user_assignment"),
            vec![
                format!("{} BIGINT NOT NULL REFERENCES {}({})", self.column("user_id"), user_table, id),
                format!("{} BIGINT NOT NULL REFERENCES {}({})", self.column("group_id"), group_table, id),
                format!("PRIMARY KEY ({}, {})", self.column("user_id"), self.column("group_id")),
            ],
        ));
        stmts.push(self.create_table_sql(
            meta_table.clone(),
            vec![
                format!("{} {} PRIMARY KEY", id, object_id),
                format!("{} BIGINT NOT NULL REFERENCES {}({})", self.column("class_id"), class_table, id),
                format!("{} BIGINT REFERENCES {}({})", self.column("creator_id"), user_table, id),
            ],
        ));

        let grants = [
            ("class_assignment", "class_id", "BIGINT".to_string(), class_table),
            ("association_assignment", "association_id", "BIGINT".to_string(), association_table),
            ("object_assignment", "object_id", object_id, meta_table),
        ];
        for (table, subject_column, subject_type, subject_table) in grants {
            stmts.push(self.create_table_sql(
                self.table(Area::Permission, table),
                vec![
                    format!(
                        "{} {} NOT NULL REFERENCES {}({})",
                        self.column(subject_column),
                        subject_type,
                        subject_table,
                        id
                    ),
                    format!("{} BIGINT NOT NULL REFERENCES {}({})", self.column("group_id"), group_table, id),
                    format!("{} BOOLEAN NOT NULL DEFAULT FALSE", self.column("read")),
                    format!("{} BOOLEAN NOT NULL DEFAULT FALSE", self.column("write")),
                    format!("{} BOOLEAN NOT NULL DEFAULT FALSE", self.column("delete")),
                    format!("{} BOOLEAN NOT NULL DEFAULT FALSE", self.column("administration")),
                    format!(
                        "PRIMARY KEY ({}, {})",
                        self.column(subject_column),
                        self.column("group_id")
                    ),
                ],
            ));
        }

        stmts
    }
}

impl<D: SqlDialect> SchemaManager for SqlBackend<D> {
    fn create_table(&self, class: &Class, parent: Option<&Class>) -> Vec<Statement> {
        let id = self.column(IDENTITY_COLUMN);
        // La racine est liée à data.meta, les autres à la table du parent
        let referenced = match parent {
            Some(parent) => self.data_table(parent),
            None => self.table(Area::Data, META_TABLE),
        };
        vec![self.create_table_sql(
            self.data_table(class),
            vec![format!(
                "{} {} PRIMARY KEY REFERENCES {}({})",
                id,
                self.dialect.object_id_type(),
                referenced,
                id
            )],
        )]
    }

    fn add_column(
        &self,
        class: &Class,
        attribute: &Attribute,
        assignment: &AttributeAssignment,
    ) -> Vec<Statement> {
        let mut definition = format!(
            "{} {}",
            self.column(&attribute.name),
            self.dialect.type_to_sql(&attribute.storage_type)
        );
        if !assignment.nullable {
            definition.push_str(
                &self
                    .dialect
                    .not_null_constraint(&attribute.name, assignment.default.is_some()),
            );
        }
        if let Some(default) = &assignment.default {
            definition.push_str(&format!(" DEFAULT {}", default));
        }
        vec![Statement::ddl(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.data_table(class),
            definition
        ))]
    }

    fn create_index(&self, class: &Class, attribute: &Attribute) -> Vec<Statement> {
        let index_name = format!("idx_{}_{}", class.name, attribute.name);
        vec![Statement::ddl(format!(
            "CREATE INDEX {} ON {} ({})",
            self.column(&index_name),
            self.data_table(class),
            self.column(&attribute.name)
        ))]
    }

    fn create_or_replace_view(&self, plan: &ViewPlan) -> Vec<Statement> {
        let id = self.column(IDENTITY_COLUMN);
        let anchor = self.table(Area::Data, plan.anchor());

        let mut projection = vec![format!("{}.{}", anchor, id)];
        projection.extend(plan.columns().map(|(class_name, column)| {
            format!("{}.{}", self.table(Area::Data, class_name), self.column(column))
        }));

        let joins: Vec<String> = plan
            .levels
            .iter()
            .skip(1)
            .map(|level| {
                let table = self.table(Area::Data, &level.class_name);
                format!("JOIN {} ON {}.{} = {}.{}", table, anchor, id, table, id)
            })
            .collect();

        let mut select = format!("SELECT {} FROM {}", projection.join(", "), anchor);
        for join in joins {
            select.push(' ');
            select.push_str(&join);
        }

        // DROP + CREATE : les colonnes d'un ancêtre peuvent s'insérer au
        // milieu de la projection, ce que CREATE OR REPLACE refuse.
        let view = self.column(&plan.view_name);
        vec![
            Statement::ddl(format!("DROP VIEW IF EXISTS {}", view)),
            Statement::ddl(format!("CREATE VIEW {} AS {}", view, select)),
        ]
    }

    fn create_edge_table(
        &self,
        association: &Association,
        origin: &Class,
        target: &Class,
    ) -> Vec<Statement> {
        let id = self.column(IDENTITY_COLUMN);
        let object_id = self.dialect.object_id_type();
        vec![self.create_table_sql(
            self.table(Area::Association, &association.name),
            vec![
                format!(
                    "{} {} NOT NULL REFERENCES {}({})",
                    self.column("origin_id"),
                    object_id,
                    self.data_table(origin),
                    id
                ),
                format!(
                    "{} {} NOT NULL REFERENCES {}({})",
                    self.column("target_id"),
                    object_id,
                    self.data_table(target),
                    id
                ),
                format!(
                    "PRIMARY KEY ({}, {})",
                    self.column("origin_id"),
                    self.column("target_id")
                ),
            ],
        )]
    }

    fn name(&self) -> &str {
        "SQL"
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metamodel::{AssociationId, AttributeId, ClassId};

    fn object_class() -> Class {
        Class::new(ClassId(1), "object", None)
    }

    fn person_class() -> Class {
        Class::new(ClassId(2), "person", Some(ClassId(1)))
    }

    fn joined(stmts: &[Statement]) -> String {
        stmts.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_postgres_qualifies_with_schema() {
        let backend = SqlBackend::new(PostgresDialect);
        assert_eq!(backend.table(Area::Data, "person"), "\"data\".\"person\"");
        assert_eq!(backend.dialect.placeholder(2), "$2");
    }

    #[test]
    fn test_sqlite_flattens_areas() {
        let backend = SqlBackend::new(SqliteDialect);
        assert_eq!(backend.table(Area::Data, "person"), "\"data_person\"");
        assert_eq!(backend.dialect.placeholder(2), "?2");
    }

    #[test]
    fn test_root_table_references_meta() {
        let backend = SqlBackend::new(PostgresDialect);
        let sql = joined(&backend.create_table(&object_class(), None));
        assert!(sql.contains("CREATE TABLE \"data\".\"object\""));
        assert!(sql.contains("REFERENCES \"data\".\"meta\"(\"id\")"));
    }

    #[test]
    fn test_child_table_references_parent() {
        let backend = SqlBackend::new(SqliteDialect);
        let parent = object_class();
        let sql = joined(&backend.create_table(&person_class(), Some(&parent)));
        assert!(sql.contains("CREATE TABLE \"data_person\""));
        assert!(sql.contains("\"id\" TEXT PRIMARY KEY REFERENCES \"data_object\"(\"id\")"));
    }

    #[test]
    fn test_add_column_not_null_with_default() {
        let backend = SqlBackend::new(PostgresDialect);
        let attribute = Attribute::new(AttributeId(1), "created", BaseType::custom("TIMESTAMPTZ"), true);
        let assignment = AttributeAssignment {
            class_id: ClassId(1),
            attribute_id: AttributeId(1),
            nullable: false,
            default: Some("CURRENT_TIMESTAMP".into()),
        };
        let sql = joined(&backend.add_column(&object_class(), &attribute, &assignment));
        assert_eq!(
            sql,
            "ALTER TABLE \"data\".\"object\" ADD COLUMN \"created\" TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP"
        );

        let index = joined(&backend.create_index(&object_class(), &attribute));
        assert_eq!(index, "CREATE INDEX \"idx_object_created\" ON \"data\".\"object\" (\"created\")");
    }

    #[test]
    fn test_sqlite_not_null_without_default_is_a_check() {
        let backend = SqlBackend::new(SqliteDialect);
        let attribute = Attribute::new(AttributeId(1), "name", BaseType::String, false);
        let mut assignment = AttributeAssignment {
            class_id: ClassId(2),
            attribute_id: AttributeId(1),
            nullable: false,
            default: None,
        };
        let sql = joined(&backend.add_column(&person_class(), &attribute, &assignment));
        assert_eq!(
            sql,
            "ALTER TABLE \"data_person\" ADD COLUMN \"name\" TEXT CHECK (\"name\" IS NOT NULL)"
        );

        assignment.default = Some("'anonymous'".into());
        let sql = joined(&backend.add_column(&person_class(), &attribute, &assignment));
        assert!(sql.ends_with("TEXT NOT NULL DEFAULT 'anonymous'"));
    }

    #[test]
    fn test_view_joins_every_level_on_anchor() {
        let backend = SqlBackend::new(SqliteDialect);
        let tree = vec![object_class(), person_class()];
        let plan = ViewPlan::build("v_person", &tree, |class| {
            Ok(if class.name == "object" {
                vec!["tag".to_string()]
            } else {
                vec!["name".to_string()]
            })
        })
        .unwrap();

        let stmts = backend.create_or_replace_view(&plan);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].sql, "DROP VIEW IF EXISTS \"v_person\"");
        assert_eq!(
            stmts[1].sql,
            "CREATE VIEW \"v_person\" AS SELECT \"data_object\".\"id\", \"data_object\".\"tag\", \
             \"data_person\".\"name\" FROM \"data_object\" \
             JOIN \"data_person\" ON \"data_object\".\"id\" = \"data_person\".\"id\""
        );
    }

    #[test]
    fn test_root_view_has_no_join() {
        let backend = SqlBackend::new(PostgresDialect);
        let plan = ViewPlan::build("v_object", &[object_class()], |_| Ok(vec![])).unwrap();
        let sql = joined(&backend.create_or_replace_view(&plan));
        assert!(!sql.contains("JOIN"));
        assert!(sql.contains("SELECT \"data\".\"object\".\"id\" FROM \"data\".\"object\""));
    }

    #[test]
    fn test_edge_table() {
        let backend = SqlBackend::new(PostgresDialect);
        let address = Class::new(ClassId(3), "address", Some(ClassId(1)));
        let association = Association::new(AssociationId(1), "person_to_address", ClassId(2), ClassId(3));
        let sql = joined(&backend.create_edge_table(&association, &person_class(), &address));
        assert!(sql.contains("CREATE TABLE \"association\".\"person_to_address\""));
        assert!(sql.contains("PRIMARY KEY (\"origin_id\", \"target_id\")"));
        assert!(sql.contains("REFERENCES \"data\".\"address\"(\"id\")"));
    }

    #[test]
    fn test_postgres_bootstrap_creates_schemas_first() {
        let backend = SqlBackend::new(PostgresDialect);
        let stmts = backend.bootstrap();
        for (i, area) in Area::ALL.iter().enumerate() {
            assert!(stmts[i].sql.contains(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", area.as_str())));
        }
        let sql = joined(&stmts);
        assert!(sql.contains("\"permission\".\"group\""));
        assert!(sql.contains("BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"));
    }

    #[test]
    fn test_sqlite_bootstrap_has_no_schema() {
        let backend = SqlBackend::new(SqliteDialect);
        let sql = joined(&backend.bootstrap());
        assert!(!sql.contains("CREATE SCHEMA"));
        assert!(sql.contains("CREATE TABLE \"data_meta\""));
        assert!(sql.contains("INTEGER PRIMARY KEY AUTOINCREMENT"));
    }
}
