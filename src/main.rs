// =============================================================================
// METARUST — Point d'entrée : démonstration du moteur de métamodèle
// =============================================================================
//
// Ce main.rs montre un exemple complet :
//   1. Provisionner la base (zones + utilisateur root)
//   2. Définir une hiérarchie object → person / address
//   3. Créer, lire et modifier des objets
//   4. Relier les objets par une association
//   5. Accorder des permissions à un arbre de groupes
//
// Avec `dialect = "postgres"`, le script de provisionnement est affiché
// au lieu d'être exécuté : la session PostgreSQL appartient à l'hôte.
//
// Usage : metarust [chemin/vers/metarust.toml]
//
// =============================================================================

use std::process::ExitCode;

use metarust::backend::sql::{PostgresDialect, SqlBackend, SqliteDialect};
use metarust::backend::sqlite::SqliteSession;
use metarust::config::{DialectKind, EngineConfig};
use metarust::core::metamodel::UserId;
use metarust::core::permission::{PermissionFlags, Subject};
use metarust::core::value::{BaseType, Value};
use metarust::logging::init_logging;
use metarust::{provision, MetaError, MetaResult, UserInterface};
use tracing::error;

fn main() -> ExitCode {
    let cli_path = std::env::args().nth(1);
    let config = match EngineConfig::from_sources(cli_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    let result = match config.dialect {
        DialectKind::Postgres => {
            print_postgres_script();
            Ok(())
        }
        DialectKind::Sqlite => run_demo(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn print_postgres_script() {
    println!("═══ Provisionnement PostgreSQL ═══\n");
    let backend = SqlBackend::new(PostgresDialect);
    for statement in backend.bootstrap() {
        println!("{};\n", statement);
    }
}

/// La démonstration définit ses propres classes : elle exige une base neuve.
fn provision_for_demo(config: &EngineConfig, session: &mut SqliteSession) -> MetaResult<UserId> {
    if !config.provision {
        return Err(MetaError::Config(
            "the demo defines its own classes and needs a fresh database (provision = true)".to_string(),
        ));
    }
    provision(session, &SqlBackend::new(SqliteDialect))
}

fn run_demo(config: &EngineConfig) -> MetaResult<()> {
    println!("╔══════════════════════════════════════════════════╗");
    println!("║      METARUST — Moteur de métamodèle             ║");
    println!("╚══════════════════════════════════════════════════╝\n");

    let mut session = if config.is_in_memory() {
        SqliteSession::open_in_memory()?
    } else {
        SqliteSession::open(&config.database)?
    };

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 1 : Provisionnement
    // ═══════════════════════════════════════════════════════════
    let root = provision_for_demo(config, &mut session)?;
    println!("✓ Base provisionnée, utilisateur root = {}\n", root);

    let mut ui = UserInterface::new(root, session).with_view_prefix(&config.view_prefix);

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 2 : Hiérarchie de classes
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 2 : Classes et attributs ═══\n");

    let object = ui.create_class("object", None)?;
    let person = ui.create_class("person", Some(&object))?;
    let address = ui.create_class("address", Some(&object))?;

    let tag = ui.create_attribute("tag", BaseType::String, false)?;
    let first_name = ui.create_attribute("first_name", BaseType::String, true)?;
    let last_name = ui.create_attribute("last_name", BaseType::String, true)?;
    let street = ui.create_attribute("street", BaseType::String, false)?;
    let city = ui.create_attribute("city", BaseType::String, false)?;

    ui.assign_attribute(&tag, &object, true, None)?;
    ui.assign_attribute(&first_name, &person, false, None)?;
    ui.assign_attribute(&last_name, &person, false, None)?;
    ui.assign_attribute(&street, &address, true, None)?;
    ui.assign_attribute(&city, &address, true, Some("'Berlin'"))?;

    for class in [&object, &person, &address] {
        let names: Vec<String> = ui
            .get_assigned_attributes(class)?
            .into_iter()
            .map(|a| a.name)
            .collect();
        println!("  {} → {}", class, names.join(", "));
    }
    println!();

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 3 : Objets
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 3 : Objets ═══\n");

    let fred = ui.create_object(
        &person,
        [
            ("first_name", Value::from("Fred")),
            ("last_name", Value::from("Schlonz")),
            ("tag", Value::from("vip")),
            ("shoe_size", Value::from(44_i64)),
        ],
    )?;
    let home = ui.create_object(&address, [("street", "Hauptstraße 1")])?;

    let mut fred = ui.get_object(fred.id, &person)?;
    println!("{}\n", fred.dump(&person.name));

    ui.modify(&mut fred, [("first_name", "Bob")])?;
    let bob = ui.get_object(fred.id, &person)?;
    println!("{}\n", bob.dump(&person.name));

    let home = ui.get_object(home.id, &address)?;
    println!("{}\n", home.dump(&address.name));

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 4 : Associations
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 4 : Associations ═══\n");

    let lives_at = ui.create_association("person_to_address", &person, &address)?;
    ui.bind(&bob, Some(&home), &lives_at, false)?;
    let found = ui.hop1(&bob, "person_to_address")?;
    println!("  {} ──{}──▶ {}\n", bob.id, lives_at, found.id);

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 5 : Permissions
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 5 : Permissions ═══\n");

    let public = ui.create_group("public", None)?;
    let admin = ui.create_group("admin", Some(&public))?;
    ui.grant_class(&person, &public, PermissionFlags::new(true, false, false, false))?;
    ui.grant_object(&bob, &admin, PermissionFlags::new(true, true, false, false))?;

    let alice = ui.create_user("alice")?;
    ui.assign_user_to_group(alice, &admin)?;
    let on_class = ui.effective_permissions(alice, Subject::Class(person.id))?;
    let on_object = ui.effective_permissions(alice, Subject::Object(bob.id))?;
    println!("  alice sur la classe person : {}", on_class);
    println!("  alice sur l'objet {} : {}\n", bob.id, on_object);

    ui.commit()?;
    println!("✓ Transaction validée");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_refuses_unprovisioned_database() {
        let config = EngineConfig {
            provision: false,
            ..EngineConfig::default()
        };
        let mut session = SqliteSession::open_in_memory().unwrap();
        assert!(matches!(
            provision_for_demo(&config, &mut session),
            Err(MetaError::Config(_))
        ));
    }

    #[test]
    fn test_demo_provisions_fresh_database() {
        let config = EngineConfig::default();
        let mut session = SqliteSession::open_in_memory().unwrap();
        assert!(provision_for_demo(&config, &mut session).is_ok());
    }
}
