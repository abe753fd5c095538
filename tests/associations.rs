mod common;

use common::interface;
use metarust::backend::sqlite::SqliteSession;
use metarust::core::metamodel::{Association, Class};
use metarust::core::object::Object;
use metarust::core::value::{BaseType, Value};
use metarust::error::EntityKind;
use metarust::{MetaError, UserInterface};

struct Fixture {
    ui: UserInterface<SqliteSession>,
    person: Class,
    address: Class,
    lives_at: Association,
}

/// object → person, object → address ; person ──lives_at──▶ address
fn fixture() -> Fixture {
    let mut ui = interface();
    let object = ui.create_class("object", None).unwrap();
    let person = ui.create_class("person", Some(&object)).unwrap();
    let address = ui.create_class("address", Some(&object)).unwrap();
    let street = ui.create_attribute("street", BaseType::String, false).unwrap();
    ui.assign_attribute(&street, &address, true, None).unwrap();
    let lives_at = ui.create_association("lives_at", &person, &address).unwrap();
    Fixture {
        ui,
        person,
        address,
        lives_at,
    }
}

fn new_address(f: &mut Fixture, street: &str) -> Object {
    let address = f.address.clone();
    f.ui.create_object(&address, [("street", street)]).unwrap()
}

fn new_person(f: &mut Fixture) -> Object {
    let person = f.person.clone();
    f.ui.create_object(&person, Vec::<(String, Value)>::new()).unwrap()
}

fn target_ids(targets: &[Object]) -> Vec<String> {
    targets.iter().map(|o| o.id.to_string()).collect()
}

#[test]
fn test_bind_then_hop_contains_target_once() {
    let mut f = fixture();
    let fred = new_person(&mut f);
    let home = new_address(&mut f, "Elm Street");
    let lives_at = f.lives_at.clone();

    f.ui.bind(&fred, Some(&home), &lives_at, false).unwrap();
    let targets = f.ui.hop(&fred, &lives_at).unwrap();

    assert_eq!(target_ids(&targets), vec![home.id.to_string()]);
    assert_eq!(targets[0].get("street"), Some(&Value::from("Elm Street")));
    assert_eq!(targets[0].class_id, f.address.id);
}

#[test]
fn test_rebind_replaces_prior_edge() {
    let mut f = fixture();
    let fred = new_person(&mut f);
    let old_home = new_address(&mut f, "Elm Street");
    let new_home = new_address(&mut f, "Oak Avenue");

    f.ui.bind(&fred, Some(&old_home), "lives_at", false).unwrap();
    f.ui.bind(&fred, Some(&new_home), "lives_at", true).unwrap();

    let targets = f.ui.hop(&fred, "lives_at").unwrap();
    assert_eq!(target_ids(&targets), vec![new_home.id.to_string()]);
}

#[test]
fn test_bind_without_rebind_accumulates() {
    let mut f = fixture();
    let fred = new_person(&mut f);
    let first = new_address(&mut f, "Elm Street");
    let second = new_address(&mut f, "Oak Avenue");

    f.ui.bind(&fred, Some(&first), "lives_at", false).unwrap();
    f.ui.bind(&fred, Some(&second), "lives_at", false).unwrap();

    let mut ids = target_ids(&f.ui.hop(&fred, "lives_at").unwrap());
    ids.sort();
    let mut expected = vec![first.id.to_string(), second.id.to_string()];
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn test_rebind_to_nothing_clears_edges() {
    let mut f = fixture();
    let fred = new_person(&mut f);
    let home = new_address(&mut f, "Elm Street");

    f.ui.bind(&fred, Some(&home), "lives_at", false).unwrap();
    f.ui.bind(&fred, None, "lives_at", true).unwrap();

    assert!(f.ui.hop(&fred, "lives_at").unwrap().is_empty());
}

#[test]
fn test_unbind_removes_exact_edge() {
    let mut f = fixture();
    let fred = new_person(&mut f);
    let first = new_address(&mut f, "Elm Street");
    let second = new_address(&mut f, "Oak Avenue");
    f.ui.bind(&fred, Some(&first), "lives_at", false).unwrap();
    f.ui.bind(&fred, Some(&second), "lives_at", false).unwrap();

    f.ui.unbind(&fred, &first, "lives_at").unwrap();
    let targets = f.ui.hop(&fred, "lives_at").unwrap();
    assert_eq!(target_ids(&targets), vec![second.id.to_string()]);

    // Arête absente : sans effet
    f.ui.unbind(&fred, &first, "lives_at").unwrap();
    assert_eq!(f.ui.hop(&fred, "lives_at").unwrap().len(), 1);
}

#[test]
fn test_hop1_returns_target_or_empty_traversal() {
    let mut f = fixture();
    let fred = new_person(&mut f);
    let homeless = new_person(&mut f);
    let home = new_address(&mut f, "Elm Street");
    f.ui.bind(&fred, Some(&home), "lives_at", false).unwrap();

    assert_eq!(f.ui.hop1(&fred, "lives_at").unwrap().id, home.id);
    match f.ui.hop1(&homeless, "lives_at") {
        Err(MetaError::EmptyTraversal { association }) => assert_eq!(association, "lives_at"),
        other => panic!("expected EmptyTraversal, got {:?}", other),
    }
}

#[test]
fn test_association_lookup() {
    let mut f = fixture();
    let by_name = f.ui.get_association_by_name("lives_at").unwrap();
    assert_eq!(by_name, f.lives_at);
    assert_eq!(f.ui.get_association_by_id(f.lives_at.id).unwrap(), f.lives_at);

    let fred = new_person(&mut f);
    assert!(matches!(
        f.ui.hop(&fred, "works_at"),
        Err(MetaError::NotFound {
            kind: EntityKind::Association,
            ..
        })
    ));
}

#[test]
fn test_duplicate_association_rejected() {
    let mut f = fixture();
    let person = f.person.clone();
    let address = f.address.clone();
    assert!(matches!(
        f.ui.create_association("lives_at", &person, &address),
        Err(MetaError::ConstraintViolation(_))
    ));
}

#[test]
fn test_edge_requires_objects_of_declared_classes() {
    let mut f = fixture();
    let fred = new_person(&mut f);
    let other = new_person(&mut f);
    // `other` n'a pas de ligne dans data_address
    let result = f.ui.bind(&fred, Some(&other), "lives_at", false);
    assert!(matches!(result, Err(MetaError::Storage(_))));
}
