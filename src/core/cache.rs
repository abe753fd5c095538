// =============================================================================
// CACHE — Registres en mémoire, par session
// =============================================================================
//
// Premier niveau de recherche avant le stockage :
//
//   get_class_by_name("person")
//     1. StructureCache  → trouvé ? terminé.
//     2. sinon requête catalogue → stocker dans le cache → retourner
//     3. sinon NotFound
//
// Un DictCache indexe chaque élément par toutes ses clés configurées
// (id, et nom quand l'entité en a un). Pas d'éviction : les entrées vivent
// aussi longtemps que la session. Stocker deux fois le même id remplace
// l'entrée précédente.
//
// Les caches ne sont PAS partagés entre sessions et ne sont pas prévus pour
// des mutations concurrentes : un cache appartient à une interface.
//
// =============================================================================

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use super::metamodel::{
    Association, AssociationId, Attribute, AttributeAssignment, AttributeId, Class, ClassId, Group,
    GroupId,
};
use super::object::ObjectId;
use super::permission::{PermissionDefinition, PermissionFlags, Subject};

/// Une entité indexable dans un DictCache.
pub trait Indexed {
    type Id: Copy + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;

    /// Nom unique, pour les entités qui en ont un
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Clé de recherche : (type de clé, valeur) réunis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a, I> {
    Id(I),
    Name(&'a str),
}

/// Dictionnaire multi-clés.
#[derive(Debug, Clone)]
pub struct DictCache<T: Indexed> {
    by_id: HashMap<T::Id, T>,
    /// `None` quand le cache n'est indexé que par id
    by_name: Option<HashMap<String, T::Id>>,
}

impl<T: Indexed> DictCache<T> {
    /// Cache indexé par id et par nom
    pub fn by_id_and_name() -> Self {
        DictCache {
            by_id: HashMap::new(),
            by_name: Some(HashMap::new()),
        }
    }

    /// Cache indexé par id seulement (objets, permissions)
    pub fn by_id() -> Self {
        DictCache {
            by_id: HashMap::new(),
            by_name: None,
        }
    }

    /// Indexe un élément sous toutes ses clés. Remplace l'entrée de même id.
    pub fn store(&mut self, element: T) {
        let id = element.id();
        if let Some(names) = self.by_name.as_mut() {
            if let Some(previous) = self.by_id.get(&id).and_then(|p| p.name()) {
                names.remove(previous);
            }
            if let Some(name) = element.name() {
                names.insert(name.to_string(), id);
            }
        }
        self.by_id.insert(id, element);
    }

    pub fn get(&self, key: Key<'_, T::Id>) -> Option<&T> {
        match key {
            Key::Id(id) => self.by_id.get(&id),
            Key::Name(name) => {
                let id = self.by_name.as_ref()?.get(name)?;
                self.by_id.get(id)
            }
        }
    }

    pub fn contains(&self, key: Key<'_, T::Id>) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Indexed for Class {
    type Id = ClassId;

    fn id(&self) -> ClassId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl Indexed for Attribute {
    type Id = AttributeId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl Indexed for Association {
    type Id = AssociationId;

    fn id(&self) -> AssociationId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl Indexed for Group {
    type Id = GroupId;

    fn id(&self) -> GroupId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl<S: Copy + Eq + Hash + Debug> Indexed for PermissionDefinition<S> {
    type Id = (S, GroupId);

    fn id(&self) -> (S, GroupId) {
        (self.subject, self.group_id)
    }
}

// ─── Cache structurel ────────────────────────────────────────────────────────

/// Classes, attributs et associations de la session.
///
/// Les attributs assignés à une classe sont chargés paresseusement
/// (`assignments`) puis tenus à jour à chaque nouvelle assignation.
#[derive(Debug, Clone)]
pub struct StructureCache {
    classes: DictCache<Class>,
    attributes: DictCache<Attribute>,
    associations: DictCache<Association>,
    assignments: HashMap<ClassId, Vec<AttributeAssignment>>,
}

impl Default for StructureCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureCache {
    pub fn new() -> Self {
        StructureCache {
            classes: DictCache::by_id_and_name(),
            attributes: DictCache::by_id_and_name(),
            associations: DictCache::by_id_and_name(),
            assignments: HashMap::new(),
        }
    }

    pub fn store_class(&mut self, class: Class) {
        self.classes.store(class);
    }

    pub fn get_class(&self, key: Key<'_, ClassId>) -> Option<&Class> {
        self.classes.get(key)
    }

    pub fn contains_class(&self, key: Key<'_, ClassId>) -> bool {
        self.classes.contains(key)
    }

    pub fn store_attribute(&mut self, attribute: Attribute) {
        self.attributes.store(attribute);
    }

    pub fn get_attribute(&self, key: Key<'_, AttributeId>) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    pub fn contains_attribute(&self, key: Key<'_, AttributeId>) -> bool {
        self.attributes.contains(key)
    }

    pub fn store_association(&mut self, association: Association) {
        self.associations.store(association);
    }

    pub fn get_association(&self, key: Key<'_, AssociationId>) -> Option<&Association> {
        self.associations.get(key)
    }

    pub fn contains_association(&self, key: Key<'_, AssociationId>) -> bool {
        self.associations.contains(key)
    }

    /// Attributs assignés à une classe, s'ils ont déjà été chargés
    pub fn get_assignments(&self, class_id: ClassId) -> Option<&[AttributeAssignment]> {
        self.assignments.get(&class_id).map(Vec::as_slice)
    }

    /// Mémorise la liste complète chargée depuis le stockage
    pub fn store_assignments(&mut self, class_id: ClassId, assignments: Vec<AttributeAssignment>) {
        self.assignments.insert(class_id, assignments);
    }

    /// Ajoute une assignation à une liste déjà chargée.
    ///
    /// Si la liste n'a jamais été chargée, on ne fait rien : le prochain
    /// chargement depuis le stockage la contiendra.
    pub fn push_assignment(&mut self, assignment: AttributeAssignment) {
        if let Some(list) = self.assignments.get_mut(&assignment.class_id) {
            list.push(assignment);
        }
    }
}

// ─── Cache des permissions ───────────────────────────────────────────────────

/// Permissions accordées, une table par type de sujet, plus le registre
/// des groupes.
///
/// Des ids identiques dans deux types de sujets ne se heurtent jamais :
/// chaque type a son propre DictCache.
#[derive(Debug, Clone)]
pub struct PermissionCache {
    classes: DictCache<PermissionDefinition<ClassId>>,
    associations: DictCache<PermissionDefinition<AssociationId>>,
    objects: DictCache<PermissionDefinition<ObjectId>>,
    groups: DictCache<Group>,
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionCache {
    pub fn new() -> Self {
        PermissionCache {
            classes: DictCache::by_id(),
            associations: DictCache::by_id(),
            objects: DictCache::by_id(),
            groups: DictCache::by_id_and_name(),
        }
    }

    /// Enregistre une permission. Toujours un nouvel enregistrement à
    /// quatre drapeaux ; le précédent pour (sujet, groupe) est remplacé.
    pub fn store_grant(&mut self, subject: Subject, group_id: GroupId, flags: PermissionFlags) {
        match subject {
            Subject::Class(id) => self.classes.store(PermissionDefinition::new(id, group_id, flags)),
            Subject::Association(id) => self
                .associations
                .store(PermissionDefinition::new(id, group_id, flags)),
            Subject::Object(id) => self.objects.store(PermissionDefinition::new(id, group_id, flags)),
        }
    }

    pub fn get_grant(&self, subject: Subject, group_id: GroupId) -> Option<PermissionFlags> {
        match subject {
            Subject::Class(id) => self.classes.get(Key::Id((id, group_id))).map(|d| d.flags),
            Subject::Association(id) => self
                .associations
                .get(Key::Id((id, group_id)))
                .map(|d| d.flags),
            Subject::Object(id) => self.objects.get(Key::Id((id, group_id))).map(|d| d.flags),
        }
    }

    pub fn contains_grant(&self, subject: Subject, group_id: GroupId) -> bool {
        self.get_grant(subject, group_id).is_some()
    }

    pub fn store_group(&mut self, group: Group) {
        self.groups.store(group);
    }

    pub fn get_group(&self, key: Key<'_, GroupId>) -> Option<&Group> {
        self.groups.get(key)
    }

    pub fn contains_group(&self, key: Key<'_, GroupId>) -> bool {
        self.groups.contains(key)
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::BaseType;

    #[test]
    fn test_store_then_get_by_both_keys() {
        let mut cache = StructureCache::new();
        assert!(!cache.contains_class(Key::Id(ClassId(1))));
        assert!(!cache.contains_class(Key::Name("object")));

        cache.store_class(Class::new(ClassId(1), "object", None));

        assert!(cache.contains_class(Key::Id(ClassId(1))));
        assert!(cache.contains_class(Key::Name("object")));
        assert_eq!(cache.get_class(Key::Name("object")).unwrap().id, ClassId(1));
    }

    #[test]
    fn test_store_same_id_replaces() {
        let mut cache: DictCache<Attribute> = DictCache::by_id_and_name();
        cache.store(Attribute::new(AttributeId(5), "tag", BaseType::String, false));
        cache.store(Attribute::new(AttributeId(5), "label", BaseType::String, true));

        assert_eq!(cache.len(), 1);
        assert!(cache.get(Key::Name("tag")).is_none());
        assert!(cache.get(Key::Name("label")).unwrap().indexed);
    }

    #[test]
    fn test_id_only_cache_ignores_names() {
        let mut cache: DictCache<Group> = DictCache::by_id();
        cache.store(Group::new(GroupId(1), "public", None));
        assert!(cache.contains(Key::Id(GroupId(1))));
        assert!(!cache.contains(Key::Name("public")));
    }

    #[test]
    fn test_assignments_loaded_lazily() {
        let mut cache = StructureCache::new();
        let assignment = AttributeAssignment {
            class_id: ClassId(2),
            attribute_id: AttributeId(9),
            nullable: false,
            default: None,
        };

        // Jamais chargée : push ignoré
        cache.push_assignment(assignment.clone());
        assert!(cache.get_assignments(ClassId(2)).is_none());

        cache.store_assignments(ClassId(2), vec![]);
        cache.push_assignment(assignment);
        assert_eq!(cache.get_assignments(ClassId(2)).unwrap().len(), 1);
    }

    #[test]
    fn test_grant_tables_do_not_collide() {
        let mut cache = PermissionCache::new();
        let read_only = PermissionFlags {
            read: true,
            ..PermissionFlags::default()
        };
        cache.store_grant(Subject::Class(ClassId(3)), GroupId(1), read_only);

        assert!(cache.contains_grant(Subject::Class(ClassId(3)), GroupId(1)));
        assert!(!cache.contains_grant(Subject::Association(AssociationId(3)), GroupId(1)));
    }

    #[test]
    fn test_grant_last_write_wins() {
        let mut cache = PermissionCache::new();
        let subject = Subject::Object(ObjectId::generate());
        cache.store_grant(subject, GroupId(2), PermissionFlags::all());
        cache.store_grant(subject, GroupId(2), PermissionFlags::default());

        assert_eq!(cache.get_grant(subject, GroupId(2)), Some(PermissionFlags::default()));
    }
}
