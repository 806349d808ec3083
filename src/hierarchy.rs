use std::collections::{HashMap, HashSet};

/// Resolves the declaring owner of static members.
pub trait StaticOwnerResolver {
    /// The class that declares `name`+`descriptor` as a static method, walking
    /// up from `owner`. Falls back to `owner` when nothing is known.
    fn static_method_owner(&self, owner: &str, name: &str, descriptor: &str) -> String;

    /// Same lookup for static fields.
    fn static_field_owner(&self, owner: &str, name: &str) -> String;
}

#[derive(Debug, Default, Clone)]
struct ClassEntry {
    super_name: Option<String>,
    static_methods: HashSet<(String, String)>,
    static_fields: HashSet<String>,
}

/// Class index built from the classes of one input program.
#[derive(Debug, Default, Clone)]
pub struct ClassIndex {
    classes: HashMap<String, ClassEntry>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, name: &str, super_name: Option<&str>) {
        let entry = self.classes.entry(name.to_string()).or_default();
        entry.super_name = super_name.map(str::to_string);
    }

    pub fn add_static_method(&mut self, owner: &str, name: &str, descriptor: &str) {
        self.classes
            .entry(owner.to_string())
            .or_default()
            .static_methods
            .insert((name.to_string(), descriptor.to_string()));
    }

    pub fn add_static_field(&mut self, owner: &str, name: &str) {
        self.classes
            .entry(owner.to_string())
            .or_default()
            .static_fields
            .insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    fn walk_up(&self, owner: &str, declares: impl Fn(&ClassEntry) -> bool) -> String {
        let mut current = owner;
        let mut seen = HashSet::new();
        while seen.insert(current) {
            let Some(entry) = self.classes.get(current) else {
                break;
            };
            if declares(entry) {
                return current.to_string();
            }
            match entry.super_name.as_deref() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        owner.to_string()
    }
}

impl StaticOwnerResolver for ClassIndex {
    fn static_method_owner(&self, owner: &str, name: &str, descriptor: &str) -> String {
        let key = (name.to_string(), descriptor.to_string());
        self.walk_up(owner, |entry| entry.static_methods.contains(&key))
    }

    fn static_field_owner(&self, owner: &str, name: &str) -> String {
        self.walk_up(owner, |entry| entry.static_fields.contains(name))
    }
}
