//! Values exposed by lifecycle hooks and the ordered maps that carry them.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use super::descriptor::PluginName;

/// Opaque value returned by a plugin's `setup` or `start` hook.
///
/// Dependents recover the concrete API with [`Contract::downcast_ref`].
#[derive(Clone)]
pub struct Contract(Arc<dyn Any + Send + Sync>);

impl Contract {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(value)
    }

    /// A contract for plugins that expose nothing.
    pub fn empty() -> Self {
        Self::new(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is::<()>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    pub fn into_inner(self) -> Arc<dyn Any + Send + Sync> {
        self.0
    }
}

impl Default for Contract {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(s) = self.downcast_ref::<String>() {
            f.debug_tuple("Contract").field(s).finish()
        } else if let Some(s) = self.downcast_ref::<&'static str>() {
            f.debug_tuple("Contract").field(s).finish()
        } else if self.is_empty() {
            f.write_str("Contract(())")
        } else {
            f.write_str("Contract(..)")
        }
    }
}

/// Map that iterates in insertion order.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts at the end, or replaces the value in place if the key exists.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&i) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[i].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Ordered map keyed by plugin id.
pub type PluginMap<V> = OrderedMap<PluginName, V>;

/// Contracts produced by one lifecycle phase, in resolved order.
pub type ContractMap = PluginMap<Contract>;

impl PluginMap<Contract> {
    /// Typed view of one plugin's contract.
    pub fn contract<T: Any>(&self, plugin: &str) -> Option<&T> {
        self.get(plugin).and_then(|c| c.downcast_ref::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_downcast() {
        let contract = Contract::new(String::from("added-as-1"));
        assert_eq!(
            contract.downcast_ref::<String>().map(String::as_str),
            Some("added-as-1")
        );
        assert!(contract.downcast_ref::<u32>().is_none());
        assert!(!contract.is_empty());
        assert!(Contract::empty().is_empty());
    }

    #[test]
    fn test_ordered_map_keeps_insertion_order() {
        let mut map: PluginMap<u32> = PluginMap::new();
        map.insert("order-2".into(), 2);
        map.insert("order-0".into(), 0);
        map.insert("order-1".into(), 1);
        assert_eq!(map.insert("order-0".into(), 10), Some(0));

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["order-2", "order-0", "order-1"]);
        assert_eq!(map.get("order-0"), Some(&10));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_contract_map_typed_access() {
        let mut contracts = ContractMap::new();
        contracts.insert("search".into(), Contract::new(42u64));
        assert_eq!(contracts.contract::<u64>("search"), Some(&42));
        assert_eq!(contracts.contract::<String>("search"), None);
        assert_eq!(contracts.contract::<u64>("missing"), None);
    }
}
