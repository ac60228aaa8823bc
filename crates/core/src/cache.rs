//! Bounded page-bundle cache with insertion-order eviction.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::bundle::PageBundle;

/// Maps canonical URLs to bundles. Eviction follows insertion order only;
/// lookups never promote an entry.
#[derive(Debug)]
pub struct NavigationCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, Rc<PageBundle>>,
}

impl NavigationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, url: &str) -> Option<Rc<PageBundle>> {
        self.entries.get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Insert under the bundle's own URL. Replacing an existing key keeps its
    /// original position in the eviction order.
    pub fn put(&mut self, bundle: Rc<PageBundle>) {
        if self.capacity == 0 {
            return;
        }
        let key = bundle.url.clone();
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = bundle;
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, bundle);
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached URLs, oldest first.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(url: &str) -> Rc<PageBundle> {
        Rc::new(PageBundle {
            url: url.to_string(),
            title: url.to_string(),
            content_html: String::new(),
            inline_styles: Vec::new(),
            stylesheets: Vec::new(),
            scripts: Vec::new(),
            extras: Vec::new(),
        })
    }

    #[test]
    fn eviction_follows_insertion_order() {
        let mut cache = NavigationCache::new(2);
        cache.put(bundle("https://a.test/1"));
        cache.put(bundle("https://a.test/2"));
        // Reading the oldest entry must not save it from eviction.
        assert!(cache.get("https://a.test/1").is_some());
        cache.put(bundle("https://a.test/3"));
        assert!(!cache.contains("https://a.test/1"));
        assert!(cache.contains("https://a.test/2"));
        assert!(cache.contains("https://a.test/3"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut cache = NavigationCache::new(10);
        for i in 0..25 {
            cache.put(bundle(&format!("https://a.test/{i}")));
            assert!(cache.len() <= 10);
        }
        let urls: Vec<&str> = cache.urls().collect();
        assert_eq!(urls.first(), Some(&"https://a.test/15"));
        assert_eq!(urls.last(), Some(&"https://a.test/24"));
    }

    #[test]
    fn replacing_keeps_position() {
        let mut cache = NavigationCache::new(2);
        cache.put(bundle("https://a.test/1"));
        cache.put(bundle("https://a.test/2"));
        let mut newer = (*bundle("https://a.test/1")).clone();
        newer.title = "fresh".to_string();
        cache.put(Rc::new(newer));
        assert_eq!(cache.get("https://a.test/1").unwrap().title, "fresh");
        cache.put(bundle("https://a.test/3"));
        assert!(!cache.contains("https://a.test/1"));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = NavigationCache::new(0);
        cache.put(bundle("https://a.test/1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties() {
        let mut cache = NavigationCache::new(3);
        cache.put(bundle("https://a.test/1"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.urls().count(), 0);
    }
}
