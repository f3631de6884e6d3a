use crate::core::types::{Champion, Device};

/// Anything that can be found by id or by name
pub trait Named {
    fn id(&self) -> u64;
    fn name(&self) -> &str;
}

impl Named for Champion {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Device {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// What to search for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    Id(u64),
    Name(&'a str),
}

impl From<u64> for LookupKey<'_> {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a str> for LookupKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

/// Id and name search over a catalog slice.
///
/// Name search is exact unless `fuzzy` is set, in which case case is ignored.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a, T> {
    items: &'a [T],
}

impl<'a, T: Named> Lookup<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a T> {
        self.items.iter()
    }

    pub fn get(&self, key: LookupKey<'_>, fuzzy: bool) -> Option<&'a T> {
        find(self.items, key, fuzzy)
    }
}

/// First item of `items` matching `key`
pub fn find<'a, T, I>(items: I, key: LookupKey<'_>, fuzzy: bool) -> Option<&'a T>
where
    T: Named + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut items = items.into_iter();
    match key {
        LookupKey::Id(id) => items.find(|item| item.id() == id),
        LookupKey::Name(name) if fuzzy => {
            let name = name.trim().to_lowercase();
            items.find(|item| item.name().to_lowercase() == name)
        }
        LookupKey::Name(name) => items.find(|item| item.name() == name),
    }
}
