//! Fold server responses into locally held, ordered collections.
//!
//! Every operation takes the old collection and returns the new one. When the
//! server answer does not identify the affected entity the collection is left
//! untouched and the caller is told to refetch.

use std::cmp::Ordering;

use folio_api_types::{BlogPost, Experience, Project, Quote, Resume, Skill};
use time::OffsetDateTime;

/// Entities that can live in an [`OrderedCollection`].
pub trait Reconcilable: Clone + Send + Sync {
    fn entity_id(&self) -> &str;

    /// Display order; `Ordering::Less` puts `a` before `b`. Kinds without a
    /// defined order keep insertion order.
    fn display_order(_a: &Self, _b: &Self) -> Ordering {
        Ordering::Equal
    }
}

/// Client-held list of one entity kind, always in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Reconcilable> OrderedCollection<T> {
    /// Build from a full server listing, applying the display order.
    pub fn from_server(items: Vec<T>) -> Self {
        let mut collection = Self { items };
        collection.sort();
        collection
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.entity_id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn sort(&mut self) {
        self.items.sort_by(T::display_order);
    }

    fn insert_front(&mut self, entity: T) {
        self.items.retain(|item| item.entity_id() != entity.entity_id());
        self.items.insert(0, entity);
    }

    fn replace(&mut self, entity: T) -> bool {
        match self
            .items
            .iter_mut()
            .find(|item| item.entity_id() == entity.entity_id())
        {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.entity_id() != id);
        self.items.len() != before
    }
}

impl<'a, T> IntoIterator for &'a OrderedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Outcome of a reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled<T> {
    /// The response was folded in.
    Applied(OrderedCollection<T>),
    /// The response was ambiguous; the collection is unchanged and must be
    /// refetched.
    NeedsRefetch(OrderedCollection<T>),
}

impl<T> Reconciled<T> {
    pub fn needs_refetch(&self) -> bool {
        matches!(self, Reconciled::NeedsRefetch(_))
    }

    pub fn into_collection(self) -> OrderedCollection<T> {
        match self {
            Reconciled::Applied(collection) | Reconciled::NeedsRefetch(collection) => collection,
        }
    }
}

pub fn reconcile_create<T: Reconcilable>(
    mut collection: OrderedCollection<T>,
    created: Option<T>,
) -> Reconciled<T> {
    match created {
        Some(entity) => {
            collection.insert_front(entity);
            collection.sort();
            Reconciled::Applied(collection)
        }
        None => Reconciled::NeedsRefetch(collection),
    }
}

pub fn reconcile_update<T: Reconcilable>(
    mut collection: OrderedCollection<T>,
    id: &str,
    updated: Option<T>,
) -> Reconciled<T> {
    let Some(entity) = updated else {
        return Reconciled::NeedsRefetch(collection);
    };
    if entity.entity_id() != id || !collection.replace(entity) {
        return Reconciled::NeedsRefetch(collection);
    }
    collection.sort();
    Reconciled::Applied(collection)
}

/// Remove `id`; survivors keep their relative order.
pub fn reconcile_delete<T: Reconcilable>(
    mut collection: OrderedCollection<T>,
    id: &str,
) -> OrderedCollection<T> {
    collection.remove(id);
    collection
}

/// Newest first; `None` sorts after every date.
fn newest_first(a: Option<OffsetDateTime>, b: Option<OffsetDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Reconcilable for Experience {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn display_order(a: &Self, b: &Self) -> Ordering {
        newest_first(a.start_date, b.start_date).then_with(|| a.order.cmp(&b.order))
    }
}

impl Reconcilable for BlogPost {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn display_order(a: &Self, b: &Self) -> Ordering {
        newest_first(
            a.published_at.or(a.created_at),
            b.published_at.or(b.created_at),
        )
        .then_with(|| newest_first(a.created_at, b.created_at))
    }
}

macro_rules! insertion_ordered {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reconcilable for $ty {
                fn entity_id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

insertion_ordered!(Project, Quote, Skill, Resume);

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn experience(id: &str, start: Option<OffsetDateTime>, order: i32) -> Experience {
        Experience {
            id: id.to_string(),
            company: "Acme".into(),
            position: "Engineer".into(),
            location: None,
            start_date: start,
            end_date: None,
            current: false,
            description: String::new(),
            responsibilities: Vec::new(),
            technologies: Vec::new(),
            order,
        }
    }

    fn quote(id: &str, text: &str) -> Quote {
        Quote {
            id: id.to_string(),
            text: text.to_string(),
            author: "Anon".into(),
            source: None,
            category: None,
            featured: false,
            created_at: None,
        }
    }

    fn post(
        id: &str,
        published_at: Option<OffsetDateTime>,
        created_at: Option<OffsetDateTime>,
    ) -> BlogPost {
        BlogPost {
            id: id.to_string(),
            title: id.to_string(),
            slug: id.to_string(),
            excerpt: String::new(),
            content: String::new(),
            category: None,
            tags: Vec::new(),
            keywords: Vec::new(),
            cover_image: None,
            published: published_at.is_some(),
            published_at,
            created_at,
        }
    }

    fn ids<T: Reconcilable>(collection: &OrderedCollection<T>) -> Vec<&str> {
        collection.iter().map(Reconcilable::entity_id).collect()
    }

    #[test]
    fn created_experience_lands_in_date_order() {
        let collection = OrderedCollection::from_server(vec![
            experience("jan23", Some(datetime!(2023-01-01 0:00 UTC)), 0),
            experience("jun24", Some(datetime!(2024-06-01 0:00 UTC)), 0),
        ]);
        let created = experience("jun23", Some(datetime!(2023-06-01 0:00 UTC)), 0);

        let result = reconcile_create(collection, Some(created));
        assert!(!result.needs_refetch());
        assert_eq!(ids(&result.into_collection()), ["jun24", "jun23", "jan23"]);
    }

    #[test]
    fn equal_start_dates_break_ties_by_order() {
        let start = Some(datetime!(2022-03-01 0:00 UTC));
        let collection = OrderedCollection::from_server(vec![
            experience("second", start, 2),
            experience("first", start, 1),
        ]);
        assert_eq!(ids(&collection), ["first", "second"]);
    }

    #[test]
    fn undated_experience_sorts_last_by_order() {
        let collection = OrderedCollection::from_server(vec![
            experience("undated-b", None, 5),
            experience("dated", Some(datetime!(2020-01-01 0:00 UTC)), 9),
            experience("undated-a", None, 0),
        ]);
        assert_eq!(ids(&collection), ["dated", "undated-a", "undated-b"]);
    }

    #[test]
    fn blog_posts_prefer_publish_date_then_creation() {
        let collection = OrderedCollection::from_server(vec![
            post("draft", None, Some(datetime!(2024-02-01 0:00 UTC))),
            post(
                "old",
                Some(datetime!(2023-01-01 0:00 UTC)),
                Some(datetime!(2022-12-01 0:00 UTC)),
            ),
            post(
                "new",
                Some(datetime!(2024-05-01 0:00 UTC)),
                Some(datetime!(2024-04-01 0:00 UTC)),
            ),
            post(
                "tie",
                Some(datetime!(2024-05-01 0:00 UTC)),
                Some(datetime!(2024-04-20 0:00 UTC)),
            ),
        ]);
        assert_eq!(ids(&collection), ["tie", "new", "draft", "old"]);
    }

    #[test]
    fn create_without_entity_requests_refetch() {
        let collection = OrderedCollection::from_server(vec![quote("q1", "a")]);
        let result = reconcile_create(collection.clone(), None);
        assert!(result.needs_refetch());
        assert_eq!(result.into_collection(), collection);
    }

    #[test]
    fn created_quote_appears_first() {
        let collection = OrderedCollection::from_server(vec![quote("q1", "a"), quote("q2", "b")]);
        let result = reconcile_create(collection, Some(quote("q3", "c")));
        assert_eq!(ids(&result.into_collection()), ["q3", "q1", "q2"]);
    }

    #[test]
    fn update_replaces_in_place() {
        let collection = OrderedCollection::from_server(vec![
            quote("q1", "a"),
            quote("q2", "b"),
            quote("q3", "c"),
        ]);
        let result = reconcile_update(collection, "q2", Some(quote("q2", "edited")));
        let collection = result.into_collection();
        assert_eq!(ids(&collection), ["q1", "q2", "q3"]);
        assert_eq!(collection.get("q2").map(|q| q.text.as_str()), Some("edited"));
    }

    #[test]
    fn update_resorts_when_dates_change() {
        let collection = OrderedCollection::from_server(vec![
            experience("a", Some(datetime!(2024-01-01 0:00 UTC)), 0),
            experience("b", Some(datetime!(2023-01-01 0:00 UTC)), 0),
        ]);
        let moved = experience("b", Some(datetime!(2025-01-01 0:00 UTC)), 0);
        let result = reconcile_update(collection, "b", Some(moved));
        assert_eq!(ids(&result.into_collection()), ["b", "a"]);
    }

    #[test]
    fn ambiguous_update_requests_refetch() {
        let collection = OrderedCollection::from_server(vec![quote("q1", "a")]);
        assert!(reconcile_update(collection.clone(), "q1", None).needs_refetch());
        assert!(
            reconcile_update(collection.clone(), "q1", Some(quote("other", "x"))).needs_refetch()
        );
        assert!(reconcile_update(collection, "missing", Some(quote("missing", "x"))).needs_refetch());
    }

    #[test]
    fn delete_preserves_survivor_order() {
        let collection = OrderedCollection::from_server(vec![
            quote("q1", "a"),
            quote("q2", "b"),
            quote("q3", "c"),
        ]);
        let collection = reconcile_delete(collection, "q2");
        assert_eq!(ids(&collection), ["q1", "q3"]);
        let collection = reconcile_delete(collection, "absent");
        assert_eq!(collection.len(), 2);
    }
}
