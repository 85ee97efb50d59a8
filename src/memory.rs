//! # In-process collection
//!
//! A [`DocumentCollection`] that keeps documents in a `Vec` behind a lock.
//! It understands only what the shelter sends:
//!
//! - filters of top-level field equality; int/long/double compare by value,
//!   a missing field equals `null` and an array field equals any element
//! - single-field sorts, with strings compared digit-aware (`A9` < `A10`)
//!   like the numeric collation [`MongoCollection`](crate::mongo::MongoCollection)
//!   sorts with
//! - `$set` updates of top-level fields
//!
//! Where MongoDB would accept more (query operators, dotted paths, other
//! update operators) this collection returns a [`ShelterError::Store`].
//!
//! Clones share the same documents, so a test can keep a handle to inspect
//! what the shelter wrote.

use std::cmp::Ordering;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};

use crate::collection::{DocumentCollection, InsertAck};
use crate::errors::{Result, ShelterError};

#[derive(Debug, Default)]
struct MemoryState {
    documents: Vec<Document>,
    unavailable: bool,
    unacknowledged: bool,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the collection. Documents are stored as given, `_id` included or not.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let collection = Self::new();
        if let Ok(mut state) = collection.state.write() {
            state.documents.extend(documents);
        }
        collection
    }

    /// While set, every operation fails as if the server were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    /// While set, inserts still land but report `acknowledged: false`.
    pub fn set_unacknowledged(&self, unacknowledged: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unacknowledged = unacknowledged;
        }
    }

    /// Copy of every stored document in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.state
            .read()
            .map(|state| state.documents.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|state| state.documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        state.check_usable()?;
        Ok(state)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        let state = self.state.write().map_err(|_| poisoned())?;
        state.check_usable()?;
        Ok(state)
    }
}

fn poisoned() -> ShelterError {
    ShelterError::Store("memory collection lock poisoned".to_string())
}

impl MemoryState {
    fn check_usable(&self) -> Result<()> {
        if self.closed {
            return Err(ShelterError::Store("collection is closed".to_string()));
        }
        if self.unavailable {
            return Err(ShelterError::Store("server selection timed out".to_string()));
        }
        Ok(())
    }

    /// One flag per stored document, in order.
    fn hits(&self, filter: &Document) -> Result<Vec<bool>> {
        self.documents
            .iter()
            .map(|document| matches(document, filter))
            .collect()
    }

    fn matching<'a>(&'a self, filter: &Document) -> Result<Vec<&'a Document>> {
        let hits = self.hits(filter)?;
        Ok(self
            .documents
            .iter()
            .zip(hits)
            .filter_map(|(document, hit)| hit.then_some(document))
            .collect())
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find_one(&self, filter: Document, sort: Document) -> Result<Option<Document>> {
        let state = self.read()?;
        let found = state.matching(&filter)?;

        let best = match sort_key(&sort)? {
            None => found.first().copied(),
            // max_by keeps the last of equal elements, so scan in reverse to keep natural order on ties
            Some((field, descending)) => found.into_iter().rev().max_by(|a, b| {
                let ordering = compare_values(a.get(&field), b.get(&field));
                if descending { ordering } else { ordering.reverse() }
            }),
        };

        Ok(best.cloned())
    }

    async fn find(&self, filter: Document) -> Result<Vec<Document>> {
        let state = self.read()?;
        let found = state.matching(&filter)?;

        Ok(found.into_iter().cloned().collect())
    }

    async fn count_matching(&self, filter: Document, limit: u64) -> Result<u64> {
        let state = self.read()?;
        let count = state.matching(&filter)?.len() as u64;

        Ok(if limit > 0 { count.min(limit) } else { count })
    }

    async fn insert_one(&self, document: Document) -> Result<InsertAck> {
        let mut state = self.write()?;

        let mut stored = match document.get("_id") {
            Some(id) => {
                if state.documents.iter().any(|d| d.get("_id") == Some(id)) {
                    return Err(ShelterError::Store(format!(
                        "E11000 duplicate key error: _id {}",
                        id
                    )));
                }
                Document::new()
            }
            None => doc! { "_id": ObjectId::new() },
        };
        for (key, value) in document {
            stored.insert(key, value);
        }
        state.documents.push(stored);

        Ok(InsertAck {
            acknowledged: !state.unacknowledged,
        })
    }

    async fn update_many(&self, filter: Document, update: Document) -> Result<u64> {
        let mut state = self.write()?;
        let fields = set_fields(&update)?;
        let hits = state.hits(&filter)?;

        let mut modified = 0;
        for (document, hit) in state.documents.iter_mut().zip(hits) {
            if !hit {
                continue;
            }

            let mut changed = false;
            for (field, value) in fields {
                if document.get(field) != Some(value) {
                    document.insert(field.clone(), value.clone());
                    changed = true;
                }
            }
            if changed {
                modified += 1;
            }
        }

        Ok(modified)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64> {
        let mut state = self.write()?;
        let mut hits = state.hits(&filter)?.into_iter();

        let before = state.documents.len();
        state.documents.retain(|_| !hits.next().unwrap_or(false));

        Ok((before - state.documents.len()) as u64)
    }

    /// Closing twice is an error.
    async fn close(self) -> Result<()> {
        let mut state = self.write()?;
        state.closed = true;

        Ok(())
    }
}

fn unsupported(what: &str) -> ShelterError {
    ShelterError::Store(format!("memory collection does not support {what}"))
}

fn matches(document: &Document, filter: &Document) -> Result<bool> {
    for (field, expected) in filter {
        if field.starts_with('$') || field.contains('.') {
            return Err(unsupported(field));
        }
        if let Bson::Document(inner) = expected
            && let Some(operator) = inner.keys().find(|k| k.starts_with('$'))
        {
            return Err(unsupported(operator));
        }
        if !equals(document.get(field), expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| same_value(item, expected))
        }
        Some(actual) => same_value(actual, expected),
    }
}

fn same_value(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// MongoDB's cross-type sort order, for the types records carry.
fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::ObjectId(_)) => 5,
        Some(Bson::Boolean(_)) => 6,
        Some(Bson::DateTime(_)) => 7,
        Some(_) => 8,
    }
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    type_rank(a).cmp(&type_rank(b)).then_with(|| match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => natural_cmp(x, y),
        (Some(Bson::ObjectId(x)), Some(Bson::ObjectId(y))) => x.cmp(y),
        (Some(Bson::Boolean(x)), Some(Bson::Boolean(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (as_number(x), as_number(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    })
}

/// Compares runs of digits by value and everything else byte-wise.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = if is_digits(x) && is_digits(y) {
                    let x = x.trim_start_matches('0');
                    let y = y.trim_start_matches('0');
                    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
                } else {
                    x.cmp(y)
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn is_digits(chunk: &str) -> bool {
    chunk.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Splits into maximal runs of digits and non-digits.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let digit = rest.as_bytes().first()?.is_ascii_digit();
        let end = rest
            .bytes()
            .position(|b| b.is_ascii_digit() != digit)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// `(field, descending)` of a single-field sort, `None` for no sort.
fn sort_key(sort: &Document) -> Result<Option<(String, bool)>> {
    let mut keys = sort.iter();
    let Some((field, direction)) = keys.next() else {
        return Ok(None);
    };
    if keys.next().is_some() {
        return Err(unsupported("multi-field sorts"));
    }

    match as_number(direction) {
        Some(d) if d < 0.0 => Ok(Some((field.clone(), true))),
        Some(d) if d > 0.0 => Ok(Some((field.clone(), false))),
        _ => Err(ShelterError::Store(format!("bad sort direction for {field}"))),
    }
}

/// The `$set` fields of an update document.
fn set_fields(update: &Document) -> Result<&Document> {
    let mut operators = update.iter();
    let fields = match (operators.next(), operators.next()) {
        (Some((operator, Bson::Document(fields))), None) if operator == "$set" => fields,
        (Some((operator, _)), _) if operator.starts_with('$') && operator != "$set" => {
            return Err(unsupported(operator));
        }
        _ => {
            return Err(ShelterError::Store(
                "update document must be a single $set".to_string(),
            ));
        }
    };

    for field in fields.keys() {
        if field == "_id" {
            return Err(ShelterError::Store(
                "performing an update on _id is not allowed".to_string(),
            ));
        }
        if field.starts_with('$') || field.contains('.') {
            return Err(unsupported(field));
        }
    }
    Ok(fields)
}
