//! Candidate data model: the wire type returned by the search endpoint and
//! the in-memory record handed to the selection UI.
//!
//! [`ApiBook`] mirrors the search service's JSON exactly, sentinels and all.
//! [`Candidate`] is what the rest of the crate (and the selection
//! collaborator) works with: it carries a batch-local id and a library
//! membership flag the wire type knows nothing about. Keeping the two apart
//! means a change on the service side touches one struct, not every consumer.

use serde::{Deserialize, Serialize};

fn unknown_count() -> i64 {
    -1
}

fn unknown_rating() -> f64 {
    -1.0
}

/// One result object from `GET {cpu_host}/books/search`.
///
/// Every field tolerates absence — the endpoint is not ours, and a missing
/// key must degrade to an empty value rather than a deserialisation error.
/// `page_count` and `rating` use the service's documented sentinels (-1 /
/// -1.0) for "not given".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiBook {
    /// Author names, comma-joined into a single string.
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub excerpt: String,
    /// ISBN-13; the service guarantees it is present on real results.
    #[serde(default)]
    pub isbn: String,
    #[serde(default = "unknown_count")]
    pub page_count: i64,
    /// YYYY-MM-DD.
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub publisher: String,
    /// Average rating; -1.0 when not given. Not surfaced on [`Candidate`].
    #[serde(default = "unknown_rating")]
    pub rating: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub title: String,
}

/// A book proposed to the user after recognition and search.
///
/// Candidates exist only for the duration of one picture→selection
/// interaction; they are discarded once the user picks one or cancels.
/// Within a batch no two candidates share an ISBN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Batch-local identifier, e.g. `cand-3`. Unique within one scan.
    pub id: String,
    /// ISBN-13, the deduplication key.
    pub isbn: String,
    pub title: String,
    /// Author names as a single comma-delimited string.
    pub author: String,
    pub excerpt: String,
    pub summary: String,
    /// Cover thumbnail URL.
    pub thumbnail: String,
    /// -1 when the service did not know.
    pub page_count: i64,
    pub published_date: String,
    pub publisher: String,
    /// Whether the user has added this candidate to their library.
    /// Always `false` at creation; flipped by the selection collaborator.
    pub in_library: bool,
}

impl Candidate {
    /// Build a candidate from a search hit with a freshly generated id.
    pub fn from_api(book: ApiBook, id: String) -> Self {
        Self {
            id,
            isbn: book.isbn,
            title: book.title,
            author: book.authors,
            excerpt: book.excerpt,
            summary: book.summary,
            thumbnail: book.thumbnail,
            page_count: book.page_count,
            published_date: book.published_date,
            publisher: book.publisher,
            in_library: false,
        }
    }
}

impl From<&Candidate> for ApiBook {
    /// Project a candidate back onto the wire shape.
    ///
    /// The rating is not carried on `Candidate`, so it comes back as the
    /// "not given" sentinel.
    fn from(c: &Candidate) -> Self {
        ApiBook {
            authors: c.author.clone(),
            excerpt: c.excerpt.clone(),
            isbn: c.isbn.clone(),
            page_count: c.page_count,
            published_date: c.published_date.clone(),
            publisher: c.publisher.clone(),
            rating: -1.0,
            summary: c.summary.clone(),
            thumbnail: c.thumbnail.clone(),
            title: c.title.clone(),
        }
    }
}

/// Batch-local id generator.
///
/// One instance lives per scan, so ids are stable within a batch and two
/// concurrent scans can never race on a shared counter.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id in the batch: `cand-0`, `cand-1`, …
    pub fn next_id(&mut self) -> String {
        let id = format!("cand-{}", self.counter);
        self.counter += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_api_book() -> ApiBook {
        ApiBook {
            authors: "Frank Herbert".into(),
            excerpt: "A beginning is the time...".into(),
            isbn: "9780441013593".into(),
            page_count: 412,
            published_date: "1965-08-01".into(),
            publisher: "Chilton Books".into(),
            rating: 4.2,
            summary: "Desert planet".into(),
            thumbnail: "https://covers.example.com/dune.jpg".into(),
            title: "Dune".into(),
        }
    }

    #[test]
    fn from_api_maps_every_surfaced_field() {
        let c = Candidate::from_api(sample_api_book(), "cand-0".into());
        assert_eq!(c.id, "cand-0");
        assert_eq!(c.isbn, "9780441013593");
        assert_eq!(c.title, "Dune");
        assert_eq!(c.author, "Frank Herbert");
        assert_eq!(c.page_count, 412);
        assert_eq!(c.publisher, "Chilton Books");
        assert!(!c.in_library);
    }

    #[test]
    fn round_trip_preserves_isbn_title_author() {
        let original = sample_api_book();
        let candidate = Candidate::from_api(original.clone(), "cand-0".into());
        let back = ApiBook::from(&candidate);
        assert_eq!(back.isbn, original.isbn);
        assert_eq!(back.title, original.title);
        assert_eq!(back.authors, original.authors);
    }

    #[test]
    fn missing_json_fields_fall_back_to_sentinels() {
        let book: ApiBook = serde_json::from_str(r#"{"isbn": "9780441013593"}"#).unwrap();
        assert_eq!(book.isbn, "9780441013593");
        assert_eq!(book.page_count, -1);
        assert_eq!(book.rating, -1.0);
        assert!(book.title.is_empty());
        assert!(book.authors.is_empty());
    }

    #[test]
    fn id_generator_is_batch_local_and_monotonic() {
        let mut a = IdGenerator::new();
        let mut b = IdGenerator::new();
        assert_eq!(a.next_id(), "cand-0");
        assert_eq!(a.next_id(), "cand-1");
        // A second batch starts over; ids never leak across scans.
        assert_eq!(b.next_id(), "cand-0");
    }
}
