//! The post-handoff shortlist: candidates the user is choosing among, with
//! library-membership toggles.
//!
//! The selection UI owns presentation; this type owns the state it mutates —
//! which candidates the user has marked for their library. Keeping the
//! toggle here (keyed by batch-local id) means the UI never reaches into
//! candidate fields it shouldn't.

use crate::candidate::Candidate;
use crate::output::ScanOutput;

/// An ordered list of candidates under user review.
#[derive(Debug, Clone, Default)]
pub struct RecommendationList {
    candidates: Vec<Candidate>,
}

impl RecommendationList {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// All candidates, in batch order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Look up a candidate by its batch-local id.
    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Flip a candidate's library membership.
    ///
    /// Returns the new state, or `None` when the id is not in this list.
    pub fn toggle_library(&mut self, id: &str) -> Option<bool> {
        let candidate = self.candidates.iter_mut().find(|c| c.id == id)?;
        candidate.in_library = !candidate.in_library;
        Some(candidate.in_library)
    }

    /// Candidates currently marked for the library.
    pub fn in_library(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.in_library)
    }
}

impl From<ScanOutput> for RecommendationList {
    fn from(output: ScanOutput) -> Self {
        Self::new(output.candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::ApiBook;

    fn list() -> RecommendationList {
        let book = ApiBook {
            authors: "Frank Herbert".into(),
            excerpt: String::new(),
            isbn: "9780441013593".into(),
            page_count: 412,
            published_date: String::new(),
            publisher: String::new(),
            rating: -1.0,
            summary: String::new(),
            thumbnail: String::new(),
            title: "Dune".into(),
        };
        RecommendationList::new(vec![Candidate::from_api(book, "cand-0".into())])
    }

    #[test]
    fn toggle_flips_membership_both_ways() {
        let mut l = list();
        assert_eq!(l.toggle_library("cand-0"), Some(true));
        assert!(l.get("cand-0").unwrap().in_library);
        assert_eq!(l.in_library().count(), 1);

        assert_eq!(l.toggle_library("cand-0"), Some(false));
        assert_eq!(l.in_library().count(), 0);
    }

    #[test]
    fn toggle_unknown_id_is_none() {
        let mut l = list();
        assert_eq!(l.toggle_library("cand-99"), None);
    }
}
