//! Text search engine surface and the in-memory reference engine.
//!
//! The engine itself (storage, term indexing, scoring) lives outside this
//! crate. The filter consumes it through two narrow traits: a segmented
//! reader view and a per-segment query-plus-projection surface. Hits are
//! delivered as an explicit stream of `(global position, external key)`
//! pairs, with the segment base offset applied by the stream itself.

use crate::error::Result;
use rustc_hash::FxHashMap;

/// One text hit, in the reader's global document-position space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Segment base plus local document id.
    pub position: u32,
    /// Value of the projected key field.
    pub key: String,
}

/// Read side of one index segment.
pub trait IndexSegment: Send + Sync {
    /// Base offset of this segment's documents in the global position space.
    fn doc_base(&self) -> u32;

    /// Number of documents in this segment.
    fn doc_count(&self) -> u32;

    /// Run the text query, returning matching local document ids.
    ///
    /// Order is unspecified and callers must not rely on it.
    fn matches(&self, query: &str) -> Result<Vec<u32>>;

    /// Selective single-field projection: read exactly one stored field of
    /// one document, skipping every other field. Documents can carry large
    /// payloads, so implementations must not materialize the whole document.
    fn read_field(&self, local_doc: u32, field: &str) -> Result<Option<String>>;
}

/// A point-in-time view of the text index, partitioned into segments.
pub trait IndexReader: Send + Sync {
    /// Upper bound of the global document-position space.
    fn max_doc(&self) -> u32;

    /// The reader's segments. Segments may be scanned concurrently.
    fn segments(&self) -> Vec<&dyn IndexSegment>;
}

/// Stream a segment's hits for `query` as global positions paired with the
/// external key read through the single-field projection.
///
/// Documents without the key field are dropped from the stream; read errors
/// are surfaced per hit.
pub fn segment_hits<'a>(
    segment: &'a dyn IndexSegment,
    query: &str,
    key_field: &'a str,
) -> Result<impl Iterator<Item = Result<SearchHit>> + 'a> {
    let base = segment.doc_base();
    let locals = segment.matches(query)?;
    Ok(locals
        .into_iter()
        .filter_map(move |local| match segment.read_field(local, key_field) {
            Ok(Some(key)) => Some(Ok(SearchHit {
                position: base + local,
                key,
            })),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }))
}

/// One stored document in the in-memory engine.
#[derive(Debug, Clone, Default)]
struct MemoryDocument {
    /// Lowercased text terms for matching.
    terms: Vec<String>,
    /// Stored fields, readable one at a time.
    fields: FxHashMap<String, String>,
}

/// A single in-memory segment with a fixed base offset.
///
/// Matching is a naive conjunction of whitespace terms; this is a reference
/// backend for embedded use and tests, not a search engine.
#[derive(Debug)]
pub struct MemorySegment {
    doc_base: u32,
    docs: Vec<MemoryDocument>,
}

impl MemorySegment {
    /// Create an empty segment whose documents start at `doc_base`.
    pub fn new(doc_base: u32) -> Self {
        Self {
            doc_base,
            docs: Vec::new(),
        }
    }

    /// Add a document with its text content and stored fields, returning the
    /// local document id.
    pub fn add_document<I, K, V>(&mut self, text: impl AsRef<str>, fields: I) -> u32
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let doc = MemoryDocument {
            terms: tokenize(text.as_ref()),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        };
        self.docs.push(doc);
        (self.docs.len() - 1) as u32
    }
}

impl IndexSegment for MemorySegment {
    fn doc_base(&self) -> u32 {
        self.doc_base
    }

    fn doc_count(&self) -> u32 {
        self.docs.len() as u32
    }

    fn matches(&self, query: &str) -> Result<Vec<u32>> {
        let wanted = tokenize(query);
        Ok(self
            .docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| wanted.iter().all(|term| doc.terms.contains(term)))
            .map(|(local, _)| local as u32)
            .collect())
    }

    fn read_field(&self, local_doc: u32, field: &str) -> Result<Option<String>> {
        Ok(self
            .docs
            .get(local_doc as usize)
            .and_then(|doc| doc.fields.get(field))
            .cloned())
    }
}

/// An in-memory reader over explicitly positioned segments.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    segments: Vec<MemorySegment>,
}

impl MemoryIndex {
    /// Create a reader with no segments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment. Bases need not be contiguous; `max_doc` covers the
    /// highest base-plus-count across all segments.
    pub fn push_segment(&mut self, segment: MemorySegment) {
        self.segments.push(segment);
    }
}

impl IndexReader for MemoryIndex {
    fn max_doc(&self) -> u32 {
        self.segments
            .iter()
            .map(|segment| segment.doc_base + segment.doc_count())
            .max()
            .unwrap_or(0)
    }

    fn segments(&self) -> Vec<&dyn IndexSegment> {
        self.segments
            .iter()
            .map(|segment| segment as &dyn IndexSegment)
            .collect()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|term| term.to_lowercase())
        .collect()
}
