//! Lazy document stream feeding the indexer.
//!
//! [`DocumentStream`] is a plain `Iterator` over borrowed corpus data. It is
//! finite and consumed by value, so each document is handed to the indexer
//! exactly once.

use crate::beir::{Corpus, CorpusRecord};
use crate::sample::SampleSelection;

/// One `(doc_id, title, text)` item. Missing fields are empty strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDocument<'a> {
    /// Corpus document id.
    pub doc_id: &'a str,
    /// Title, or `""` when the record has none.
    pub title: &'a str,
    /// Body, or `""` when the record has none.
    pub text: &'a str,
}

impl<'a> StreamDocument<'a> {
    fn from_record(doc_id: &'a str, record: &'a CorpusRecord) -> Self {
        Self {
            doc_id,
            title: record.title.as_deref().unwrap_or(""),
            text: record.text.as_deref().unwrap_or(""),
        }
    }

    /// The item as a `(doc_id, title, text)` tuple.
    pub fn as_tuple(&self) -> (&'a str, &'a str, &'a str) {
        (self.doc_id, self.title, self.text)
    }
}

enum Source<'a> {
    Full(indexmap::map::Iter<'a, String, CorpusRecord>),
    Sampled {
        corpus: &'a Corpus,
        ids: std::slice::Iter<'a, String>,
    },
}

/// Iterator over the documents to index.
pub struct DocumentStream<'a> {
    source: Source<'a>,
}

/// Build the stream for a corpus.
///
/// With a selection, only the selected ids are visited, in selection order.
/// Without one, every corpus document is visited in corpus order.
pub fn document_stream<'a>(
    corpus: &'a Corpus,
    selection: Option<&'a SampleSelection>,
) -> DocumentStream<'a> {
    let source = match selection {
        Some(selection) => Source::Sampled {
            corpus,
            ids: selection.ids().iter(),
        },
        None => Source::Full(corpus.iter()),
    };
    DocumentStream { source }
}

impl<'a> Iterator for DocumentStream<'a> {
    type Item = StreamDocument<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Full(iter) => iter
                .next()
                .map(|(id, record)| StreamDocument::from_record(id, record)),
            Source::Sampled { corpus, ids } => {
                let corpus: &'a Corpus = *corpus;
                for id in ids.by_ref() {
                    if let Some((id, record)) = corpus.get_key_value(id.as_str()) {
                        return Some(StreamDocument::from_record(id, record));
                    }
                    log::warn!("Sampled id {id} is not in the corpus; skipping");
                }
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            Source::Full(iter) => iter.size_hint(),
            Source::Sampled { ids, .. } => (0, Some(ids.len())),
        }
    }
}

impl std::fmt::Debug for DocumentStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.source {
            Source::Full(_) => "full",
            Source::Sampled { .. } => "sampled",
        };
        f.debug_struct("DocumentStream")
            .field("mode", &mode)
            .field("remaining", &self.size_hint().1)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
