//! Tests for the memory store.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tempfile::TempDir;

use super::*;
use crate::chunking::ChunkingStrategy;
use crate::embedding::Embedder;
use crate::errors::Error;
use crate::memory_types::Metadata;
use crate::search::BatchResults;
use crate::storage::Storage;

const VOCAB: [&str; 5] = ["cat", "dog", "fish", "bird", "car"];

/// Counts vocabulary words; records the size of every embed call.
#[derive(Clone, Default)]
struct KeywordEmbedder {
    calls: Arc<Mutex<Vec<usize>>>,
    extra_dims: usize,
}

impl Embedder for KeywordEmbedder {
    fn embed(&mut self, fragments: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        self.calls.lock().unwrap().push(fragments.len());
        Ok(fragments
            .iter()
            .map(|fragment| {
                let mut vector = vec![0.0f32; VOCAB.len() + self.extra_dims];
                for token in fragment.split_whitespace() {
                    let word = token
                        .trim_matches(|c: char| !c.is_alphanumeric())
                        .to_lowercase();
                    if let Some(slot) = VOCAB.iter().position(|known| *known == word) {
                        vector[slot] += 1.0;
                    }
                }
                vector
            })
            .collect())
    }
}

/// Returns one vector too few.
struct ShortEmbedder;

impl Embedder for ShortEmbedder {
    fn embed(&mut self, fragments: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        Ok(vec![vec![1.0]; fragments.len().saturating_sub(1)])
    }
}

fn record(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected JSON object"),
    }
}

fn options(memory_file: Option<std::path::PathBuf>, embedding_mode: EmbeddingMode) -> MemoryOptions {
    MemoryOptions {
        memory_file,
        chunking: ChunkingStrategy::Paragraph,
        embedding_mode,
    }
}

fn in_memory(mode: EmbeddingMode) -> (Memory, Arc<Mutex<Vec<usize>>>) {
    let embedder = KeywordEmbedder::default();
    let calls = embedder.calls.clone();
    (Memory::new(options(None, mode), embedder).unwrap(), calls)
}

fn chunks(results: &[crate::memory_types::SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.chunk.as_str()).collect()
}

#[test]
fn test_save_paragraphs_share_indices() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory
        .save("The cat sat. \n\n The dog ran.", json!({"id": 1}))
        .unwrap();

    let entries = memory.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].chunk, "The cat sat.");
    assert_eq!(entries[1].chunk, "The dog ran.");
    for entry in entries {
        assert_eq!(entry.metadata_index, 0);
        assert_eq!(entry.source_index, 0);
        assert_eq!(entry.embedding.as_ref().map(Vec::len), Some(VOCAB.len()));
    }
    assert_eq!(memory.metadata_records(), &[record(json!({"id": 1}))]);
}

#[test]
fn test_save_pads_missing_metadata() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory
        .save(vec!["a", "b"], vec![record(json!({"x": 1}))])
        .unwrap();

    assert_eq!(
        memory.metadata_records(),
        &[record(json!({"x": 1})), Metadata::new()]
    );
    let dump = memory.dump();
    assert_eq!(dump.entries[1].chunk, "b");
    assert_eq!(dump.entries[1].metadata, Metadata::new());
}

#[test]
fn test_save_without_metadata() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory.save("cat", ()).unwrap();
    assert_eq!(memory.metadata_records(), &[Metadata::new()]);
}

#[test]
fn test_counters_increase_across_saves() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory.save("cat\n\ndog", json!({"n": 0})).unwrap();
    memory.save(vec!["fish", "bird"], ()).unwrap();

    let indices: Vec<(usize, usize)> = memory
        .entries()
        .iter()
        .map(|e| (e.metadata_index, e.source_index))
        .collect();
    assert_eq!(indices, vec![(0, 0), (0, 0), (1, 1), (2, 2)]);
    assert_eq!(memory.metadata_records().len(), 3);
}

#[test]
fn test_search_ranks_by_distance() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory
        .save(vec!["dog dog", "cat", "cat dog"], vec![record(json!({"k": "d"}))])
        .unwrap();

    let results = memory.search("cat", 3, false).unwrap();
    assert_eq!(chunks(&results), vec!["cat", "cat dog", "dog dog"]);
    assert_eq!(results[0].distance, 0.0);
    assert_eq!(results[1].distance, 1.0);
    assert_eq!(results[2].distance, 5.0);
    assert_eq!(results[2].metadata, record(json!({"k": "d"})));
}

#[test]
fn test_search_unique_keeps_first_fragment_per_source() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory.save(vec!["cat\n\ncat dog", "cat fish"], ()).unwrap();

    let all = memory.search("cat", 3, false).unwrap();
    assert_eq!(chunks(&all), vec!["cat", "cat dog", "cat fish"]);

    let unique = memory.search("cat", 3, true).unwrap();
    assert_eq!(chunks(&unique), vec!["cat", "cat fish"]);
}

#[test]
fn test_search_unique_filters_after_truncation() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory.save(vec!["cat\n\ncat dog", "cat fish"], ()).unwrap();

    // The top two hits share a source, so only one result survives even
    // though a second source exists further down the ranking.
    let unique = memory.search("cat", 2, true).unwrap();
    assert_eq!(chunks(&unique), vec!["cat"]);
}

#[test]
fn test_search_empty_store_skips_embedding() {
    let (mut memory, calls) = in_memory(EmbeddingMode::Eager);
    assert!(memory.search("cat", 5, false).unwrap().is_empty());
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_search_top_n_exceeds_entries() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory.save(vec!["cat", "dog"], ()).unwrap();
    assert_eq!(memory.search("bird", 10, false).unwrap().len(), 2);
}

#[test]
fn test_lazy_mode_embeds_at_search_time() {
    let (mut memory, calls) = in_memory(EmbeddingMode::Lazy);
    memory.save(vec!["cat\n\ncat dog", "cat fish"], ()).unwrap();

    assert!(calls.lock().unwrap().is_empty());
    assert!(memory.entries().iter().all(|e| e.embedding.is_none()));

    let results = memory.search("cat", 3, false).unwrap();
    assert_eq!(chunks(&results), vec!["cat", "cat dog", "cat fish"]);
    // All three stored fragments plus the query, in one call.
    assert_eq!(*calls.lock().unwrap(), vec![4]);
    assert!(memory.entries().iter().all(|e| e.embedding.is_none()));
}

#[test]
fn test_lazy_and_eager_rank_identically() {
    let texts = vec!["dog car", "bird", "cat cat", "fish dog"];
    let (mut eager, _) = in_memory(EmbeddingMode::Eager);
    let (mut lazy, _) = in_memory(EmbeddingMode::Lazy);
    eager.save(texts.clone(), ()).unwrap();
    lazy.save(texts, ()).unwrap();

    assert_eq!(
        eager.search("dog", 4, false).unwrap(),
        lazy.search("dog", 4, false).unwrap()
    );
}

#[test]
fn test_search_batch_diverse_represents_each_query() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory
        .save(vec!["cat", "cat cat", "dog", "dog dog"], ())
        .unwrap();

    let flattened = memory
        .search_batch(vec!["cat", "cat cat dog"], 2, false, BatchResults::Flatten)
        .unwrap();
    assert_eq!(chunks(&flattened), vec!["cat", "cat cat"]);

    let diverse = memory
        .search_batch(vec!["cat", "dog"], 2, false, BatchResults::Diverse)
        .unwrap();
    assert_eq!(chunks(&diverse), vec!["cat", "dog"]);
}

#[test]
fn test_embedder_count_mismatch_appends_nothing() {
    let mut memory = Memory::new(options(None, EmbeddingMode::Eager), ShortEmbedder).unwrap();
    let result = memory.save("cat\n\ndog", ());
    assert!(matches!(result, Err(Error::Embedding(_))));
    assert!(memory.is_empty());
    assert!(memory.metadata_records().is_empty());
}

#[test]
fn test_dimension_mismatch_after_model_change() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.bin");

    let mut memory = Memory::new(
        options(Some(path.clone()), EmbeddingMode::Eager),
        KeywordEmbedder::default(),
    )
    .unwrap();
    memory.save("cat", ()).unwrap();

    let wider = KeywordEmbedder {
        extra_dims: 3,
        ..KeywordEmbedder::default()
    };
    let mut reopened = Memory::new(options(Some(path), EmbeddingMode::Eager), wider).unwrap();
    let result = reopened.search("cat", 1, false);
    assert!(matches!(
        result,
        Err(Error::DimensionMismatch {
            expected: 5,
            actual: 8
        })
    ));
}

#[test]
fn test_reload_reproduces_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.bin");

    let mut memory = Memory::new(
        options(Some(path.clone()), EmbeddingMode::Eager),
        KeywordEmbedder::default(),
    )
    .unwrap();
    memory
        .save(vec!["cat\n\ndog", "fish"], vec![record(json!({"id": 1}))])
        .unwrap();

    let mut reopened = Memory::new(
        options(Some(path), EmbeddingMode::Eager),
        KeywordEmbedder::default(),
    )
    .unwrap();
    assert_eq!(reopened.entries(), memory.entries());
    assert_eq!(reopened.metadata_records(), memory.metadata_records());

    reopened.save("bird", ()).unwrap();
    let last = reopened.entries().last().unwrap();
    assert_eq!(last.source_index, 2);
    assert_eq!(last.metadata_index, 2);
}

#[test]
fn test_eager_open_backfills_lazy_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.bin");

    let mut lazy = Memory::new(
        options(Some(path.clone()), EmbeddingMode::Lazy),
        KeywordEmbedder::default(),
    )
    .unwrap();
    lazy.save(vec!["cat", "dog"], ()).unwrap();

    let embedder = KeywordEmbedder::default();
    let calls = embedder.calls.clone();
    let eager = Memory::new(options(Some(path.clone()), EmbeddingMode::Eager), embedder).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![2]);
    assert!(eager.entries().iter().all(|e| e.embedding.is_some()));

    let persisted = Storage::new(&path).load_from_disk().unwrap();
    assert!(persisted.entries.iter().all(|e| e.embedding.is_some()));
}

#[test]
fn test_clear_persists_empty_state_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.bin");

    let mut memory = Memory::new(
        options(Some(path.clone()), EmbeddingMode::Eager),
        KeywordEmbedder::default(),
    )
    .unwrap();
    memory.save(vec!["cat", "dog"], json!({"a": true})).unwrap();

    memory.clear().unwrap();
    let once = memory.dump();
    memory.clear().unwrap();
    let twice = memory.dump();

    assert_eq!(once, twice);
    assert_eq!(twice.entry_count, 0);
    assert_eq!(twice.metadata_count, 0);

    let persisted = Storage::new(&path).load_from_disk().unwrap();
    assert!(persisted.entries.is_empty());
    assert!(persisted.metadata.is_empty());
    assert_eq!(persisted.next_source_index, 0);

    memory.save("fish", ()).unwrap();
    assert_eq!(memory.entries()[0].source_index, 0);
    assert_eq!(memory.entries()[0].metadata_index, 0);
}

#[test]
fn test_in_memory_store_has_no_file() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory.save("cat", ()).unwrap();
    memory.clear().unwrap();
    assert!(memory.memory_file().is_none());
    assert!(memory.is_empty());
}

#[test]
fn test_dump_does_not_mutate() {
    let (mut memory, _) = in_memory(EmbeddingMode::Lazy);
    memory.save("cat\n\ndog", json!({"id": 7})).unwrap();

    let before = memory.entries().to_vec();
    let dump = memory.dump();
    assert_eq!(memory.entries(), before.as_slice());

    assert_eq!(dump.entry_count, 2);
    assert_eq!(dump.metadata_count, 1);
    assert_eq!(dump.entries[0].embedding_len, 0);
    assert_eq!(dump.entries[1].metadata, record(json!({"id": 7})));
}

#[test]
fn test_missing_parent_directory_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing/memory.bin");
    let result = Memory::new(
        options(Some(path), EmbeddingMode::Eager),
        KeywordEmbedder::default(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_chunking_rejected_at_construction() {
    let result = Memory::new(
        MemoryOptions {
            memory_file: None,
            chunking: ChunkingStrategy::SlidingWindow {
                window_size: 3,
                overlap: 5,
            },
            embedding_mode: EmbeddingMode::Eager,
        },
        KeywordEmbedder::default(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_memory_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Memory>();
}

#[test]
fn test_store_shared_across_threads_behind_mutex() {
    let (mut memory, _) = in_memory(EmbeddingMode::Eager);
    memory.save(vec!["cat", "dog"], ()).unwrap();
    let shared = Arc::new(Mutex::new(memory));

    let handles: Vec<_> = ["cat", "dog"]
        .into_iter()
        .map(|query| {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                let mut memory = shared.lock().unwrap();
                memory.search(query, 1, false).unwrap()[0].chunk.clone()
            })
        })
        .collect();

    let found: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(found, vec!["cat", "dog"]);
}

#[test]
fn test_empty_text_in_sliding_window_is_stored() {
    let mut memory = Memory::new(
        MemoryOptions {
            memory_file: None,
            chunking: ChunkingStrategy::SlidingWindow {
                window_size: 4,
                overlap: 1,
            },
            embedding_mode: EmbeddingMode::Eager,
        },
        KeywordEmbedder::default(),
    )
    .unwrap();
    memory.save(vec!["", "cat"], ()).unwrap();

    let chunks: Vec<&str> = memory.entries().iter().map(|e| e.chunk.as_str()).collect();
    assert_eq!(chunks, vec!["", "cat"]);
    assert_eq!(memory.entries()[1].source_index, 1);
}
