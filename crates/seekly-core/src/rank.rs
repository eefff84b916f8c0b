//! Similarity ranking
//!
//! A pure function from (query vector, corpus) to ordered results. Each file
//! is represented by its single best chunk; no I/O happens here.

use std::cmp::Ordering;
use std::path::PathBuf;

use crate::cache::FileRecord;
use crate::chunk::ChunkKind;

/// How to cut down the ranked list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    /// Files scoring below this are dropped
    pub min_similarity: f32,
    /// Keep at most this many results; `None` keeps everything above the floor
    pub limit: Option<usize>,
}

/// A ranked file with the chunk that earned its score.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Position in the result list (1-indexed)
    pub rank: usize,
    pub path: PathBuf,
    /// Cosine similarity of the best chunk
    pub score: f32,
    pub kind: ChunkKind,
    pub start_line: usize,
    pub end_line: usize,
    /// Text of the best chunk
    pub snippet: String,
}

/// Cosine similarity, 0 for zero-norm or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    let score = (dot / denom) as f32;
    if score.is_finite() { score } else { 0.0 }
}

/// Rank files against a query vector.
///
/// Per-file score is the best chunk score; on equal chunk scores the earlier
/// chunk wins. Files sort by descending score, then ascending path.
pub fn rank(query: &[f32], corpus: &[FileRecord], options: &RankOptions) -> Vec<QueryResult> {
    let mut scored: Vec<(f32, &FileRecord, usize)> = corpus
        .iter()
        .filter(|record| record.is_rankable())
        .filter_map(|record| {
            let mut best: Option<(f32, usize)> = None;
            for (i, chunk) in record.chunks.iter().enumerate() {
                let score = cosine_similarity(query, &chunk.embedding);
                if best.is_none_or(|(s, _)| score > s) {
                    best = Some((score, i));
                }
            }
            best.map(|(score, i)| (score, record, i))
        })
        .filter(|(score, _, _)| *score >= options.min_similarity)
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.path.cmp(&b.1.path))
    });

    if let Some(limit) = options.limit {
        scored.truncate(limit);
    }

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, record, chunk_index))| {
            let chunk = &record.chunks[chunk_index];
            QueryResult {
                rank: i + 1,
                path: record.path.clone(),
                score,
                kind: chunk.kind,
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                snippet: chunk.text.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ChunkRecord, RecordStatus, fingerprint};
    use crate::extract::UnembeddableReason;

    fn chunk(kind: ChunkKind, line: usize, text: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            kind,
            start_line: line,
            end_line: line,
            text: text.to_string(),
            fingerprint: fingerprint(text.as_bytes()),
            embedding,
        }
    }

    fn file(path: &str, chunks: Vec<ChunkRecord>) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            size: 0,
            mtime: 0,
            fingerprint: String::new(),
            status: RecordStatus::Embedded,
            chunks,
        }
    }

    fn all(min_similarity: f32) -> RankOptions {
        RankOptions {
            min_similarity,
            limit: None,
        }
    }

    #[test]
    fn cosine_self_and_symmetry() {
        let a = [0.3f32, -1.2, 4.5, 0.01];
        let b = [2.0f32, 0.5, -0.25, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn best_chunk_represents_the_file() {
        let corpus = vec![file(
            "/r/a.py",
            vec![
                chunk(ChunkKind::File, 1, "whole", vec![1.0, 1.0]),
                chunk(ChunkKind::Function, 3, "def sort():", vec![1.0, 0.0]),
                chunk(ChunkKind::Function, 9, "def other():", vec![0.0, 1.0]),
            ],
        )];

        let results = rank(&[1.0, 0.0], &corpus, &all(0.0));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].snippet, "def sort():");
        assert_eq!(results[0].kind, ChunkKind::Function);
        assert_eq!(results[0].start_line, 3);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn equal_chunk_scores_keep_the_earlier_chunk() {
        let corpus = vec![file(
            "/r/a.py",
            vec![
                chunk(ChunkKind::File, 1, "whole", vec![1.0, 0.0]),
                chunk(ChunkKind::Function, 2, "part", vec![2.0, 0.0]),
            ],
        )];
        let results = rank(&[1.0, 0.0], &corpus, &all(0.0));
        assert_eq!(results[0].kind, ChunkKind::File);
    }

    #[test]
    fn floor_ties_and_limit() {
        let corpus = vec![
            file("/r/c.py", vec![chunk(ChunkKind::File, 1, "c", vec![1.0, 0.0])]),
            file("/r/a.py", vec![chunk(ChunkKind::File, 1, "a", vec![1.0, 0.0])]),
            file("/r/b.py", vec![chunk(ChunkKind::File, 1, "b", vec![1.0, 1.0])]),
            file("/r/d.py", vec![chunk(ChunkKind::File, 1, "d", vec![0.0, 1.0])]),
        ];

        let results = rank(&[1.0, 0.0], &corpus, &all(0.5));
        let paths: Vec<_> = results.iter().map(|r| r.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/r/a.py", "/r/c.py", "/r/b.py"]);
        let ranks: Vec<_> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);

        let limited = rank(
            &[1.0, 0.0],
            &corpus,
            &RankOptions {
                min_similarity: 0.0,
                limit: Some(2),
            },
        );
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].path, PathBuf::from("/r/c.py"));

        let everything = rank(&[1.0, 0.0], &corpus, &all(0.0));
        assert_eq!(everything.len(), 4);
    }

    #[test]
    fn ranking_is_deterministic() {
        let corpus: Vec<FileRecord> = (0..20)
            .map(|i| {
                let v = vec![(i % 3) as f32, 1.0];
                file(
                    &format!("/r/f{:02}.rs", 19 - i),
                    vec![chunk(ChunkKind::File, 1, "x", v)],
                )
            })
            .collect();
        let query = [1.0, 0.5];
        let first = rank(&query, &corpus, &all(0.0));
        for _ in 0..5 {
            assert_eq!(rank(&query, &corpus, &all(0.0)), first);
        }
        let mut reversed = corpus.clone();
        reversed.reverse();
        assert_eq!(rank(&query, &reversed, &all(0.0)), first);
    }

    #[test]
    fn unembeddable_records_are_not_ranked() {
        let mut binary = file("/r/blob.txt", vec![]);
        binary.status = RecordStatus::Unembeddable {
            reason: UnembeddableReason::Binary,
        };
        let empty = file("/r/empty.py", vec![]);
        let results = rank(&[1.0], &[binary, empty], &all(0.0));
        assert!(results.is_empty());
    }
}
