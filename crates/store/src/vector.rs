//! Vector similarity ranking over stored verse embeddings.

use selah_core::Passage;

/// Cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]. Returns 0.0 for empty, zero-norm, or
/// mismatched-length inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Rank `(passage, embedding)` pairs against a query embedding.
///
/// Keeps passages scoring at least `min_similarity`, best first, with
/// `score` set to the similarity.
pub fn rank_by_similarity<'a, I>(
    candidates: I,
    query: &[f32],
    limit: usize,
    min_similarity: f32,
) -> Vec<Passage>
where
    I: IntoIterator<Item = (&'a Passage, &'a [f32])>,
{
    let mut scored: Vec<Passage> = candidates
        .into_iter()
        .filter_map(|(passage, embedding)| {
            let sim = cosine_similarity(embedding, query);
            (sim >= min_similarity).then(|| Passage {
                score: sim,
                ..passage.clone()
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

/// Encode an embedding as little-endian f32 bytes.
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode little-endian f32 bytes; a trailing partial value is ignored.
pub fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
