//! Property tests for chunking, similarity, and retrieval.

use docqa::document::{Chunk, Document};
use docqa::{Chunker, Corpus, WordBudgetChunker, best_match, cosine_similarity};
use proptest::prelude::*;

/// Text made of words separated by arbitrary whitespace runs.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(("[a-zA-Z0-9.,é]{1,15}", "[ \t\n]{1,3}"), 0..40).prop_map(|parts| {
        parts.into_iter().map(|(word, sep)| format!("{sep}{word}")).collect::<String>()
    })
}

/// A non-zero embedding of the given dimension.
fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
        .prop_filter("non-zero embedding", |v| v.iter().map(|x| x * x).sum::<f32>() > 1e-6)
}

/// A corpus of up to four documents with up to five chunks each.
fn arb_corpus(dim: usize) -> impl Strategy<Value = Corpus> {
    proptest::collection::vec(proptest::collection::vec(arb_embedding(dim), 0..5), 0..4).prop_map(
        |docs| {
            docs.into_iter()
                .enumerate()
                .map(|(d, embeddings)| {
                    let id = format!("doc-{d}");
                    Document {
                        id: id.clone(),
                        text: String::new(),
                        chunks: embeddings
                            .into_iter()
                            .enumerate()
                            .map(|(index, embedding)| Chunk {
                                document_id: id.clone(),
                                index,
                                text: format!("{id}/{index}"),
                                embedding,
                            })
                            .collect(),
                    }
                })
                .collect()
        },
    )
}

/// **Property: chunk reconstruction and non-emptiness**
/// *For any* text and budget, joining the chunks with single spaces reproduces
/// the whitespace-normalized words, and no chunk is empty.
mod prop_chunking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_rejoin_to_normalized_words(text in arb_text(), budget in 1usize..60) {
            let chunks = WordBudgetChunker::new(budget).chunk(&text);
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

            prop_assert_eq!(chunks.join(" "), normalized);
            prop_assert!(chunks.iter().all(|c| !c.is_empty()));
        }

        #[test]
        fn every_chunk_but_the_last_exceeds_the_budget(text in arb_text(), budget in 1usize..60) {
            let chunks = WordBudgetChunker::new(budget).chunk(&text);
            let word_chars = |c: &String| -> usize {
                c.split_whitespace().map(|w| w.chars().count()).sum()
            };

            if let Some((_, closed)) = chunks.split_last() {
                for chunk in closed {
                    prop_assert!(word_chars(chunk) > budget);
                    // Without its last word the chunk was still within budget.
                    let last = chunk.split_whitespace().last().unwrap();
                    prop_assert!(word_chars(chunk) - last.chars().count() <= budget);
                }
            }
        }
    }
}

/// **Property: cosine similarity range**
/// *For any* non-zero vectors, similarity lies in `[-1, 1]` and a vector is
/// maximally similar to itself.
mod prop_similarity {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn similarity_is_bounded(u in arb_embedding(DIM), v in arb_embedding(DIM)) {
            let sim = cosine_similarity(&u, &v).unwrap();
            prop_assert!((-1.0..=1.0).contains(&sim));
        }

        #[test]
        fn self_similarity_is_one(u in arb_embedding(DIM)) {
            let sim = cosine_similarity(&u, &u).unwrap();
            prop_assert!((sim - 1.0).abs() < 1e-4, "self similarity was {}", sim);
        }
    }
}

/// **Property: retriever determinism and tie-break**
/// *For any* corpus and query, retrieval returns the same triple every time,
/// that triple has the maximal score, and no earlier chunk scores as high.
mod prop_retrieval {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn best_match_is_first_global_maximum(corpus in arb_corpus(DIM), query in arb_embedding(DIM)) {
            let first = best_match(&corpus, &query).unwrap();
            let second = best_match(&corpus, &query).unwrap();
            prop_assert_eq!(&first, &second);

            let scores: Vec<(String, usize, f32)> = corpus
                .chunks()
                .map(|c| (c.document_id.clone(), c.index, cosine_similarity(&query, &c.embedding).unwrap()))
                .collect();

            match first {
                None => prop_assert!(scores.is_empty()),
                Some(found) => {
                    let position = scores
                        .iter()
                        .position(|(doc, idx, _)| *doc == found.document_id && *idx == found.chunk_index)
                        .unwrap();
                    prop_assert!(scores.iter().all(|(_, _, s)| *s <= found.score));
                    prop_assert!(scores[..position].iter().all(|(_, _, s)| *s < found.score));
                }
            }
        }

        #[test]
        fn duplicated_best_chunk_resolves_to_earlier_document(
            corpus in arb_corpus(DIM),
            query in arb_embedding(DIM),
        ) {
            // Append a document whose only chunk equals the query; then prepend
            // a copy. The prepended copy must win the tie.
            let exact = |id: &str| Document {
                id: id.to_string(),
                text: String::new(),
                chunks: vec![Chunk {
                    document_id: id.to_string(),
                    index: 0,
                    text: "exact".to_string(),
                    embedding: query.clone(),
                }],
            };
            let mut documents = vec![exact("front")];
            documents.extend(corpus.documents().cloned());
            documents.push(exact("back"));
            let corpus: Corpus = documents.into_iter().collect();

            let found = best_match(&corpus, &query).unwrap().unwrap();
            prop_assert_eq!(found.document_id, "front");
        }
    }
}
