//! Shared fixtures: miniature word spaces built in temporary directories.

#![allow(dead_code)]

use std::path::Path;
use tantivy::{Index, TantivyDocument};
use wordspace::store::sparse::WordFields;
use wordspace::{DenseStore, RELATION_SEPARATOR, WordspaceConfig};

/// One entry of a sparse fixture space.
pub struct SparseEntry {
    pub word: &'static str,
    pub freq: u64,
    /// Similar words, highest similarity first (empty for COL spaces).
    pub neighbors: &'static str,
    pub neighbor_sims: &'static str,
    /// Feature keys (`{rel}` is replaced with the relation separator).
    pub features: &'static str,
    pub significances: &'static str,
}

/// The standard sparse fixture: four fruit-and-car words with overlapping
/// feature vectors and hand-picked neighbor lists.
pub fn fruit_entries() -> Vec<SparseEntry> {
    vec![
        SparseEntry {
            word: "apple",
            freq: 100,
            neighbors: "banana cherry car",
            neighbor_sims: "0.8 0.6 0.1",
            features: "red sweet fruit{rel}n fruit",
            significances: "0.5 0.3 0.4 0.2",
        },
        SparseEntry {
            word: "banana",
            freq: 80,
            neighbors: "apple cherry",
            neighbor_sims: "0.8 0.5",
            features: "yellow sweet fruit",
            significances: "0.7 0.4 0.5",
        },
        SparseEntry {
            word: "cherry",
            freq: 60,
            neighbors: "apple banana",
            neighbor_sims: "0.6 0.5",
            features: "red sweet fruit",
            significances: "0.6 0.2 0.3",
        },
        SparseEntry {
            word: "car",
            freq: 500,
            neighbors: "apple",
            neighbor_sims: "0.1",
            features: "fast red",
            significances: "0.9 0.1",
        },
    ]
}

/// Write a sparse word space (index plus config file) into `dir`.
pub fn write_sparse_space(dir: &Path, entries: &[SparseEntry], sim: bool) {
    let (schema, fields) = WordFields::build();
    let index = Index::create_in_dir(dir, schema).expect("create index");
    let mut writer = index
        .writer::<TantivyDocument>(50_000_000)
        .expect("create writer");
    for entry in entries {
        let mut doc = TantivyDocument::default();
        doc.add_text(fields.word, entry.word);
        doc.add_u64(fields.freq, entry.freq);
        if sim {
            doc.add_text(fields.dsb, entry.neighbors);
            doc.add_text(fields.dsb_sim, entry.neighbor_sims);
        } else {
            doc.add_text(fields.dsb, "");
            doc.add_text(fields.dsb_sim, "");
        }
        let features = entry
            .features
            .replace("{rel}", &RELATION_SEPARATOR.to_string());
        doc.add_text(fields.kol, &features);
        doc.add_text(fields.kol_sig, entry.significances);
        writer.add_document(doc).expect("add document");
    }
    writer.commit().expect("commit");

    let config = format!(
        "vocabularySize={}\n\
         tokencount=10000\n\
         minFreq=60\n\
         maxFreq=500\n\
         stopwords=the of a\n\
         numberOfSimilarWords=3\n\
         numberFeatureWords=6\n\
         similarityMeasure=KOLB\n\
         dontCompute2ndOrder={}\n",
        entries.len(),
        !sim
    );
    std::fs::write(dir.join("disco.config"), config).expect("write config");
}

/// Words and vectors of the dense fixture. The vectors are chosen so that
/// `woman + king - man` equals `queen` exactly.
pub fn royal_words() -> (Vec<String>, Vec<Vec<f32>>) {
    let words = ["king", "queen", "man", "woman", "apple"];
    let vectors = vec![
        vec![1.0, 0.0, 1.0, 1.0],
        vec![0.0, 1.0, 1.0, 1.0],
        vec![1.0, 0.0, 1.0, 0.0],
        vec![0.0, 1.0, 1.0, 0.0],
        vec![-0.5, -0.5, 0.1, 0.0],
    ];
    (words.iter().map(|w| w.to_string()).collect(), vectors)
}

fn cosine(v1: &[f32], v2: &[f32]) -> f32 {
    let dot: f32 = v1.iter().zip(v2).map(|(a, b)| a * b).sum();
    let n1: f32 = v1.iter().map(|a| a * a).sum();
    let n2: f32 = v2.iter().map(|a| a * a).sum();
    dot / (n1 * n2).sqrt()
}

fn dense_config() -> WordspaceConfig {
    WordspaceConfig {
        tokencount: 10000,
        min_freq: 10,
        max_freq: 1000,
        stopwords: "the of a".to_string(),
        similarity_measure: wordspace::SimilarityMeasure::Cosine,
        ..Default::default()
    }
}

/// A dense COL space over the royal fixture words.
pub fn dense_col_space() -> DenseStore {
    let (words, vectors) = royal_words();
    let dim = vectors[0].len();
    let matrix: Vec<f32> = vectors.into_iter().flatten().collect();
    let frequencies = vec![100, 80, 500, 450, 60];
    DenseStore::new(words, frequencies, matrix, dim, dense_config()).expect("build dense store")
}

/// A dense SIM space over the royal fixture words, with the top `n_sim`
/// cosine neighbors of each word stored (zero-padded rows).
pub fn dense_sim_space(n_sim: usize) -> DenseStore {
    let (words, vectors) = royal_words();
    build_sim_space(words, vectors, vec![100, 80, 500, 450, 60], n_sim)
}

/// A larger dense SIM space: `n` words with unit vectors spread over a ring,
/// each storing its two ring neighbors. Word `i` is named `w{i}`.
pub fn ring_sim_space(n: usize) -> DenseStore {
    let words: Vec<String> = (0..n).map(|i| format!("w{i}")).collect();
    let vectors: Vec<Vec<f32>> = (0..n)
        .map(|i| {
            let theta = i as f32 * 2.0 * std::f32::consts::PI / n as f32;
            vec![theta.cos(), theta.sin()]
        })
        .collect();
    let frequencies = vec![100u32; n];
    build_sim_space(words, vectors, frequencies, 2)
}

fn build_sim_space(
    words: Vec<String>,
    vectors: Vec<Vec<f32>>,
    frequencies: Vec<u32>,
    n_sim: usize,
) -> DenseStore {
    let n = words.len();
    let dim = vectors[0].len();

    let mut sim_matrix = vec![0i32; n * n_sim];
    let mut sim_values = vec![0.0f32; n * n_sim];
    for i in 0..n {
        let mut neighbors: Vec<(usize, f32)> = (0..n)
            .filter(|k| *k != i)
            .map(|k| (k, cosine(&vectors[i], &vectors[k])))
            .filter(|(_, sim)| *sim > 0.0)
            .collect();
        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (slot, (id, sim)) in neighbors.into_iter().take(n_sim).enumerate() {
            sim_matrix[i * n_sim + slot] = id as i32;
            sim_values[i * n_sim + slot] = sim;
        }
    }

    let matrix: Vec<f32> = vectors.into_iter().flatten().collect();
    DenseStore::new(words, frequencies, matrix, dim, dense_config())
        .expect("build dense store")
        .with_neighbors(sim_matrix, sim_values, n_sim)
        .expect("attach neighbors")
}
