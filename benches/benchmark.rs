use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hirematch::{score, EmbeddingGenerator, Settings, VectorIndex};
use rand::prelude::*;

const DIMENSIONS: i64 = 256;
const NUM_ELEMENTS: usize = 1000; // Number of resumes in the index
const NUM_QUERIES: usize = 10; // Number of queries to perform

const WORDS: &[&str] = &[
    "rust", "python", "aws", "kubernetes", "postgresql", "react", "typescript", "docker",
    "terraform", "kafka", "backend", "frontend", "engineer", "senior", "lead", "years",
    "experience", "distributed", "systems", "cloud", "api", "design", "testing", "mentoring",
];

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(10))
        .warm_up_time(std::time::Duration::from_secs(2))
        .configure_from_args()
}

fn synthetic_resume(rng: &mut StdRng, words: usize) -> String {
    (0..words)
        .map(|_| *WORDS.choose(rng).unwrap())
        .collect::<Vec<_>>()
        .join(" ")
}

fn score_resumes(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let job = synthetic_resume(&mut rng, 80);
    let skills: Vec<String> = WORDS[..5].iter().map(|s| s.to_string()).collect();

    let mut group = c.benchmark_group("score");
    for words in [100, 1000] {
        let resume = synthetic_resume(&mut rng, words);
        group.bench_with_input(BenchmarkId::new("resume_words", words), &resume, |b, resume| {
            b.iter(|| score(&job, &skills, resume))
        });
    }
    group.finish();

    let generator = EmbeddingGenerator::new(DIMENSIONS).unwrap();
    let resume = synthetic_resume(&mut rng, 1000);
    c.bench_function("embed_1000_words", |b| b.iter(|| generator.embed(&resume)));
}

fn search_index(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let settings = Settings::new(dir.path().join("bench.index"), DIMENSIONS).unwrap();
    let (index, _) = VectorIndex::open(&settings).unwrap();
    let generator = EmbeddingGenerator::new(DIMENSIONS).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let vectors: Vec<_> = (0..NUM_ELEMENTS)
        .map(|_| generator.embed(&synthetic_resume(&mut rng, 200)))
        .collect();
    let ids: Vec<String> = (0..NUM_ELEMENTS).map(|i| format!("cand-{}", i)).collect();
    index.add(&vectors, &ids).unwrap();

    let queries: Vec<_> = (0..NUM_QUERIES)
        .map(|_| generator.embed(&synthetic_resume(&mut rng, 30)))
        .collect();

    c.bench_function(&format!("search_{}_queries", NUM_QUERIES), |b| {
        b.iter(|| {
            for query in &queries {
                let hits = index.search(query, 10).unwrap();
                assert_eq!(hits.len(), 10);
            }
        })
    });

    c.bench_function("add_one_with_snapshot", |b| {
        let mut n = 0usize;
        b.iter(|| {
            n += 1;
            index
                .add(&[queries[n % NUM_QUERIES].clone()], &[format!("extra-{}", n)])
                .unwrap();
        })
    });
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = score_resumes, search_index
}
criterion_main!(benches);
