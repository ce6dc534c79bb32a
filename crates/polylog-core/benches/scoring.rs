use criterion::{black_box, criterion_group, criterion_main, Criterion};

use polylog_core::feedback::parse_feedback_str;
use polylog_core::scoring::{normalize_credits, Outcome};
use polylog_core::similarity::similarity;

fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");

    group.bench_function("short_latin", |b| {
        b.iter(|| similarity(black_box("Good morning!"), black_box("good mornin")))
    });

    group.bench_function("sentence_hangul", |b| {
        b.iter(|| {
            similarity(
                black_box("오늘은 날씨가 정말 좋네요, 산책하러 갈까요?"),
                black_box("오늘 날씨가 정말 좋네요 산책 갈까요"),
            )
        })
    });

    let long_a = "the quick brown fox jumps over the lazy dog ".repeat(8);
    let long_b = "a quick brown fox jumped over two lazy dogs ".repeat(8);
    group.bench_function("paragraph", |b| {
        b.iter(|| similarity(black_box(&long_a), black_box(&long_b)))
    });

    group.finish();
}

fn bench_normalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_credits");

    for n in [10usize, 100, 1000] {
        let outcomes: Vec<Outcome> = (0..n)
            .map(|i| {
                if i % 3 == 0 {
                    Outcome::Similarity(i as f64 / n as f64)
                } else {
                    Outcome::Discrete(i % 2 == 0)
                }
            })
            .collect();
        group.bench_function(format!("n={n}"), |b| {
            b.iter(|| normalize_credits(black_box(&outcomes)))
        });
    }

    group.finish();
}

fn bench_feedback(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_feedback");

    let legacy = r#"{
        "문법": {"스코어": 70, "피드백": "시제가 틀렸습니다."},
        "단어 선택 및 문맥": {"스코어": 80, "피드백": "자연스럽습니다."},
        "총점": {"스코어": 75, "피드백": "좋은 번역입니다."}
    }"#;
    let current = r#"{"score": 62, "feedback": "Mostly right."}"#;

    group.bench_function("legacy", |b| {
        b.iter(|| parse_feedback_str(black_box(legacy)))
    });
    group.bench_function("current", |b| {
        b.iter(|| parse_feedback_str(black_box(current)))
    });

    group.finish();
}

criterion_group!(benches, bench_similarity, bench_normalizer, bench_feedback);
criterion_main!(benches);
