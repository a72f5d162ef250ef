//! Benchmarks for the per-turn CPU work: prompt assembly and citation
//! extraction. Both run once per tenant message while the session is locked,
//! so they bound how long other turns on the same session wait.

use std::time::Duration;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use leasa_chat::{ContextAssembler, RecommendationExtractor, DEFAULT_POLICY};
use leasa_core::types::{Listing, Turn};

/// A catalog of `n` listings with realistic field lengths.
fn generate_catalog(n: usize) -> Vec<Listing> {
    (0..n)
        .map(|i| Listing {
            id: format!("listing-{:04}", i),
            address: format!("{} Market Street, Apt {}, San Francisco, CA 94103", 100 + i, i % 40),
            description: "Bright two-bedroom unit with in-unit laundry, hardwood floors, \
                          a renovated kitchen and a shared roof deck. Close to transit."
                .to_string(),
            specifications: "No smoking. Small pets negotiable. Income 3x rent. \
                             12-month minimum lease. Credit check required."
                .to_string(),
            price: Some(2400.0 + (i as f64) * 15.0),
            created_at: Utc::now(),
        })
        .collect()
}

fn generate_transcript(turns: usize) -> Vec<Turn> {
    (0..turns)
        .map(|i| {
            if i % 2 == 0 {
                Turn::tenant(format!(
                    "I'm looking for something near downtown under $3000, message {}",
                    i
                ))
            } else {
                Turn::agent(format!(
                    "Here are a few options that match most of what you asked for, reply {}. \
                     The first one is slightly over budget but has parking.",
                    i
                ))
            }
        })
        .collect()
}

fn bench_assemble(c: &mut Criterion) {
    let catalog = generate_catalog(200);
    let transcript = generate_transcript(40);
    let unbounded = ContextAssembler::new(DEFAULT_POLICY, 0);
    let bounded = ContextAssembler::new(DEFAULT_POLICY, 60_000);

    let mut group = c.benchmark_group("context_assembly");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("catalog_200_turns_40", |b| {
        b.iter(|| unbounded.assemble(black_box(&catalog), black_box(&transcript), "2BR?"))
    });

    // Budget forces the oldest turns out.
    group.bench_function("catalog_200_turns_40_truncated", |b| {
        b.iter(|| bounded.assemble(black_box(&catalog), black_box(&transcript), "2BR?"))
    });

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let catalog = generate_catalog(200);
    let extractor = RecommendationExtractor::default();

    let cited: String = (0..10)
        .map(|i| {
            format!(
                "Option {} is a strong match for your commute. [PROPERTY_ID: listing-{:04}]\n",
                i,
                i * 17
            )
        })
        .collect();
    let plain = "Could you tell me your budget and preferred move-in date first?".repeat(10);

    let mut group = c.benchmark_group("recommendation_extraction");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("ten_citations", |b| {
        b.iter(|| extractor.extract(black_box(&cited), black_box(&catalog)))
    });

    group.bench_function("no_citations", |b| {
        b.iter(|| extractor.extract(black_box(&plain), black_box(&catalog)))
    });

    group.finish();
}

criterion_group!(benches, bench_assemble, bench_extract);
criterion_main!(benches);
