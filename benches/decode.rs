use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lexparse::{symbols, ChartDecoder, DecoderConfig, EnglishRules, Symbol};

const MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/toy");

fn decode(decoder: &mut ChartDecoder, sentence: &[Symbol]) -> usize {
  decoder.decode(sentence, &[], false).parses.len()
}

fn criterion_benchmark(c: &mut Criterion) {
  let mut decoder = ChartDecoder::load(MODEL, DecoderConfig::default(), Arc::new(EnglishRules::new())).unwrap();
  let simple_input = symbols("John left .");
  let complex_input = symbols("Mary saw the dog .");
  let fragmented_input = symbols("the dog John saw Mary the dog left .");

  c.bench_function("decode simple", |b| {
    b.iter(|| decode(&mut decoder, black_box(&simple_input)))
  });

  c.bench_function("decode transitive", |b| {
    b.iter(|| decode(&mut decoder, black_box(&complex_input)))
  });

  c.bench_function("decode fragments", |b| {
    b.iter(|| decode(&mut decoder, black_box(&fragmented_input)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
