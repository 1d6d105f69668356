use criterion::{criterion_group, criterion_main, Criterion};
use ptgen::{grammar::Grammar, lalr, ll1};
use std::{hint::black_box, path::Path};

criterion_main!(benches);
criterion_group!(benches, bench_ll1, bench_lalr);

fn load(name: &str) -> Grammar {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/grammars")
        .join(name);
    Grammar::from_file(path).unwrap()
}

fn bench_ll1(c: &mut Criterion) {
    for name in ["expr_ll1.txt", "script.txt"] {
        let grammar = load(name);
        c.bench_function(&format!("ll1/{}", name), |b| {
            b.iter(|| {
                let _table = black_box(ll1::compute(&grammar).unwrap());
            });
        });
    }
}

fn bench_lalr(c: &mut Criterion) {
    for name in ["expr_lalr.txt", "pointer.txt", "cond.txt", "ambiguous.txt"] {
        let grammar = load(name);
        c.bench_function(&format!("lalr/{}", name), |b| {
            b.iter(|| {
                let _table = black_box(lalr::compute(&grammar));
            });
        });
    }
}
