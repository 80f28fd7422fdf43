use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use pika::grammar::{CharSet, Expr, Grammar, GrammarBuilder};
use pika::parser::ParseDriver;
use pika::testing::{GeneratorConfig, InputGenerator};

/// E <- E '+' E / [0-9]+  (left recursive)
fn arithmetic_grammar() -> Grammar {
    GrammarBuilder::new()
        .entry_point("E")
        .rule(
            "E",
            Expr::first([
                Expr::seq([Expr::ref_("E"), Expr::lit("+"), Expr::ref_("E")]),
                Expr::plus(Expr::char_set(CharSet::digits())),
            ]),
        )
        .build()
        .expect("bench grammar should build")
}

/// Ident <- [A-Za-z] ([A-Za-z] / [0-9])*
fn ident_grammar() -> Grammar {
    GrammarBuilder::new()
        .entry_point("Ident")
        .rule(
            "Ident",
            Expr::seq([
                Expr::char_set(CharSet::letters()),
                Expr::star(Expr::first([
                    Expr::char_set(CharSet::letters()),
                    Expr::char_set(CharSet::digits()),
                ])),
            ]),
        )
        .build()
        .expect("bench grammar should build")
}

fn sum_input(terms: usize) -> String {
    (0..terms)
        .map(|i| (i % 10).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

fn bench_left_recursive_sum(c: &mut Criterion) {
    let grammar = arithmetic_grammar();
    let driver = ParseDriver::new(&grammar);
    let mut group = c.benchmark_group("left_recursive_sum");
    for terms in [8, 32] {
        let input = sum_input(terms);
        group.bench_function(format!("{terms}_terms"), |b| {
            b.iter(|| black_box(driver.parse(black_box(&input))));
        });
    }
    group.finish();
}

fn bench_generated_ident(c: &mut Criterion) {
    let grammar = ident_grammar();
    let driver = ParseDriver::new(&grammar);
    let generator = InputGenerator::new(
        &grammar,
        GeneratorConfig {
            max_repetitions: 64,
            seed: Some(42),
            ..GeneratorConfig::default()
        },
    );
    let input = generator.generate(grammar.entry_clause());
    c.bench_function("generated_ident", |b| {
        b.iter(|| black_box(driver.parse(black_box(&input))));
    });
}

criterion_group!(benches, bench_left_recursive_sum, bench_generated_ident);
criterion_main!(benches);
