use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridcalc_core::{CellKey, Worksheet};
use gridcalc_formula::{evaluate, parse_formula, resolve_dependencies, DependencyGraph, EvaluationContext};

const FORMULAS: &[(&str, &str)] = &[
    ("literal", "=1+2*3"),
    ("references", "=(length+width)*2*height-door_area*doors-window_area*windows"),
    ("nested_if", "=IF(A1>=90,\"A\",IF(A1>=80,\"B\",IF(A1>=70,\"C\",\"F\")))"),
    ("range_math", "=SUM(A1:A100*B1:B100)/COUNT(A1:A100)"),
    ("qualified", "=VLOOKUP('Price List'!A2,[Book.xlsx]Rates!$A$1:$D$500,3,FALSE)"),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, formula) in FORMULAS {
        group.bench_with_input(BenchmarkId::from_parameter(name), formula, |b, formula| {
            b.iter(|| parse_formula(black_box(formula)))
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut sheet = Worksheet::new();
    for row in 1..=100u32 {
        sheet.insert(CellKey::parse(&format!("A{row}")).unwrap(), f64::from(row) * 0.1);
        sheet.insert(CellKey::parse(&format!("B{row}")).unwrap(), f64::from(row));
    }
    let ast = parse_formula("=SUM(A1:A100*B1:B100)/COUNT(A1:A100)").unwrap();

    c.bench_function("evaluate/range_math", |b| {
        b.iter(|| {
            let ctx = EvaluationContext::new(&sheet);
            evaluate(black_box(&ast), &ctx)
        })
    });
}

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule");
    for size in [100u32, 1_000, 5_000] {
        // a chain A2 = A1 + 1, A3 = A2 + 1, ...
        let deps: Vec<_> = (2..=size)
            .map(|row| {
                let cell = CellKey::parse(&format!("A{row}")).unwrap();
                let ast = parse_formula(&format!("=A{}+1", row - 1)).unwrap();
                (cell, resolve_dependencies(&ast))
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &deps, |b, deps| {
            b.iter(|| {
                let graph =
                    DependencyGraph::from_formulas(deps.iter().map(|(cell, set)| (cell.clone(), set)));
                graph.schedule()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_schedule);
criterion_main!(benches);
