//! Tests for dependency-ordered batch evaluation and concurrent use

use gridcalc::prelude::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

fn values(results: &[EvaluationResult]) -> Vec<Option<CellValue>> {
    results.iter().map(|r| r.value.clone()).collect()
}

/// Later cells see values computed for earlier layers, in any input order
#[test]
fn test_batch_dependency_order() {
    let engine = FormulaEngine::new();
    engine.set_worksheet_data([("A1", 2.0)]).unwrap();

    let results = engine
        .batch_evaluate([
            ("C1", "=B1*10"),
            ("B1", "=A1+1"),
            ("D1", "=SUM(B1:C1)"),
        ])
        .unwrap();

    assert_eq!(
        values(&results),
        vec![
            Some(CellValue::Number(30.0)),
            Some(CellValue::Number(3.0)),
            Some(CellValue::Number(33.0)),
        ]
    );
    assert!(results.iter().all(|r| !r.cached));
}

/// Batch cells may be names
#[test]
fn test_batch_named_cells() {
    let engine = FormulaEngine::new();
    engine
        .set_worksheet_data([("length", 12.0), ("width", 10.0), ("base_rate", 4.5)])
        .unwrap();

    let results = engine
        .batch_evaluate([
            ("cost", "=area*base_rate"),
            ("area", "=length*width"),
        ])
        .unwrap();
    assert_eq!(results[0].value, Some(CellValue::Number(540.0)));
    assert_eq!(results[1].value, Some(CellValue::Number(120.0)));
}

/// Cycle members and everything downstream report the cycle path
#[test]
fn test_batch_cycle() {
    let engine = FormulaEngine::new();
    let results = engine
        .batch_evaluate([
            ("A1", "=B1+1"),
            ("B1", "=A1+1"),
            ("C1", "=A1*2"),
            ("D1", "=5"),
        ])
        .unwrap();

    let cycle = Some("Circular reference: A1 -> B1 -> A1");
    assert_eq!(results[0].error.as_deref(), cycle);
    assert_eq!(results[1].error.as_deref(), cycle);
    assert_eq!(results[2].error.as_deref(), cycle);
    assert_eq!(results[2].value, None);
    assert_eq!(results[3].value, Some(CellValue::Number(5.0)));
}

/// A cell that fails to parse reads as #VALUE! downstream
#[test]
fn test_batch_parse_failure() {
    let engine = FormulaEngine::new();
    let results = engine
        .batch_evaluate([("A1", "=1+"), ("B1", "=A1*2"), ("C1", "=IFERROR(A1,0)")])
        .unwrap();

    assert!(results[0]
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Parse error")));
    assert_eq!(results[1].error.as_deref(), Some("#VALUE!"));
    assert_eq!(results[2].value, Some(CellValue::Number(0.0)));
}

/// Error values flow to dependents like any other value
#[test]
fn test_batch_error_propagation() {
    let engine = FormulaEngine::new();
    let results = engine
        .batch_evaluate([("A1", "=1/0"), ("B1", "=A1+1"), ("C1", "=ISERROR(A1)")])
        .unwrap();

    assert_eq!(results[0].error.as_deref(), Some("#DIV/0!"));
    assert_eq!(results[1].error.as_deref(), Some("#DIV/0!"));
    assert_eq!(results[2].value, Some(CellValue::Boolean(true)));
}

/// Invalid batches are rejected outright
#[test]
fn test_batch_invalid_input() {
    let engine = FormulaEngine::new();
    assert_eq!(
        engine.batch_evaluate([("A1", "=1"), ("a1", "=2")]),
        Err(EngineError::DuplicateCell("A1".into()))
    );
    assert_eq!(
        engine.batch_evaluate([("A1", "")]),
        Err(EngineError::EmptyFormula)
    );
}

/// Sequential and parallel batches agree
#[test]
fn test_parallel_matches_sequential() {
    let mut cells = Vec::new();
    for row in 1..=50 {
        cells.push((format!("A{row}"), format!("={row}*1.1")));
        cells.push((format!("B{row}"), format!("=A{row}+SUM(A1:A{row})")));
    }
    cells.push(("C1".to_string(), "=SUM(B1:B50)".to_string()));

    let parallel = FormulaEngine::new();
    let sequential = FormulaEngine::with_options(EngineOptions::default().with_parallel(false));

    let a = parallel.batch_evaluate(cells.clone()).unwrap();
    let b = sequential.batch_evaluate(cells).unwrap();
    assert_eq!(a, b);
    assert!(a.iter().all(EvaluationResult::is_ok));
}

/// Many threads may evaluate while the snapshot is being replaced
#[test]
fn test_concurrent_evaluation() {
    let engine = Arc::new(FormulaEngine::new());
    engine.set_worksheet_data([("A1", 1.0), ("A2", 1.0)]).unwrap();

    let readers: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..200 {
                    let result = engine.evaluate(&format!("B{}", i + 1), "=A1+A2").unwrap();
                    // both cells always come from the same snapshot
                    let n = result.as_number().unwrap();
                    assert!(n == 2.0 || n == 4.0, "torn read: {n}");
                }
            })
        })
        .collect();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..100 {
                let v = if i % 2 == 0 { 2.0 } else { 1.0 };
                engine.set_worksheet_data([("A1", v), ("A2", v)]).unwrap();
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();
}
