//! Integration tests for #[cached_args_method]

use slotcache::{cached_args_method, InstanceCache, InstanceStorage};
use std::cell::Cell;
use std::sync::Arc;

struct Matrix {
    rows: Vec<Vec<i32>>,
    calls: Cell<u32>,
    cache: InstanceCache,
}

impl Matrix {
    fn new(rows: Vec<Vec<i32>>) -> Self {
        Self {
            rows,
            calls: Cell::new(0),
            cache: InstanceCache::new(),
        }
    }

    fn bump(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl InstanceStorage for Matrix {
    fn instance_cache(&self) -> &InstanceCache {
        &self.cache
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Axis {
    Row,
    Column,
}

impl Matrix {
    #[cached_args_method]
    fn row_sum(&self, row: usize) -> i32 {
        self.bump();
        self.rows[row].iter().sum()
    }

    #[cached_args_method]
    fn cell(&self, row: usize, column: usize) -> Option<i32> {
        self.bump();
        self.rows.get(row)?.get(column).copied()
    }

    #[cached_args_method]
    fn sum_along(&self, axis: Axis, index: usize) -> i32 {
        self.bump();
        match axis {
            Axis::Row => self.rows[index].iter().sum(),
            Axis::Column => self.rows.iter().map(|row| row[index]).sum(),
        }
    }

    #[cached_args_method]
    fn describe(&self, label: &str) -> String {
        self.bump();
        format!("{} ({}x{})", label, self.rows.len(), self.rows[0].len())
    }

    #[cached_args_method(freeze)]
    fn scaled_row(&self, row: usize, factor: i32) -> Vec<i32> {
        self.bump();
        self.rows[row].iter().map(|v| v * factor).collect()
    }

    #[cached_args_method]
    fn checked_row(&self, row: usize) -> Result<i32, String> {
        self.bump();
        match self.rows.get(row) {
            Some(values) => Ok(values.iter().sum()),
            None => Err(format!("row {} out of range", row)),
        }
    }
}

fn sample() -> Matrix {
    Matrix::new(vec![vec![1, 2, 3], vec![4, 5, 6]])
}

#[test]
fn test_distinct_args_compute_separately() {
    let matrix = sample();
    assert_eq!(matrix.row_sum(0), 6);
    assert_eq!(matrix.row_sum(1), 15);
    assert_eq!(matrix.calls.get(), 2);

    assert_eq!(matrix.row_sum(0), 6);
    assert_eq!(matrix.calls.get(), 2);
}

#[test]
fn test_multiple_arguments_form_one_key() {
    let matrix = sample();
    assert_eq!(matrix.cell(0, 1), Some(2));
    assert_eq!(matrix.cell(1, 0), Some(4));
    assert_eq!(matrix.cell(5, 5), None);
    assert_eq!(matrix.cell(0, 1), Some(2));
    assert_eq!(matrix.calls.get(), 3);
}

#[test]
fn test_custom_hashable_argument() {
    let matrix = sample();
    assert_eq!(matrix.sum_along(Axis::Row, 0), 6);
    assert_eq!(matrix.sum_along(Axis::Column, 0), 5);
    assert_eq!(matrix.sum_along(Axis::Row, 0), 6);
    assert_eq!(matrix.calls.get(), 2);
}

#[test]
fn test_borrowed_str_argument() {
    let matrix = sample();
    let label = String::from("grid");
    assert_eq!(matrix.describe(&label), "grid (2x3)");
    assert_eq!(matrix.describe("grid"), "grid (2x3)");
    assert_eq!(matrix.describe("other"), "other (2x3)");
    assert_eq!(matrix.calls.get(), 2);
}

#[test]
fn test_entries_are_per_instance() {
    let first = sample();
    let second = Matrix::new(vec![vec![10, 10]]);
    assert_eq!(first.row_sum(0), 6);
    assert_eq!(second.row_sum(0), 20);
    assert_eq!(first.calls.get(), 1);
    assert_eq!(second.calls.get(), 1);
}

#[test]
fn test_frozen_values_per_key() {
    let matrix = sample();
    let doubled = matrix.scaled_row(0, 2);
    let tripled = matrix.scaled_row(0, 3);

    assert_eq!(&*doubled, &[2, 4, 6]);
    assert_eq!(&*tripled, &[3, 6, 9]);
    assert!(Arc::ptr_eq(&doubled, &matrix.scaled_row(0, 2)));
    assert!(!Arc::ptr_eq(&doubled, &tripled));
}

#[test]
fn test_errors_are_retried_per_key() {
    let matrix = sample();
    assert_eq!(matrix.checked_row(9), Err("row 9 out of range".to_string()));
    assert_eq!(matrix.checked_row(9), Err("row 9 out of range".to_string()));
    assert_eq!(matrix.checked_row(1), Ok(15));
    assert_eq!(matrix.checked_row(1), Ok(15));
    assert_eq!(matrix.calls.get(), 3);
}
