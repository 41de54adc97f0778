//! Property-based generators using proptest.

use crate::fixtures::{program_row, term_row};
use feedsync_protocol::Row;
use proptest::prelude::*;

/// Generates a term label with a year and an optional parity word.
pub fn term_label() -> impl Strategy<Value = (i32, Option<&'static str>, String)> {
    (
        1990i32..2040,
        prop_oneof![
            Just(Some("Ganjil")),
            Just(Some("GENAP")),
            Just(Some("odd")),
            Just(Some("Even")),
            Just(None),
        ],
    )
        .prop_map(|(year, word)| {
            let label = match word {
                Some(word) => format!("{year}/{} {word}", year + 1),
                None => format!("{year}/{} Pendek", year + 1),
            };
            (year, word, label)
        })
}

/// Generates term rows with distinct ids inside `years`.
pub fn term_rows(years: std::ops::Range<i32>, max: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::btree_set((years, 1i32..=3), 0..=max).prop_map(|ids| {
        ids.into_iter()
            .map(|(year, period)| {
                let parity = if period == 2 { "Genap" } else { "Ganjil" };
                term_row(
                    &format!("{year}{period}"),
                    &format!("{year}/{} {parity}", year + 1),
                )
            })
            .collect()
    })
}

/// Generates program rows with distinct ids and arbitrary names.
pub fn program_rows(max: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::btree_map(0u32..10_000, "[A-Za-z ]{1,20}", 0..=max).prop_map(|programs| {
        programs
            .into_iter()
            .map(|(id, name)| program_row(&format!("P{id}"), &format!("C{id}"), &name))
            .collect()
    })
}
