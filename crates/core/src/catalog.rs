//! Static make → model → model-year catalog used to populate the analysis form.

use serde::Serialize;
use std::collections::BTreeMap;

struct ModelRange {
    model: &'static str,
    first_year: u16,
    last_year: u16,
}

const fn range(model: &'static str, first_year: u16, last_year: u16) -> ModelRange {
    ModelRange {
        model,
        first_year,
        last_year,
    }
}

const CATALOG: &[(&str, &[ModelRange])] = &[
    ("bmw", &[range("3 series", 2015, 2023), range("x5", 2015, 2023)]),
    ("chevrolet", &[range("equinox", 2015, 2023), range("silverado", 2015, 2023)]),
    ("ford", &[range("escape", 2015, 2023), range("f-150", 2015, 2023), range("mustang", 2015, 2023)]),
    ("honda", &[range("accord", 2015, 2023), range("civic", 2015, 2023), range("cr-v", 2015, 2023)]),
    ("jeep", &[range("grand cherokee", 2015, 2023), range("wrangler", 2015, 2023)]),
    ("tesla", &[range("model 3", 2018, 2023), range("model y", 2020, 2023)]),
    ("toyota", &[range("camry", 2015, 2023), range("corolla", 2015, 2023), range("rav4", 2015, 2023)]),
];

fn lookup_make(make: &str) -> Option<&'static [ModelRange]> {
    let make = make.trim().to_ascii_lowercase();
    CATALOG.iter().find(|(m, _)| *m == make).map(|(_, models)| *models)
}

pub fn makes() -> Vec<&'static str> {
    let mut out: Vec<_> = CATALOG.iter().map(|(m, _)| *m).collect();
    out.sort_unstable();
    out
}

/// Empty for an unknown make.
pub fn models(make: &str) -> Vec<&'static str> {
    let mut out: Vec<_> = lookup_make(make)
        .unwrap_or_default()
        .iter()
        .map(|r| r.model)
        .collect();
    out.sort_unstable();
    out
}

pub fn years(make: &str, model: &str) -> Vec<u16> {
    let model = model.trim().to_ascii_lowercase();
    lookup_make(make)
        .and_then(|models| models.iter().find(|r| r.model == model))
        .map(|r| (r.first_year..=r.last_year).collect())
        .unwrap_or_default()
}

pub fn contains(make: &str, model: &str, year: i32) -> bool {
    u16::try_from(year)
        .map(|y| years(make, model).contains(&y))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogTree(pub BTreeMap<&'static str, BTreeMap<&'static str, Vec<u16>>>);

pub fn tree() -> CatalogTree {
    let mut out = BTreeMap::new();
    for (make, models) in CATALOG {
        let entry: &mut BTreeMap<_, _> = out.entry(*make).or_default();
        for r in *models {
            entry.insert(r.model, (r.first_year..=r.last_year).collect());
        }
    }
    CatalogTree(out)
}
