use bson::Bson;

use crate::document::Document;
use crate::nested::resolve_path;

/// Raw (non-numeric-coerced) projection of `field` across every document.
pub fn extract(data: &[Document], field: &[String]) -> Vec<Bson> {
    data.iter().map(|doc| resolve_path(doc, field)).collect()
}

/// Coerce each value to `f64` (accepting numbers and numeric strings) and
/// drop anything non-finite or non-numeric.
pub fn extract_numerical(data: &[Document], field: &[String]) -> Vec<f64> {
    extract(data, field)
        .into_iter()
        .filter_map(|v| to_f64(&v))
        .filter(|v| v.is_finite())
        .collect()
}

fn to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(d) => Some(*d),
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some(v),
        Some(a) => Some(a.min(v)),
    })
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some(v),
        Some(a) => Some(a.max(v)),
    })
}

pub fn avg(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = avg(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Value with the highest occurrence count. `None` over an empty
/// projection; ties resolve to the first value reaching the winning count
/// in iteration order.
pub fn mode(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &v in values {
        match counts.iter_mut().find(|(existing, _)| *existing == v) {
            Some((_, count)) => *count += 1,
            None => counts.push((v, 1)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(v, _)| v)
}

/// Middle value, or the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// The full document whose numerical projection of `field` is minimal.
pub fn min_record<'a>(data: &'a [Document], field: &[String]) -> Option<&'a Document> {
    extremum_record(data, field, f64::lt)
}

/// The full document whose numerical projection of `field` is maximal.
pub fn max_record<'a>(data: &'a [Document], field: &[String]) -> Option<&'a Document> {
    extremum_record(data, field, f64::gt)
}

fn extremum_record<'a>(
    data: &'a [Document],
    field: &[String],
    better: impl Fn(&f64, &f64) -> bool,
) -> Option<&'a Document> {
    let mut best: Option<(&Document, f64)> = None;
    for doc in data {
        let Some(v) = to_f64(&resolve_path(doc, field)).filter(|v| v.is_finite()) else {
            continue;
        };
        match &best {
            None => best = Some((doc, v)),
            Some((_, current)) if better(&v, current) => best = Some((doc, v)),
            _ => {}
        }
    }
    best.map(|(doc, _)| doc)
}
