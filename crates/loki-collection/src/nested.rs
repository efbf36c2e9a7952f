use bson::Bson;

use crate::document::Document;

/// Resolve a registered virtual accessor's path against a document.
///
/// Walks `obj.path[0].path[1]...`. If an intermediate segment is an array,
/// the remaining path is resolved against every element and the results are
/// flattened into a single `Bson::Array` (matching "return either the
/// scalar or a flattened list when any intermediate segment is a list").
/// Missing segments resolve to `Bson::Null`.
pub fn resolve_path(doc: &Document, path: &[String]) -> Bson {
    resolve_value(&Bson::Document(doc.clone()), path)
}

fn resolve_value(value: &Bson, path: &[String]) -> Bson {
    let Some((head, rest)) = path.split_first() else {
        return value.clone();
    };

    match value {
        Bson::Document(doc) => match doc.get(head) {
            Some(next) => resolve_value(next, rest),
            None => Bson::Null,
        },
        Bson::Array(items) => {
            let flattened: Vec<Bson> = items
                .iter()
                .map(|item| resolve_value(item, path))
                .flat_map(|v| match v {
                    Bson::Array(inner) => inner,
                    other => vec![other],
                })
                .collect();
            Bson::Array(flattened)
        }
        _ => Bson::Null,
    }
}
