//! JSON dump: a list of `[start_ms, end_ms, text, meta]` tuples.
//!
//! On upload the list may arrive as native JSON instead of a string, so
//! [`from_value`] is offered alongside [`parse`].

use std::collections::BTreeMap;

use serde_json::Value;

use super::{SubtitleItem, SubtitleSet};
use crate::error::CoreError;

fn time_field(idx: usize, value: Option<&Value>) -> Result<Option<i64>, CoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| CoreError::Validation(format!("Subtitle {idx}: times must be integers"))),
    }
}

/// `[start, end, text]` with an optional fourth `meta` object.
fn tuple_item(idx: usize, fields: Vec<Value>) -> Result<SubtitleItem, CoreError> {
    if fields.len() < 3 || fields.len() > 4 {
        return Err(CoreError::Validation(format!(
            "Subtitle {idx}: expected [start, end, text, meta]"
        )));
    }
    let start_ms = time_field(idx, fields.first())?;
    let end_ms = time_field(idx, fields.get(1))?;
    let text = fields
        .get(2)
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::Validation(format!("Subtitle {idx}: text must be a string")))?
        .to_string();
    let meta: BTreeMap<String, Value> = match fields.get(3) {
        Some(Value::Object(map)) => map.clone().into_iter().collect(),
        None | Some(Value::Null) => BTreeMap::new(),
        Some(_) => {
            return Err(CoreError::Validation(format!(
                "Subtitle {idx}: meta must be an object"
            )))
        }
    };
    Ok(SubtitleItem {
        start_ms,
        end_ms,
        text,
        meta,
    })
}

pub fn parse(input: &str) -> Result<SubtitleSet, CoreError> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| CoreError::Validation(format!("Invalid JSON subtitles: {e}")))?;
    from_value(value)
}

/// Accept either tuples or `{start_ms, end_ms, text, meta}` objects.
pub fn from_value(value: Value) -> Result<SubtitleSet, CoreError> {
    let Value::Array(entries) = value else {
        return Err(CoreError::Validation(
            "JSON subtitles must be a list".to_string(),
        ));
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let item = match entry {
                Value::Array(fields) => tuple_item(idx, fields)?,
                other => serde_json::from_value(other)
                    .map_err(|e| CoreError::Validation(format!("Subtitle {idx}: {e}")))?,
            };
            Ok(item)
        })
        .collect::<Result<Vec<_>, CoreError>>()
        .map(SubtitleSet::from_items)
}

pub fn to_value(set: &SubtitleSet) -> Value {
    Value::Array(
        set.iter()
            .map(|item| {
                Value::Array(vec![
                    item.start_ms.map_or(Value::Null, Value::from),
                    item.end_ms.map_or(Value::Null, Value::from),
                    Value::from(item.text.clone()),
                    Value::Object(item.meta.clone().into_iter().collect()),
                ])
            })
            .collect(),
    )
}

pub fn serialize(set: &SubtitleSet) -> Result<String, CoreError> {
    serde_json::to_string(&to_value(set)).map_err(|e| CoreError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tuples_and_objects_are_both_accepted() {
        let set = from_value(json!([
            [100, 200, "a", {"new_paragraph": true}],
            {"start_ms": null, "end_ms": null, "text": "b"}
        ]))
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.items()[0].meta.get("new_paragraph"), Some(&json!(true)));
        assert!(!set.items()[1].is_synced());
    }

    #[test]
    fn output_is_tuple_list() {
        let set = SubtitleSet::from_timed(&[(1, 2, "x")]);
        assert_eq!(to_value(&set), json!([[1, 2, "x", {}]]));
    }

    #[test]
    fn non_lists_are_rejected() {
        assert!(parse("{\"a\": 1}").is_err());
        assert!(parse("not json").is_err());
    }
}
