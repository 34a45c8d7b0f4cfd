//! Deep merge of JSON documents

use serde_json::Value;

/// Merge `patch` into `target`.
///
/// - arrays on both sides are concatenated, dropping structural duplicates
/// - objects on both sides merge key by key
/// - keys present on one side only are kept
/// - any other conflict takes the patch value
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match target_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, patch_value),
                    None => {
                        target_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (Value::Array(target_items), Value::Array(patch_items)) => {
            let mut merged: Vec<Value> = Vec::with_capacity(target_items.len() + patch_items.len());
            for item in target_items.drain(..).chain(patch_items.iter().cloned()) {
                if !merged.contains(&item) {
                    merged.push(item);
                }
            }
            *target_items = merged;
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Merge a patch into JSON text and pretty-print the result.
///
/// A trailing newline on the input is kept.
pub fn merge_json_text(text: &str, patch: &Value) -> serde_json::Result<String> {
    let mut document: Value = serde_json::from_str(text)?;
    deep_merge(&mut document, patch);
    let mut out = serde_json::to_string_pretty(&document)?;
    if text.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
