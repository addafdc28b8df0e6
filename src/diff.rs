//! Deep comparison of state snapshots.

use crate::value::{Record, Value};


/// Changes between two snapshots: a subset of the current snapshot's keys.
pub type Patch = Record;

/// Returns the entries of `current` that differ from `prev`.
///
/// For every key of `current`:
///
/// - Two records are compared recursively; the nested patch is attached only if it is non-empty.
/// - Two sequences of different lengths: the whole current sequence is attached.
/// - Two sequences of the same length are compared by index. If any index changed, a sequence of the
///   same length is attached, holding the nested patch (records), the new element (other changed values)
///   or the previous element (unchanged indices), so the full sequence can be rebuilt from the patch.
/// - Anything else, including values of different kinds, is attached if the values are not equal.
///
/// Keys that exist only in `prev` are not reported; removals are not visible in the patch.
pub fn state_changed(prev: &Record, current: &Record) -> Patch {
    let mut patch = Patch::new();
    for (key, value) in current {
        let Some(old) = prev.get(key) else {
            patch.insert(key.clone(), value.clone());
            continue;
        };
        match (old, value) {
            (Value::Sequence(old_items), Value::Sequence(items)) => {
                if old_items.len() != items.len() {
                    patch.insert(key.clone(), value.clone());
                } else if let Some(items) = sequence_changed(old_items, items) {
                    patch.insert(key.clone(), Value::Sequence(items));
                }
            }
            (Value::Record(old_record), Value::Record(record)) => {
                let nested = state_changed(old_record, record);
                if !nested.is_empty() {
                    patch.insert(key.clone(), Value::Record(nested));
                }
            }
            _ => {
                if old != value {
                    if old.kind() != value.kind() {
                        tracing::trace!(key = key.as_str(), from = %old.kind(), to = %value.kind(), "value kind changed");
                    }
                    patch.insert(key.clone(), value.clone());
                }
            }
        }
    }
    patch
}

fn sequence_changed(old_items: &[Value], items: &[Value]) -> Option<Vec<Value>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(items.len());
    for (old, value) in old_items.iter().zip(items) {
        match (old, value) {
            (Value::Record(old_record), Value::Record(record)) => {
                let nested = state_changed(old_record, record);
                if nested.is_empty() {
                    out.push(old.clone());
                } else {
                    changed = true;
                    out.push(Value::Record(nested));
                }
            }
            _ if old != value => {
                changed = true;
                out.push(value.clone());
            }
            _ => out.push(old.clone()),
        }
    }
    changed.then_some(out)
}

/// Applies a patch produced by [`state_changed`] to `base`.
///
/// Records are merged recursively, sequences of equal length are merged by index,
/// and every other value in the patch replaces the value in `base`.
/// Diffing the result against the snapshot the patch was computed from yields an empty patch.
pub fn apply_patch(base: &Record, patch: &Patch) -> Record {
    let mut out = base.clone();
    for (key, value) in patch {
        let merged = match out.get(key) {
            Some(old) => merge_value(old, value),
            None => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

fn merge_value(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Record(base), Value::Record(patch)) => Value::Record(apply_patch(base, patch)),
        (Value::Sequence(base), Value::Sequence(patch)) if base.len() == patch.len() => {
            Value::Sequence(base.iter().zip(patch).map(|(b, p)| merge_value(b, p)).collect())
        }
        _ => patch.clone(),
    }
}
