use serde_json::Value;

/// "Copy all current values from the payload into the existing row
/// (field-wise replacement)" (§4.6 step 4): every key present in
/// `payload` overwrites the same key on `existing`; keys `existing` has
/// that `payload` doesn't are left untouched. When there is no existing
/// row, or either side isn't a JSON object, `payload` wins outright.
pub fn field_wise_merge(existing: Option<Value>, payload: Value) -> Value {
    match (existing, payload) {
        (Some(Value::Object(mut existing)), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
            Value::Object(existing)
        }
        (_, payload) => payload,
    }
}
