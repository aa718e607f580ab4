//! Lenient accessors over untyped JSON payloads
//!
//! Risk reports come from a third party and any field may be missing, null or
//! of an unexpected type. These helpers never fail; they fall back to a default.

use serde_json::Value;

/// Extension trait for reading report fields by JSON pointer.
pub trait ValueExt {
    /// Number at `pointer`, or `default` when absent, null or not numeric.
    ///
    /// Numeric strings (`"1000"`) are accepted since some report fields are
    /// serialized as text upstream.
    fn f64_or(&self, pointer: &str, default: f64) -> f64;

    /// Like [`ValueExt::f64_or`] but treats `0` as absent, mirroring the
    /// upstream convention where zero means "not reported".
    fn nonzero_f64_or(&self, pointer: &str, default: f64) -> f64;

    /// Non-empty string at `pointer`, or `default`.
    fn str_or(&self, pointer: &str, default: &str) -> String;
}

impl ValueExt for Value {
    fn f64_or(&self, pointer: &str, default: f64) -> f64 {
        match self.pointer(pointer) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(default),
            _ => default,
        }
    }

    fn nonzero_f64_or(&self, pointer: &str, default: f64) -> f64 {
        let v = self.f64_or(pointer, default);
        if v == 0.0 || v.is_nan() {
            default
        } else {
            v
        }
    }

    fn str_or(&self, pointer: &str, default: &str) -> String {
        match self.pointer(pointer) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => default.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_f64_or_defaults() {
        let v = json!({ "price": 1.5, "token": { "supply": "1000" }, "holders": null });
        assert_eq!(v.f64_or("/price", 0.0), 1.5);
        assert_eq!(v.f64_or("/token/supply", 0.0), 1000.0);
        assert_eq!(v.f64_or("/holders", 7.0), 7.0);
        assert_eq!(v.f64_or("/missing/deep", 3.0), 3.0);
    }

    #[test]
    fn test_nonzero_f64_or() {
        let v = json!({ "token": { "supply": 0, "decimals": 9 } });
        assert_eq!(v.nonzero_f64_or("/token/supply", 1.0), 1.0);
        assert_eq!(v.nonzero_f64_or("/token/decimals", 6.0), 9.0);
    }

    #[test]
    fn test_str_or() {
        let v = json!({ "tokenMeta": { "name": "Bonk", "symbol": "" } });
        assert_eq!(v.str_or("/tokenMeta/name", "Unknown Token"), "Bonk");
        assert_eq!(v.str_or("/tokenMeta/symbol", "UNK"), "UNK");
        assert_eq!(v.str_or("/detectedAt", ""), "");
    }
}
