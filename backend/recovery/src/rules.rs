//! Validation rules.
//!
//! A rule is a named predicate that returns `Ok(())` or a message describing
//! the violation. Rules are applied in order by [`crate::ErrorHandler::validate`];
//! the first failure is the one reported.

use regex::Regex;
use serde_json::Value;

type Check<T> = dyn Fn(&T) -> Result<(), String> + Send + Sync;

pub struct ValidationRule<T: ?Sized> {
    name: String,
    check: Box<Check<T>>,
}

impl<T: ?Sized> ValidationRule<T> {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), check: Box::new(check) }
    }

    /// Build a rule from a boolean predicate and a fixed violation message.
    pub fn predicate(
        name: impl Into<String>,
        message: impl Into<String>,
        pred: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        let message = message.into();
        Self::new(name, move |value| if pred(value) { Ok(()) } else { Err(message.clone()) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &T) -> Result<(), String> {
        (self.check)(value)
    }
}

impl<T: ?Sized> std::fmt::Debug for ValidationRule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule").field("name", &self.name).finish()
    }
}

/// Rejects `null` and blank strings.
pub fn required() -> ValidationRule<Value> {
    ValidationRule::new("required", |value: &Value| match value {
        Value::Null => Err("is required".to_string()),
        Value::String(s) if s.trim().is_empty() => Err("is required".to_string()),
        _ => Ok(()),
    })
}

/// Strings and arrays must have at least `min` characters/items. Other types pass.
pub fn min_length(min: usize) -> ValidationRule<Value> {
    ValidationRule::new("minLength", move |value: &Value| match length_of(value) {
        Some(len) if len < min => Err(format!("must be at least {min} characters long")),
        _ => Ok(()),
    })
}

/// Strings and arrays must have at most `max` characters/items. Other types pass.
pub fn max_length(max: usize) -> ValidationRule<Value> {
    ValidationRule::new("maxLength", move |value: &Value| match length_of(value) {
        Some(len) if len > max => Err(format!("must be at most {max} characters long")),
        _ => Ok(()),
    })
}

/// Numbers must fall within `min..=max`; non-numbers fail.
pub fn range(min: f64, max: f64) -> ValidationRule<Value> {
    ValidationRule::new("range", move |value: &Value| match value.as_f64() {
        Some(n) if n >= min && n <= max => Ok(()),
        Some(_) => Err(format!("must be between {min} and {max}")),
        None => Err("must be a number".to_string()),
    })
}

/// Strings must match `pattern`; non-strings fail.
pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<ValidationRule<Value>, regex::Error> {
    let re = Regex::new(pattern)?;
    let message = message.into();
    Ok(ValidationRule::new("pattern", move |value: &Value| match value.as_str() {
        Some(s) if re.is_match(s) => Ok(()),
        _ => Err(message.clone()),
    }))
}

/// Value must equal one of `allowed`.
pub fn one_of(allowed: Vec<Value>) -> ValidationRule<Value> {
    ValidationRule::new("oneOf", move |value: &Value| {
        if allowed.contains(value) {
            Ok(())
        } else {
            let names: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            Err(format!("must be one of {}", names.join(", ")))
        }
    })
}

/// Arbitrary check under a caller-chosen name.
pub fn custom<F>(name: impl Into<String>, check: F) -> ValidationRule<Value>
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
{
    ValidationRule::new(name, check)
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn custom_rule_keeps_its_name() {
        let rule = custom("even", |v: &Value| match v.as_i64() {
            Some(n) if n % 2 == 0 => Ok(()),
            _ => Err("must be even".to_string()),
        });
        assert_eq!(rule.name(), "even");
        assert!(rule.check(&json!(4)).is_ok());
        assert_eq!(rule.check(&json!(3)).unwrap_err(), "must be even");
    }

    #[test]
    fn required_rejects_blank() {
        let rule = required();
        assert!(rule.check(&json!(null)).is_err());
        assert!(rule.check(&json!("   ")).is_err());
        assert!(rule.check(&json!(0)).is_ok());
    }

    #[test]
    fn length_rules_count_chars() {
        assert!(max_length(3).check(&json!("héé")).is_ok());
        assert!(max_length(2).check(&json!("héé")).is_err());
        assert!(min_length(2).check(&json!([1])).is_err());
        assert!(min_length(2).check(&json!(true)).is_ok());
    }

    #[test]
    fn range_requires_number() {
        let rule = range(5.0, 3600.0);
        assert!(rule.check(&json!(60)).is_ok());
        assert_eq!(rule.check(&json!(1)).unwrap_err(), "must be between 5 and 3600");
        assert_eq!(rule.check(&json!("60")).unwrap_err(), "must be a number");
    }

    #[test]
    fn pattern_and_one_of() {
        let rule = pattern(r"^(/|https?://)", "must be a path or URL").unwrap();
        assert!(rule.check(&json!("/api/data")).is_ok());
        assert!(rule.check(&json!("ftp://x")).is_err());
        assert!(pattern("(", "bad").is_err());

        let rule = one_of(vec![json!("light"), json!("dark")]);
        assert!(rule.check(&json!("dark")).is_ok());
        assert!(rule.check(&json!("blue")).unwrap_err().contains("\"light\""));
    }

    #[test]
    fn predicate_rule_uses_fixed_message() {
        let rule = ValidationRule::<i64>::predicate("even", "must be even", |n| n % 2 == 0);
        assert!(rule.check(&4).is_ok());
        assert_eq!(rule.check(&3).unwrap_err(), "must be even");
        assert_eq!(rule.name(), "even");
    }
}
