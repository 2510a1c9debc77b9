use std::collections::HashMap;

/// Decoded query string of one request.
///
/// Keys map to either a single value or, when the key repeats, the list of
/// values in encounter order. A key that appears once stays scalar, never a
/// one-element list.
#[derive(Debug, Default, PartialEq)]
pub struct Query {
    data: HashMap<String, Value>,
}

#[derive(Debug, PartialEq)]
pub enum Value {
    Single(String),
    Multi(Vec<String>),
}

impl Value {
    /// Returns the scalar value, or the first accumulated one.
    pub fn first(&self) -> &str {
        match self {
            Value::Single(v) => v,
            Value::Multi(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Inserts one decoded key/value pair, accumulating repeated keys.
    pub(crate) fn push(&mut self, key: String, value: String) {
        use std::collections::hash_map::Entry;

        match self.data.entry(key) {
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Value::Single(v) => {
                    let first = std::mem::take(v);
                    occupied.insert(Value::Multi(vec![first, value]));
                }
                Value::Multi(values) => values.push(value),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Value::Single(value));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_of(pairs: &[(&str, &str)]) -> Query {
        let mut query = Query::new();
        for (k, v) in pairs {
            query.push(k.to_string(), v.to_string());
        }
        query
    }

    #[test]
    fn empty_query() {
        let query = Query::new();
        assert_eq!(query.len(), 0);
        assert!(query.is_empty());
        assert_eq!(query.get("a"), None);
    }

    #[test]
    fn single_values_stay_scalar() {
        let query = query_of(&[("a", "1"), ("b", "2")]);
        assert_eq!(query.len(), 2);
        assert_eq!(query.get("a"), Some(&Value::Single("1".to_string())));
        assert_eq!(query.get("b"), Some(&Value::Single("2".to_string())));
    }

    #[test]
    fn repeated_keys_accumulate_in_order() {
        let query = query_of(&[("a", ""), ("b", "2"), ("a", "42"), ("a", "7")]);
        assert_eq!(query.len(), 2);
        assert_eq!(
            query.get("a"),
            Some(&Value::Multi(vec!["".to_string(), "42".to_string(), "7".to_string()]))
        );
        assert_eq!(query.get("b"), Some(&Value::Single("2".to_string())));
    }

    #[test]
    fn first_of_multi() {
        let query = query_of(&[("a", "x"), ("a", "y")]);
        assert_eq!(query.get("a").unwrap().first(), "x");
    }
}
