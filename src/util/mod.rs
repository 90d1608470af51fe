use std::collections::HashMap;


/// Strip `prefix` from every key that carries it. Keys without the prefix are
/// kept as they are.
#[must_use]
pub fn remove_prefix_from_hashmap_keys<V>(
    hashmap: HashMap<String, V>,
    prefix: &str,
) -> HashMap<String, V> {
    hashmap
        .into_iter()
        .map(|(key, value)| match key.strip_prefix(prefix) {
            Some(stripped) => (stripped.to_string(), value),
            None => (key, value),
        })
        .collect()
}

/// Parse a boolean option value. Accepts `true`/`false`, `yes`/`no`,
/// `on`/`off` and `1`/`0`, in any case.
#[must_use]
pub fn parse_bool_option(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_and_plain_keys_are_both_kept() {
        let options = HashMap::from([
            ("sql_commit".to_string(), "10"),
            ("create_table".to_string(), "true"),
        ]);

        let stripped = remove_prefix_from_hashmap_keys(options, "sql_");

        assert_eq!(
            stripped,
            HashMap::from([
                ("commit".to_string(), "10"),
                ("create_table".to_string(), "true"),
            ])
        );
    }

    #[test]
    fn bare_prefix_becomes_empty_key() {
        let options = HashMap::from([("sql_".to_string(), 1)]);
        let stripped = remove_prefix_from_hashmap_keys(options, "sql_");
        assert_eq!(stripped.get(""), Some(&1));
    }

    #[test]
    fn boolean_spellings() {
        assert_eq!(parse_bool_option("TRUE"), Some(true));
        assert_eq!(parse_bool_option(" off "), Some(false));
        assert_eq!(parse_bool_option("1"), Some(true));
        assert_eq!(parse_bool_option("maybe"), None);
    }
}
