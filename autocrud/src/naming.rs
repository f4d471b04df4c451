//! Identifier case conversion used for default table names and URL segments.

/// Converts a `PascalCase` or `camelCase` identifier to `snake_case`.
///
/// An underscore is inserted before an uppercase character when the previous
/// character is lowercase, or when the previous character is uppercase and the
/// next one is lowercase. Runs of uppercase letters (acronyms) therefore stay
/// joined while `HTTPServer` still splits into `http_server`.
///
/// ```
/// use autocrud::naming::to_snake_case;
///
/// assert_eq!(to_snake_case("UserName"), "user_name");
/// assert_eq!(to_snake_case("HTTPServer"), "http_server");
/// ```
#[must_use]
pub fn to_snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev != '_' && (prev.is_lowercase() || (prev.is_uppercase() && next_is_lower)) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

/// Default table name for an entity: snake case plus a plural `s`.
#[must_use]
pub fn table_name(entity_name: &str) -> String {
    format!("{}s", to_snake_case(entity_name))
}

/// URL segment under which an entity's routes are mounted.
#[must_use]
pub fn resource_segment(entity_name: &str) -> String {
    entity_name.to_lowercase()
}
