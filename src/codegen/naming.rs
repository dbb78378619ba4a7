//! identifier normalization for generated code

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};

/// pascal-case type name, suffixed when it would shadow a prelude type
pub fn type_name(name: &str) -> String {
    let out = name.to_upper_camel_case();
    match out.as_str() {
        "" => "Unnamed".to_string(),
        "Self" | "Type" | "Box" | "Result" | "Option" | "Vec" | "Value" | "String"
        | "Serialize" | "Deserialize" | "Ok" | "Err" | "Some" | "None" => format!("{out}Type"),
        _ if starts_with_digit(&out) => format!("T{out}"),
        _ => out,
    }
}

/// pascal-case enum variant name
pub fn variant_name(value: &str) -> String {
    let out = if value.chars().any(char::is_lowercase) {
        value.to_upper_camel_case()
    } else {
        value.to_lowercase().to_upper_camel_case()
    };
    match out.as_str() {
        "" => "Unnamed".to_string(),
        "Self" => "SelfValue".to_string(),
        _ if starts_with_digit(&out) => format!("V{out}"),
        _ => out,
    }
}

/// snake-case field, method or parameter name with keyword escaping
pub fn field_name(name: &str) -> String {
    let out = name.to_snake_case();
    if out.is_empty() {
        return "value".to_string();
    }
    if starts_with_digit(&out) {
        return format!("_{out}");
    }
    escape_keyword(out)
}

fn starts_with_digit(ident: &str) -> bool {
    ident.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// snake-case module name; keywords get a trailing underscore
pub fn module_name(type_name: &str) -> String {
    let out = type_name.to_snake_case();
    if starts_with_digit(&out) {
        format!("t{out}")
    } else if is_rust_keyword(&out) {
        format!("{out}_")
    } else {
        out
    }
}

/// screaming-snake-case constant name
pub fn const_name(name: &str) -> String {
    name.to_shouty_snake_case()
}

/// pascal-case operation name used in the document header
pub fn operation_name(name: &str) -> String {
    name.to_upper_camel_case()
}

/// name of the accessor struct for a namespace path
pub fn namespace_struct(path: &[String]) -> String {
    let mut out: String = path.iter().map(|s| s.to_upper_camel_case()).collect();
    out.push_str("Api");
    out
}

/// strips raw-identifier syntax
pub fn unescape(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

fn escape_keyword(ident: String) -> String {
    match ident.as_str() {
        // cannot be raw identifiers
        "self" | "Self" | "super" | "crate" => format!("{ident}_"),
        _ if is_rust_keyword(&ident) => format!("r#{ident}"),
        _ => ident,
    }
}

pub fn is_rust_keyword(name: &str) -> bool {
    matches!(
        name,
        "as" | "break"
            | "const"
            | "continue"
            | "crate"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
            | "gen"
    )
}
