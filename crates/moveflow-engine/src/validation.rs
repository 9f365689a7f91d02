//! Input checks shared by the node handlers.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use moveflow_core::error::{MoveflowError, Result};

/// Named address the compiler maps to the deploying account.
pub const DEPLOYER_PLACEHOLDER: &str = "deployer";

/// Appended to diagnostics cut by [`truncate_message`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Shortest bytecode accepted for deployment, in hex digits (the 4-byte module magic).
const MIN_BYTECODE_HEX_DIGITS: usize = 8;

/// Locations probed for bytecode inside a compile or bytecode node's output.
const BYTECODE_PATHS: [&[&str]; 4] = [
    &["bytecode"],
    &["output", "bytecode"],
    &["result", "bytecode"],
    &["data", "bytecode"],
];

fn module_decl() -> &'static Regex {
    static MODULE_DECL: OnceLock<Regex> = OnceLock::new();
    MODULE_DECL.get_or_init(|| {
        Regex::new(r"\bmodule\s+([A-Za-z_][A-Za-z0-9_]*|0x[0-9a-fA-F]+)\s*::\s*([A-Za-z_][A-Za-z0-9_]*)")
            .expect("module declaration pattern is valid")
    })
}

/// Check that `code` declares a module under the deployer named address.
pub fn validate_source(code: &str) -> Result<()> {
    if code.trim().is_empty() {
        return Err(MoveflowError::Validation("Contract code is required".into()));
    }

    let mut addresses = module_decl()
        .captures_iter(code)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));

    match addresses.next() {
        None => Err(MoveflowError::Validation(format!(
            "Contract code must contain a module declaration (module {}::<name> {{ ... }})",
            DEPLOYER_PLACEHOLDER
        ))),
        Some(first) => {
            if first == DEPLOYER_PLACEHOLDER || addresses.any(|a| a == DEPLOYER_PLACEHOLDER) {
                Ok(())
            } else {
                Err(MoveflowError::Validation(format!(
                    "Module must be declared under the `{}` named address, found `{}`",
                    DEPLOYER_PLACEHOLDER, first
                )))
            }
        }
    }
}

/// Name of the first module declared under the deployer address.
pub fn derive_module_name(code: &str) -> Option<String> {
    module_decl()
        .captures_iter(code)
        .find(|c| c.get(1).map(|m| m.as_str()) == Some(DEPLOYER_PLACEHOLDER))
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string())
}

/// Validate a hex bytecode string and return it with a `0x` prefix.
pub fn validate_bytecode(bytecode: &str) -> Result<String> {
    let trimmed = bytecode.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(MoveflowError::Validation("Bytecode is empty".into()));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MoveflowError::Validation(
            "Bytecode is not a valid hex string".into(),
        ));
    }
    if digits.len() % 2 != 0 {
        return Err(MoveflowError::Validation(
            "Bytecode has an odd number of hex digits".into(),
        ));
    }
    if digits.len() < MIN_BYTECODE_HEX_DIGITS {
        return Err(MoveflowError::Validation(
            "Bytecode is too short to be a compiled module".into(),
        ));
    }

    Ok(format!("0x{}", digits.to_lowercase()))
}

/// Probe the known output shapes for a non-empty bytecode string.
pub fn find_bytecode(output: &Value) -> Option<&str> {
    BYTECODE_PATHS.iter().find_map(|path| {
        let mut cur = output;
        for key in path.iter() {
            cur = cur.get(key)?;
        }
        cur.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "0x")
    })
}

/// Constructor arguments from a deploy node's payload.
///
/// Absent, null and blank values mean "no arguments". A string is parsed as
/// JSON. Anything that is not ultimately an array is rejected.
pub fn parse_constructor_args(raw: Option<&Value>) -> Result<Vec<Value>> {
    let not_array =
        || MoveflowError::Validation("Constructor arguments must be a JSON array".into());

    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => Ok(items),
            _ => Err(not_array()),
        },
        Some(_) => Err(not_array()),
    }
}

/// Cap `message` at `max_chars` characters, marking the cut.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &message[..cut], TRUNCATION_MARKER),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &str = r#"
module deployer::Counter {
    struct Count has key { value: u64 }
    public entry fun increment(account: &signer) {}
}
"#;

    #[test]
    fn test_valid_source() {
        assert!(validate_source(VALID).is_ok());
        assert_eq!(derive_module_name(VALID).as_deref(), Some("Counter"));
    }

    #[test]
    fn test_source_without_module() {
        let err = validate_source("not a module").unwrap_err();
        assert!(err.to_string().contains("module declaration"));
        assert!(derive_module_name("not a module").is_none());
    }

    #[test]
    fn test_source_with_wrong_address() {
        let err = validate_source("module 0x1::Coin { }").unwrap_err();
        assert!(err.to_string().contains("`deployer` named address"));
        assert!(err.to_string().contains("0x1"));
    }

    #[test]
    fn test_name_taken_from_deployer_module() {
        let code = "module std::helper {}\nmodule deployer :: Vault {}";
        assert!(validate_source(code).is_ok());
        assert_eq!(derive_module_name(code).as_deref(), Some("Vault"));
    }

    #[test]
    fn test_blank_source() {
        let err = validate_source("   \n").unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_bytecode_validation() {
        assert_eq!(validate_bytecode("A11CEB0B0600").unwrap(), "0xa11ceb0b0600");
        assert_eq!(validate_bytecode("0xa11ceb0b").unwrap(), "0xa11ceb0b");

        for bad in ["", "0x", "0xzz11ceb0", "0xa11ceb0b0", "0xa11c"] {
            assert!(validate_bytecode(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_find_bytecode_probes_nested_shapes() {
        assert_eq!(find_bytecode(&json!({"bytecode": "0x01"})), Some("0x01"));
        assert_eq!(
            find_bytecode(&json!({"result": {"bytecode": "0x02"}})),
            Some("0x02")
        );
        assert_eq!(
            find_bytecode(&json!({"bytecode": "0x", "data": {"bytecode": "0x03"}})),
            Some("0x03")
        );
        assert_eq!(find_bytecode(&json!({"bytecode": ""})), None);
        assert_eq!(find_bytecode(&json!({"abi": {}})), None);
    }

    #[test]
    fn test_constructor_args() {
        assert!(parse_constructor_args(None).unwrap().is_empty());
        assert!(parse_constructor_args(Some(&Value::Null)).unwrap().is_empty());
        assert!(parse_constructor_args(Some(&json!(""))).unwrap().is_empty());
        assert_eq!(
            parse_constructor_args(Some(&json!([1, "a"]))).unwrap(),
            vec![json!(1), json!("a")]
        );
        assert_eq!(
            parse_constructor_args(Some(&json!("[true, 7]"))).unwrap(),
            vec![json!(true), json!(7)]
        );
        assert!(parse_constructor_args(Some(&json!("{\"a\": 1}"))).is_err());
        assert!(parse_constructor_args(Some(&json!("not json"))).is_err());
        assert!(parse_constructor_args(Some(&json!(42))).is_err());
    }

    #[test]
    fn test_truncate_message() {
        let long = "e".repeat(1000);
        let cut = truncate_message(&long, 500);
        assert_eq!(cut, format!("{}{}", "e".repeat(500), TRUNCATION_MARKER));

        assert_eq!(truncate_message("short", 500), "short");
        assert_eq!(truncate_message(&"x".repeat(500), 500), "x".repeat(500));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "é".repeat(10);
        assert_eq!(truncate_message(&s, 3), format!("ééé{}", TRUNCATION_MARKER));
    }
}
