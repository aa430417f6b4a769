//! Discipline-node registry.
//!
//! Submitting organizations are identified by a short code; the long name is
//! stamped into records as the contributor and added as a keyword.

use crate::error::DoiError;

const NODES: &[(&str, &str)] = &[
    ("atm", "Atmospheres"),
    ("eng", "Engineering"),
    ("geo", "Geosciences"),
    ("img", "Cartography and Imaging Sciences Discipline"),
    ("naif", "Navigational and Ancillary Information Facility"),
    ("ppi", "Planetary Plasma Interactions"),
    ("rms", "Ring-Moon Systems"),
    ("sbn", "Small Bodies"),
];

/// Long name for a node code, or [`DoiError::UnknownNode`].
pub fn long_name(code: &str) -> Result<&'static str, DoiError> {
    let code = code.trim().to_ascii_lowercase();
    NODES
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, long)| *long)
        .ok_or(DoiError::UnknownNode(code))
}

/// The set of permissible node codes.
pub fn permissible_codes() -> Vec<&'static str> {
    NODES.iter().map(|(short, _)| *short).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_case_insensitively() {
        assert_eq!(long_name("geo").unwrap(), "Geosciences");
        assert_eq!(long_name("GEO").unwrap(), "Geosciences");
    }

    #[test]
    fn unknown_code_is_reported() {
        assert!(matches!(long_name("xyz"), Err(DoiError::UnknownNode(_))));
    }

    #[test]
    fn all_codes_are_permissible() {
        for code in permissible_codes() {
            assert!(long_name(code).is_ok());
        }
    }
}
