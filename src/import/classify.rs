//! Row classification for command CSV exports
//!
//! Exports group commands under heading rows: a heading has text in the
//! first column only, and every following command row belongs to it until
//! the next heading.
//!
//! ```text
//! Switching,,,
//! show vlan,List VLANs,show vlan brief,
//! ```

use super::normalize::{is_blank, normalize};

/// Column header tokens; a row containing one of these is a header row
const HEADER_TOKENS: &[&str] = &[
    "command",
    "description",
    "example",
    "category",
    "tag",
    "os",
    "platform",
    "version",
];

/// Marker of the warning banner some exports put above the header
const BANNER_MARKER: &str = "WARNING!!";

/// Number of meaningful columns
const WIDTH: usize = 4;

/// Why a row produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No cells, or only blank cells
    Blank,
    /// Column header row
    Header,
    /// Matched neither a heading nor a command
    Noise,
}

/// Classification of one CSV row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    /// Heading row starting a new grouping node
    Grouping { name: String },
    /// Command row
    Command {
        command: String,
        description: Option<String>,
        example: Option<String>,
    },
    Skip(SkipReason),
}

/// Classify a row. Checks run in the order blank, header, grouping, command.
pub fn classify<S: AsRef<str>>(row: &[S]) -> RowClass {
    if row.iter().all(|c| is_blank(c.as_ref())) {
        return RowClass::Skip(SkipReason::Blank);
    }

    if is_header(row) {
        return RowClass::Skip(SkipReason::Header);
    }

    let cell = |i: usize| row.get(i).map(|c| c.as_ref()).unwrap_or("");

    if !is_blank(cell(0)) && (1..WIDTH).all(|i| is_blank(cell(i))) {
        return RowClass::Grouping {
            name: normalize(cell(0)),
        };
    }

    let first = normalize(cell(0));
    let command = if first.is_empty() {
        normalize(cell(1))
    } else {
        first
    };
    if command.is_empty() {
        return RowClass::Skip(SkipReason::Noise);
    }

    RowClass::Command {
        command,
        description: non_empty(normalize(cell(2))),
        example: non_empty(normalize(cell(3))),
    }
}

/// True if any of the first four cells is a column header token
pub fn is_header<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().take(WIDTH).any(|c| {
        let token = normalize(c.as_ref()).to_lowercase();
        HEADER_TOKENS.contains(&token.as_str())
    })
}

/// True if the row is an export warning banner
pub fn is_banner<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().any(|c| c.as_ref().contains(BANNER_MARKER))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_blank_rows() {
        let empty: [&str; 0] = [];
        assert_eq!(classify(&empty), RowClass::Skip(SkipReason::Blank));
        assert_eq!(classify(&["", "  ", "\t"]), RowClass::Skip(SkipReason::Blank));
    }

    #[test]
    fn test_header_rows() {
        assert_eq!(
            classify(&["COMMAND", "Description", "Example", "Category"]),
            RowClass::Skip(SkipReason::Header)
        );
        assert_eq!(classify(&["\" Tag \""]), RowClass::Skip(SkipReason::Header));
        // Tokens beyond the fourth column do not count
        assert_ne!(
            classify(&["show run", "", "", "", "version"]),
            RowClass::Skip(SkipReason::Header)
        );
    }

    #[test]
    fn test_grouping_row_padded() {
        assert_eq!(
            classify(&["  Switching  "]),
            RowClass::Grouping {
                name: "Switching".to_string()
            }
        );
        assert_eq!(
            classify(&["Routing", "", " ", ""]),
            RowClass::Grouping {
                name: "Routing".to_string()
            }
        );
    }

    #[test]
    fn test_command_rows() {
        assert_eq!(
            classify(&["show vlan", "List VLANs", "show vlan brief", ""]),
            RowClass::Command {
                command: "show vlan".to_string(),
                description: Some("show vlan brief".to_string()),
                example: None,
            }
        );
        assert_eq!(
            classify(&["", "show ip route", "List routes", "show ip route 10.0.0.0"]),
            RowClass::Command {
                command: "show ip route".to_string(),
                description: Some("List routes".to_string()),
                example: Some("show ip route 10.0.0.0".to_string()),
            }
        );
    }

    #[test]
    fn test_noise_rows() {
        assert_eq!(
            classify(&["", "", "orphan description", ""]),
            RowClass::Skip(SkipReason::Noise)
        );
    }

    #[test]
    fn test_banner() {
        assert!(is_banner(&["WARNING!! Do not edit the header row", "", ""]));
        assert!(!is_banner(&["warning: lowercase is not the marker"]));
    }

    fn padded(row: &[String]) -> Vec<String> {
        let mut cells = row.to_vec();
        while cells.len() < WIDTH {
            cells.push(String::new());
        }
        cells
    }

    proptest! {
        #[test]
        fn prop_grouping_has_blank_tail(row in prop::collection::vec("[ a-z\"]{0,6}", 0..6)) {
            if let RowClass::Grouping { .. } = classify(&row) {
                let cells = padded(&row);
                prop_assert!(!is_blank(&cells[0]));
                prop_assert!(cells[1..WIDTH].iter().all(|c| is_blank(c)));
            }
        }

        #[test]
        fn prop_command_has_name_cell(row in prop::collection::vec("[ a-z\"]{0,6}", 0..6)) {
            if let RowClass::Command { .. } = classify(&row) {
                let cells = padded(&row);
                prop_assert!(!is_blank(&cells[0]) || !is_blank(&cells[1]));
            }
        }

        #[test]
        fn prop_header_never_yields_record(
            pos in 0usize..4,
            other in prop::collection::vec("[ a-z]{0,8}", 4),
        ) {
            let mut row = other;
            row[pos] = "Command".to_string();
            prop_assert_eq!(classify(&row), RowClass::Skip(SkipReason::Header));
        }
    }
}
