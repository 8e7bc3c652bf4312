use tally_core::Cell;

/// Canonical narration form: line breaks and whitespace runs collapse to a
/// single space, letters are upper-cased, ends are trimmed.
pub fn normalize(raw: &str) -> String {
    raw.to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes any cell via its display form; empty cells become `""`.
pub fn normalize_cell(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => normalize(s),
        other => normalize(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_uppercases() {
        assert_eq!(normalize("  neft\tsalary   credit "), "NEFT SALARY CREDIT");
    }

    #[test]
    fn removes_line_breaks() {
        assert_eq!(normalize("upi/cr/123\r\njohn doe\n"), "UPI/CR/123 JOHN DOE");
    }

    #[test]
    fn idempotent() {
        for raw in ["", "  a  b ", "Straße\ncafé", "UPI/CR/409293829100/JOHN DOE", "\u{a0}x\u{2003}y"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn empty_cell_is_empty_string() {
        assert_eq!(normalize_cell(&Cell::Empty), "");
        assert_eq!(normalize_cell(&Cell::text("   ")), "");
    }

    #[test]
    fn non_text_cells_use_display_form() {
        assert_eq!(normalize_cell(&Cell::Number(1000.0)), "1000");
        assert_eq!(normalize_cell(&Cell::Bool(true)), "TRUE");
    }
}
