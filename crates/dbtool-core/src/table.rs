use std::fmt::{Display, Formatter};
use std::fmt::Write as _;

pub const EMPTY_TABLE_MARKER: &str = "(empty)";

/// A single stored value, independent of the store driver.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            // Debug keeps the fractional part (`1.0`) and round-trips.
            Self::Real(value) => write!(f, "{value:?}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::Blob(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2);
                for byte in bytes {
                    let _ = write!(hex, "{byte:02x}");
                }
                write!(f, "x'{hex}'")
            }
        }
    }
}

/// Render rows as a fixed-width text table.
///
/// Each column is as wide as its header or its widest cell, whichever is
/// larger. Cells are left-aligned and padded, columns are separated by ` | `,
/// and the second line is a dash rule joined with `-+-`. Lines are joined with
/// `\n` and there is no trailing newline.
#[must_use]
pub fn format_table(headers: &[String], rows: &[Vec<CellValue>]) -> String {
    let rendered = rows
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|header| header.chars().count()).collect::<Vec<_>>();
    for row in &rendered {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(rendered.len() + 2);
    lines.push(format_row(headers, &widths));
    lines.push(widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>().join("-+-"));
    for row in &rendered {
        lines.push(format_row(row, &widths));
    }
    lines.join("\n")
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
}
