//! Minimal string table with aligned-text and CSV renderings.

/// A header row plus data rows. Short rows are padded with empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    fn cells(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        let width = self.width();
        std::iter::once(&self.header)
            .chain(self.rows.iter())
            .map(move |row| {
                (0..width)
                    .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
                    .collect()
            })
    }

    /// Right-aligned, space-separated columns, one line per row.
    pub fn to_text(&self) -> String {
        let width = self.width();
        let mut col_widths = vec![0usize; width];
        for row in self.cells() {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for row in self.cells() {
            let line: Vec<String> = row
                .iter()
                .zip(&col_widths)
                .map(|(cell, &w)| format!("{cell:>w$}"))
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        }
        out
    }

    /// Comma-separated values with RFC 4180 quoting.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for row in self.cells() {
            let line: Vec<String> = row.iter().map(|cell| csv_field(cell)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }
}

fn csv_field(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["Topic", "Count", "Name"]);
        table.push_row(["-1", "12", "-1_the_and"]);
        table.push_row(["0", "7", "0_budget_tax"]);
        table
    }

    #[test]
    fn text_columns_are_aligned() {
        let text = sample().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Topic  Count          Name");
        assert_eq!(lines[1], "   -1     12    -1_the_and");
        assert_eq!(lines[2], "    0      7  0_budget_tax");
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let mut table = Table::new(["", "3"]);
        table.push_row(["Terms", "budget, tax"]);
        table.push_row(["Quote", "say \"hi\""]);
        assert_eq!(
            table.to_csv(),
            ",3\nTerms,\"budget, tax\"\nQuote,\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn ragged_rows_are_padded() {
        let mut table = Table::new(["Name"]);
        table.push_row(["a", "x", "y"]);
        table.push_row(["b"]);
        assert_eq!(table.to_csv(), "Name,,\na,x,y\nb,,\n");
    }

    #[test]
    fn empty_table_renders_header_only() {
        let table = Table::new(["Topic", "Count"]);
        assert_eq!(table.to_csv(), "Topic,Count\n");
        assert!(table.rows().is_empty());
    }
}
