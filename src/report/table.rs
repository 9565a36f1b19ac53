/// Column alignment in a markdown table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Fixed-width markdown table. Every column is padded to its widest cell so
/// the raw text lines up in a terminal as well as rendering on GitHub.
#[derive(Debug, Clone, Default)]
pub struct MarkdownTable {
    headers: Vec<String>,
    alignments: Vec<Alignment>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let alignments = vec![Alignment::Left; headers.len()];
        Self {
            headers,
            alignments,
            rows: Vec::new(),
        }
    }

    /// Missing trailing alignments default to left.
    pub fn with_alignments(mut self, alignments: &[Alignment]) -> Self {
        for (slot, align) in self.alignments.iter_mut().zip(alignments) {
            *slot = *align;
        }
        self
    }

    /// Short rows are padded with empty cells, extra cells are dropped.
    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = cells
            .into_iter()
            .map(Into::into)
            .take(self.headers.len())
            .collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| width(&row[col]))
                    .chain(std::iter::once(width(&self.headers[col])))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header_cells: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| pad(h, *w, Alignment::Left))
            .collect();

        let separator_cells: Vec<String> = self
            .alignments
            .iter()
            .zip(&widths)
            .map(|(align, w)| match align {
                Alignment::Left => "-".repeat((*w).max(1)),
                Alignment::Center => format!(":{}:", "-".repeat(w.saturating_sub(2).max(1))),
                Alignment::Right => format!("{}:", "-".repeat(w.saturating_sub(1).max(1))),
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format!("| {} |", header_cells.join(" | ")));
        lines.push(format!("| {} |", separator_cells.join(" | ")));
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .zip(&self.alignments)
                .map(|((cell, w), align)| pad(cell, *w, *align))
                .collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }
        lines.join("\n")
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad(text: &str, width_to: usize, align: Alignment) -> String {
    let diff = width_to.saturating_sub(width(text));
    match align {
        Alignment::Left => format!("{text}{}", " ".repeat(diff)),
        Alignment::Right => format!("{}{text}", " ".repeat(diff)),
        Alignment::Center => {
            let left = diff / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(diff - left))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_columns_to_widest_cell() {
        let mut table = MarkdownTable::new(["Model", "Time"])
            .with_alignments(&[Alignment::Left, Alignment::Right]);
        table.push_row(["gpt-4o-mini", "0.52"]);
        table.push_row(["o3", "12.10"]);

        let expected = "\
| Model       | Time  |
| ----------- | ----: |
| gpt-4o-mini |  0.52 |
| o3          | 12.10 |";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn center_alignment_splits_padding() {
        let mut table =
            MarkdownTable::new(["Working"]).with_alignments(&[Alignment::Center]);
        table.push_row(["ok"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[1], "| :-----: |");
        assert_eq!(lines[2], "|   ok    |");
    }

    #[test]
    fn short_rows_are_padded() {
        let mut table = MarkdownTable::new(["A", "B"]);
        table.push_row(["x"]);
        assert_eq!(table.render().lines().last(), Some("| x |   |"));
    }
}
