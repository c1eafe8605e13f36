use tabled::{builder::Builder, settings::Style};

/// Rounded table with a fixed header row
pub struct TableBuilder {
    builder: Builder,
    rows: usize,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());
        Self { builder, rows: 0 }
    }

    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builder
            .push_record(cells.into_iter().map(Into::<String>::into));
        self.rows += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn build(self) -> String {
        if self.is_empty() {
            return String::new();
        }
        self.builder.build().with(Style::rounded()).to_string()
    }
}

/// Two-column table of per-table row counts
pub fn stats_table(stats: &crate::storage::DbStats) -> String {
    let mut builder = TableBuilder::new(&["Table", "Rows"]);
    for (table, count) in &stats.tables {
        builder.add_row([table.to_string(), count.to_string()]);
    }
    builder.add_row(["total".to_string(), stats.total_rows().to_string()]);
    builder.build()
}
