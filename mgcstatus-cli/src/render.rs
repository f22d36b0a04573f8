use mgcstatus_core::report::ReportRow;
use prettytable::format::{self, FormatBuilder, LinePosition, LineSeparator, TableFormat};
use prettytable::{Cell, Row, Table};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    Plain,
    Markdown,
}

fn markdown_format() -> TableFormat {
    FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separators(&[LinePosition::Title], LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

pub fn table<W: Write + ?Sized>(
    out: &mut W,
    rows: &[ReportRow],
    extended: bool,
    style: Style,
) -> io::Result<()> {
    let mut t = Table::new();
    t.set_format(match style {
        Style::Plain => *format::consts::FORMAT_DEFAULT,
        Style::Markdown => markdown_format(),
    });
    t.set_titles(Row::new(ReportRow::headers(extended).into_iter().map(Cell::new).collect()));
    for r in rows {
        t.add_row(Row::new(r.cells().iter().map(|c| Cell::new(c)).collect()));
    }
    t.print(out)?;
    Ok(())
}

pub fn json<W: Write>(out: &mut W, rows: &[ReportRow]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, rows)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ReportRow {
        ReportRow {
            name: "app.users".into(),
            objs: 900,
            chunks: 9,
            ave_chunk_size_kb: 100.0,
            all_data_size_mb: None,
            ideal_chunks_per_shard: 3,
            remain_chunks: 0,
            remain_chunks_size_kb: 0.0,
            jumbo_chunks: 0,
            balancer: 1,
        }
    }

    #[test]
    fn markdown_has_pipe_header_rule() {
        let mut buf = Vec::new();
        table(&mut buf, &[row()], false, Style::Markdown).unwrap();
        let s = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert!(lines[0].starts_with("| CollectionName"));
        assert!(lines[1].starts_with("|-"));
        assert!(lines[2].contains("app.users"));
        assert!(!s.contains('+'));
    }

    #[test]
    fn plain_grid_lists_rows() {
        let mut buf = Vec::new();
        table(&mut buf, &[row()], false, Style::Plain).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.starts_with('+'));
        assert!(s.contains("idealChunksPerShards"));
        assert!(s.contains("100.00"));
    }
}
