//! In-memory text buffer produced by the source reader.

use arrow::array::{Array, StringArray};

/// One row: a fixed-arity sequence of nullable text cells borrowed from the
/// buffer that produced it
pub type Row<'a> = Vec<Option<&'a str>>;

/// A decoded slice of the source file, one text array per projected column
#[derive(Debug, Clone)]
pub struct TextBatch {
    columns: Vec<StringArray>,
    num_rows: usize,
}

impl TextBatch {
    /// All columns must have the same length
    pub fn new(columns: Vec<StringArray>) -> Self {
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.len() == num_rows));
        Self { columns, num_rows }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }
}

/// Columnar, text-only copy of one source file
///
/// Holds exactly the projected columns, in projection order, with rows in
/// source order.
#[derive(Debug, Clone, Default)]
pub struct TableBuffer {
    columns: Vec<String>,
    batches: Vec<TextBatch>,
}

impl TableBuffer {
    pub fn new(columns: Vec<String>, batches: Vec<TextBatch>) -> Self {
        Self { columns, batches }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(TextBatch::num_rows).sum()
    }

    /// Lazily walk the buffer row by row
    ///
    /// Each call returns a fresh single-pass iterator; rows borrow their cells
    /// from the buffer, so no second copy of the data is built.
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            buffer: self,
            batch: 0,
            row: 0,
        }
    }
}

/// Iterator over the rows of a [`TableBuffer`]
pub struct Rows<'a> {
    buffer: &'a TableBuffer,
    batch: usize,
    row: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Row<'a>> {
        loop {
            let batch = self.buffer.batches.get(self.batch)?;

            if self.row < batch.num_rows {
                let row = self.row;
                self.row += 1;
                return Some(
                    batch
                        .columns
                        .iter()
                        .map(|col| col.is_valid(row).then(|| col.value(row)))
                        .collect(),
                );
            }

            self.batch += 1;
            self.row = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let consumed: usize = self.buffer.batches[..self.batch.min(self.buffer.batches.len())]
            .iter()
            .map(TextBatch::num_rows)
            .sum::<usize>()
            + self.row;
        let remaining = self.buffer.num_rows().saturating_sub(consumed);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(ids: &[&str], names: &[Option<&str>]) -> TextBatch {
        TextBatch::new(vec![
            StringArray::from(ids.to_vec()),
            StringArray::from(names.to_vec()),
        ])
    }

    #[test]
    fn test_rows_span_batches_in_order() {
        let buffer = TableBuffer::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                batch(&["1", "2"], &[Some("a"), None]),
                TextBatch::new(vec![StringArray::from(Vec::<&str>::new()); 2]),
                batch(&["3"], &[Some("c")]),
            ],
        );

        let rows: Vec<Row<'_>> = buffer.rows().collect();

        assert_eq!(buffer.num_rows(), 3);
        assert_eq!(
            rows,
            vec![
                vec![Some("1"), Some("a")],
                vec![Some("2"), None],
                vec![Some("3"), Some("c")],
            ]
        );
    }

    #[test]
    fn test_size_hint_tracks_consumption() {
        let buffer = TableBuffer::new(
            vec!["id".to_string(), "name".to_string()],
            vec![batch(&["1", "2"], &[None, None]), batch(&["3"], &[None])],
        );

        let mut rows = buffer.rows();
        assert_eq!(rows.size_hint(), (3, Some(3)));
        rows.next();
        rows.next();
        rows.next();
        assert_eq!(rows.size_hint(), (0, Some(0)));
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_empty_buffer_yields_nothing() {
        let buffer = TableBuffer::default();
        assert_eq!(buffer.num_rows(), 0);
        assert_eq!(buffer.rows().count(), 0);
    }
}
