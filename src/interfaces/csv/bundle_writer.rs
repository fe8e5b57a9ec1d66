use crate::domain::bundle::IdentifierBundle;
use crate::error::Result;
use std::io::Write;

/// Writes recorded bundles as CSV rows, identifiers in hex and absent
/// optional identifiers as empty fields. The header precedes the first row.
pub struct BundleWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BundleWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_bundle(&mut self, bundle: &IdentifierBundle) -> Result<()> {
        self.writer.serialize(bundle)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
