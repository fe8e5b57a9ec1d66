pub mod bundle_writer;
pub mod purchase_reader;
