use crate::chain::ChainRecord;
use crate::errors::AnalyzerResult;
use std::io::{Read, Write};
use std::path::Path;

/// CSV import/export of chain records, the offline alternative to the live
/// feed. One row per contract, the same column set as the wire format.

pub fn load_records(path: &Path) -> AnalyzerResult<Vec<ChainRecord>> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}

pub fn save_records(path: &Path, records: &[ChainRecord]) -> AnalyzerResult<()> {
    let file = std::fs::File::create(path)?;
    write_records(file, records)
}

pub fn read_records<R: Read>(reader: R) -> AnalyzerResult<Vec<ChainRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        let rec: ChainRecord = row?;
        records.push(rec);
    }
    Ok(records)
}

pub fn write_records<W: Write>(writer: W, records: &[ChainRecord]) -> AnalyzerResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}
