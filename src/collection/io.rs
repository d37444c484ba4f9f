use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};
use std::string::FromUtf8Error;

use thiserror::Error;
use tracing::{debug, warn};

use crate::alignment::AlignmentTrack;
use crate::sample::Sample;

/// Column titles of the mutation table.
pub const MUTATION_TABLE_HEADER: [&str; 2] = ["sequence_name", "mutations"];

/// Metadata column holding stored mutation summaries.
pub const MUTATIONS_TITLE: &str = "mutations";

/// Errors from the table and FASTA readers and writers.
#[derive(Debug, Error)]
pub enum IoError {
    /// Underlying reader or writer failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV or a failed CSV write.
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    /// Rendered output was not UTF-8.
    #[error("rendered output is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),

    /// Table has no header line.
    #[error("metadata table is empty")]
    EmptyTable,

    /// FASTA sequence line before any `>` header.
    #[error("sequence data on line {0} precedes the first FASTA header")]
    OrphanSequence(usize),
}

/// Write `sequence_name,mutations` rows for every compared sample.
/// Names containing a comma or quote are quoted.
pub fn write_mutation_table<'a, W: Write>(
    writer: &mut W,
    samples: impl IntoIterator<Item = &'a Sample>,
) -> Result<usize, IoError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(MUTATION_TABLE_HEADER)?;
    let mut rows = 0;
    for sample in samples {
        if !sample.is_compared() && !sample.is_reference() {
            continue;
        }
        out.write_record([sample.name(), sample.mutation_summary().as_str()])?;
        rows += 1;
    }
    out.flush()?;
    Ok(rows)
}

/// Render the mutation table into a string.
pub fn render_mutation_table<'a>(
    samples: impl IntoIterator<Item = &'a Sample>,
) -> Result<String, IoError> {
    let mut buffer = Vec::new();
    write_mutation_table(&mut buffer, samples)?;
    Ok(String::from_utf8(buffer)?)
}

/// Write protein results as FASTA. Samples without a result are skipped.
pub fn write_result_fasta<'a, W: Write>(
    writer: &mut W,
    samples: impl IntoIterator<Item = &'a Sample>,
) -> Result<usize, IoError> {
    let mut written = 0;
    let mut total = 0;
    for sample in samples {
        total += 1;
        let Some(result) = sample.result().filter(|r| !r.is_empty()) else {
            debug!(sample = sample.name(), "no protein sequence, skipping");
            continue;
        };
        writeln!(writer, ">{}", sample.name())?;
        writeln!(writer, "{result}")?;
        written += 1;
    }
    writer.flush()?;
    debug!(written, total, "wrote result FASTA");
    Ok(written)
}

/// Write the three rows of `track` under a `>name` line.
pub fn write_alignment<W: Write>(
    writer: &mut W,
    name: &str,
    track: &AlignmentTrack,
) -> Result<(), IoError> {
    writer.write_all(track.render(name).as_bytes())?;
    Ok(())
}

/// One data row of a metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    /// First-column sample identifier.
    pub id: String,
    /// Remaining columns keyed by title.
    pub values: BTreeMap<String, String>,
}

/// Parsed metadata table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    /// Header titles; the first names the identifier column.
    pub titles: Vec<String>,
    /// Rows with the right field count.
    pub rows: Vec<MetadataRow>,
    /// Rows dropped for a wrong field count.
    pub skipped: usize,
}

impl MetadataTable {
    /// Row for `id`, if present.
    pub fn row(&self, id: &str) -> Option<&MetadataRow> {
        self.rows.iter().find(|r| r.id == id)
    }
}

/// Read a comma-separated metadata table. The first column identifies the
/// sample; rows whose field count differs from the header are skipped with
/// a warning. Quoted fields may contain commas; blank lines are ignored and
/// every field is trimmed.
pub fn read_metadata<R: Read>(reader: R) -> Result<MetadataTable, IoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let titles: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if titles.is_empty() {
        return Err(IoError::EmptyTable);
    }
    let mut table = MetadataTable {
        titles,
        ..MetadataTable::default()
    };

    for record in rdr.records() {
        let record = record?;
        if record.len() != table.titles.len() {
            let line = record.position().map_or(0, |p| p.line());
            warn!(line, fields = record.len(), "skipping metadata row");
            table.skipped += 1;
            continue;
        }

        let mut fields = record.iter().map(str::to_string);
        let id = fields.next().unwrap_or_default();
        let values = table.titles[1..].iter().cloned().zip(fields).collect();
        table.rows.push(MetadataRow { id, values });
    }

    Ok(table)
}

/// Read FASTA records as `(name, sequence)`. Sequence lines are
/// concatenated with whitespace removed.
pub fn read_fasta<R: BufRead>(reader: R) -> Result<Vec<(String, String)>, IoError> {
    let mut records: Vec<(String, String)> = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix('>') {
            records.push((name.trim().to_string(), String::new()));
            continue;
        }
        let Some((_, sequence)) = records.last_mut() else {
            return Err(IoError::OrphanSequence(number + 1));
        };
        sequence.extend(line.chars().filter(|c| !c.is_whitespace()));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Reference;
    use crate::EngineConfig;
    use std::io::Cursor;

    #[test]
    fn table_lists_compared_samples() {
        let reference = Reference::new("ref", "MFVFLV", 1);
        let mut base = Sample::protein("ref", "MFVFLV");
        base.set_reference(true);
        let mut a = Sample::new("a");
        a.load_mutations("F2L V6A", &reference, &EngineConfig::default());
        let untouched = Sample::protein("b", "MFV");

        let table = render_mutation_table([&base, &a, &untouched]).unwrap();
        assert_eq!(table, "sequence_name,mutations\nref,\na,F2L V6A\n");
    }

    #[test]
    fn fasta_skips_samples_without_result() {
        let samples = [Sample::protein("a", "MFV"), Sample::nucleotide("b", "ATG")];
        let mut out = Vec::new();
        assert_eq!(write_result_fasta(&mut out, &samples).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), ">a\nMFV\n");
    }

    #[test]
    fn metadata_rows_with_wrong_width_are_skipped() {
        let csv = "name, date ,mutations\ns1,2021-01-01,N501Y\ns2,2021\n\ns3 , 2022-02-02 , \n";
        let table = read_metadata(Cursor::new(csv)).unwrap();
        assert_eq!(table.titles, vec!["name", "date", "mutations"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped, 1);
        let s3 = table.row("s3").unwrap();
        assert_eq!(s3.values["date"], "2022-02-02");
        assert_eq!(s3.values["mutations"], "");
    }

    #[test]
    fn quoted_fields_keep_their_commas() {
        let csv = "name,location,mutations\ns1,\"Europe / UK, London\",N501Y\n";
        let table = read_metadata(Cursor::new(csv)).unwrap();
        assert_eq!(table.skipped, 0);
        let s1 = table.row("s1").unwrap();
        assert_eq!(s1.values["location"], "Europe / UK, London");
        assert_eq!(s1.values["mutations"], "N501Y");
    }

    #[test]
    fn names_with_commas_survive_a_table_round_trip() {
        let reference = Reference::new("ref", "MFVFLV", 1);
        let mut sample = Sample::new("hCoV-19/UK, batch 2");
        sample.load_mutations("F2L", &reference, &EngineConfig::default());

        let rendered = render_mutation_table([&sample]).unwrap();
        assert_eq!(rendered, "sequence_name,mutations\n\"hCoV-19/UK, batch 2\",F2L\n");

        let table = read_metadata(Cursor::new(rendered)).unwrap();
        assert_eq!(table.row("hCoV-19/UK, batch 2").unwrap().values["mutations"], "F2L");
    }

    #[test]
    fn empty_metadata_is_an_error() {
        assert!(matches!(read_metadata(Cursor::new("\n\n")), Err(IoError::EmptyTable)));
    }

    #[test]
    fn fasta_records_join_wrapped_lines() {
        let records = read_fasta(Cursor::new(">s1 first\nMFV\nFLV\n>s2\nAAA\n")).unwrap();
        assert_eq!(
            records,
            vec![("s1 first".into(), "MFVFLV".into()), ("s2".into(), "AAA".into())]
        );
        assert!(matches!(
            read_fasta(Cursor::new("MFV\n")),
            Err(IoError::OrphanSequence(1))
        ));
    }
}
