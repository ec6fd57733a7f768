//! Parsing and ordering of drained ttp output.
//!
//! The device drains each CPU's shard separately; tools that want one
//! timeline sort the records by timestamp afterwards.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::Path;

/// One drained line: `<id>,<cpu>,<timestamp>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Record {
    // Field order gives the sort order: timestamp, then cpu, then id
    pub timestamp: u64,
    pub cpu: u32,
    pub id: u32,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.id, self.cpu, self.timestamp)
    }
}

/// Parse a single line, without its newline.
pub fn parse_line(line: &str) -> Result<Record> {
    let mut fields = line.split(',');
    let (Some(id), Some(cpu), Some(timestamp), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        bail!("expected 3 comma-separated fields, got {:?}", line);
    };

    Ok(Record {
        id: id.parse().with_context(|| format!("bad event id {:?}", id))?,
        cpu: cpu.parse().with_context(|| format!("bad cpu {:?}", cpu))?,
        timestamp: timestamp
            .parse()
            .with_context(|| format!("bad timestamp {:?}", timestamp))?,
    })
}

/// Parse drained text, skipping blank lines.
pub fn parse_dump(text: &str) -> Result<Vec<Record>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_line(line.trim()).with_context(|| format!("line {}", index + 1))
        })
        .collect()
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read dump: {}", path.as_ref().display()))?;
    parse_dump(&text)
}

/// Merge per-CPU records into one timeline.
pub fn sort_by_time(records: &mut [Record]) {
    records.sort_unstable();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_lines() {
        assert_eq!(
            parse_line("5,0,1000").unwrap(),
            Record { timestamp: 1000, cpu: 0, id: 5 }
        );
        assert!(parse_line("5; 0; 1000").is_err());
        assert!(parse_line("5,0").is_err());
        assert!(parse_line("5,0,1,2").is_err());
    }

    #[test]
    fn errors_name_the_line() {
        let err = parse_dump("1,0,10\n\nx,0,11\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }

    #[test]
    fn sort_merges_cpus_by_timestamp() {
        let mut records = parse_dump("1,0,30\n2,0,40\n3,1,10\n4,1,30\n").unwrap();
        sort_by_time(&mut records);
        let lines: Vec<String> = records.iter().map(Record::to_string).collect();
        assert_eq!(lines, ["3,1,10", "1,0,30", "4,1,30", "2,0,40"]);
    }
}
