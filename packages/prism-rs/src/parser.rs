use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use crate::error::{PrismError, Result};

/// Samples and optional header values read from a plain-text trace
///
/// The format is whitespace-separated numbers; `#` starts a comment that runs
/// to the end of the line. Comment lines of the form `# key: value` with the
/// keys `dt`, `station` or `channel` are picked up as header fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTrace {
    pub samples: Vec<f64>,
    pub dt: Option<f64>,
    pub station: Option<String>,
    pub channel: Option<String>,
}

pub fn parse_trace(content: &str) -> Result<ParsedTrace> {
    parse_trace_from_bytes(content.as_bytes())
}

/// Parse a trace from a byte slice (e.g. mmap)
pub fn parse_trace_from_bytes(content: &[u8]) -> Result<ParsedTrace> {
    let mut trace = ParsedTrace::default();

    for (line_no, line) in content.split(|&b| b == b'\n').enumerate() {
        let line = std::str::from_utf8(line).map_err(|_| {
            PrismError::ParseError(format!("line {} is not valid UTF-8", line_no + 1))
        })?;

        let (data, comment) = match line.find('#') {
            Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
            None => (line, None),
        };

        if let Some(comment) = comment {
            parse_header(comment, &mut trace, line_no + 1)?;
        }

        for token in data.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| {
                PrismError::ParseError(format!("line {}: '{}' is not a number", line_no + 1, token))
            })?;
            trace.samples.push(value);
        }
    }

    Ok(trace)
}

fn parse_header(comment: &str, trace: &mut ParsedTrace, line_no: usize) -> Result<()> {
    let Some((key, value)) = comment.split_once(':') else {
        return Ok(());
    };
    let value = value.trim();
    match key.trim().to_ascii_lowercase().as_str() {
        "dt" => {
            let dt = value.parse::<f64>().map_err(|_| {
                PrismError::ParseError(format!("line {}: invalid dt '{}'", line_no, value))
            })?;
            trace.dt = Some(dt);
        }
        "station" => trace.station = Some(value.to_string()),
        "channel" => trace.channel = Some(value.to_string()),
        _ => {}
    }
    Ok(())
}

/// Open a trace file, map it into memory (read-only) and parse it
pub fn read_trace_file(path: &Path) -> Result<ParsedTrace> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(ParsedTrace::default());
    }
    // The mapping lives only for the parse and the file is opened read-only
    let mmap = unsafe { Mmap::map(&file)? };
    parse_trace_from_bytes(&mmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_basic() {
        let trace = parse_trace("1.0 2.0\n-3.5e-1\t4\n").unwrap();
        assert_eq!(trace.samples, vec![1.0, 2.0, -0.35, 4.0]);
        assert_eq!(trace.dt, None);
    }

    #[test]
    fn test_parse_header_and_comments() {
        let content = "# station: CE.12345\n# channel: HNE\n# dt: 0.005\n0.1 0.2 # trailing\n# plain note\n0.3\r\n";
        let trace = parse_trace(content).unwrap();
        assert_eq!(trace.samples, vec![0.1, 0.2, 0.3]);
        assert_eq!(trace.dt, Some(0.005));
        assert_eq!(trace.station.as_deref(), Some("CE.12345"));
        assert_eq!(trace.channel.as_deref(), Some("HNE"));
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(parse_trace("").unwrap().samples.is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_trace("1.0\n2.0 abc\n").unwrap_err();
        assert!(matches!(err, PrismError::ParseError(msg) if msg.contains("line 2")));
        assert!(parse_trace("# dt: fast\n1.0").is_err());
    }

    #[test]
    fn test_read_trace_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# dt: 0.01").unwrap();
        writeln!(file, "1 2 3").unwrap();
        let trace = read_trace_file(file.path()).unwrap();
        assert_eq!(trace.samples, vec![1.0, 2.0, 3.0]);
        assert_eq!(trace.dt, Some(0.01));
    }
}
