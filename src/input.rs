use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use flate2::read::MultiGzDecoder;

/// Opens a variant file and transparently peels off GZIP/BGZF layers to
/// expose the underlying text stream.
///
/// Supports nested compression (e.g. a re-gzipped `.vcf.gz`).
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open input {}", path.display()))?;
    let mut reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(file));

    // Limit recursion depth to avoid looping on malformed inputs
    let mut depth = 0;
    const MAX_DEPTH: usize = 10;

    while depth < MAX_DEPTH {
        let is_gzip = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            // GZIP magic: 1f 8b
            buf.len() >= 2 && buf[0] == 0x1f && buf[1] == 0x8b
        };

        if !is_gzip {
            break;
        }

        tracing::debug!("detected GZIP/BGZF layer");
        // MultiGzDecoder handles BGZF and concatenated GZIP members
        reader = Box::new(BufReader::new(MultiGzDecoder::new(reader)));
        depth += 1;
    }

    Ok(reader)
}
