use anyhow::{Context, Result};
use common::{progress::Progress, serde::Deserializer};

/// Reads the rest of the buffer as text and calls `callback` with every
/// non-empty, trimmed line. Errors are tagged with the line number.
pub fn lines<T: Deserializer>(
    des: &mut T,
    progress: Progress,
    mut callback: impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let size = des.remaining();
    progress.set_total(size as u64);

    let bytes = des.read_bytes(size);
    let text = std::str::from_utf8(bytes).context("File is not valid UTF-8 text")?;

    let mut complete = 0;
    for (idx, line) in text.lines().enumerate() {
        complete += line.len() as u64 + 1;
        progress.set_complete(complete);

        let line = line.trim();
        if !line.is_empty() {
            callback(line).with_context(|| format!("Line {}", idx + 1))?;
        }
    }

    Ok(())
}

pub fn parse_f64(token: Option<&str>) -> Result<f64> {
    let token = token.context("Missing coordinate")?;
    let value = token
        .parse::<f64>()
        .with_context(|| format!("Invalid number `{token}`"))?;
    anyhow::ensure!(value.is_finite(), "Non-finite coordinate `{token}`");
    Ok(value)
}
