use anyhow::{bail, Result};

/// Number of characters looked at when guessing the dialect of a file.
pub const SAMPLE_SIZE: usize = 8192;

/// Delimiters in the order they win when several of them look consistent.
const PREFERRED_DELIMITERS: [char; 6] = [',', '\t', ';', '|', ' ', ':'];

const QUOTE_CANDIDATES: [char; 2] = ['"', '\''];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
}

/// Returns the start of `text` that is used for sniffing. When the text had to be cut, the
/// trailing partial line is dropped so that it doesn't skew the field counts.
pub fn sample(text: &str) -> &str {
    let end = match text.char_indices().nth(SAMPLE_SIZE) {
        Some((end, _)) => end,
        None => return text,
    };
    let truncated = &text[..end];
    match truncated.rfind('\n') {
        Some(last_newline) => &truncated[..last_newline],
        None => truncated,
    }
}

pub fn sniff(sample: &str) -> Result<Dialect> {
    let lines: Vec<&str> = sample
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        bail!("Could not determine delimiter: the sample is empty");
    }

    let quote = guess_quote(&lines);
    let Some(delimiter) = guess_delimiter(&lines, quote) else {
        bail!("Could not determine delimiter");
    };

    Ok(Dialect {
        delimiter: delimiter as u8,
        quote: quote as u8,
    })
}

/// A quote character counts when it opens a field: at the start of a line or right after a
/// possible delimiter, optionally preceded by one space.
fn guess_quote(lines: &[&str]) -> char {
    let mut best = ('"', 0);
    for quote in QUOTE_CANDIDATES {
        let mut count = 0;
        for line in lines {
            let chars: Vec<char> = line.chars().collect();
            for (i, c) in chars.iter().enumerate() {
                if *c != quote {
                    continue;
                }
                let mut j = i;
                if j > 0 && chars[j - 1] == ' ' {
                    j -= 1;
                }
                if j == 0 || PREFERRED_DELIMITERS.contains(&chars[j - 1]) {
                    count += 1;
                }
            }
        }
        if count > best.1 {
            best = (quote, count);
        }
    }
    best.0
}

fn guess_delimiter(lines: &[&str], quote: char) -> Option<char> {
    let counts: Vec<[usize; PREFERRED_DELIMITERS.len()]> = lines
        .iter()
        .map(|line| count_unquoted(line, quote))
        .collect();

    let mut consistency = Vec::with_capacity(PREFERRED_DELIMITERS.len());
    for i in 0..PREFERRED_DELIMITERS.len() {
        let per_line: Vec<usize> = counts.iter().map(|c| c[i]).collect();
        let (mode, frequency) = mode(&per_line);
        if mode == 0 {
            consistency.push(0.0);
        } else {
            consistency.push(frequency as f64 / lines.len() as f64);
        }
    }

    for threshold in [1.0, 0.95, 0.9] {
        for (i, delimiter) in PREFERRED_DELIMITERS.iter().enumerate() {
            if consistency[i] > 0.0 && consistency[i] >= threshold {
                return Some(*delimiter);
            }
        }
    }

    // Nothing is consistent enough, e.g. when data rows end with a trailing delimiter that
    // the header lacks. Settle for a delimiter that shows up on every line.
    PREFERRED_DELIMITERS
        .iter()
        .enumerate()
        .find(|(i, _)| counts.iter().all(|c| c[*i] > 0))
        .map(|(_, delimiter)| *delimiter)
}

fn count_unquoted(line: &str, quote: char) -> [usize; PREFERRED_DELIMITERS.len()] {
    let mut counts = [0; PREFERRED_DELIMITERS.len()];
    let mut in_quotes = false;
    for c in line.chars() {
        if c == quote {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = PREFERRED_DELIMITERS.iter().position(|d| *d == c) {
            counts[i] += 1;
        }
    }
    counts
}

/// Most common value and how often it occurs. Ties go to the larger value.
fn mode(values: &[usize]) -> (usize, usize) {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mut best = (0, 0);
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i >= best.1 {
            best = (sorted[i], j - i);
        }
        i = j;
    }
    best
}
