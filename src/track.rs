//! GPX track parsing.
//!
//! Reads every `<trkpt>` in document order (all tracks and segments flattened)
//! into [`Sample`]s. Parsing is deliberately lenient about values and strict
//! about markup:
//!
//! - a missing or malformed `lat`/`lon` attribute becomes `0.0`
//! - a missing or malformed `<ele>` child becomes `0.0`
//! - numeric text is read like JavaScript's `parseFloat`: the longest numeric
//!   prefix wins, so `"12.5m"` reads as `12.5`
//! - only markup that is not well-formed fails, with [`CorridorError::Parse`]

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{CorridorError, Result};
use crate::Sample;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Parse GPX text into ordered track samples.
///
/// # Example
/// ```
/// use route_corridor::parse_track;
///
/// let samples = parse_track(r#"<gpx><trk><trkseg>
///     <trkpt lat="48.1" lon="11.5"><ele>520</ele></trkpt>
///     <trkpt lat="oops" lon="11.6"/>
/// </trkseg></trk></gpx>"#).unwrap();
///
/// assert_eq!(samples.len(), 2);
/// assert_eq!(samples[0].elevation, 520.0);
/// assert_eq!(samples[1].lat, 0.0); // lenient default
/// ```
pub fn parse_track(text: &str) -> Result<Vec<Sample>> {
    let mut reader = Reader::from_str(text.trim_start_matches(BYTE_ORDER_MARK));

    let mut samples = Vec::new();
    let mut depth: usize = 0;
    let mut seen_root = false;

    // Open <trkpt> and the depth it was opened at
    let mut current: Option<(Sample, usize)> = None;
    let mut ele_text: Option<String> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(parse_error(reader.buffer_position() as u64, e)),
        };

        match event {
            Event::Start(ref e) => {
                if depth == 0 {
                    check_single_root(&mut seen_root, position)?;
                }
                depth += 1;

                match e.local_name().as_ref() {
                    b"trkpt" => current = Some((read_sample(e, position)?, depth)),
                    b"ele" => {
                        if let Some((_, trkpt_depth)) = current {
                            if depth == trkpt_depth + 1 {
                                ele_text = Some(String::new());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(ref e) => {
                if depth == 0 {
                    check_single_root(&mut seen_root, position)?;
                }
                if e.local_name().as_ref() == b"trkpt" {
                    samples.push(read_sample(e, position)?);
                }
            }
            Event::End(ref e) => {
                if depth == 0 {
                    return Err(CorridorError::Parse {
                        position,
                        message: "closing tag without a matching opening tag".to_string(),
                    });
                }

                match e.local_name().as_ref() {
                    b"trkpt" => {
                        if let Some((sample, trkpt_depth)) = current {
                            if trkpt_depth == depth {
                                samples.push(sample);
                                current = None;
                            }
                        }
                    }
                    b"ele" => {
                        if let (Some(text), Some((sample, _))) = (ele_text.take(), current.as_mut()) {
                            sample.elevation = lenient_float(&text);
                        }
                    }
                    _ => {}
                }
                depth -= 1;
            }
            Event::Text(ref t) => {
                if let Some(text) = ele_text.as_mut() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| parse_error(position, e))?;
                    text.push_str(&unescaped);
                } else if depth == 0 && !t.iter().all(|b| b.is_ascii_whitespace()) {
                    return Err(CorridorError::Parse {
                        position,
                        message: "text outside the document element".to_string(),
                    });
                }
            }
            Event::CData(ref c) => {
                if let Some(text) = ele_text.as_mut() {
                    text.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let end = reader.buffer_position() as u64;
    if depth != 0 {
        return Err(CorridorError::Parse {
            position: end,
            message: format!("document ends with {} unclosed element(s)", depth),
        });
    }
    if !seen_root {
        return Err(CorridorError::Parse {
            position: end,
            message: "document has no root element".to_string(),
        });
    }

    debug!("[RouteCorridor] Parsed {} track points", samples.len());
    Ok(samples)
}

/// Parse GPX from raw bytes. The bytes must be UTF-8.
pub fn parse_track_bytes(data: &[u8]) -> Result<Vec<Sample>> {
    let text = std::str::from_utf8(data).map_err(|e| CorridorError::Parse {
        position: e.valid_up_to() as u64,
        message: format!("track is not valid UTF-8: {e}"),
    })?;
    parse_track(text)
}

fn check_single_root(seen_root: &mut bool, position: u64) -> Result<()> {
    if *seen_root {
        return Err(CorridorError::Parse {
            position,
            message: "more than one root element".to_string(),
        });
    }
    *seen_root = true;
    Ok(())
}

fn read_sample(element: &BytesStart<'_>, position: u64) -> Result<Sample> {
    let mut sample = Sample::new(0.0, 0.0, 0.0);

    for attr in element.attributes() {
        let attr = attr.map_err(|e| parse_error(position, e))?;
        let value = attr.unescape_value().map_err(|e| parse_error(position, e))?;
        match attr.key.local_name().as_ref() {
            b"lat" => sample.lat = lenient_float(&value),
            b"lon" => sample.lon = lenient_float(&value),
            _ => {}
        }
    }

    Ok(sample)
}

fn parse_error(position: u64, err: impl std::fmt::Display) -> CorridorError {
    CorridorError::Parse {
        position,
        message: err.to_string(),
    }
}

/// Read a number the way `parseFloat` does: skip leading whitespace, take the
/// longest numeric prefix, and fall back to `0.0` when there is none.
pub(crate) fn lenient_float(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let count_digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_digits = count_digits(end);
    end += int_digits;

    let mut frac_digits = 0;
    if end < len && bytes[end] == b'.' {
        frac_digits = count_digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return 0.0;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < len && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = count_digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
