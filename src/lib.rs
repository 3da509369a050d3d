//! Decoder for the Sierra ECG / Philips ECG resting-ECG XML format.
//!
//! A Sierra ECG / Philips ECG file is an XML document whose `<parsedwaveforms>` element
//! holds a base64-encoded waveform payload, usually compressed with a proprietary
//! scheme called XLI: an LZW-style dictionary coder layered under a second-order
//! residual predictor. This crate turns that payload into twelve reconstructed ECG lead
//! signals, and optionally the file's representative-beat waveforms.
//!
//! ```no_run
//! use sierraecg::read_file;
//!
//! let file = read_file("resting.xml", false)?;
//! println!("{} {}, {} leads", file.doc_type, file.doc_ver, file.leads.len());
//! # Ok::<(), sierraecg::Error>(())
//! ```

mod bitstream;
mod error;
mod leads;
mod lzw;
mod xli;
mod xml;

pub use error::{Error, Result};
pub use xli::Limits;

use std::path::Path;

/// The decoded result of a Sierra ECG / Philips ECG file.
#[derive(Debug, Clone)]
pub struct EcgFile {
    /// `"SierraECG"` or `"PhilipsECG"`.
    pub doc_type: String,
    /// One of `"1.03"`, `"1.04"`, `"1.04.01"`, `"1.04.02"`.
    pub doc_ver: String,
    /// One entry per channel, in the order declared by the file.
    pub leads: Vec<EcgLead>,
    /// Representative-beat waveforms, aligned to `leads` by label. Empty unless
    /// `include_repbeats` was requested and the file carries a `<repbeats>` section.
    pub repbeats: Vec<EcgRepbeat>,
}

/// One channel of the rhythm strip.
#[derive(Debug, Clone)]
pub struct EcgLead {
    pub label: String,
    pub sampling_freq: u32,
    pub duration: u32,
    pub samples: Vec<i16>,
}

/// One representative beat, decoded from a plain (non-XLI) base64 `<waveform>`.
#[derive(Debug, Clone)]
pub struct EcgRepbeat {
    pub label: String,
    pub sampling_freq: u32,
    pub duration: u32,
    pub resolution: String,
    pub method: String,
    pub samples: Vec<u16>,
}

const SUPPORTED_DOC_TYPES: &[&str] = &["SierraECG", "PhilipsECG"];
const SUPPORTED_DOC_VERS: &[&str] = &["1.03", "1.04", "1.04.01", "1.04.02"];
const STANDARD_ACQUISITION_TYPES: &[&str] = &["STD-12", "10-WIRE"];

/// Reads and decodes a Sierra ECG / Philips ECG file from disk.
pub fn read_file(path: impl AsRef<Path>, include_repbeats: bool) -> Result<EcgFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| Error::DecodeError(format!("failed to read {}: {}", path.display(), e)))?;
    read_bytes(&bytes, include_repbeats)
}

/// Decodes a Sierra ECG / Philips ECG file already held in memory, using the default
/// resource limits (see `Limits`).
pub fn read_bytes(xml: &[u8], include_repbeats: bool) -> Result<EcgFile> {
    read_bytes_with_limits(xml, include_repbeats, Limits::default())
}

/// Decodes a Sierra ECG / Philips ECG file already held in memory, bounding the XLI
/// decoder's trust in attacker-controlled chunk-size fields with `limits`.
pub fn read_bytes_with_limits(
    xml: &[u8],
    include_repbeats: bool,
    limits: Limits,
) -> Result<EcgFile> {
    let doc = xml::parse(xml)?;

    let doc_type = xml::require_element(&doc.doc_type, "documenttype")?.to_string();
    let doc_ver = xml::require_element(&doc.doc_ver, "documentversion")?.to_string();
    if !SUPPORTED_DOC_TYPES.contains(&doc_type.as_str())
        || !SUPPORTED_DOC_VERS.contains(&doc_ver.as_str())
    {
        return Err(Error::UnsupportedFile(format!(
            "Files of type {} {} are unsupported",
            doc_type, doc_ver
        )));
    }

    let sampling_freq: u32 = parse_required(&doc.sampling_rate, "samplingrate")?;
    let channel_count: usize =
        parse_required(&doc.number_channels_allocated, "numberchannelsallocated")?;
    let acquisition_type =
        xml::require_element(&doc.acquisition_type, "acquisitiontype")?.to_string();

    let data_encoding = xml::require_attribute(&doc.data_encoding, "dataencoding")?;
    if data_encoding != "Base64" {
        return Err(Error::UnsupportedFile(format!(
            "Waveform data encoding unsupported: {}",
            data_encoding
        )));
    }

    let duration: u32 = parse_required(&doc.duration_per_channel, "durationperchannel")?;
    let sample_count = (duration as u64 * sampling_freq as u64 / 1000) as usize;

    let labels = resolve_labels(&doc, channel_count, &acquisition_type)?;

    let waveform_text = xml::require_element(&doc.waveform_text, "parsedwaveforms")?;
    let waveform_data = decode_base64(waveform_text)?;

    let compression = doc
        .compress_method
        .clone()
        .or_else(|| doc.compression.clone())
        .unwrap_or_else(|| "Uncompressed".to_string());

    let mut channels = match compression.as_str() {
        "Uncompressed" => leads::split_uncompressed(&waveform_data, labels.len(), sample_count)?,
        "XLI" => {
            let mut chunks = leads::decode_xli(&waveform_data, &limits)?;
            if STANDARD_ACQUISITION_TYPES.contains(&acquisition_type.as_str()) {
                leads::synthesize_derived_leads(&mut chunks);
            }
            chunks
        }
        other => {
            return Err(Error::UnsupportedFile(format!(
                "Waveform data compression algorithm unsupported: {}",
                other
            )))
        }
    };

    if channels.len() != labels.len() {
        return Err(Error::DecodeError(format!(
            "waveform payload produced {} channels but {} leads were declared",
            channels.len(),
            labels.len()
        )));
    }

    let leads: Vec<EcgLead> = labels
        .iter()
        .zip(channels.drain(..))
        .map(|(label, samples)| EcgLead {
            label: label.clone(),
            sampling_freq,
            duration,
            samples,
        })
        .collect();

    log::debug!(
        "decoded {} {} file: {} leads, {} samples/lead",
        doc_type,
        doc_ver,
        leads.len(),
        sample_count
    );

    let repbeats = if include_repbeats {
        decode_repbeats(&doc, &labels)?
    } else {
        Vec::new()
    };

    Ok(EcgFile {
        doc_type,
        doc_ver,
        leads,
        repbeats,
    })
}

fn parse_required<T>(value: &Option<String>, tag: &'static str) -> Result<T>
where
    T: std::str::FromStr,
{
    let text = xml::require_element(value, tag)?;
    text.trim()
        .parse()
        .map_err(|_| Error::DecodeError(format!("could not parse <{}> as a number: {}", tag, text)))
}

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    // The payload is pretty-printed XML text and commonly wraps with whitespace.
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| Error::DecodeError(format!("malformed base64 waveform payload: {}", e)))
}

fn resolve_labels(
    doc: &xml::ParsedDocument,
    channel_count: usize,
    acquisition_type: &str,
) -> Result<Vec<String>> {
    if let Some(lead_labels) = doc.lead_labels.as_deref().filter(|s| !s.is_empty()) {
        let number_of_leads: usize = parse_required(&doc.number_of_leads, "numberofleads")?;
        return Ok(lead_labels
            .split(' ')
            .filter(|s| !s.is_empty())
            .take(number_of_leads)
            .map(str::to_string)
            .collect());
    }

    Ok((1..=channel_count)
        .map(|index| lead_name(acquisition_type, index))
        .collect())
}

fn lead_name(acquisition_type: &str, index: usize) -> String {
    if STANDARD_ACQUISITION_TYPES.contains(&acquisition_type) {
        match index {
            1 => return "I".to_string(),
            2 => return "II".to_string(),
            3 => return "III".to_string(),
            4 => return "aVR".to_string(),
            5 => return "aVL".to_string(),
            6 => return "aVF".to_string(),
            7..=12 => return format!("V{}", index - 6),
            _ => {}
        }
    }
    format!("Channel {}", index)
}

fn decode_repbeats(doc: &xml::ParsedDocument, labels: &[String]) -> Result<Vec<EcgRepbeat>> {
    let section = match &doc.repbeats {
        Some(section) => section,
        None => return Ok(Vec::new()),
    };

    let data_encoding = xml::require_attribute(&section.data_encoding, "dataencoding")?;
    if data_encoding != "Base64" {
        return Err(Error::UnsupportedFile(format!(
            "Repbeat data encoding unsupported: {}",
            data_encoding
        )));
    }

    let sampling_freq: u32 = section
        .samples_per_sec
        .as_deref()
        .ok_or(Error::MissingAttribute("samplespersec"))?
        .trim()
        .parse()
        .map_err(|_| Error::DecodeError("could not parse @samplespersec as a number".into()))?;
    let resolution = section
        .resolution
        .clone()
        .ok_or(Error::MissingAttribute("resolution"))?;
    let method = section
        .method
        .clone()
        .ok_or(Error::MissingAttribute("repbeatmethod"))?;

    if section.beats.len() != labels.len() {
        return Err(Error::OrderingMismatch {
            expected: labels.join(", "),
            found: section
                .beats
                .iter()
                .map(|b| b.lead_name.clone())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    let mut repbeats = Vec::with_capacity(section.beats.len());
    for (label, beat) in labels.iter().zip(section.beats.iter()) {
        if &beat.lead_name != label {
            return Err(Error::OrderingMismatch {
                expected: label.clone(),
                found: beat.lead_name.clone(),
            });
        }

        let mut samples = Vec::new();
        for waveform in &beat.waveforms {
            let bytes = decode_base64(waveform)?;
            for chunk in bytes.chunks_exact(2) {
                samples.push(u16::from_le_bytes([chunk[0], chunk[1]]));
            }
        }

        let duration = if sampling_freq > 0 {
            (samples.len() as u64 * 1000 / sampling_freq as u64) as u32
        } else {
            0
        };

        repbeats.push(EcgRepbeat {
            label: label.clone(),
            sampling_freq,
            duration,
            resolution: resolution.clone(),
            method: method.clone(),
            samples,
        });
    }

    Ok(repbeats)
}
