//! The Sierra ECG / Philips ECG XML container: locates the handful of elements and
//! attributes this format actually needs and leaves everything else alone.
//!
//! Parsing uses `quick_xml`'s low-level event reader rather than its `serde` mode: the
//! documents in the wild nest the fields we care about at varying depths, and
//! `quick_xml` never expands a DTD or external entity on its own, which is the whole of
//! the "harden against entity expansion" requirement — there is simply no expansion
//! machinery to disable.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

/// One `<repbeat>` element: its lead name and the base64 text of its `<waveform>`
/// children, in document order.
#[derive(Debug, Clone)]
pub struct RepbeatEntry {
    pub lead_name: String,
    pub waveforms: Vec<String>,
}

/// The `<repbeats>` section, if present.
#[derive(Debug, Clone, Default)]
pub struct RepbeatsSection {
    pub data_encoding: Option<String>,
    pub samples_per_sec: Option<String>,
    pub resolution: Option<String>,
    pub method: Option<String>,
    pub beats: Vec<RepbeatEntry>,
}

/// Everything extracted from one document in a single pass.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub doc_type: Option<String>,
    pub doc_ver: Option<String>,
    pub sampling_rate: Option<String>,
    pub number_channels_allocated: Option<String>,
    pub acquisition_type: Option<String>,
    pub data_encoding: Option<String>,
    pub duration_per_channel: Option<String>,
    pub compress_method: Option<String>,
    pub compression: Option<String>,
    pub number_of_leads: Option<String>,
    pub lead_labels: Option<String>,
    pub waveform_text: Option<String>,
    pub repbeats: Option<RepbeatsSection>,
}

/// Parses the whole document in one pass, recording the first occurrence of every
/// tag/attribute this crate understands, mirroring the source's
/// `getElementsByTagName`-first-match semantics rather than a strict grammar.
pub fn parse(xml: &[u8]) -> Result<ParsedDocument> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut doc = ParsedDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    // State for the element currently being collected into `text_buf`.
    let mut collecting: Option<String> = None;

    // State while inside <repbeats>.
    let mut in_repbeats = false;
    let mut current_repbeat: Option<RepbeatEntry> = None;
    let mut current_waveform: Option<String> = None;

    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::DecodeError(format!("malformed XML: {}", e)))?
        {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                match name.as_str() {
                    "documenttype" | "documentversion" | "samplingrate"
                    | "numberchannelsallocated" | "acquisitiontype" => {
                        collecting = Some(name.clone());
                        text_buf.clear();
                    }
                    "parsedwaveforms" => {
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                            let value = attr
                                .unescape_value()
                                .unwrap_or_default()
                                .to_string();
                            match key.as_str() {
                                "dataencoding" => doc.data_encoding = Some(value),
                                "durationperchannel" => doc.duration_per_channel = Some(value),
                                "compressmethod" => doc.compress_method = Some(value),
                                "compression" => doc.compression = Some(value),
                                "numberofleads" => doc.number_of_leads = Some(value),
                                "leadlabels" => doc.lead_labels = Some(value),
                                _ => {}
                            }
                        }
                        collecting = Some(name.clone());
                        text_buf.clear();
                    }
                    "repbeats" => {
                        in_repbeats = true;
                        let mut section = RepbeatsSection::default();
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                            let value = attr
                                .unescape_value()
                                .unwrap_or_default()
                                .to_string();
                            match key.as_str() {
                                "dataencoding" => section.data_encoding = Some(value),
                                "samplespersec" => section.samples_per_sec = Some(value),
                                "resolution" => section.resolution = Some(value),
                                "repbeatmethod" => section.method = Some(value),
                                _ => {}
                            }
                        }
                        doc.repbeats = Some(section);
                    }
                    "repbeat" if in_repbeats => {
                        let mut lead_name = String::new();
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                            if key == "leadname" {
                                lead_name = attr
                                    .unescape_value()
                                    .unwrap_or_default()
                                    .to_string();
                            }
                        }
                        current_repbeat = Some(RepbeatEntry {
                            lead_name,
                            waveforms: Vec::new(),
                        });
                    }
                    "waveform" if in_repbeats => {
                        current_waveform = Some(String::new());
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::Text(e) => {
                if collecting.is_some() || current_waveform.is_some() {
                    let decoded = e
                        .unescape()
                        .map_err(|e| Error::DecodeError(format!("malformed XML text: {}", e)))?;
                    if let Some(w) = current_waveform.as_mut() {
                        w.push_str(&decoded);
                    } else {
                        text_buf.push_str(&decoded);
                    }
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.pop();

                if let Some(tag) = collecting.as_deref() {
                    if tag == name {
                        match name.as_str() {
                            "documenttype" => {
                                doc.doc_type.get_or_insert_with(|| text_buf.clone());
                            }
                            "documentversion" => {
                                doc.doc_ver.get_or_insert_with(|| text_buf.clone());
                            }
                            "samplingrate" => {
                                doc.sampling_rate.get_or_insert_with(|| text_buf.clone());
                            }
                            "numberchannelsallocated" => {
                                doc.number_channels_allocated
                                    .get_or_insert_with(|| text_buf.clone());
                            }
                            "acquisitiontype" => {
                                doc.acquisition_type
                                    .get_or_insert_with(|| text_buf.clone());
                            }
                            "parsedwaveforms" => {
                                doc.waveform_text.get_or_insert_with(|| text_buf.clone());
                            }
                            _ => {}
                        }
                        collecting = None;
                    }
                }

                match name.as_str() {
                    "waveform" if in_repbeats => {
                        if let (Some(beat), Some(waveform)) =
                            (current_repbeat.as_mut(), current_waveform.take())
                        {
                            beat.waveforms.push(waveform);
                        }
                    }
                    "repbeat" if in_repbeats => {
                        if let Some(beat) = current_repbeat.take() {
                            if let Some(section) = doc.repbeats.as_mut() {
                                section.beats.push(beat);
                            }
                        }
                    }
                    "repbeats" => {
                        in_repbeats = false;
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(doc)
}

/// Fetches a required element's text, or `MissingElement`.
pub fn require_element<'a>(value: &'a Option<String>, tag: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or(Error::MissingElement(tag))
}

/// Fetches a required attribute's value, or `MissingAttribute`.
pub fn require_attribute<'a>(value: &'a Option<String>, attr: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or(Error::MissingAttribute(attr))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0"?>
<restingecgdata>
  <documentinfo>
    <documenttype>SierraECG</documenttype>
    <documentversion>1.03</documentversion>
  </documentinfo>
  <dataacquisition>
    <signalcharacteristics>
      <samplingrate>500</samplingrate>
      <numberchannelsallocated>12</numberchannelsallocated>
      <acquisitiontype>STD-12</acquisitiontype>
    </signalcharacteristics>
  </dataacquisition>
  <parsedwaveforms dataencoding="Base64" durationperchannel="10000" compressmethod="Uncompressed">AQID</parsedwaveforms>
</restingecgdata>"#;

    #[test]
    fn parses_document_metadata() {
        let doc = parse(MINIMAL.as_bytes()).unwrap();
        assert_eq!(doc.doc_type.as_deref(), Some("SierraECG"));
        assert_eq!(doc.doc_ver.as_deref(), Some("1.03"));
        assert_eq!(doc.sampling_rate.as_deref(), Some("500"));
        assert_eq!(doc.number_channels_allocated.as_deref(), Some("12"));
        assert_eq!(doc.acquisition_type.as_deref(), Some("STD-12"));
        assert_eq!(doc.data_encoding.as_deref(), Some("Base64"));
        assert_eq!(doc.duration_per_channel.as_deref(), Some("10000"));
        assert_eq!(doc.compress_method.as_deref(), Some("Uncompressed"));
        assert_eq!(doc.waveform_text.as_deref(), Some("AQID"));
    }

    #[test]
    fn parses_repbeats_in_document_order() {
        let xml = r#"<restingecgdata>
  <repbeats dataencoding="Base64" samplespersec="1000" resolution="2.5" repbeatmethod="Median">
    <repbeat leadname="I"><waveform>AQID</waveform></repbeat>
    <repbeat leadname="II"><waveform>BAUG</waveform></repbeat>
  </repbeats>
</restingecgdata>"#;
        let doc = parse(xml.as_bytes()).unwrap();
        let section = doc.repbeats.unwrap();
        assert_eq!(section.data_encoding.as_deref(), Some("Base64"));
        assert_eq!(section.beats.len(), 2);
        assert_eq!(section.beats[0].lead_name, "I");
        assert_eq!(section.beats[0].waveforms, vec!["AQID".to_string()]);
        assert_eq!(section.beats[1].lead_name, "II");
    }

    #[test]
    fn missing_element_surfaces_as_error() {
        assert!(require_element(&None, "documenttype").is_err());
    }
}
