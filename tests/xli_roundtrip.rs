//! End-to-end tests that build a synthetic Sierra ECG XML document — base64 waveform
//! payload, XLI chunk framing, and all — and check `sierraecg::read_bytes` recovers the
//! samples the fixture was built to produce.
//!
//! No binary XML fixtures ship in this pack (see DESIGN.md), so these tests play the
//! role of an encoder: pack a handful of known samples into the exact wire format
//! `xli.rs` expects, then decode them back through the public API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Packs `bits`-wide codes MSB-first into bytes, matching the bit-stream reader's
/// left-justified register convention.
fn pack_codes(codes: &[u16], bits: u32) -> Vec<u8> {
    let mut bit_buffer: u32 = 0;
    let mut bit_count: u32 = 0;
    let mut bytes = Vec::new();
    for &code in codes {
        bit_buffer |= (code as u32 & ((1 << bits) - 1)) << (32 - bit_count - bits);
        bit_count += bits;
        while bit_count >= 8 {
            bytes.push((bit_buffer >> 24) as u8);
            bit_buffer <<= 8;
            bit_count -= 8;
        }
    }
    if bit_count > 0 {
        bytes.push((bit_buffer >> 24) as u8);
    }
    bytes
}

/// Builds one XLI chunk (header + LZW body) that decodes to exactly `values`, using
/// literal byte codes only (every byte 0..=255 is already in the LZW dictionary's
/// initial 256 entries, so no dictionary back-references are needed to round-trip).
fn encode_chunk(values: &[i16], start: i16) -> Vec<u8> {
    let m = values.len();
    let mut buf = vec![0u8; m * 2];
    for (i, &v) in values.iter().enumerate() {
        let bytes = (v as u16).to_be_bytes();
        buf[i] = bytes[0];
        buf[m + i] = bytes[1];
    }

    let mut codes: Vec<u16> = buf.iter().map(|&b| b as u16).collect();
    // `decode_chunks` drains the LZW stream with a full `collect()`, so trailing
    // padding bytes would be decoded as spurious extra literal-byte codes rather
    // than silently discarded. Two copies of the out-of-range sentinel code (1023,
    // one past `max_code` = 1022) terminate the stream cleanly right after the
    // intended bytes and, as a side effect, give the refill loop the lookahead it
    // needs to read the last real code at all (it always tries one more byte before
    // trusting a register occupancy of up to 24 bits — see bitstream.rs).
    codes.push(1023);
    codes.push(1023);
    let body = pack_codes(&codes, 10);

    let mut chunk = Vec::with_capacity(8 + body.len());
    chunk.extend_from_slice(&(body.len() as i32).to_le_bytes());
    chunk.extend_from_slice(&[0, 0]); // reserved
    chunk.extend_from_slice(&start.to_le_bytes());
    chunk.extend_from_slice(&body);
    chunk
}

fn xml_document(
    acquisition_type: &str,
    lead_labels: &str,
    number_of_leads: usize,
    sampling_freq: u32,
    duration: u32,
    payload: &[u8],
) -> String {
    format!(
        r#"<?xml version="1.0"?>
<restingecgdata>
  <documentinfo>
    <documenttype>SierraECG</documenttype>
    <documentversion>1.04</documentversion>
  </documentinfo>
  <dataacquisition>
    <signalcharacteristics>
      <samplingrate>{sampling_freq}</samplingrate>
      <numberchannelsallocated>{number_of_leads}</numberchannelsallocated>
      <acquisitiontype>{acquisition_type}</acquisitiontype>
    </signalcharacteristics>
  </dataacquisition>
  <parsedwaveforms dataencoding="Base64" durationperchannel="{duration}" compressmethod="XLI" leadlabels="{lead_labels}" numberofleads="{number_of_leads}">{b64}</parsedwaveforms>
</restingecgdata>"#,
        sampling_freq = sampling_freq,
        number_of_leads = number_of_leads,
        acquisition_type = acquisition_type,
        duration = duration,
        lead_labels = lead_labels,
        b64 = STANDARD.encode(payload),
    )
}

#[test]
fn decodes_single_lead_with_second_order_prediction() {
    // Raw stored deltas: first two pass through unchanged, the rest run through the
    // second-order predictor. Expected output computed by hand from spec.md §4.3's
    // recurrence: z = 2y - x - last; last = raw[i] - 64.
    let raw = vec![10i16, -5, 70, -20, 130, 3];
    let expected = vec![10i16, -5, -20, -41, 22, 19];

    let chunk = encode_chunk(&raw, 0);
    let xml = xml_document("OTHER", "LeadX", 1, 1000, 6, &chunk);

    let file = sierraecg::read_bytes(xml.as_bytes(), false).unwrap();
    assert_eq!(file.leads.len(), 1);
    assert_eq!(file.leads[0].label, "LeadX");
    assert_eq!(file.leads[0].samples, expected);
}

#[test]
fn synthesizes_derived_limb_leads_for_standard_twelve() {
    // M=2 keeps the predictor loop a no-op (it only runs for i in 2..M), so each
    // chunk's decoded values are exactly its raw packed values.
    let i_lead = vec![100i16, 50];
    let ii_lead = vec![200i16, 80];
    let iii_residual = vec![10i16, 5];
    let avr_residual = vec![5i16, 2];
    let avl_residual = vec![3i16, 1];
    let avf_residual = vec![2i16, 1];

    let mut payload = Vec::new();
    for lead in [
        &i_lead,
        &ii_lead,
        &iii_residual,
        &avr_residual,
        &avl_residual,
        &avf_residual,
    ] {
        payload.extend(encode_chunk(lead, 0));
    }

    let xml = xml_document("STD-12", "I II III aVR aVL aVF", 6, 1000, 2, &payload);
    let file = sierraecg::read_bytes(xml.as_bytes(), false).unwrap();

    assert_eq!(file.leads.len(), 6);
    assert_eq!(file.leads[0].samples, i_lead);
    assert_eq!(file.leads[1].samples, ii_lead);
    assert_eq!(file.leads[2].samples, vec![90, 25]); // II - I - residual
    assert_eq!(file.leads[3].samples, vec![-155, -67]); // -residual - floor((I+II)/2)
    assert_eq!(file.leads[4].samples, vec![2, 11]); // floor((I-III)/2) - residual
    assert_eq!(file.leads[5].samples, vec![143, 51]); // floor((II+III)/2) - residual
}

#[test]
fn unsupported_compression_method_is_rejected() {
    let chunk = encode_chunk(&[1, 2], 0);
    let mut xml = xml_document("OTHER", "LeadX", 1, 1000, 2, &chunk);
    xml = xml.replace("compressmethod=\"XLI\"", "compressmethod=\"LOL\"");

    let err = sierraecg::read_bytes(xml.as_bytes(), false).unwrap_err();
    assert!(matches!(err, sierraecg::Error::UnsupportedFile(_)));
}
