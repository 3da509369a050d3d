#![no_main]
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use libfuzzer_sys::fuzz_target;

// Wraps arbitrary bytes as the waveform payload of an otherwise well-formed document,
// so mutation effort lands on the XLI chunk framer and LZW decoder instead of being
// spent on malformed XML.
fuzz_target!(|data: &[u8]| {
    let xml = format!(
        r#"<?xml version="1.0"?>
<restingecgdata>
  <documentinfo>
    <documenttype>SierraECG</documenttype>
    <documentversion>1.03</documentversion>
  </documentinfo>
  <dataacquisition>
    <signalcharacteristics>
      <samplingrate>500</samplingrate>
      <numberchannelsallocated>1</numberchannelsallocated>
      <acquisitiontype>OTHER</acquisitiontype>
    </signalcharacteristics>
  </dataacquisition>
  <parsedwaveforms dataencoding="Base64" durationperchannel="1000" compressmethod="XLI" leadlabels="LeadX" numberofleads="1">{}</parsedwaveforms>
</restingecgdata>"#,
        STANDARD.encode(data)
    );
    let _ = sierraecg::read_bytes(xml.as_bytes(), false);
});
