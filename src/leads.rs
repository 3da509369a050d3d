//! Lead-set assembly: turning the raw stored channels into the full 12-lead set.
//!
//! For an `"Uncompressed"` payload the channels are a flat little-endian `i16` array,
//! split evenly. For `"XLI"` the stored chunks are I, II, a residual-coded III, a
//! residual-coded aVR/aVL/aVF, and V1..V6 (in that order); the residual-coded limb
//! leads are turned into their real values here via the Einthoven/Goldberger
//! identities.

use crate::error::{Error, Result};
use crate::xli::{self, Limits};

/// Splits a flat little-endian `i16` buffer into `lead_count` lanes of `samples` each.
pub fn split_uncompressed(data: &[u8], lead_count: usize, samples: usize) -> Result<Vec<Vec<i16>>> {
    let needed = lead_count
        .checked_mul(samples)
        .and_then(|n| n.checked_mul(2))
        .ok_or_else(|| Error::DecodeError("uncompressed lead size overflowed".into()))?;
    if data.len() < needed {
        return Err(Error::DecodeError(format!(
            "uncompressed waveform payload too short: need {} bytes, have {}",
            needed,
            data.len()
        )));
    }

    let mut leads = Vec::with_capacity(lead_count);
    for lead in 0..lead_count {
        let mut samples_out = Vec::with_capacity(samples);
        for i in 0..samples {
            let offset = (lead * samples + i) * 2;
            samples_out.push(i16::from_le_bytes([data[offset], data[offset + 1]]));
        }
        leads.push(samples_out);
    }
    Ok(leads)
}

/// Decodes an XLI payload into raw per-chunk channels, without derived-lead synthesis.
pub fn decode_xli(data: &[u8], limits: &Limits) -> Result<Vec<Vec<i16>>> {
    xli::decode_chunks(data, limits)
}

/// Synthesizes the derived limb leads (III, aVR, aVL, aVF) from the stored channels
/// and their residuals, in place.
///
/// `leads` must be ordered `I, II, III, aVR, aVL, aVF, ...` (the standard-12 / 10-wire
/// acquisition order); leads beyond index 5 (the precordial leads) are untouched.
/// Synthesis is skipped for any other acquisition layout, matching the spec's "only for
/// standard-12 / 10-wire acquisitions" scope.
///
/// III must be updated before aVL and aVF, since both consume the *updated* III.
pub fn synthesize_derived_leads(leads: &mut [Vec<i16>]) {
    if leads.len() < 6 {
        return;
    }

    let len = leads[0..6].iter().map(Vec::len).min().unwrap_or(0);
    for i in 0..len {
        let l1 = leads[0][i];
        let l2 = leads[1][i];

        // III[i] <- II[i] - I[i] - III[i]
        let l3 = wrapping_sub16(wrapping_sub16(l2, l1), leads[2][i]);
        leads[2][i] = l3;

        // aVR[i] <- -aVR[i] - floor((I[i] + II[i]) / 2)
        let avr = leads[3][i];
        leads[3][i] = wrapping_sub16(wrapping_neg16(avr), floor_div2(wrapping_add16(l1, l2)));

        // aVL[i] <- floor((I[i] - III[i]) / 2) - aVL[i]
        let avl = leads[4][i];
        leads[4][i] = wrapping_sub16(floor_div2(wrapping_sub16(l1, l3)), avl);

        // aVF[i] <- floor((II[i] + III[i]) / 2) - aVF[i]
        let avf = leads[5][i];
        leads[5][i] = wrapping_sub16(floor_div2(wrapping_add16(l2, l3)), avf);
    }
}

fn wrapping_add16(a: i16, b: i16) -> i16 {
    a.wrapping_add(b)
}

fn wrapping_sub16(a: i16, b: i16) -> i16 {
    a.wrapping_sub(b)
}

fn wrapping_neg16(a: i16) -> i16 {
    a.wrapping_neg()
}

/// Integer division of a 16-bit value by 2, rounding toward negative infinity (true
/// floor, not truncation toward zero). `div_euclid` with a positive divisor is exactly
/// floor division, unlike `/` which truncates toward zero.
fn floor_div2(a: i16) -> i16 {
    a.div_euclid(2)
}
