//! ByteRange calculation for PDF signatures.
//!
//! PDF digital signatures use a ByteRange array to specify which portions
//! of the document are covered by the signature. The signature itself is
//! stored in a placeholder that is excluded from the signed bytes.
//!
//! ## ByteRange Format
//!
//! The ByteRange is an array of four integers:
//! `[offset1, length1, offset2, length2]`
//!
//! Where:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset where the signature value begins
//! - `offset2` = byte offset where the signature value ends
//! - `length2` = remaining bytes to end of file
//!
//! The signature value is a hex-encoded string within `<` and `>` delimiters.
//!
//! ## Resolution
//!
//! A freshly serialized placeholder carries sentinel tokens instead of the
//! four numbers. [`resolve_byte_range`] finds them, computes the real range
//! around the `/Contents` slot and overwrites the sentinel in place, padding
//! with spaces so no other byte moves.

use super::placeholder::SentinelByteRange;
use crate::error::{Error, Result};

/// A placeholder whose `/ByteRange` has been written.
#[derive(Debug, Clone)]
pub struct ResolvedPlaceholder {
    /// The full file, sentinel replaced, signature slot still zero-filled
    pub pdf: Vec<u8>,
    /// `[0, slot_start, slot_end, remaining]`
    pub byte_range: [usize; 4],
    /// Hex digits available between `<` and `>`
    pub placeholder_length: usize,
    /// The bytes the signature must cover (file without the slot)
    pub signable: Vec<u8>,
}

/// Calculator for PDF signature byte ranges.
#[derive(Debug)]
pub struct ByteRangeCalculator {
    /// Size of the placeholder for the signature value (hex digits + 2 for angle brackets)
    placeholder_size: usize,
}

impl ByteRangeCalculator {
    /// Create a ByteRange calculator with a specific placeholder size.
    pub fn with_placeholder_size(placeholder_size: usize) -> Self {
        Self { placeholder_size }
    }

    /// Hex digits between the angle brackets.
    pub fn placeholder_length(&self) -> usize {
        self.placeholder_size.saturating_sub(2)
    }

    /// Calculate the ByteRange array given the position of the /Contents value.
    ///
    /// # Arguments
    ///
    /// * `file_size` - Total size of the PDF file
    /// * `contents_offset` - Byte offset where the /Contents value starts (including '<')
    ///
    /// # Returns
    ///
    /// An array `[0, before_sig, after_sig_start, after_sig_len]`
    pub fn calculate_byte_range(&self, file_size: usize, contents_offset: usize) -> [usize; 4] {
        let after_sig_start = contents_offset + self.placeholder_size;
        let after_sig_len = file_size.saturating_sub(after_sig_start);

        [0, contents_offset, after_sig_start, after_sig_len]
    }

    /// Format a ByteRange array as a `/ByteRange` entry.
    pub fn format_byte_range(byte_range: &[usize; 4]) -> String {
        format!(
            "/ByteRange [{} {} {} {}]",
            byte_range[0], byte_range[1], byte_range[2], byte_range[3]
        )
    }

    /// Extract the bytes to be signed from a PDF file.
    ///
    /// This returns the concatenation of the two ranges specified by ByteRange.
    pub fn extract_signed_bytes(pdf_data: &[u8], byte_range: &[usize; 4]) -> Result<Vec<u8>> {
        let [offset1, length1, offset2, length2] = *byte_range;

        if offset1 + length1 > pdf_data.len() {
            return Err(Error::ByteRangeResolution(format!(
                "ByteRange first range exceeds file size: {} + {} > {}",
                offset1,
                length1,
                pdf_data.len()
            )));
        }
        if offset2 + length2 > pdf_data.len() {
            return Err(Error::ByteRangeResolution(format!(
                "ByteRange second range exceeds file size: {} + {} > {}",
                offset2,
                length2,
                pdf_data.len()
            )));
        }

        let mut signed_bytes = Vec::with_capacity(length1 + length2);
        signed_bytes.extend_from_slice(&pdf_data[offset1..offset1 + length1]);
        signed_bytes.extend_from_slice(&pdf_data[offset2..offset2 + length2]);

        Ok(signed_bytes)
    }

    /// Check if a ByteRange covers the entire document except the signature.
    ///
    /// A valid ByteRange should:
    /// - Start at offset 0
    /// - End at the file size
    /// - Have no gaps except for the signature placeholder
    pub fn validate_byte_range(byte_range: &[usize; 4], file_size: usize) -> Result<()> {
        let [offset1, length1, offset2, length2] = *byte_range;

        if offset1 != 0 {
            return Err(Error::ByteRangeResolution(format!(
                "ByteRange must start at 0, got {}",
                offset1
            )));
        }

        let actual_end = offset2 + length2;
        if actual_end != file_size {
            return Err(Error::ByteRangeResolution(format!(
                "ByteRange must end at file size {}, got {}",
                file_size, actual_end
            )));
        }

        if length1 > offset2 {
            return Err(Error::ByteRangeResolution(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                length1, offset2
            )));
        }

        Ok(())
    }

    /// Find the /Contents value position after `search_start`.
    ///
    /// This searches for the pattern `/Contents <` and returns the offset
    /// of the opening angle bracket.
    pub fn find_contents_offset(pdf_data: &[u8], search_start: usize) -> Option<usize> {
        let contents_pattern = b"/Contents";
        let window = pdf_data.get(search_start..)?;

        let mut pos = 0;
        while pos + contents_pattern.len() < window.len() {
            let found = window[pos..]
                .windows(contents_pattern.len())
                .position(|w| w == contents_pattern)?;
            let after_contents = pos + found + contents_pattern.len();
            for (i, &byte) in window.iter().enumerate().skip(after_contents) {
                if byte == b'<' {
                    return Some(search_start + i);
                }
                if !matches!(byte, b' ' | b'\t' | b'\n' | b'\r') {
                    break;
                }
            }
            pos = after_contents;
        }

        None
    }

    /// Replace the placeholder in the PDF with the actual signature.
    ///
    /// The DER bytes are hex-encoded and right-padded with `00` pairs so the
    /// slot keeps its exact length.
    ///
    /// # Errors
    ///
    /// [`Error::Capacity`] when the hex signature is longer than the slot.
    pub fn insert_signature(
        &self,
        pdf_data: &mut [u8],
        contents_offset: usize,
        signature: &[u8],
    ) -> Result<()> {
        let available = self.placeholder_length();
        let required = signature.len() * 2;
        if required > available {
            return Err(Error::Capacity {
                required,
                available,
            });
        }

        if contents_offset + self.placeholder_size > pdf_data.len() {
            return Err(Error::ByteRangeResolution(
                "Signature insertion would exceed file bounds".to_string(),
            ));
        }

        let mut sig_value = String::with_capacity(self.placeholder_size);
        sig_value.push('<');
        sig_value.push_str(&bytes_to_hex(signature));
        // Pad with NUL bytes to fill the placeholder
        for _ in 0..(available - required) / 2 {
            sig_value.push_str("00");
        }
        if (available - required) % 2 == 1 {
            sig_value.push('0');
        }
        sig_value.push('>');

        pdf_data[contents_offset..contents_offset + self.placeholder_size]
            .copy_from_slice(sig_value.as_bytes());

        Ok(())
    }
}

/// Strip trailing line breaks after the final `%%EOF` marker.
///
/// # Errors
///
/// [`Error::ByteRangeResolution`] if the file does not end with `%%EOF`.
pub fn remove_trailing_newline(mut pdf: Vec<u8>) -> Result<Vec<u8>> {
    while matches!(pdf.last(), Some(b'\n' | b'\r')) {
        pdf.pop();
    }
    if !pdf.ends_with(b"%%EOF") {
        return Err(Error::ByteRangeResolution(
            "A PDF file must end with an EOF line".to_string(),
        ));
    }
    Ok(pdf)
}

/// Replace the sentinel `/ByteRange` with real offsets and cut out the signable bytes.
///
/// # Errors
///
/// [`Error::ByteRangeResolution`] if the file still ends with a newline, the
/// sentinel or the `/Contents` slot cannot be found, or the resolved range
/// does not fit in the sentinel's span.
pub fn resolve_byte_range(mut pdf: Vec<u8>) -> Result<ResolvedPlaceholder> {
    if matches!(pdf.last(), Some(b'\n' | b'\r')) {
        return Err(Error::ByteRangeResolution(
            "Trailing newline must be removed before resolving the byte range".to_string(),
        ));
    }

    let sentinel = SentinelByteRange::find(&pdf).ok_or_else(|| {
        Error::ByteRangeResolution("Could not find empty ByteRange placeholder".to_string())
    })?;

    let slot_start = ByteRangeCalculator::find_contents_offset(&pdf, sentinel.end)
        .ok_or_else(|| {
            Error::ByteRangeResolution("Could not find /Contents after the ByteRange".to_string())
        })?;
    let slot_end = pdf[slot_start..]
        .iter()
        .position(|&b| b == b'>')
        .map(|i| slot_start + i + 1)
        .ok_or_else(|| {
            Error::ByteRangeResolution("Unterminated /Contents placeholder".to_string())
        })?;

    let calculator = ByteRangeCalculator::with_placeholder_size(slot_end - slot_start);
    let byte_range = calculator.calculate_byte_range(pdf.len(), slot_start);

    let mut replacement = ByteRangeCalculator::format_byte_range(&byte_range);
    let sentinel_len = sentinel.end - sentinel.start;
    if replacement.len() > sentinel_len {
        return Err(Error::ByteRangeResolution(format!(
            "Resolved ByteRange ({} bytes) does not fit the placeholder ({} bytes)",
            replacement.len(),
            sentinel_len
        )));
    }
    replacement.push_str(&" ".repeat(sentinel_len - replacement.len()));
    pdf[sentinel].copy_from_slice(replacement.as_bytes());

    let signable = ByteRangeCalculator::extract_signed_bytes(&pdf, &byte_range)?;

    log::debug!("Resolved ByteRange {:?}", byte_range);

    Ok(ResolvedPlaceholder {
        pdf,
        byte_range,
        placeholder_length: calculator.placeholder_length(),
        signable,
    })
}

/// Write a DER signature into the resolved placeholder's slot.
///
/// # Errors
///
/// [`Error::Capacity`] when the signature does not fit.
pub fn place_signature(resolved: ResolvedPlaceholder, signature: &[u8]) -> Result<Vec<u8>> {
    let ResolvedPlaceholder {
        mut pdf,
        byte_range,
        placeholder_length,
        ..
    } = resolved;
    let calculator = ByteRangeCalculator::with_placeholder_size(placeholder_length + 2);
    calculator.insert_signature(&mut pdf, byte_range[1], signature)?;
    Ok(pdf)
}

/// Convert bytes to uppercase hex string.
fn bytes_to_hex(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8] = b"0123456789ABCDEF";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
    }
    hex
}
