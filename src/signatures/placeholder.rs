//! Signature placeholder insertion.
//!
//! Adds an unsigned signature field to the document: a signature dictionary
//! whose `/Contents` is a zero-filled hex slot and whose `/ByteRange` holds
//! sentinel tokens, a widget annotation pointing at it, and (for visible
//! signatures) an appearance stream. The document is then fully rewritten so
//! the byte-range resolver can work on plain byte offsets.
//!
//! ## Placeholder layout in the output
//!
//! ```text
//! /ByteRange[0/**********/**********/**********]/Contents<0000...0000>
//! ```
//!
//! The sentinel tokens are written as PDF names so the document stays
//! parseable until the real offsets are known.

use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use lopdf::{dictionary, text_string, Object, ObjectId, Stream, StringFormat};
use regex::bytes::Regex;
use std::ops::Range;

use super::layout::{compute_layout, PageSize, PlaceholderLayout};
use super::types::{
    SignatureOptions, BYTE_RANGE_PLACEHOLDER, MAXIMUM_SIGNATURE_LENGTH, SIGNATURE_FILTER,
    SIGNATURE_SUB_FILTER,
};
use crate::document::SignableDocument;
use crate::error::{Error, Result};

/// Resource name of the appearance font.
const APPEARANCE_FONT_NAME: &str = "Helv";

/// Standard font backing [`APPEARANCE_FONT_NAME`].
const APPEARANCE_BASE_FONT: &str = "Helvetica";

/// Signature flags: SignaturesExist | AppendOnly.
const SIG_FLAGS: i64 = 3;

/// Annotation flag: Print.
const ANNOTATION_FLAG_PRINT: i64 = 4;

lazy_static! {
    /// `/ByteRange [0 /********** /********** /**********]`, whitespace-tolerant
    static ref RE_SENTINEL_BYTE_RANGE: Regex = Regex::new(
        r"(?-u)/ByteRange\s*\[\s*0\s*/\*{10}\s*/\*{10}\s*/\*{10}\s*\]"
    ).unwrap();
}

/// The not-yet-known `/ByteRange` value.
///
/// Owns both sides of the contract: the object placed in the signature
/// dictionary and the byte pattern the resolver uses to find it again in the
/// serialized file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelByteRange;

impl SentinelByteRange {
    /// Array object `[0 /********** /********** /**********]`.
    pub fn object() -> Object {
        let token = || Object::Name(BYTE_RANGE_PLACEHOLDER.as_bytes().to_vec());
        Object::Array(vec![Object::Integer(0), token(), token(), token()])
    }

    /// Byte span of the first `/ByteRange` sentinel in `pdf`, key included.
    pub fn find(pdf: &[u8]) -> Option<Range<usize>> {
        RE_SENTINEL_BYTE_RANGE.find(pdf).map(|m| m.range())
    }
}

/// Insert an unsigned signature placeholder into `unsigned` and serialize.
///
/// `signing_time` is written to `/M`, the appearance text and the field name.
///
/// # Errors
///
/// - [`Error::DocumentParse`] if the input is not a readable PDF
/// - [`Error::InputValidation`] if the document has no pages or the reserved size
///   is zero or above [`MAXIMUM_SIGNATURE_LENGTH`]
/// - [`Error::PlaceholderConstruction`] if the object graph cannot be updated
pub fn insert_placeholder(
    unsigned: &[u8],
    options: &SignatureOptions,
    signing_time: DateTime<Utc>,
) -> Result<Vec<u8>> {
    if options.reserved_signature_size == 0 {
        return Err(Error::InputValidation(
            "Reserved signature size must be greater than zero".to_string(),
        ));
    }
    if options.reserved_signature_size > MAXIMUM_SIGNATURE_LENGTH {
        return Err(Error::InputValidation(format!(
            "Reserved signature size {} exceeds the maximum of {} bytes",
            options.reserved_signature_size, MAXIMUM_SIGNATURE_LENGTH
        )));
    }

    let mut doc = SignableDocument::parse(unsigned)?;

    let pages = doc.pages();
    let sizes: Vec<PageSize> = pages.iter().map(|p| p.size).collect();
    let layout = compute_layout(&sizes, options)?;
    let page_id = pages[layout.page_index].id;

    let appearance_id = if layout.is_visible {
        Some(add_appearance_stream(&mut doc, &layout, options, signing_time)?)
    } else {
        None
    };

    let signature_id = doc.register(signature_dictionary(options, signing_time));

    let rect: Vec<Object> = layout
        .rect
        .to_array()
        .iter()
        .map(|v| Object::Real(*v))
        .collect();
    let mut widget = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Sig",
        "Rect" => rect,
        "V" => signature_id,
        "T" => text_string(&format!("Signature_{}", signing_time.timestamp_millis())),
        "F" => ANNOTATION_FLAG_PRINT,
        "P" => page_id,
    };
    if let Some(appearance_id) = appearance_id {
        widget.set("AP", dictionary! { "N" => appearance_id });
    }
    let widget_id = doc.register(widget);

    let form_id = ensure_acro_form(&mut doc)?;
    doc.append_to_array(form_id, b"Fields", Object::Reference(widget_id))?;
    doc.append_to_array(page_id, b"Annots", Object::Reference(widget_id))?;

    if !layout.is_visible {
        let catalog_id = doc.catalog_id()?;
        doc.dictionary_mut(catalog_id)?
            .set("NeedAppearances", Object::Boolean(true));
    }

    let bytes = doc.serialize()?;
    log::debug!(
        "Inserted signature placeholder on page {} ({} bytes, visible={})",
        layout.page_index + 1,
        bytes.len(),
        layout.is_visible
    );
    Ok(bytes)
}

fn signature_dictionary(options: &SignatureOptions, signing_time: DateTime<Utc>) -> lopdf::Dictionary {
    // ByteRange must precede Contents: the resolver scans forward from the sentinel.
    dictionary! {
        "Type" => "Sig",
        "Filter" => SIGNATURE_FILTER,
        "SubFilter" => SIGNATURE_SUB_FILTER,
        "ByteRange" => SentinelByteRange::object(),
        "Contents" => Object::String(
            vec![0u8; options.reserved_signature_size],
            StringFormat::Hexadecimal,
        ),
        "Name" => text_string(&options.name),
        "Location" => text_string(&options.location),
        "ContactInfo" => text_string(&options.contact),
        "Reason" => text_string(options.reason_or_default()),
        "M" => Object::string_literal(format_pdf_date(signing_time)),
    }
}

/// Find or create the interactive form and mark it as holding signatures.
fn ensure_acro_form(doc: &mut SignableDocument) -> Result<ObjectId> {
    let catalog_id = doc.catalog_id()?;
    let existing = doc.dictionary(catalog_id)?.get(b"AcroForm").ok().cloned();

    let form_id = match existing {
        Some(Object::Reference(id)) if doc.dictionary(id).is_ok() => id,
        Some(Object::Dictionary(form)) => doc.register(form),
        _ => doc.register(dictionary! {
            "SigFlags" => SIG_FLAGS,
            "Fields" => Vec::<Object>::new(),
        }),
    };
    doc.dictionary_mut(catalog_id)?
        .set("AcroForm", Object::Reference(form_id));

    let form = doc.dictionary_mut(form_id)?;
    if !form.has(b"Fields") {
        form.set("Fields", Vec::<Object>::new());
    }
    form.set("SigFlags", SIG_FLAGS);
    Ok(form_id)
}

fn add_appearance_stream(
    doc: &mut SignableDocument,
    layout: &PlaceholderLayout,
    options: &SignatureOptions,
    signing_time: DateTime<Utc>,
) -> Result<ObjectId> {
    let font_id = doc.embed_standard_font(APPEARANCE_BASE_FONT)?;

    let content = appearance_content(layout, &appearance_lines(options, signing_time));
    let bbox: Vec<Object> = layout
        .rect
        .to_array()
        .iter()
        .map(|v| Object::Real(*v))
        .collect();
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => bbox,
            "Resources" => dictionary! {
                "Font" => dictionary! { APPEARANCE_FONT_NAME => font_id },
            },
        },
        content.into_bytes(),
    );
    Ok(doc.register(stream))
}

/// Text shown in a visible signature, top line first.
pub fn appearance_lines(options: &SignatureOptions, signing_time: DateTime<Utc>) -> [String; 4] {
    [
        format!("Digitally signed by {}", options.name),
        format!("Date: {}", signing_time.to_rfc3339_opts(SecondsFormat::Millis, true)),
        format!("Reason: {}", options.reason_or_default()),
        format!("Location: {}", options.location),
    ]
}

/// Content stream drawing `lines` from the layout's text anchor downwards.
pub fn appearance_content(layout: &PlaceholderLayout, lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let origin = layout.line_origin(idx);
            format!(
                "BT /{} {} Tf 0 0 0 rg {} {} Td ({}) Tj ET",
                APPEARANCE_FONT_NAME,
                layout.font_size,
                origin.x,
                origin.y,
                escape_pdf_string(line)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape text for a literal string drawn with a simple-encoded font.
///
/// Characters outside printable ASCII have no glyph in the standard
/// encoding and are replaced with `?`.
fn escape_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 10);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_ascii() && !c.is_ascii_control() => result.push(c),
            _ => result.push('?'),
        }
    }
    result
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn format_pdf_date(time: DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%SZ").to_string()
}
