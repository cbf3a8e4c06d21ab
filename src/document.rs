//! Object-model access for the signing pipeline.
//!
//! [`SignableDocument`] wraps an [`lopdf::Document`] and exposes the handful
//! of operations placeholder insertion needs: page geometry, registering new
//! objects, catalog access, array appends and a full rewrite with object
//! streams disabled so every object sits at a plain byte offset.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, SaveOptions};

use crate::error::{Error, Result};
use crate::signatures::PageSize;

/// Names of the 14 standard Type 1 fonts every viewer provides.
pub const STANDARD_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

/// Media box assumed for pages that inherit none.
const FALLBACK_PAGE_SIZE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// A page object and its dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRef {
    /// Indirect reference of the page dictionary
    pub id: ObjectId,
    /// Media box size
    pub size: PageSize,
}

/// A parsed document being prepared for signing.
#[derive(Debug)]
pub struct SignableDocument {
    doc: Document,
}

impl SignableDocument {
    /// Parse a document from memory.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| Error::DocumentParse(e.to_string()))?;
        doc.catalog()
            .map_err(|e| Error::DocumentParse(format!("missing catalog: {}", e)))?;
        Ok(Self { doc })
    }

    /// Pages in document order with their media box sizes.
    pub fn pages(&self) -> Vec<PageRef> {
        self.doc
            .get_pages()
            .into_values()
            .map(|id| PageRef {
                id,
                size: self.page_size(id),
            })
            .collect()
    }

    /// Walk up the page tree until a `/MediaBox` is found.
    fn page_size(&self, page_id: ObjectId) -> PageSize {
        let mut current = Some(page_id);
        let mut depth = 0;
        while let Some(id) = current {
            let Ok(dict) = self.doc.get_dictionary(id) else {
                break;
            };
            if let Some(size) = self.media_box(dict) {
                return size;
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
            if depth > 64 {
                break;
            }
        }
        log::warn!("No MediaBox for page {:?}, assuming US Letter", page_id);
        FALLBACK_PAGE_SIZE
    }

    fn media_box(&self, dict: &Dictionary) -> Option<PageSize> {
        let raw = dict.get(b"MediaBox").ok()?;
        let resolved = match raw {
            Object::Reference(id) => self.doc.get_object(*id).ok()?,
            other => other,
        };
        let values = resolved
            .as_array()
            .ok()?
            .iter()
            .map(|obj| self.number(obj))
            .collect::<Option<Vec<f32>>>()?;
        match values.as_slice() {
            [llx, lly, urx, ury] => Some(PageSize::new((urx - llx).abs(), (ury - lly).abs())),
            _ => None,
        }
    }

    fn number(&self, obj: &Object) -> Option<f32> {
        match obj {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(f) => Some(*f),
            Object::Reference(id) => self.doc.get_object(*id).ok().and_then(|o| self.number(o)),
            _ => None,
        }
    }

    /// Add a font dictionary for one of the standard 14 fonts.
    pub fn embed_standard_font(&mut self, base_font: &str) -> Result<ObjectId> {
        if !STANDARD_FONTS.contains(&base_font) {
            return Err(Error::PlaceholderConstruction(format!(
                "Failed to embed font {}: not a standard font",
                base_font
            )));
        }
        Ok(self.register(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
        }))
    }

    /// Add an object to the document and return its reference.
    pub fn register<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Reference of the document catalog.
    pub fn catalog_id(&self) -> Result<ObjectId> {
        Ok(self.doc.trailer.get(b"Root").and_then(Object::as_reference)?)
    }

    /// Look up a dictionary by reference.
    pub fn dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        Ok(self.doc.get_dictionary(id)?)
    }

    /// Look up a dictionary by reference for modification.
    pub fn dictionary_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        Ok(self.doc.get_dictionary_mut(id)?)
    }

    /// Append `value` to the array under `key` in dictionary `owner`.
    ///
    /// The array may be stored inline or behind a reference; a missing or
    /// non-array entry is replaced by a new one-element array.
    pub fn append_to_array(&mut self, owner: ObjectId, key: &[u8], value: Object) -> Result<()> {
        let entry = self.dictionary(owner)?.get(key).ok().cloned();
        match entry {
            Some(Object::Reference(id))
                if self.doc.get_object(id).and_then(Object::as_array).is_ok() =>
            {
                self.doc.get_object_mut(id)?.as_array_mut()?.push(value);
            },
            Some(Object::Array(_)) => {
                self.dictionary_mut(owner)?
                    .get_mut(key)?
                    .as_array_mut()?
                    .push(value);
            },
            _ => {
                self.dictionary_mut(owner)?.set(key, vec![value]);
            },
        }
        Ok(())
    }

    /// Write the whole document with object streams disabled.
    pub fn serialize(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let options = SaveOptions::builder().use_object_streams(false).build();
        self.doc.save_with_options(&mut out, options)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    fn two_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let first = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 842.into(), 595.into()] as Vec<Object>,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![first.into(), second.into()] as Vec<Object>,
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()] as Vec<Object>,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = SignableDocument::parse(b"not a pdf at all");
        assert!(matches!(result, Err(Error::DocumentParse(_))));
    }

    #[test]
    fn test_pages_inherit_media_box() {
        let doc = SignableDocument::parse(&two_page_pdf()).unwrap();
        let pages = doc.pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].size, PageSize::new(612.0, 792.0));
        assert_eq!(pages[1].size, PageSize::new(842.0, 595.0));
    }

    #[test]
    fn test_embed_standard_font() {
        let mut doc = SignableDocument::parse(&two_page_pdf()).unwrap();
        let font_id = doc.embed_standard_font("Helvetica").unwrap();
        let font = doc.dictionary(font_id).unwrap();
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");

        let result = doc.embed_standard_font("Comic Sans");
        assert!(matches!(result, Err(Error::PlaceholderConstruction(_))));
    }

    #[test]
    fn test_append_to_array_creates_and_extends() {
        let mut doc = SignableDocument::parse(&two_page_pdf()).unwrap();
        let page = doc.pages()[0].id;
        doc.append_to_array(page, b"Annots", Object::Integer(1)).unwrap();
        doc.append_to_array(page, b"Annots", Object::Integer(2)).unwrap();
        let annots = doc.dictionary(page).unwrap().get(b"Annots").unwrap();
        assert_eq!(annots.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_append_to_indirect_array() {
        let mut doc = SignableDocument::parse(&two_page_pdf()).unwrap();
        let page = doc.pages()[0].id;
        let array_id = doc.register(vec![Object::Integer(7)]);
        doc.dictionary_mut(page).unwrap().set("Annots", array_id);
        doc.append_to_array(page, b"Annots", Object::Integer(8)).unwrap();

        let serialized = doc.serialize().unwrap();
        let reparsed = Document::load_mem(&serialized).unwrap();
        let array = reparsed.get_object(array_id).unwrap().as_array().unwrap();
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn test_serialize_round_trip() {
        let doc = SignableDocument::parse(&two_page_pdf()).unwrap();
        let bytes = doc.serialize().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(SignableDocument::parse(&bytes).is_ok());
    }
}
