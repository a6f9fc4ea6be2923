//! PDF title lookup via the trailer's `/Info` dictionary
//!
//! Files that `lopdf` refuses to load (a stale `startxref`, a damaged xref
//! table) are scanned as raw bytes instead: the last `/Info n g R` reference
//! names the information object, whose literal or hex `/Title` is decoded.
//! Indirect or encrypted titles are not recovered by the scan.

use lazy_static::lazy_static;
use log::debug;
use lopdf::{Document, Object};
use regex::bytes::Regex;

lazy_static! {
    static ref INFO_REF: Regex = Regex::new(r"/Info\s*(\d+)\s+(\d+)\s+R").unwrap();
    static ref TITLE_KEY: Regex = Regex::new(r"/Title\s*").unwrap();
}

/// `/Title` from the document information dictionary
pub fn extract_title(content: &[u8]) -> Option<String> {
    match Document::load_mem(content) {
        Ok(doc) => document_title(&doc),
        Err(e) => {
            debug!("PDF did not load ({}); scanning for /Info", e);
            scan_info_title(content)
        }
    }
}

fn document_title(doc: &Document) -> Option<String> {
    let info = resolve(doc, doc.trailer.get(b"Info").ok()?)?;
    let title = resolve(doc, info.as_dict().ok()?.get(b"Title").ok()?)?;

    match title {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Title from the raw bytes of a PDF that could not be parsed
fn scan_info_title(content: &[u8]) -> Option<String> {
    // Incremental updates append trailers, so the last reference wins
    let caps = INFO_REF.captures_iter(content).last()?;
    let number = std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?;
    let generation = std::str::from_utf8(caps.get(2)?.as_bytes()).ok()?;

    let header = Regex::new(&format!(r"(?:^|[^0-9]){}\s+{}\s+obj", number, generation)).ok()?;
    let start = header.find_iter(content).last()?.end();
    let body = &content[start..];
    let body = match find(body, b"endobj") {
        Some(end) => &body[..end],
        None => body,
    };

    let value = &body[TITLE_KEY.find(body)?.end()..];
    let raw = match value.first()? {
        b'(' => literal_string(&value[1..])?,
        b'<' => hex_string(&value[1..])?,
        _ => return None,
    };
    Some(decode_text_string(&raw))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Bytes of a literal string, starting just after its opening `(`
fn literal_string(input: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        i += 1;
        match b {
            b'(' => {
                depth += 1;
                out.push(b);
            }
            b')' if depth == 0 => return Some(out),
            b')' => {
                depth -= 1;
                out.push(b);
            }
            b'\\' => {
                let next = *input.get(i)?;
                i += 1;
                match next {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'0'..=b'7' => {
                        let mut value = u32::from(next - b'0');
                        for _ in 0..2 {
                            match input.get(i) {
                                Some(d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xFF) as u8);
                    }
                    // Line continuation
                    b'\r' => {
                        if input.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'\n' => {}
                    other => out.push(other),
                }
            }
            _ => out.push(b),
        }
    }

    None
}

/// Bytes of a hex string, starting just after its opening `<`
fn hex_string(input: &[u8]) -> Option<Vec<u8>> {
    let end = input.iter().position(|&b| b == b'>')?;
    let mut digits: Vec<u8> = input[..end]
        .iter()
        .copied()
        .filter(u8::is_ascii_hexdigit)
        .collect();
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    hex::decode(digits).ok()
}

/// Decode a PDF text string
///
/// UTF-16BE when it starts with a byte order mark, otherwise UTF-8, falling
/// back to treating each byte as one Latin-1 character.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    fn build_pdf(title: Option<Object>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = title {
            let info_id = doc.add_object(dictionary! { "Title" => title });
            doc.trailer.set("Info", info_id);
        }

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_literal_title() {
        let pdf = build_pdf(Some(Object::string_literal("  A PDF Title ")));
        assert_eq!(extract_title(&pdf).as_deref(), Some("  A PDF Title "));
    }

    #[test]
    fn test_utf16_title() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "책 제목".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let pdf = build_pdf(Some(Object::String(bytes, StringFormat::Hexadecimal)));
        assert_eq!(extract_title(&pdf).as_deref(), Some("책 제목"));
    }

    #[test]
    fn test_no_info_dictionary() {
        let pdf = build_pdf(None);
        assert_eq!(extract_title(&pdf), None);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_text_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
        assert_eq!(decode_text_string("plain".as_bytes()), "plain");
    }

    #[test]
    fn test_stale_startxref_falls_back_to_scan() {
        let pdf = build_pdf(Some(Object::string_literal("Shifted Title")));
        let at = pdf.windows(9).rposition(|w| w == b"startxref").unwrap();
        let tail = String::from_utf8_lossy(&pdf[at + 9..]).into_owned();
        let offset: usize = tail.split_whitespace().next().unwrap().parse().unwrap();

        let mut broken = pdf[..at].to_vec();
        broken.extend_from_slice(format!("startxref\n{}\n%%EOF\n", offset + 5).as_bytes());
        assert_eq!(extract_title(&broken).as_deref(), Some("Shifted Title"));
    }

    #[test]
    fn test_scan_uses_info_object_not_outline() {
        let pdf = b"%PDF-1.4\n\
3 0 obj\n<< /Title (Chapter One) /Parent 2 0 R >>\nendobj\n\
13 0 obj\n<< /Producer (x) >>\nendobj\n\
7 0 obj\n<< /Author (A) /Title (Real \\(Book\\) \\101) >>\nendobj\n\
trailer\n<< /Root 1 0 R /Info 7 0 R >>\nstartxref\n999999\n%%EOF\n";
        assert_eq!(scan_info_title(pdf).as_deref(), Some("Real (Book) A"));
    }

    #[test]
    fn test_scan_hex_title() {
        let pdf = b"%PDF-1.4\n4 0 obj\n<</Title <FEFF 00 41 00 42>>>\nendobj\n\
trailer\n<</Info 4 0 R>>\n%%EOF";
        assert_eq!(scan_info_title(pdf).as_deref(), Some("AB"));
    }

    #[test]
    fn test_literal_string_nesting() {
        assert_eq!(literal_string(b"a(b)c) rest").unwrap(), b"a(b)c");
        assert_eq!(literal_string(b"line\\\nnext)").unwrap(), b"linenext");
        assert_eq!(literal_string(b"unterminated"), None);
    }
}
