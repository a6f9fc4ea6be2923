// RidiSync - Ridibooks Library Export
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! EPUB title lookup
//!
//! # Lookup Path
//! 1. `META-INF/container.xml` names the package document through the
//!    `full-path` attribute of its first `rootfile` element.
//! 2. The package document (OPF) carries `<dc:title>` in its metadata.
//!    Packages without a Dublin Core title fall back to the first element
//!    whose local name ends in `title`.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

pub const CONTAINER_PATH: &str = "META-INF/container.xml";

const CONTAINER_NS: &[u8] = b"urn:oasis:names:tc:opendocument:xmlns:container";
const DC_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";

/// Title of an EPUB held in memory
pub fn extract_title(content: &[u8]) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(content)).ok()?;

    let container = read_entry(&mut archive, CONTAINER_PATH)?;
    let opf_path = rootfile_path(&container)?;
    let opf = read_entry(&mut archive, &opf_path)?;

    package_title(&opf)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).ok()?;

    Some(decode_xml(&bytes))
}

/// Decode an XML entry, honoring a UTF-16 byte order mark
///
/// UTF-16 without a BOM is recognized by its leading `<`.
fn decode_xml(bytes: &[u8]) -> String {
    let (body, big_endian) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        [0x00, 0x3C, ..] => (bytes, true),
        [0x3C, 0x00, ..] => (bytes, false),
        _ => {
            let text = String::from_utf8_lossy(bytes);
            return text.trim_start_matches('\u{feff}').to_string();
        }
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// `full-path` of the first container `rootfile`
fn rootfile_path(xml: &str) -> Option<String> {
    let mut reader = NsReader::from_str(xml);

    loop {
        match reader.read_resolved_event() {
            Ok((ResolveResult::Bound(Namespace(ns)), Event::Start(e) | Event::Empty(e)))
                if ns == CONTAINER_NS && e.local_name().as_ref() == b"rootfile" =>
            {
                let attr = e.try_get_attribute("full-path").ok()??;
                let value = attr.unescape_value().ok()?;
                let value = value.trim();
                return (!value.is_empty()).then(|| value.to_string());
            }
            Ok((_, Event::Eof)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Open element while scanning the package document
struct Frame {
    /// Position of the start tag in document order
    order: usize,
    dc_title: bool,
    title_like: bool,
    /// Text before the first child element
    text: String,
    child_seen: bool,
}

fn keep_earliest(slot: &mut Option<(usize, String)>, order: usize, text: &str) {
    if slot.as_ref().map_or(true, |(o, _)| order < *o) {
        *slot = Some((order, text.to_string()));
    }
}

fn package_title(xml: &str) -> Option<String> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Frame> = Vec::new();
    let mut order = 0usize;

    let mut dc_title: Option<(usize, String)> = None;
    let mut any_title: Option<(usize, String)> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event().ok()?;

        match event {
            Event::Start(e) => {
                let in_dc = matches!(resolved, ResolveResult::Bound(Namespace(ns)) if ns == DC_NS);
                let local = e.local_name();
                let local = local.as_ref();

                if let Some(parent) = stack.last_mut() {
                    parent.child_seen = true;
                }
                stack.push(Frame {
                    order,
                    dc_title: in_dc && local == b"title",
                    title_like: local.to_ascii_lowercase().ends_with(b"title"),
                    text: String::new(),
                    child_seen: false,
                });
                order += 1;
            }
            Event::Empty(_) => {
                if let Some(parent) = stack.last_mut() {
                    parent.child_seen = true;
                }
                order += 1;
            }
            Event::Text(t) => {
                if let Some(frame) = stack.last_mut().filter(|f| !f.child_seen) {
                    if let Ok(text) = t.unescape() {
                        frame.text.push_str(&text);
                    }
                }
            }
            Event::CData(c) => {
                if let Some(frame) = stack.last_mut().filter(|f| !f.child_seen) {
                    frame.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    let text = frame.text.trim();
                    if !text.is_empty() {
                        if frame.dc_title {
                            keep_earliest(&mut dc_title, frame.order, text);
                        }
                        if frame.title_like {
                            keep_earliest(&mut any_title, frame.order, text);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    dc_title.or(any_title).map(|(_, title)| title)
}
