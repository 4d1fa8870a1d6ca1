use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use std::str;

use crate::models::RemoteFile;

#[derive(Debug, Default)]
struct ResponseEntry {
    href: String,
    props: PropValues,
    has_ok_propstat: bool,
}

#[derive(Debug, Default)]
struct PropValues {
    displayname: String,
    content_length: Option<i64>,
    last_modified: Option<String>,
    content_type: Option<String>,
    etag: Option<String>,
    is_collection: bool,
}

impl PropValues {
    fn merge(&mut self, other: PropValues) {
        if !other.displayname.is_empty() {
            self.displayname = other.displayname;
        }
        if other.content_length.is_some() {
            self.content_length = other.content_length;
        }
        if other.last_modified.is_some() {
            self.last_modified = other.last_modified;
        }
        if other.content_type.is_some() {
            self.content_type = other.content_type;
        }
        if other.etag.is_some() {
            self.etag = other.etag;
        }
        self.is_collection |= other.is_collection;
    }
}

/// Parses a PROPFIND 207 multistatus body into remote file entries.
/// Namespace prefixes vary between servers, so matching is on local names.
/// Properties are buffered per propstat block and only those whose status
/// is 200 contribute to the entry.
pub fn parse_multistatus(xml_text: &str) -> Result<Vec<RemoteFile>> {
    let mut reader = Reader::from_str(xml_text);
    reader.config_mut().trim_text(true);

    let mut files = Vec::new();
    let mut current: Option<ResponseEntry> = None;
    let mut propstat_props = PropValues::default();
    let mut propstat_status = String::new();
    let mut current_element = String::new();
    let mut in_response = false;
    let mut in_propstat = false;
    let mut in_resourcetype = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = local_name(e.name())?;

                match name.as_str() {
                    "response" => {
                        in_response = true;
                        current = Some(ResponseEntry::default());
                    }
                    "propstat" => {
                        in_propstat = true;
                        propstat_props = PropValues::default();
                        propstat_status.clear();
                    }
                    "resourcetype" => in_resourcetype = true,
                    "collection" if in_resourcetype && in_propstat => {
                        propstat_props.is_collection = true;
                    }
                    _ => current_element = name,
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape()?.to_string();

                if in_response && !text.trim().is_empty() {
                    if in_propstat {
                        match current_element.as_str() {
                            "displayname" => {
                                propstat_props.displayname = text.trim().to_string()
                            }
                            "getcontentlength" => {
                                propstat_props.content_length = text.trim().parse().ok()
                            }
                            "getlastmodified" => {
                                propstat_props.last_modified = Some(text.trim().to_string())
                            }
                            "getcontenttype" => {
                                propstat_props.content_type = Some(text.trim().to_string())
                            }
                            "getetag" => propstat_props.etag = Some(text.trim().to_string()),
                            "status" => propstat_status = text.trim().to_string(),
                            _ => {}
                        }
                    } else if current_element == "href" {
                        if let Some(ref mut entry) = current {
                            entry.href = text.trim().to_string();
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.name())?;

                match name.as_str() {
                    "response" => {
                        if let Some(entry) = current.take() {
                            if entry.has_ok_propstat && !entry.href.is_empty() {
                                files.push(entry.into_remote_file());
                            }
                        }
                        in_response = false;
                    }
                    "propstat" => {
                        if propstat_status.contains("200") {
                            if let Some(ref mut entry) = current {
                                entry.props.merge(std::mem::take(&mut propstat_props));
                                entry.has_ok_propstat = true;
                            }
                        }
                        in_propstat = false;
                    }
                    "resourcetype" => in_resourcetype = false,
                    _ => {}
                }

                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("XML parsing error: {}", e)),
            _ => {}
        }

        buf.clear();
    }

    Ok(files)
}

impl ResponseEntry {
    fn into_remote_file(self) -> RemoteFile {
        let name = if self.props.displayname.is_empty() {
            let segment = self
                .href
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or("")
                .to_string();
            urlencoding::decode(&segment)
                .map(|c| c.into_owned())
                .unwrap_or(segment)
        } else {
            self.props.displayname
        };

        RemoteFile {
            path: self.href,
            name,
            size: self.props.content_length.unwrap_or(0),
            mime_type: self.props.content_type.unwrap_or_default(),
            last_modified: self.props.last_modified.as_deref().and_then(parse_http_date),
            etag: self.props.etag,
            is_directory: self.props.is_collection,
        }
    }
}

fn local_name(qname: QName) -> Result<String> {
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| anyhow!("Invalid UTF-8 in element name: {}", e))?;
    Ok(name.to_string())
}

fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    if date_str.is_empty() {
        return None;
    }

    // WebDAV servers send RFC 2822; some send RFC 3339
    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc3339(date_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT")
                .ok()
                .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
        })
}
