//! WebDAV file lookups.
//!
//! Only `PROPFIND` with `Depth: 0` is needed: it confirms a file exists and
//! returns its basic metadata. Responses are `207 Multi-Status` documents;
//! elements are matched by local name so any namespace prefix works.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::error::{ShareError, ShareResult};
use crate::session::TalkSession;

/// Properties requested for every lookup.
pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:getlastmodified/>
    <d:getcontentlength/>
    <d:resourcetype/>
    <d:getetag/>
    <d:getcontenttype/>
  </d:prop>
</d:propfind>"#;

/// Whether a resource is a plain file or a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResourceType {
    #[default]
    File,
    Collection,
}

/// The `prop` block of one propstat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavProp {
    pub last_modified: Option<String>,
    pub content_length: Option<u64>,
    pub resource_type: ResourceType,
    pub etag: Option<String>,
    pub content_type: Option<String>,
}

/// One `propstat` entry: properties plus the status line they share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropStat {
    pub prop: DavProp,
    pub status: String,
}

impl PropStat {
    /// Whether the status line reports `200`.
    pub fn is_ok(&self) -> bool {
        self.status.split_whitespace().nth(1) == Some("200")
    }
}

/// One `response` entry of a multi-status document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavResponse {
    pub href: String,
    pub propstats: Vec<PropStat>,
}

/// A parsed `multistatus` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiStatus {
    pub responses: Vec<DavResponse>,
}

/// Metadata of a single file, flattened from a multi-status response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileProperties {
    pub href: String,
    pub last_modified: Option<String>,
    pub content_length: Option<u64>,
    pub resource_type: ResourceType,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub status: String,
}

impl MultiStatus {
    /// Flatten the first response into file properties.
    ///
    /// Prefers the first propstat reporting 200; falls back to the first
    /// propstat. `None` when there is no response or it has no propstat.
    pub fn file_properties(&self) -> Option<FileProperties> {
        let response = self.responses.first()?;
        let propstat = response
            .propstats
            .iter()
            .find(|p| p.is_ok())
            .or_else(|| response.propstats.first())?;

        let prop = propstat.prop.clone();
        Some(FileProperties {
            href: response.href.clone(),
            last_modified: prop.last_modified,
            content_length: prop.content_length,
            resource_type: prop.resource_type,
            etag: prop.etag,
            content_type: prop.content_type,
            status: propstat.status.clone(),
        })
    }
}

fn malformed(what: impl std::fmt::Display) -> ShareError {
    ShareError::MalformedResponse(format!("XML decode error: {}", what))
}

/// Parse a `multistatus` document.
pub fn parse_multistatus(xml: &str) -> ShareResult<MultiStatus> {
    // Entity references split text into several events, so values are
    // trimmed once per element, not per event.
    let mut reader = Reader::from_str(xml);

    let mut multistatus = MultiStatus::default();
    let mut seen_root = false;
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(Vec::as_slice);
                match (name.as_slice(), parent) {
                    (b"multistatus", None) => seen_root = true,
                    (b"response", Some(b"multistatus")) => {
                        multistatus.responses.push(DavResponse::default());
                    }
                    (b"propstat", Some(b"response")) => {
                        if let Some(response) = multistatus.responses.last_mut() {
                            response.propstats.push(PropStat::default());
                        }
                    }
                    (b"collection", Some(b"resourcetype")) => {
                        if let Some(prop) = current_prop(&mut multistatus) {
                            prop.resource_type = ResourceType::Collection;
                        }
                    }
                    _ => {}
                }
                stack.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"collection"
                    && stack.last().map(Vec::as_slice) == Some(&b"resourcetype"[..])
                    && let Some(prop) = current_prop(&mut multistatus)
                {
                    prop.resource_type = ResourceType::Collection;
                }
            }
            Event::Text(e) => {
                text.push_str(&e.decode().map_err(malformed)?);
            }
            Event::CData(e) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e.resolve_char_ref().map_err(malformed)? {
                    text.push(ch);
                } else {
                    let entity = e.decode().map_err(malformed)?;
                    let resolved = resolve_predefined_entity(&entity)
                        .ok_or_else(|| malformed(format!("unknown entity &{};", entity)))?;
                    text.push_str(resolved);
                }
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                let value = text.trim().to_string();
                text.clear();
                assign(&mut multistatus, &name, stack.last().map(Vec::as_slice), value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ShareError::MalformedResponse(
            "no multistatus element in WebDAV response".to_string(),
        ));
    }

    Ok(multistatus)
}

fn current_propstat(multistatus: &mut MultiStatus) -> Option<&mut PropStat> {
    multistatus.responses.last_mut()?.propstats.last_mut()
}

fn current_prop(multistatus: &mut MultiStatus) -> Option<&mut DavProp> {
    current_propstat(multistatus).map(|p| &mut p.prop)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Store the text of a closed element on the entry it belongs to.
fn assign(
    multistatus: &mut MultiStatus,
    name: &[u8],
    parent: Option<&[u8]>,
    value: String,
) -> ShareResult<()> {
    match (name, parent) {
        (b"href", Some(b"response")) => {
            if let Some(response) = multistatus.responses.last_mut() {
                response.href = value;
            }
        }
        (b"status", Some(b"propstat")) => {
            if let Some(propstat) = current_propstat(multistatus) {
                propstat.status = value;
            }
        }
        (_, Some(b"prop")) => {
            let Some(prop) = current_prop(multistatus) else {
                return Ok(());
            };
            match name {
                b"getlastmodified" => prop.last_modified = non_empty(value),
                b"getetag" => prop.etag = non_empty(value),
                b"getcontenttype" => prop.content_type = non_empty(value),
                b"getcontentlength" if !value.is_empty() => {
                    let length = value.parse::<u64>().map_err(|_| {
                        ShareError::MalformedResponse(format!(
                            "invalid getcontentlength {:?}",
                            value
                        ))
                    })?;
                    prop.content_length = Some(length);
                }
                _ => {}
            }
        }
        _ => {}
    }
    Ok(())
}

/// Look up a file with `PROPFIND` (`Depth: 0`).
///
/// A 404 or a multi-status without entries means the file does not exist.
pub async fn propfind(session: &TalkSession, path: &str) -> ShareResult<FileProperties> {
    let url = session.dav_file_url(path)?;
    let method = Method::from_bytes(b"PROPFIND")
        .map_err(|e| ShareError::Transport(format!("Invalid HTTP method: {}", e)))?;

    let request = session
        .dav_request(method, url, PROPFIND_BODY)
        .header("Depth", "0");
    let response = session.send("PROPFIND", request).await?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        debug!("PROPFIND reported {} as missing", path);
        return Err(ShareError::FileNotFound {
            path: path.to_string(),
        });
    }
    if !status.is_success() {
        warn!("PROPFIND for {} failed with status {}", path, status);
        return Err(ShareError::Propfind {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    parse_multistatus(&body)?
        .file_properties()
        .ok_or_else(|| ShareError::FileNotFound {
            path: path.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FILE_RESPONSE: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:s="http://sabredav.org/ns" xmlns:oc="http://owncloud.org/ns">
  <d:response>
    <d:href>/remote.php/dav/files/alice/Talk/cat.png</d:href>
    <d:propstat>
      <d:prop>
        <d:getlastmodified>Tue, 06 Feb 2024 10:00:00 GMT</d:getlastmodified>
        <d:getcontentlength>2048</d:getcontentlength>
        <d:resourcetype/>
        <d:getetag>&quot;65c2f4a0e1b2c&quot;</d:getetag>
        <d:getcontenttype>image/png</d:getcontenttype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn test_parse_file_response() {
        let multistatus = parse_multistatus(FILE_RESPONSE).unwrap();
        let props = multistatus.file_properties().unwrap();

        assert_eq!(
            props,
            FileProperties {
                href: "/remote.php/dav/files/alice/Talk/cat.png".to_string(),
                last_modified: Some("Tue, 06 Feb 2024 10:00:00 GMT".to_string()),
                content_length: Some(2048),
                resource_type: ResourceType::File,
                etag: Some("\"65c2f4a0e1b2c\"".to_string()),
                content_type: Some("image/png".to_string()),
                status: "HTTP/1.1 200 OK".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_collection_and_missing_props() {
        let xml = r#"<?xml version="1.0"?>
<multistatus xmlns="DAV:">
  <response>
    <href>/remote.php/dav/files/alice/Talk/</href>
    <propstat>
      <prop><getcontentlength/></prop>
      <status>HTTP/1.1 404 Not Found</status>
    </propstat>
    <propstat>
      <prop><resourcetype><collection/></resourcetype></prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;

        let props = parse_multistatus(xml).unwrap().file_properties().unwrap();
        assert_eq!(props.resource_type, ResourceType::Collection);
        assert_eq!(props.content_length, None);
        assert_eq!(props.status, "HTTP/1.1 200 OK");
    }

    #[test]
    fn test_empty_multistatus_has_no_properties() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"></d:multistatus>"#;
        let multistatus = parse_multistatus(xml).unwrap();
        assert!(multistatus.responses.is_empty());
        assert!(multistatus.file_properties().is_none());
    }

    #[test]
    fn test_response_without_propstat_has_no_properties() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/x</d:href></d:response></d:multistatus>"#;
        assert!(parse_multistatus(xml).unwrap().file_properties().is_none());
    }

    #[test]
    fn test_non_multistatus_is_malformed() {
        let xml = r#"<d:error xmlns:d="DAV:"><s:message xmlns:s="http://sabredav.org/ns">nope</s:message></d:error>"#;
        assert!(matches!(
            parse_multistatus(xml),
            Err(ShareError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_invalid_content_length_is_malformed() {
        let xml = FILE_RESPONSE.replace("2048", "lots");
        assert!(parse_multistatus(&xml).is_err());
    }

    #[test]
    fn test_entities_keep_surrounding_spaces() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>
      /f/Tom &amp; Jerry.png
    </d:href>
    <d:propstat>
      <d:prop><d:getcontenttype>a &lt; b</d:getcontenttype></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

        let props = parse_multistatus(xml).unwrap().file_properties().unwrap();
        assert_eq!(props.href, "/f/Tom & Jerry.png");
        assert_eq!(props.content_type.as_deref(), Some("a < b"));
        assert_eq!(props.status, "HTTP/1.1 200 OK");
    }

    #[test]
    fn test_propstat_is_ok() {
        let ok = PropStat {
            status: "HTTP/1.1 200 OK".to_string(),
            ..Default::default()
        };
        let missing = PropStat {
            status: "HTTP/1.1 404 Not Found".to_string(),
            ..Default::default()
        };
        assert!(ok.is_ok());
        assert!(!missing.is_ok());
    }
}
