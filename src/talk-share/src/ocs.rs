//! OCS response envelopes.
//!
//! Every OCS endpoint wraps its payload as `{"ocs": {"meta": ..., "data": ...}}`.
//! The sharing API is inconsistent about the shape of `data`: depending on
//! server version and share type it is a single object, a list of objects,
//! or an empty list. `ShareData` models exactly those shapes; anything else
//! fails to decode and is reported as a malformed response.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{ShareError, ShareResult};

/// Top-level OCS wrapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OcsEnvelope {
    pub ocs: OcsBody,
}

/// Contents of the `ocs` key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OcsBody {
    #[serde(default)]
    pub meta: Option<OcsMeta>,
    /// `None` when `data` is absent or `null`.
    #[serde(default)]
    pub data: Option<ShareData>,
}

/// Status block of an OCS response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OcsMeta {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub statuscode: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `data` payload of a share response.
#[derive(Debug, Clone, PartialEq)]
pub enum ShareData {
    List(Vec<ShareObject>),
    Single(ShareObject),
}

impl<'de> Deserialize<'de> for ShareData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Structs would also accept JSON arrays positionally, so the object
        // check has to happen before handing off to `ShareObject`.
        fn object<E: serde::de::Error>(value: Value) -> Result<ShareObject, E> {
            match value {
                Value::Object(_) => serde_json::from_value(value).map_err(E::custom),
                other => Err(E::custom(format!(
                    "expected share object, found {}",
                    json_kind(&other)
                ))),
            }
        }

        match Value::deserialize(deserializer)? {
            // Only element 0 is ever read; later entries that do not decode
            // are dropped instead of failing the whole response.
            Value::Array(items) => {
                let mut items = items.into_iter();
                let Some(first) = items.next() else {
                    return Ok(ShareData::List(Vec::new()));
                };
                let mut list = vec![object::<D::Error>(first)?];
                for (index, item) in items.enumerate() {
                    match object::<D::Error>(item) {
                        Ok(share) => list.push(share),
                        Err(e) => debug!("Skipping share list entry {}: {}", index + 1, e),
                    }
                }
                Ok(ShareData::List(list))
            }
            value @ Value::Object(_) => object(value).map(ShareData::Single),
            other => Err(D::Error::custom(format!(
                "expected share object or list, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The fields of a share record this crate reads. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ShareObject {
    /// Share identifier; servers send it as a string or an integer.
    #[serde(default, deserialize_with = "string_or_integer")]
    pub id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_target: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

fn string_or_integer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(u64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Integer(n) => n.to_string(),
    }))
}

impl ShareData {
    /// The share record to read from: the object itself, or the first
    /// element of a list. `None` for an empty list.
    pub fn first(&self) -> Option<&ShareObject> {
        match self {
            ShareData::List(items) => items.first(),
            ShareData::Single(object) => Some(object),
        }
    }
}

impl OcsEnvelope {
    /// Decode an OCS body. Unexpected shapes fail closed.
    pub fn parse(body: &[u8]) -> ShareResult<Self> {
        let value: Value = serde_json::from_slice(body)?;
        if !matches!(value.get("ocs"), Some(Value::Object(_))) {
            return Err(ShareError::MalformedResponse(
                "no OCS object in response".to_string(),
            ));
        }
        let envelope: OcsEnvelope = serde_json::from_value(value)?;

        if let Some(meta) = &envelope.ocs.meta {
            debug!(
                "OCS meta: status={:?} statuscode={:?} message={:?}",
                meta.status, meta.statuscode, meta.message
            );
        }

        Ok(envelope)
    }

    /// The share record carried by the response, if any.
    ///
    /// Returns `None` when `data` is missing, `null` or an empty list.
    pub fn share(&self) -> Option<&ShareObject> {
        self.ocs.data.as_ref().and_then(ShareData::first)
    }

    /// The public URL of a link share.
    ///
    /// `Ok(None)` means the server returned no share record and the caller
    /// has to resolve the URL some other way. A record without `url` is an
    /// error.
    pub fn public_url(&self) -> ShareResult<Option<&str>> {
        match self.share() {
            None => Ok(None),
            Some(share) => share.url.as_deref().map(Some).ok_or_else(|| {
                ShareError::MalformedResponse("no url in share data".to_string())
            }),
        }
    }

    /// The `token` of the share record.
    pub fn token(&self) -> ShareResult<&str> {
        self.share()
            .and_then(|share| share.token.as_deref())
            .ok_or_else(|| ShareError::MalformedResponse("no share token in response".to_string()))
    }

    /// The `id` of the share record.
    pub fn id(&self) -> ShareResult<&str> {
        self.share()
            .and_then(|share| share.id.as_deref())
            .ok_or_else(|| ShareError::MalformedResponse("no id in share data".to_string()))
    }
}
