//! Export container reading.
//!
//! Three container shapes appear in the wild: a top-level JSON array of
//! records, an object with a `messages` array (Telegram Desktop exports),
//! and newline-delimited JSON. NDJSON files also open with `{`, so a file
//! that does not start with `[` is first probed for being a single JSON
//! document; a single document with a `messages` key is the object form,
//! one without it is read as one-line NDJSON. Records are streamed to a
//! callback without materializing the whole file; exports can run to
//! hundreds of megabytes.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use serde::de::{Deserialize, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::error::PipelineError;

/// Which container shape the input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Array,
    MessagesObject,
    NdJson,
}

impl ContainerFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::MessagesObject => "messages_object",
            Self::NdJson => "ndjson",
        }
    }
}

/// Streams every record in `path` to `on_record`, detecting the container
/// shape from the first non-whitespace byte.
///
/// A file that parses as none of the three shapes is a fatal
/// [`PipelineError::MalformedInput`].
pub fn read_messages<F>(path: &Path, mut on_record: F) -> Result<ContainerFormat, PipelineError>
where
    F: FnMut(Value),
{
    let mut file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let first = first_significant_byte(&mut file, path)?;
    file.seek(SeekFrom::Start(0))
        .map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    match first {
        Some(b'[') => {
            stream_array(BufReader::new(file), path, on_record)?;
            Ok(ContainerFormat::Array)
        }
        Some(b'{') => {
            if is_single_document(&mut file, path)? {
                if stream_messages_object(BufReader::new(&mut file), path, &mut on_record)? {
                    return Ok(ContainerFormat::MessagesObject);
                }
                // A single object without a `messages` key is a one-record
                // NDJSON export; nothing was delivered above, so re-reading
                // is safe.
                file.seek(SeekFrom::Start(0))
                    .map_err(|source| PipelineError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
            }
            stream_ndjson(BufReader::new(file), path, on_record)?;
            Ok(ContainerFormat::NdJson)
        }
        Some(_) => {
            stream_ndjson(BufReader::new(file), path, on_record)?;
            Ok(ContainerFormat::NdJson)
        }
        None => Err(PipelineError::EmptyInput {
            path: path.to_path_buf(),
        }),
    }
}

/// Returns true when the file holds exactly one well-formed JSON value.
///
/// NDJSON has a second value (or a broken first one) after the first
/// object, so this one extra pass cleanly separates the two `{`-leading
/// shapes before any record reaches the callback. The value itself is
/// skipped without being built.
fn is_single_document(file: &mut File, path: &Path) -> Result<bool, PipelineError> {
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(&mut *file));
    let parsed = IgnoredAny::deserialize(&mut de).is_ok() && de.end().is_ok();
    file.seek(SeekFrom::Start(0))
        .map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parsed)
}

fn first_significant_byte(file: &mut File, path: &Path) -> Result<Option<u8>, PipelineError> {
    let mut buf = [0_u8; 1];
    loop {
        let n = file.read(&mut buf).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            return Ok(None);
        }
        if !buf[0].is_ascii_whitespace() {
            return Ok(Some(buf[0]));
        }
    }
}

fn stream_array<R, F>(reader: R, path: &Path, on_record: F) -> Result<(), PipelineError>
where
    R: Read,
    F: FnMut(Value),
{
    let mut de = serde_json::Deserializer::from_reader(reader);
    ForEachRecord { on_record }
        .deserialize(&mut de)
        .map_err(|err| PipelineError::MalformedInput {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })
}

/// Returns whether the object had a `messages` key. When it did not, no
/// record was delivered to the callback.
fn stream_messages_object<R, F>(reader: R, path: &Path, on_record: F) -> Result<bool, PipelineError>
where
    R: Read,
    F: FnMut(Value),
{
    let mut de = serde_json::Deserializer::from_reader(reader);
    MessagesObject { on_record }
        .deserialize(&mut de)
        .map_err(|err| PipelineError::MalformedInput {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })
}

fn stream_ndjson<R, F>(reader: BufReader<R>, path: &Path, mut on_record: F) -> Result<(), PipelineError>
where
    R: Read,
    F: FnMut(Value),
{
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: Value =
            serde_json::from_str(trimmed).map_err(|err| PipelineError::MalformedInput {
                path: path.to_path_buf(),
                detail: format!("line {}: {err}", line_no + 1),
            })?;
        on_record(record);
    }
    Ok(())
}

/// Seed that visits a JSON array and hands each element to a callback
/// instead of collecting it.
struct ForEachRecord<F> {
    on_record: F,
}

impl<'de, F> DeserializeSeed<'de> for ForEachRecord<F>
where
    F: FnMut(Value),
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, F> Visitor<'de> for ForEachRecord<F>
where
    F: FnMut(Value),
{
    type Value = ();

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("an array of message records")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(record) = seq.next_element::<Value>()? {
            (self.on_record)(record);
        }
        Ok(())
    }
}

/// Seed that visits an export object, streams the `messages` array, and
/// ignores every other key. Yields whether the key was present.
struct MessagesObject<F> {
    on_record: F,
}

impl<'de, F> DeserializeSeed<'de> for MessagesObject<F>
where
    F: FnMut(Value),
{
    type Value = bool;

    fn deserialize<D>(self, deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, F> Visitor<'de> for MessagesObject<F>
where
    F: FnMut(Value),
{
    type Value = bool;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("an export object with a `messages` array")
    }

    fn visit_map<A>(mut self, mut map: A) -> Result<bool, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut found = false;
        while let Some(key) = map.next_key::<String>()? {
            if key == "messages" {
                map.next_value_seed(ForEachRecord {
                    on_record: &mut self.on_record,
                })?;
                found = true;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}
