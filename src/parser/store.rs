//! Object store: the document's indirect-object arena.
//!
//! All indirect objects are parsed up front into an immutable arena keyed
//! by [`ObjectId`]. Cross-references between objects stay as ids and are
//! resolved by lookup, so shared resource dictionaries and encoding objects
//! need no ownership juggling. Decoded stream payloads are cached per
//! object and populated at most once, which keeps concurrent read-only
//! lookups from parallel page workers safe.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};

use super::filters;
use super::lexer::{is_delimiter, is_whitespace, Lexer, Token};
use super::object::{Object, ObjectId};

/// An indirect object plus its lazily decoded stream payload.
#[derive(Debug)]
pub struct ObjectRecord {
    object: Object,
    decoded: OnceLock<Vec<u8>>,
}

impl ObjectRecord {
    fn new(object: Object) -> Self {
        Self {
            object,
            decoded: OnceLock::new(),
        }
    }

    pub fn object(&self) -> &Object {
        &self.object
    }
}

/// Random-access store over a parsed object graph.
pub struct ObjectStore {
    objects: HashMap<ObjectId, ObjectRecord>,
    trailer: HashMap<String, Object>,
    warnings: Mutex<Vec<String>>,
}

impl ObjectStore {
    /// Parse the object graph out of a raw byte buffer.
    ///
    /// The declared cross-reference sections are consulted first; if they
    /// are missing or clearly incomplete, the buffer is rescanned linearly
    /// for `N G obj` headers so that truncated or damaged files still yield
    /// whatever objects survive.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Corrupted("empty input buffer".to_string()));
        }

        let mut warnings = Vec::new();
        let mut objects: HashMap<ObjectId, ObjectRecord> = HashMap::new();
        let mut trailer: HashMap<String, Object> = HashMap::new();

        let offsets = match read_xref_chain(bytes, &mut trailer) {
            Ok(offsets) => offsets,
            Err(msg) => {
                warnings.push(format!("cross-reference unusable ({}), scanning file", msg));
                HashMap::new()
            }
        };

        // File order, so indirect Length references resolve the same way
        // on every parse.
        let mut ordered: Vec<(ObjectId, usize)> =
            offsets.iter().map(|(&id, &offset)| (id, offset)).collect();
        ordered.sort_by_key(|&(id, offset)| (offset, id));
        for (id, offset) in ordered {
            if let Some(object) = parse_indirect_object_at(bytes, offset, Some(&objects)) {
                objects.insert(id, ObjectRecord::new(object));
            }
        }

        // Distrust a cross-reference that resolved far fewer objects than
        // the trailer claims exist; damaged offsets are common.
        let declared = trailer.get("Size").and_then(|v| v.as_i64()).unwrap_or(0) as usize;
        let threshold = declared / 2;
        if objects.is_empty() || (declared > 0 && objects.len() < threshold) {
            if !offsets.is_empty() {
                warnings.push(format!(
                    "cross-reference resolved {} of {} declared objects, scanning file",
                    objects.len(),
                    declared
                ));
            }
            scan_objects(bytes, &mut objects);
        }

        if trailer.is_empty() {
            recover_trailer(bytes, &objects, &mut trailer);
        }

        expand_object_streams(&mut objects, &mut warnings);

        if objects.is_empty() {
            return Err(Error::Corrupted(
                "no indirect objects could be located".to_string(),
            ));
        }

        Ok(Self {
            objects,
            trailer,
            warnings: Mutex::new(warnings),
        })
    }

    /// Number of objects in the arena.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The trailer dictionary (possibly recovered from a scan).
    pub fn trailer(&self) -> &HashMap<String, Object> {
        &self.trailer
    }

    /// Look up an indirect object by id.
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id).map(|r| r.object())
    }

    /// Follow a reference one step; non-references pass through.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.get(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    /// Fetch `key` from a dictionary, following at most one reference.
    pub fn dict_get<'a>(
        &'a self,
        dict: &'a HashMap<String, Object>,
        key: &str,
    ) -> Option<&'a Object> {
        dict.get(key).map(|v| self.resolve(v))
    }

    /// Decoded stream content for an object, applying its filter chain.
    ///
    /// The result is cached on first access; warnings from decoding are
    /// recorded once on the store.
    pub fn stream_content(&self, id: ObjectId) -> Option<&[u8]> {
        let record = self.objects.get(&id)?;
        let Object::Stream { dict, data } = record.object() else {
            return None;
        };
        let content = record.decoded.get_or_init(|| {
            let (decoded, warnings) = filters::decode_stream(dict, data);
            if !warnings.is_empty() {
                let mut sink = self.warnings.lock().unwrap_or_else(|e| e.into_inner());
                for warning in warnings {
                    log::warn!("object {} {}: {}", id.0, id.1, warning);
                    sink.push(format!("object {} {}: {}", id.0, id.1, warning));
                }
            }
            decoded
        });
        Some(content)
    }

    /// The document catalog (trailer `Root`), if one can be found.
    pub fn catalog(&self) -> Option<&HashMap<String, Object>> {
        let root = self.trailer.get("Root")?;
        self.resolve(root).as_dict()
    }

    /// Drain the warnings accumulated so far.
    pub fn take_warnings(&self) -> Vec<String> {
        let mut sink = self.warnings.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *sink)
    }
}

/// Walk the `startxref` chain, collecting object offsets and trailer keys.
///
/// Returns an error message (not a fatal error) when nothing useful could
/// be read; the caller falls back to scanning.
fn read_xref_chain(
    bytes: &[u8],
    trailer: &mut HashMap<String, Object>,
) -> std::result::Result<HashMap<ObjectId, usize>, String> {
    let start = find_startxref(bytes).ok_or("no startxref marker")?;
    let mut offsets = HashMap::new();
    let mut next = Some(start);
    let mut visited = Vec::new();

    while let Some(offset) = next {
        if offset >= bytes.len() || visited.contains(&offset) {
            break;
        }
        visited.push(offset);
        if visited.len() > 64 {
            break;
        }

        let section_trailer = if bytes[offset..].starts_with(b"xref") {
            read_xref_table(bytes, offset, &mut offsets)?
        } else {
            read_xref_stream(bytes, offset, &mut offsets)?
        };

        next = section_prev(&section_trailer, &visited);

        // Earlier sections in the chain are newer; keep the first value seen.
        for (key, value) in section_trailer {
            trailer.entry(key).or_insert(value);
        }
    }

    if offsets.is_empty() {
        return Err("cross-reference sections held no usable entries".to_string());
    }
    Ok(offsets)
}

fn section_prev(trailer: &HashMap<String, Object>, visited: &[usize]) -> Option<usize> {
    let prev = trailer.get("Prev")?.as_i64()?;
    let prev = usize::try_from(prev).ok()?;
    if visited.contains(&prev) {
        None
    } else {
        Some(prev)
    }
}

/// Locate the byte offset announced by the final `startxref` marker.
fn find_startxref(bytes: &[u8]) -> Option<usize> {
    let tail_start = bytes.len().saturating_sub(2048);
    let rel = memchr::memmem::rfind(&bytes[tail_start..], b"startxref")?;
    let mut lexer = Lexer::new(bytes);
    lexer.set_position(tail_start + rel + b"startxref".len());
    match lexer.next_token() {
        Some(Token::Integer(v)) if v >= 0 => usize::try_from(v).ok(),
        _ => None,
    }
}

/// Classic `xref` table: subsections of 20-byte entries.
fn read_xref_table(
    bytes: &[u8],
    offset: usize,
    offsets: &mut HashMap<ObjectId, usize>,
) -> std::result::Result<HashMap<String, Object>, String> {
    let mut lexer = Lexer::new(bytes);
    lexer.set_position(offset);
    match lexer.next_token() {
        Some(Token::Keyword(kw)) if kw == "xref" => {}
        _ => return Err("xref keyword missing".to_string()),
    }

    loop {
        let checkpoint = lexer.position();
        match lexer.next_token() {
            Some(Token::Integer(first)) => {
                let count = match lexer.next_token() {
                    Some(Token::Integer(v)) if v >= 0 => v as u64,
                    _ => return Err("malformed xref subsection header".to_string()),
                };
                for i in 0..count {
                    let entry_offset = match lexer.next_token() {
                        Some(Token::Integer(v)) => v,
                        _ => return Err("truncated xref subsection".to_string()),
                    };
                    let generation = match lexer.next_token() {
                        Some(Token::Integer(v)) => v,
                        _ => return Err("truncated xref subsection".to_string()),
                    };
                    let kind = match lexer.next_token() {
                        Some(Token::Keyword(kw)) => kw,
                        _ => return Err("truncated xref subsection".to_string()),
                    };
                    if kind == "n" {
                        let obj_num = (first as u64 + i) as u32;
                        if let (Ok(entry_offset), Ok(generation)) =
                            (usize::try_from(entry_offset), u16::try_from(generation))
                        {
                            offsets.insert((obj_num, generation), entry_offset);
                        }
                    }
                }
            }
            Some(Token::Keyword(kw)) if kw == "trailer" => {
                let mut parser = GraphParser::new(lexer);
                return match parser.parse_value(None) {
                    Some(Object::Dictionary(dict)) => Ok(dict),
                    _ => Err("trailer dictionary unreadable".to_string()),
                };
            }
            _ => {
                // Tables written without a trailer keyword exist in the
                // wild; stop at whatever came next.
                lexer.set_position(checkpoint);
                return Ok(HashMap::new());
            }
        }
    }
}

/// Compressed cross-reference stream (`/Type /XRef`).
fn read_xref_stream(
    bytes: &[u8],
    offset: usize,
    offsets: &mut HashMap<ObjectId, usize>,
) -> std::result::Result<HashMap<String, Object>, String> {
    let object = parse_indirect_object_at(bytes, offset, None)
        .ok_or("no object at cross-reference offset")?;
    let Object::Stream { dict, data } = object else {
        return Err("cross-reference offset is not a stream".to_string());
    };
    if dict.get("Type").and_then(|v| v.as_name()) != Some("XRef") {
        return Err("stream at cross-reference offset is not an XRef".to_string());
    }

    let (content, _warnings) = filters::decode_stream(&dict, &data);

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_i64())
                .filter_map(|v| usize::try_from(v).ok())
                .collect()
        })
        .unwrap_or_default();
    if widths.len() < 3 {
        return Err("XRef stream W array malformed".to_string());
    }
    let entry_len: usize = widths.iter().sum();
    if entry_len == 0 {
        return Err("XRef stream entries are zero-width".to_string());
    }

    let size = dict.get("Size").and_then(|v| v.as_i64()).unwrap_or(0);
    let index: Vec<i64> = dict
        .get("Index")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
        .unwrap_or_else(|| vec![0, size]);

    let mut cursor = 0usize;
    for pair in index.chunks(2) {
        let [start, count] = pair else { break };
        for i in 0..*count {
            if cursor + entry_len > content.len() {
                break;
            }
            let entry = &content[cursor..cursor + entry_len];
            cursor += entry_len;

            let mut fields = [0u64; 3];
            let mut at = 0usize;
            for (f, &w) in widths.iter().enumerate().take(3) {
                let mut value = 0u64;
                for &b in &entry[at..at + w] {
                    value = (value << 8) | b as u64;
                }
                fields[f] = value;
                at += w;
            }
            // A zero-width type field defaults to "in use".
            let kind = if widths[0] == 0 { 1 } else { fields[0] };

            if kind == 1 {
                let obj_num = (*start + i) as u32;
                let generation = fields[2].min(u16::MAX as u64) as u16;
                offsets.insert((obj_num, generation), fields[1] as usize);
            }
            // Type 2 entries live inside object streams; the ObjStm
            // expansion pass picks those up.
        }
    }

    Ok(dict)
}

/// Linear fallback: lex every `N G obj` header in the buffer.
///
/// Later occurrences overwrite earlier ones so incremental updates win.
fn scan_objects(bytes: &[u8], objects: &mut HashMap<ObjectId, ObjectRecord>) {
    for marker in memchr::memmem::find_iter(bytes, b"obj") {
        if let Some((id, header_start)) = object_header_before(bytes, marker) {
            if let Some(object) = parse_indirect_object_at(bytes, header_start, Some(objects)) {
                objects.insert(id, ObjectRecord::new(object));
            }
        }
    }
}

/// Validate that an `obj` keyword at `marker` is preceded by `N G` digits
/// and return the id plus the offset of the object number.
fn object_header_before(bytes: &[u8], marker: usize) -> Option<(ObjectId, usize)> {
    let after = marker + 3;
    if after < bytes.len() && !is_whitespace(bytes[after]) && !is_delimiter(bytes[after]) {
        return None;
    }
    if marker == 0 || !is_whitespace(bytes[marker - 1]) {
        return None;
    }

    let gen_end = marker - 1;
    let (generation, gen_start) = digits_ending_at(bytes, gen_end)?;
    if gen_start == 0 || !is_whitespace(bytes[gen_start - 1]) {
        return None;
    }

    let mut num_end = gen_start - 1;
    while num_end > 0 && is_whitespace(bytes[num_end - 1]) {
        num_end -= 1;
    }
    let (obj_num, num_start) = digits_ending_at(bytes, num_end)?;
    if num_start > 0 && !is_whitespace(bytes[num_start - 1]) && !is_delimiter(bytes[num_start - 1])
    {
        return None;
    }

    let obj_num = u32::try_from(obj_num).ok()?;
    let generation = u16::try_from(generation).ok()?;
    Some(((obj_num, generation), num_start))
}

/// Parse the decimal run ending just before `end`; returns (value, start).
fn digits_ending_at(bytes: &[u8], end: usize) -> Option<(u64, usize)> {
    let mut start = end;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == end {
        return None;
    }
    let mut value = 0u64;
    for &b in &bytes[start..end] {
        value = value.checked_mul(10)?.checked_add((b - b'0') as u64)?;
    }
    Some((value, start))
}

/// Parse `N G obj ... endobj` at a byte offset.
fn parse_indirect_object_at(
    bytes: &[u8],
    offset: usize,
    known: Option<&HashMap<ObjectId, ObjectRecord>>,
) -> Option<Object> {
    if offset >= bytes.len() {
        return None;
    }
    let mut lexer = Lexer::new(bytes);
    lexer.set_position(offset);
    let mut parser = GraphParser::new(lexer);

    parser.expect_integer()?;
    parser.expect_integer()?;
    parser.expect_keyword("obj")?;
    parser.parse_value(known)
}

/// Recursive-descent parser over graph tokens, with stream handling.
struct GraphParser<'a> {
    lexer: Lexer<'a>,
    buffer: VecDeque<Token>,
}

impl<'a> GraphParser<'a> {
    fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            buffer: VecDeque::new(),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.buffer.pop_front().or_else(|| self.lexer.next_token())
    }

    fn peek(&mut self, n: usize) -> Option<&Token> {
        while self.buffer.len() < n {
            let token = self.lexer.next_token()?;
            self.buffer.push_back(token);
        }
        self.buffer.get(n - 1)
    }

    fn expect_integer(&mut self) -> Option<i64> {
        match self.next_token()? {
            Token::Integer(v) => Some(v),
            _ => None,
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Option<()> {
        match self.next_token()? {
            Token::Keyword(kw) if kw == word => Some(()),
            _ => None,
        }
    }

    /// Parse one value. `known` supplies already-parsed objects so that an
    /// indirect `Length` can be resolved while reading a stream.
    fn parse_value(&mut self, known: Option<&HashMap<ObjectId, ObjectRecord>>) -> Option<Object> {
        match self.next_token()? {
            Token::Null => Some(Object::Null),
            Token::Boolean(v) => Some(Object::Boolean(v)),
            Token::Real(v) => Some(Object::Real(v)),
            Token::String(v) | Token::HexString(v) => Some(Object::String(v)),
            Token::Name(v) => Some(Object::Name(v)),
            Token::Integer(v) => self.integer_or_reference(v),
            Token::ArrayStart => {
                let mut items = Vec::new();
                loop {
                    match self.peek(1) {
                        Some(Token::ArrayEnd) => {
                            self.next_token();
                            break;
                        }
                        None => break,
                        _ => match self.parse_value(known) {
                            Some(item) => items.push(item),
                            None => {
                                self.next_token();
                            }
                        },
                    }
                }
                Some(Object::Array(items))
            }
            Token::DictStart => self.parse_dict_or_stream(known),
            _ => None,
        }
    }

    /// `N G R` is a reference; a lone integer stays an integer.
    fn integer_or_reference(&mut self, first: i64) -> Option<Object> {
        let second = match self.peek(1) {
            Some(Token::Integer(v)) => *v,
            _ => return Some(Object::Integer(first)),
        };
        let is_ref = matches!(self.peek(2), Some(Token::Keyword(kw)) if kw == "R");
        if !is_ref {
            return Some(Object::Integer(first));
        }
        self.next_token();
        self.next_token();
        let obj_num = u32::try_from(first).ok()?;
        let generation = u16::try_from(second).unwrap_or(0);
        Some(Object::Reference((obj_num, generation)))
    }

    fn parse_dict_or_stream(
        &mut self,
        known: Option<&HashMap<ObjectId, ObjectRecord>>,
    ) -> Option<Object> {
        let mut dict = HashMap::new();
        loop {
            match self.peek(1) {
                Some(Token::DictEnd) => {
                    self.next_token();
                    break;
                }
                None => break,
                _ => {}
            }
            let key = match self.next_token()? {
                Token::Name(v) => v,
                _ => break,
            };
            match self.parse_value(known) {
                Some(value) => {
                    dict.insert(key, value);
                }
                None => break,
            }
        }

        let at_stream = matches!(self.peek(1), Some(Token::Keyword(kw)) if kw == "stream");
        if !at_stream {
            return Some(Object::Dictionary(dict));
        }
        self.next_token();

        // The payload is read from the raw lexer position; any token peeked
        // past the stream keyword would point into binary data.
        self.buffer.clear();

        let length = dict.get("Length").and_then(|v| match v {
            Object::Integer(n) => usize::try_from(*n).ok(),
            Object::Reference(id) => known
                .and_then(|k| k.get(id))
                .and_then(|r| r.object().as_i64())
                .and_then(|n| usize::try_from(n).ok()),
            _ => None,
        });

        let stream_start = self.lexer.position();
        let mut data = match length {
            Some(length) => self.lexer.consume_stream(length),
            None => self.lexer.consume_stream_until_endstream(),
        };

        // A wrong Length lands the lexer in the middle of the payload;
        // re-read up to the real endstream marker when that happens.
        if length.is_some()
            && !matches!(self.peek(1), Some(Token::Keyword(kw)) if kw == "endstream" || kw == "endobj")
        {
            self.buffer.clear();
            self.lexer.set_position(stream_start);
            data = self.lexer.consume_stream_until_endstream();
        }

        if matches!(self.peek(1), Some(Token::Keyword(kw)) if kw == "endstream") {
            self.next_token();
        }

        Some(Object::Stream { dict, data })
    }
}

/// Pull compressed objects (`/Type /ObjStm`) into the arena.
///
/// Direct objects already present are never overwritten; in incremental
/// files they supersede stale object-stream entries.
fn expand_object_streams(objects: &mut HashMap<ObjectId, ObjectRecord>, warnings: &mut Vec<String>) {
    let mut container_ids: Vec<ObjectId> = objects
        .iter()
        .filter_map(|(id, record)| match record.object() {
            Object::Stream { dict, .. }
                if dict.get("Type").and_then(|v| v.as_name()) == Some("ObjStm") =>
            {
                Some(*id)
            }
            _ => None,
        })
        .collect();
    container_ids.sort_unstable();

    let mut additions: HashMap<ObjectId, Object> = HashMap::new();
    for container_id in container_ids {
        let Some(Object::Stream { dict, data }) = objects.get(&container_id).map(|r| r.object())
        else {
            continue;
        };
        let count = dict.get("N").and_then(|v| v.as_i64()).unwrap_or(0) as usize;
        let first = dict.get("First").and_then(|v| v.as_i64()).unwrap_or(0) as usize;
        if count == 0 {
            continue;
        }

        let (content, decode_warnings) = filters::decode_stream(dict, data);
        warnings.extend(decode_warnings);
        if content.len() <= first {
            warnings.push(format!(
                "object stream {} {} shorter than its header",
                container_id.0, container_id.1
            ));
            continue;
        }

        let mut header = Lexer::new(&content);
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let (Some(Token::Integer(obj_num)), Some(Token::Integer(rel))) =
                (header.next_token(), header.next_token())
            else {
                break;
            };
            if let (Ok(obj_num), Ok(rel)) = (u32::try_from(obj_num), usize::try_from(rel)) {
                entries.push((obj_num, rel));
            }
        }

        for (obj_num, rel) in entries {
            let id = (obj_num, 0u16);
            let at = first + rel;
            if at >= content.len() || objects.contains_key(&id) || additions.contains_key(&id) {
                continue;
            }
            let mut lexer = Lexer::new(&content);
            lexer.set_position(at);
            let mut parser = GraphParser::new(lexer);
            if let Some(object) = parser.parse_value(None) {
                additions.insert(id, object);
            }
        }
    }

    for (id, object) in additions {
        objects.insert(id, ObjectRecord::new(object));
    }
}

/// Last-ditch trailer recovery: find a `trailer` keyword, or synthesize a
/// Root entry by locating a catalog object.
fn recover_trailer(
    bytes: &[u8],
    objects: &HashMap<ObjectId, ObjectRecord>,
    trailer: &mut HashMap<String, Object>,
) {
    for marker in memchr::memmem::find_iter(bytes, b"trailer") {
        let mut lexer = Lexer::new(bytes);
        lexer.set_position(marker + b"trailer".len());
        let mut parser = GraphParser::new(lexer);
        if let Some(Object::Dictionary(dict)) = parser.parse_value(None) {
            for (key, value) in dict {
                trailer.insert(key, value);
            }
        }
    }
    if trailer.contains_key("Root") {
        return;
    }

    // XRef streams double as trailers.
    for (_, record) in objects.iter() {
        if let Object::Stream { dict, .. } = record.object() {
            if dict.get("Type").and_then(|v| v.as_name()) == Some("XRef") {
                for (key, value) in dict {
                    trailer.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }
    }
    if trailer.contains_key("Root") {
        return;
    }

    let mut catalog_ids: Vec<ObjectId> = objects
        .iter()
        .filter(|(_, record)| {
            record
                .object()
                .as_dict()
                .and_then(|d| d.get("Type"))
                .and_then(|v| v.as_name())
                == Some("Catalog")
        })
        .map(|(id, _)| *id)
        .collect();
    catalog_ids.sort_unstable();
    if let Some(&id) = catalog_ids.last() {
        trailer.insert("Root".to_string(), Object::Reference(id));
    }
}
