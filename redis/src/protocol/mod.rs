//! RESP frame codec: encoding commands to wire bytes and parsing wire bytes into replies.

pub mod encode;

use xitca_io::bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, ProtocolError};

const CRLF: &[u8] = b"\r\n";

/// a parsed RESP reply. a server error reply surfaces as a value here, not as a parse error --
/// it is up to the resolver that receives it to decide how to treat it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Integer(i64),
    SimpleString(Box<str>),
    BulkString(Option<Bytes>),
    Array(Option<Vec<Reply>>),
    Error(Box<str>),
}

impl Reply {
    pub fn is_queued(&self) -> bool {
        matches!(self, Reply::SimpleString(s) if &**s == "QUEUED")
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::BulkString(None) | Reply::Array(None))
    }
}

/// pluggable parser contract: feed bytes in, attempt to pull a complete reply back out.
///
/// an implementation owns its own accumulation buffer; [`Parser::gets`] returns `Ok(None)`
/// (the "incomplete" sentinel) when there is not yet a full reply buffered.
pub trait Parser: Send {
    fn feed(&mut self, bytes: &[u8]);

    fn gets(&mut self) -> Result<Option<Reply>, Error>;
}

/// the default, dependency-free RESP parser. accumulates fed bytes in a [`BytesMut`] and parses
/// directly off the front of it, advancing as complete frames are recognized.
#[derive(Debug, Default)]
pub struct RespParser {
    buf: BytesMut,
}

impl RespParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Parser for RespParser {
    fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn gets(&mut self) -> Result<Option<Reply>, Error> {
        try_parse(&mut self.buf)
    }
}

/// attempt to parse exactly one top-level [`Reply`] off the front of `buf`, consuming the bytes
/// it used. returns `Ok(None)` if `buf` does not yet contain a complete reply.
pub fn try_parse(buf: &mut BytesMut) -> Result<Option<Reply>, Error> {
    let mut cursor = 0usize;
    match parse_at(buf, &mut cursor) {
        Ok(Some(reply)) => {
            buf.advance(cursor);
            Ok(Some(reply))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    memchr::memchr(b'\r', buf).filter(|&i| buf.get(i + 1) == Some(&b'\n'))
}

/// parse one reply starting at `buf[*cursor..]`, advancing `*cursor` past what it consumed.
/// does not mutate `buf` itself -- advancing the real buffer is the caller's job, so that a
/// `None` return (incomplete) leaves `buf` untouched for the next feed.
fn parse_at(buf: &BytesMut, cursor: &mut usize) -> Result<Option<Reply>, Error> {
    let rest = &buf[*cursor..];
    if rest.is_empty() {
        return Ok(None);
    }

    let tag = rest[0];
    let Some(nl) = find_crlf(rest) else {
        return Ok(None);
    };
    let line = &rest[1..nl];

    match tag {
        b'+' => {
            let s = str_from_ascii(line)?;
            *cursor += nl + 2;
            Ok(Some(Reply::SimpleString(s.into())))
        }
        b'-' => {
            let s = str_from_ascii(line)?;
            *cursor += nl + 2;
            Ok(Some(Reply::Error(s.into())))
        }
        b':' => {
            let n = parse_i64(line)?;
            *cursor += nl + 2;
            Ok(Some(Reply::Integer(n)))
        }
        b'$' => {
            let len = parse_i64(line)?;
            let header_len = nl + 2;
            if len < 0 {
                *cursor += header_len;
                return Ok(Some(Reply::BulkString(None)));
            }
            let len = len as usize;
            if rest.len() < header_len + len + 2 {
                return Ok(None);
            }
            let data = Bytes::copy_from_slice(&rest[header_len..header_len + len]);
            *cursor += header_len + len + 2;
            Ok(Some(Reply::BulkString(Some(data))))
        }
        b'*' => {
            let len = parse_i64(line)?;
            *cursor += nl + 2;
            if len < 0 {
                return Ok(Some(Reply::Array(None)));
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                match parse_at(buf, cursor)? {
                    Some(item) => items.push(item),
                    None => return Ok(None),
                }
            }
            Ok(Some(Reply::Array(Some(items))))
        }
        other => Err(ProtocolError(format!("unexpected reply tag byte {other:#x}")).into()),
    }
}

fn str_from_ascii(line: &[u8]) -> Result<String, Error> {
    std::str::from_utf8(line)
        .map(str::to_owned)
        .map_err(|e| ProtocolError(format!("non-utf8 simple string/error line: {e}")).into())
}

fn parse_i64(line: &[u8]) -> Result<i64, Error> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ProtocolError(format!("invalid integer in reply: {:?}", String::from_utf8_lossy(line))).into())
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_one(bytes: &[u8]) -> Reply {
        let mut buf = BytesMut::from(bytes);
        try_parse(&mut buf).unwrap().unwrap()
    }

    #[test]
    fn simple_string() {
        assert_eq!(parse_one(b"+OK\r\n"), Reply::SimpleString("OK".into()));
    }

    #[test]
    fn error() {
        assert_eq!(parse_one(b"-ERR bad thing\r\n"), Reply::Error("ERR bad thing".into()));
    }

    #[test]
    fn integer() {
        assert_eq!(parse_one(b":1000\r\n"), Reply::Integer(1000));
        assert_eq!(parse_one(b":-1\r\n"), Reply::Integer(-1));
    }

    #[test]
    fn bulk_string() {
        assert_eq!(
            parse_one(b"$6\r\nfoobar\r\n"),
            Reply::BulkString(Some(Bytes::from_static(b"foobar")))
        );
    }

    #[test]
    fn bulk_string_nil() {
        assert_eq!(parse_one(b"$-1\r\n"), Reply::BulkString(None));
    }

    #[test]
    fn empty_bulk_string() {
        assert_eq!(parse_one(b"$0\r\n\r\n"), Reply::BulkString(Some(Bytes::new())));
    }

    #[test]
    fn array() {
        assert_eq!(
            parse_one(b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n"),
            Reply::Array(Some(vec![
                Reply::BulkString(Some(Bytes::from_static(b"foo"))),
                Reply::BulkString(Some(Bytes::from_static(b"bar"))),
            ]))
        );
    }

    #[test]
    fn array_nil() {
        assert_eq!(parse_one(b"*-1\r\n"), Reply::Array(None));
    }

    #[test]
    fn nested_array() {
        assert_eq!(
            parse_one(b"*2\r\n*1\r\n:1\r\n$-1\r\n"),
            Reply::Array(Some(vec![Reply::Array(Some(vec![Reply::Integer(1)])), Reply::BulkString(None)]))
        );
    }

    #[test]
    fn incomplete_returns_none() {
        let mut buf = BytesMut::from(&b"$6\r\nfoo"[..]);
        assert!(try_parse(&mut buf).unwrap().is_none());
        // nothing consumed on incomplete parse.
        assert_eq!(&buf[..], b"$6\r\nfoo");
    }

    #[test]
    fn feeds_across_multiple_chunks() {
        let mut parser = RespParser::new();
        parser.feed(b"$6\r\nfoo");
        assert!(parser.gets().unwrap().is_none());
        parser.feed(b"bar\r\n");
        assert_eq!(
            parser.gets().unwrap().unwrap(),
            Reply::BulkString(Some(Bytes::from_static(b"foobar")))
        );
    }

    #[test]
    fn consumes_only_one_reply_per_call() {
        let mut buf = BytesMut::from(&b"+OK\r\n+OK2\r\n"[..]);
        assert_eq!(try_parse(&mut buf).unwrap().unwrap(), Reply::SimpleString("OK".into()));
        assert_eq!(&buf[..], b"+OK2\r\n");
    }
}
