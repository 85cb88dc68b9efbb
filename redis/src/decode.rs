//! applying a resolver's encoding and transform chain to a parsed [`Reply`], then delivering
//! the outcome through its sink.

use crate::{
    error::{Error, ResponseError},
    protocol::Reply,
    resolver::Resolver,
    value::{Encoding, Value},
};

/// run the decode pipeline and fulfill `resolver`'s sink with the outcome: error remap,
/// recursive encoding-aware decode, then the transform chain left-to-right. a caller who
/// already dropped the receiving future just gets a dropped result; the queue is already
/// aligned by the time this runs so that's not our problem.
pub(crate) fn decode(reply: Reply, resolver: Resolver, default_encoding: Encoding) {
    let Resolver {
        encoding,
        transforms,
        error_func,
        sink,
    } = resolver;

    let result = decode_reply(reply, encoding.resolve(default_encoding), error_func, transforms);
    let _ = sink.send(result);
}

fn decode_reply(
    reply: Reply,
    encoding: Encoding,
    error_func: Option<crate::resolver::ErrorFunc>,
    transforms: Vec<crate::resolver::Transform>,
) -> Result<Value, Error> {
    if let Reply::Error(msg) = reply {
        let err = ResponseError(String::from(msg));
        return Err(match error_func {
            Some(f) => f(err),
            None => err.into(),
        });
    }

    let mut value = decode_value(reply, encoding);
    for transform in transforms {
        value = transform(value?);
    }
    value
}

fn decode_value(reply: Reply, encoding: Encoding) -> Result<Value, Error> {
    match reply {
        Reply::Integer(n) => Ok(Value::Int(n)),
        Reply::SimpleString(s) if &*s == "OK" => Ok(Value::Bool(true)),
        Reply::SimpleString(s) => Ok(Value::Text(String::from(s))),
        Reply::BulkString(None) => Ok(Value::Nil),
        Reply::BulkString(Some(bytes)) => match encoding {
            Encoding::RawBytes => Ok(Value::Bytes(bytes)),
            Encoding::Utf8 | Encoding::Default => String::from_utf8(bytes.to_vec())
                .map(Value::Text)
                .map_err(|e| crate::error::ProtocolError(format!("reply is not valid utf-8: {e}")).into()),
        },
        Reply::Array(None) => Ok(Value::Nil),
        Reply::Array(Some(items)) => items
            .into_iter()
            .map(|item| decode_value(item, encoding))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Reply::Error(_) => unreachable!("error replies are handled before decode_value is reached"),
    }
}

#[cfg(test)]
mod test {
    use tokio::sync::oneshot;

    use super::*;

    fn resolver(encoding: Encoding) -> (Resolver, oneshot::Receiver<Result<Value, Error>>) {
        let (tx, rx) = oneshot::channel();
        (Resolver::new(encoding, tx), rx)
    }

    #[tokio::test]
    async fn ok_maps_to_true() {
        let (r, rx) = resolver(Encoding::Default);
        decode(Reply::SimpleString("OK".into()), r, Encoding::Utf8);
        assert_eq!(rx.await.unwrap().unwrap(), Value::Bool(true));
    }

    #[tokio::test]
    async fn bulk_string_raw_bytes() {
        let (r, rx) = resolver(Encoding::RawBytes);
        decode(
            Reply::BulkString(Some(xitca_io::bytes::Bytes::from_static(b"foo"))),
            r,
            Encoding::Utf8,
        );
        assert_eq!(rx.await.unwrap().unwrap(), Value::Bytes(xitca_io::bytes::Bytes::from_static(b"foo")));
    }

    #[tokio::test]
    async fn bulk_string_text_default() {
        let (r, rx) = resolver(Encoding::Default);
        decode(
            Reply::BulkString(Some(xitca_io::bytes::Bytes::from_static(b"foo"))),
            r,
            Encoding::Utf8,
        );
        assert_eq!(rx.await.unwrap().unwrap(), Value::Text("foo".into()));
    }

    #[tokio::test]
    async fn error_without_remap() {
        let (r, rx) = resolver(Encoding::Default);
        decode(Reply::Error("ERR bad".into()), r, Encoding::Utf8);
        assert!(rx.await.unwrap().unwrap_err().is_response_error());
    }

    #[tokio::test]
    async fn error_with_remap() {
        use crate::error::ConnectionClosed;
        let (mut r, rx) = resolver(Encoding::Default);
        r.error_func = Some(Box::new(|_| ConnectionClosed.into()));
        decode(Reply::Error("ERR bad".into()), r, Encoding::Utf8);
        assert!(rx.await.unwrap().unwrap_err().is_connection_closed());
    }

    #[tokio::test]
    async fn transform_chain_applies_in_order() {
        let (mut r, rx) = resolver(Encoding::Default);
        r.transforms.push(Box::new(|v| match v {
            Value::Int(n) => Ok(Value::Int(n + 1)),
            other => Ok(other),
        }));
        r.transforms.push(Box::new(|v| match v {
            Value::Int(n) => Ok(Value::Int(n * 2)),
            other => Ok(other),
        }));
        decode(Reply::Integer(3), r, Encoding::Utf8);
        assert_eq!(rx.await.unwrap().unwrap(), Value::Int(8));
    }

    #[tokio::test]
    async fn nested_array_decodes_elementwise() {
        let (r, rx) = resolver(Encoding::RawBytes);
        let reply = Reply::Array(Some(vec![
            Reply::Integer(1),
            Reply::BulkString(Some(xitca_io::bytes::Bytes::from_static(b"a"))),
            Reply::Array(None),
        ]));
        decode(reply, r, Encoding::Utf8);
        assert_eq!(
            rx.await.unwrap().unwrap(),
            Value::Array(vec![
                Value::Int(1),
                Value::Bytes(xitca_io::bytes::Bytes::from_static(b"a")),
                Value::Nil,
            ])
        );
    }
}
