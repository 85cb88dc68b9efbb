//! encoding a verb + argument list into a RESP request frame.

use xitca_io::bytes::{BufMut, Bytes, BytesMut};

use crate::error::{EncodingUnsupported, Error};

/// one command argument. external collaborators build these; the core only needs to
/// serialize them.
#[derive(Debug, Clone)]
pub enum Arg {
    Bytes(Bytes),
    Text(String),
    Int(i64),
    Float(f64),
}

impl Arg {
    fn write_into(&self, buf: &mut BytesMut) -> Result<(), Error> {
        match self {
            Arg::Bytes(b) => bulk_string(buf, b),
            Arg::Text(s) => bulk_string(buf, s.as_bytes()),
            Arg::Int(n) => {
                let mut tmp = itoa::Buffer::new();
                bulk_string(buf, tmp.format(*n).as_bytes())
            }
            Arg::Float(f) => {
                if !f.is_finite() {
                    return Err(EncodingUnsupported.into());
                }
                let mut tmp = ryu::Buffer::new();
                bulk_string(buf, tmp.format(*f).as_bytes())
            }
        }
        Ok(())
    }
}

impl From<Bytes> for Arg {
    fn from(b: Bytes) -> Self {
        Arg::Bytes(b)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(b: Vec<u8>) -> Self {
        Arg::Bytes(Bytes::from(b))
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_owned())
    }
}

impl From<i64> for Arg {
    fn from(n: i64) -> Self {
        Arg::Int(n)
    }
}

impl From<f64> for Arg {
    fn from(f: f64) -> Self {
        Arg::Float(f)
    }
}

/// encode a verb and its arguments as a RESP array-of-bulk-strings request.
pub fn encode_command<I>(verb: &str, args: I) -> Result<BytesMut, Error>
where
    I: IntoIterator<Item = Arg>,
    I::IntoIter: ExactSizeIterator,
{
    let args = args.into_iter();
    let mut buf = BytesMut::with_capacity(64 + args.len() * 16);

    buf.put_u8(b'*');
    let mut tmp = itoa::Buffer::new();
    buf.put_slice(tmp.format(1 + args.len()).as_bytes());
    buf.put_slice(b"\r\n");

    bulk_string(&mut buf, verb.to_ascii_uppercase().as_bytes());

    for arg in args {
        arg.write_into(&mut buf)?;
    }

    Ok(buf)
}

fn bulk_string(buf: &mut BytesMut, bytes: &[u8]) {
    buf.put_u8(b'$');
    let mut tmp = itoa::Buffer::new();
    buf.put_slice(tmp.format(bytes.len()).as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(bytes);
    buf.put_slice(b"\r\n");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encodes_verb_and_args() {
        let buf = encode_command("set", [Arg::from("mykey"), Arg::from("foo")]).unwrap();
        assert_eq!(&buf[..], b"*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$3\r\nfoo\r\n");
    }

    #[test]
    fn upper_cases_verb_only() {
        let buf = encode_command("gEt", [Arg::from("MyKey")]).unwrap();
        assert_eq!(&buf[..], b"*2\r\n$3\r\nGET\r\n$5\r\nMyKey\r\n");
    }

    #[test]
    fn integers_render_as_decimal() {
        let buf = encode_command("incrby", [Arg::from("k"), Arg::from(-42i64)]).unwrap();
        assert_eq!(&buf[..], b"*3\r\n$6\r\nINCRBY\r\n$1\r\nk\r\n$3\r\n-42\r\n");
    }

    #[test]
    fn floats_render_losslessly() {
        let buf = encode_command("incrbyfloat", [Arg::from("k"), Arg::from(1.5f64)]).unwrap();
        assert_eq!(&buf[..], b"*3\r\n$11\r\nINCRBYFLOAT\r\n$1\r\nk\r\n$3\r\n1.5\r\n");
    }

    #[test]
    fn non_finite_float_rejected() {
        let err = encode_command("set", [Arg::from("k"), Arg::from(f64::NAN)]).unwrap_err();
        assert!(err.downcast_ref::<EncodingUnsupported>().is_some());
    }

    #[test]
    fn no_args() {
        let buf = encode_command("ping", []).unwrap();
        assert_eq!(&buf[..], b"*1\r\n$4\r\nPING\r\n");
    }
}
