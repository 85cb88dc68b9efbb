mod buf_list;
mod byte_str;
mod io;
mod limit;
mod uninit;

pub use buf_list::{BufList, EitherBuf};
pub use byte_str::BytesStr;
pub use io::read_buf;
pub use limit::PagedBytesMut;
pub use uninit::ChunkVectoredUninit;
