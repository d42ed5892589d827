pub mod codec;
pub mod dump;
pub mod reader;
pub mod writer;

pub use codec::Point;
pub use dump::dump_to_text;
pub use reader::{Block, PointFile, QueryContext};
pub use writer::{encode_sorted_text, BinaryWriter};
