mod pack;
mod unpack;

pub use pack::pack;
pub use unpack::unpack;
