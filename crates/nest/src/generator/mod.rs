mod interface;
mod mutex;
mod snowflake;

pub use interface::*;
pub(crate) use mutex::*;
pub use snowflake::*;
