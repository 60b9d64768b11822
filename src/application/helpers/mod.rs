pub mod global_id;
pub mod metafield_codec;
pub mod period;
