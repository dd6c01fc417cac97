pub mod log_file;
pub mod message_codec;
