pub mod audio_models;
pub mod config;
pub mod error;
pub mod format;
pub mod state;
pub mod tensor_message;
