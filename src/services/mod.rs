pub mod api;
pub mod chat;
pub mod clipboard;
pub mod editor;
pub mod home;
pub mod optimize;
pub mod toast;

#[cfg(test)]
pub mod testing;
