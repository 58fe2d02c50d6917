/// Module for loading corpus documents from files.
pub mod file_loaders;
/// Text pasted line by line on a terminal.
pub mod manual_input;
