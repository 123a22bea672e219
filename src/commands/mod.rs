pub mod annotation_commands;
pub mod scan_commands;
pub mod settings_commands;
