pub mod commands;
pub mod html_converter;
pub mod html_parser;
pub mod insertion;
pub mod markdown_converter;
pub mod popup_menu;
pub mod structured_document;
pub mod structured_editor;
pub mod trigger;
