pub mod extractor;
pub mod policy;
pub mod sanitizer;
