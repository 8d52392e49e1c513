pub mod adf;
pub mod template;
