pub mod article;
pub mod content;
pub mod verdict;

pub use article::*;
pub use content::*;
pub use verdict::*;
